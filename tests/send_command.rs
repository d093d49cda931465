use std::collections::BTreeMap;

use reqwest::Method;
use role_trigger::command::{self, DEFAULT_AGENT_URL, START_PATH, STOP_PATH};
use role_trigger::{
    Client, MockBehavior, MockBehaviorPlan, MockResponse, MockTransport, RestErrorKind,
    RestTransportState, StartRoleCommand, StopRoleCommand,
};

fn start_command() -> StartRoleCommand {
    StartRoleCommand {
        role_id: "role-1".to_string(),
        service_id: "service-1".to_string(),
        image_id: "busybox:latest".to_string(),
    }
}

fn recorded_body_fields(transport: &MockTransport, index: usize) -> BTreeMap<String, String> {
    let requests = transport.outbound_requests();
    let body = requests[index]
        .body
        .as_ref()
        .expect("recorded request should carry a body");
    sonic_rs::from_slice(body).expect("recorded body should be a flat JSON object")
}

#[tokio::test]
async fn start_role_posts_exact_payload_once() {
    let transport = MockTransport::new();
    let client = Client::with_transport(transport.clone());

    command::start_role(&client, DEFAULT_AGENT_URL, &start_command())
        .await
        .expect("start command should complete against default mock");

    let snapshot = transport.snapshot();
    assert_eq!(snapshot.request_count, 1);
    assert_eq!(snapshot.last_method, Some(Method::POST));
    assert_eq!(
        snapshot.last_url.as_deref(),
        Some("http://localhost:50551/start")
    );
    assert_eq!(snapshot.last_status, Some(200));
    assert_eq!(snapshot.state, RestTransportState::Idle);

    let expected = BTreeMap::from([
        ("roleId".to_string(), "role-1".to_string()),
        ("serviceId".to_string(), "service-1".to_string()),
        ("imageId".to_string(), "busybox:latest".to_string()),
    ]);
    assert_eq!(recorded_body_fields(&transport, 0), expected);

    let requests = transport.outbound_requests();
    assert!(
        requests[0]
            .headers
            .iter()
            .any(|(key, value)| key == "content-type" && value.as_ref() == b"application/json"),
        "request should declare a JSON content type"
    );
}

#[tokio::test]
async fn send_uses_caller_specified_method_and_url() {
    let transport = MockTransport::new();
    let client = Client::with_transport(transport.clone());

    command::send(
        &client,
        "http://localhost:50551/start",
        Method::PUT,
        &start_command(),
    )
    .await
    .expect("send should pass the method through untouched");

    let snapshot = transport.snapshot();
    assert_eq!(snapshot.last_method, Some(Method::PUT));
    assert_eq!(
        snapshot.last_url.as_deref(),
        Some("http://localhost:50551/start")
    );
}

#[tokio::test]
async fn non_2xx_ack_completes_without_retry() {
    let transport = MockTransport::new();
    let url = format!("{DEFAULT_AGENT_URL}{START_PATH}");
    transport.queue_post_response(&url, MockResponse::text(500, "agent exploded"));
    transport.queue_post_response(&url, MockResponse::text(200, ""));
    let client = Client::with_transport(transport.clone());

    command::start_role(&client, DEFAULT_AGENT_URL, &start_command())
        .await
        .expect("a delivered non-2xx ack is still a completed send");

    let snapshot = transport.snapshot();
    assert_eq!(snapshot.request_count, 1, "no retry on non-2xx status");
    assert_eq!(snapshot.last_status, Some(500));
}

#[tokio::test]
async fn connect_failure_propagates_after_exactly_one_attempt() {
    let transport = MockTransport::with_behavior(MockBehavior::connect_error(
        "connection refused",
        true,
    ));
    let client = Client::with_transport(transport.clone());

    let err = command::start_role(&client, DEFAULT_AGENT_URL, &start_command())
        .await
        .expect_err("unreachable agent should surface a transport error");

    assert_eq!(err.kind(), RestErrorKind::Connect);
    assert!(err.is_retryable());
    assert_eq!(transport.snapshot().request_count, 1);
}

#[tokio::test]
async fn timeout_and_dropped_responses_are_typed_as_timeouts() {
    let mut behavior_plan = MockBehaviorPlan::default();
    behavior_plan.push(MockBehavior::timeout_error("timed out", true));
    behavior_plan.push(MockBehavior::drop_response());
    let transport = MockTransport::with_behavior_plan(behavior_plan);
    let client = Client::with_transport(transport.clone());

    let timeout_err = command::start_role(&client, DEFAULT_AGENT_URL, &start_command())
        .await
        .expect_err("timeout behavior should fail");
    assert_eq!(timeout_err.kind(), RestErrorKind::Timeout);

    let drop_err = command::start_role(&client, DEFAULT_AGENT_URL, &start_command())
        .await
        .expect_err("dropped response should fail");
    assert_eq!(drop_err.kind(), RestErrorKind::Timeout);

    assert_eq!(transport.snapshot().request_count, 2);
}

#[tokio::test]
async fn scripted_rejection_surfaces_status() {
    let transport = MockTransport::with_behavior(MockBehavior::reject(503, "rate limited"));
    let client = Client::with_transport(transport.clone());

    let err = command::start_role(&client, DEFAULT_AGENT_URL, &start_command())
        .await
        .expect_err("scripted rejection should fail");

    assert_eq!(err.kind(), RestErrorKind::Rejected);
    assert_eq!(err.status(), Some(503));
}

#[tokio::test]
async fn stop_role_posts_remove_container_flag_to_stop_path() {
    let transport = MockTransport::new();
    let client = Client::with_transport(transport.clone());

    let command = StopRoleCommand {
        role_id: "role-1".to_string(),
        service_id: "service-1".to_string(),
        image_id: "busybox:latest".to_string(),
        remove_container: true,
    };
    command::stop_role(&client, DEFAULT_AGENT_URL, &command)
        .await
        .expect("stop command should complete against default mock");

    let snapshot = transport.snapshot();
    assert_eq!(snapshot.last_method, Some(Method::POST));
    assert_eq!(
        snapshot.last_url.as_deref(),
        Some(&*format!("{DEFAULT_AGENT_URL}{STOP_PATH}"))
    );

    let requests = transport.outbound_requests();
    let body = requests[0].body.as_ref().expect("stop body recorded");
    let parsed: StopRoleCommand = sonic_rs::from_slice(body).expect("stop body parses back");
    assert_eq!(parsed, command);
}

#[tokio::test]
async fn consecutive_sends_emit_one_request_each() {
    let transport = MockTransport::new();
    let client = Client::with_transport(transport.clone());

    command::start_role(&client, DEFAULT_AGENT_URL, &start_command())
        .await
        .expect("first send");
    command::start_role(&client, DEFAULT_AGENT_URL, &start_command())
        .await
        .expect("second send");

    assert_eq!(transport.outbound_count(), 2);
}

#[tokio::test]
async fn health_maps_status_to_bool_and_propagates_transport_errors() {
    let transport = MockTransport::new();
    let url = format!("{DEFAULT_AGENT_URL}/healthz");
    transport.queue_get_response(&url, MockResponse::text(200, ""));
    transport.queue_get_response(&url, MockResponse::text(503, "draining"));
    let client = Client::with_transport(transport.clone());

    assert!(command::health(&client, DEFAULT_AGENT_URL)
        .await
        .expect("healthy agent"));
    assert!(!command::health(&client, DEFAULT_AGENT_URL)
        .await
        .expect("unhealthy agent still answers"));

    let dead = Client::with_transport(MockTransport::with_behavior(
        MockBehavior::connect_error("connection refused", true),
    ));
    let err = command::health(&dead, DEFAULT_AGENT_URL)
        .await
        .expect_err("unreachable agent should error");
    assert_eq!(err.kind(), RestErrorKind::Connect);
}
