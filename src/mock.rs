use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use bytes::Bytes;
use reqwest::Method;
use serde::Serialize;
use sonic_rs::to_vec;

use super::adapter::{
    RestBytes, RestError, RestErrorKind, RestFuture, RestRequest, RestResponse, RestResult,
    RestTransport, RestTransportState,
};

/// Scripted outcome for the next request the mock sees. Defaults to `Pass`,
/// which serves the next queued response (or an empty 200 when nothing is
/// queued).
#[derive(Clone, Debug, Default)]
pub enum MockBehavior {
    #[default]
    Pass,
    Delay(Duration),
    Reject {
        status: u16,
        reason: String,
    },
    ConnectError {
        reason: String,
        retryable: bool,
    },
    TimeoutError {
        reason: String,
        retryable: bool,
    },
    Drop,
}

impl MockBehavior {
    pub fn pass() -> Self {
        Self::Pass
    }

    pub fn delay(ms: u64) -> Self {
        Self::Delay(Duration::from_millis(ms))
    }

    pub fn reject(status: u16, reason: impl Into<String>) -> Self {
        Self::Reject {
            status,
            reason: reason.into(),
        }
    }

    pub fn connect_error(reason: impl Into<String>, retryable: bool) -> Self {
        Self::ConnectError {
            reason: reason.into(),
            retryable,
        }
    }

    pub fn timeout_error(reason: impl Into<String>, retryable: bool) -> Self {
        Self::TimeoutError {
            reason: reason.into(),
            retryable,
        }
    }

    pub fn drop_response() -> Self {
        Self::Drop
    }
}

#[derive(Clone, Debug, Default)]
pub struct MockBehaviorPlan {
    queue: VecDeque<MockBehavior>,
}

impl MockBehaviorPlan {
    pub fn push(&mut self, behavior: MockBehavior) -> &mut Self {
        self.queue.push_back(behavior);
        self
    }

    fn pop(&mut self) -> MockBehavior {
        self.queue.pop_front().unwrap_or_default()
    }

    fn remaining(&self) -> usize {
        self.queue.len()
    }
}

#[derive(Clone, Debug)]
pub struct MockResponse {
    pub status: u16,
    pub headers: Vec<(String, RestBytes)>,
    pub body: RestBytes,
}

impl MockResponse {
    pub fn new(status: u16, body: impl Into<RestBytes>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<RestBytes>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self::new(status, body.into())
    }

    pub fn json<T: Serialize>(status: u16, payload: &T) -> RestResult<Self> {
        let body = to_vec(payload).map_err(RestError::encode)?;
        Ok(Self::new(status, body))
    }
}

#[derive(Clone, Debug)]
pub struct MockTransportSnapshot {
    pub state: RestTransportState,
    pub request_count: usize,
    pub last_method: Option<Method>,
    pub last_url: Option<String>,
    pub last_status: Option<u16>,
    pub behavior_remaining: usize,
    pub response_queue_len: usize,
    pub route_queue_len: usize,
    pub last_error: Option<String>,
    pub elapsed_total: Duration,
}

#[derive(Debug)]
struct MockTransportState {
    state: RestTransportState,
    request_count: usize,
    last_method: Option<Method>,
    last_url: Option<String>,
    last_status: Option<u16>,
    behavior_plan: MockBehaviorPlan,
    default_response_queue: VecDeque<MockResponse>,
    route_response_queues: HashMap<(Method, String), VecDeque<MockResponse>>,
    outbound_log: Vec<RestRequest>,
    last_error: Option<String>,
    elapsed_total: Duration,
}

impl MockTransportState {
    fn snapshot(&self) -> MockTransportSnapshot {
        MockTransportSnapshot {
            state: self.state,
            request_count: self.request_count,
            last_method: self.last_method.clone(),
            last_url: self.last_url.clone(),
            last_status: self.last_status,
            behavior_remaining: self.behavior_plan.remaining(),
            response_queue_len: self.default_response_queue.len(),
            route_queue_len: self.route_response_queues.values().map(VecDeque::len).sum(),
            last_error: self.last_error.clone(),
            elapsed_total: self.elapsed_total,
        }
    }
}

impl Default for MockTransportState {
    fn default() -> Self {
        Self {
            state: RestTransportState::Idle,
            request_count: 0,
            last_method: None,
            last_url: None,
            last_status: None,
            behavior_plan: MockBehaviorPlan::default(),
            default_response_queue: VecDeque::new(),
            route_response_queues: HashMap::new(),
            outbound_log: Vec::new(),
            last_error: None,
            elapsed_total: Duration::from_millis(0),
        }
    }
}

/// In-memory transport that records every outbound request and serves
/// scripted behaviors and queued responses.
#[derive(Clone, Debug)]
pub struct MockTransport {
    state: Arc<Mutex<MockTransportState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockTransportState::default())),
        }
    }

    pub fn with_behavior_plan(behavior_plan: MockBehaviorPlan) -> Self {
        let transport = Self::new();
        transport
            .state
            .lock()
            .expect("mock transport mutex poisoned while installing behavior plan")
            .behavior_plan = behavior_plan;
        transport
    }

    pub fn with_behavior(behavior: MockBehavior) -> Self {
        let mut behavior_plan = MockBehaviorPlan::default();
        behavior_plan.push(behavior);
        Self::with_behavior_plan(behavior_plan)
    }

    pub fn snapshot(&self) -> MockTransportSnapshot {
        self.state
            .lock()
            .expect("mock transport mutex poisoned while taking snapshot")
            .snapshot()
    }

    pub fn queue_response(&self, response: MockResponse) {
        self.state
            .lock()
            .expect("mock transport mutex poisoned while queueing response")
            .default_response_queue
            .push_back(response);
    }

    pub fn queue_response_for(
        &self,
        method: Method,
        url: impl Into<String>,
        response: MockResponse,
    ) {
        let key = (method, url.into());
        self.state
            .lock()
            .expect("mock transport mutex poisoned while queueing response by route")
            .route_response_queues
            .entry(key)
            .or_default()
            .push_back(response);
    }

    pub fn queue_post_response(&self, url: impl Into<String>, response: MockResponse) {
        self.queue_response_for(Method::POST, url, response);
    }

    pub fn queue_get_response(&self, url: impl Into<String>, response: MockResponse) {
        self.queue_response_for(Method::GET, url, response);
    }

    /// Every request executed so far, oldest first, bodies included.
    pub fn outbound_requests(&self) -> Vec<RestRequest> {
        self.state
            .lock()
            .expect("mock transport mutex poisoned while reading outbound log")
            .outbound_log
            .clone()
    }

    pub fn outbound_count(&self) -> usize {
        self.state
            .lock()
            .expect("mock transport mutex poisoned while reading outbound count")
            .outbound_log
            .len()
    }

    pub fn clear_log(&self) {
        self.state
            .lock()
            .expect("mock transport mutex poisoned while clearing log")
            .outbound_log
            .clear();
    }

    fn pop_behavior(&self) -> MockBehavior {
        self.state
            .lock()
            .expect("mock transport mutex poisoned while reading behavior plan")
            .behavior_plan
            .pop()
    }

    fn next_response(&self, request: &RestRequest) -> Option<MockResponse> {
        let mut state = self
            .state
            .lock()
            .expect("mock transport mutex poisoned while selecting response");
        let route_key = (request.method.clone(), request.url.clone());
        if let Some(queue) = state.route_response_queues.get_mut(&route_key) {
            if let Some(response) = queue.pop_front() {
                return Some(response);
            }
        }
        state.default_response_queue.pop_front()
    }

    fn record_request(&self, request: &RestRequest) {
        let mut state = self
            .state
            .lock()
            .expect("mock transport mutex poisoned while recording request");
        state.outbound_log.push(request.clone());
        state.request_count += 1;
        state.last_method = Some(request.method.clone());
        state.last_url = Some(request.url.clone());
        state.state = RestTransportState::Busy;
        state.last_error = None;
    }

    fn record_response(&self, status: u16, elapsed: Duration) {
        let mut state = self
            .state
            .lock()
            .expect("mock transport mutex poisoned while recording response");
        state.last_status = Some(status);
        state.state = RestTransportState::Idle;
        state.elapsed_total += elapsed;
    }

    fn fail(
        &self,
        kind: RestErrorKind,
        status: Option<u16>,
        message: impl Into<String>,
        retryable: bool,
    ) -> RestError {
        let message = message.into();
        let error = match kind {
            RestErrorKind::Connect => RestError::connect(message.clone(), status, retryable),
            RestErrorKind::Timeout => RestError::timeout(message.clone(), status, retryable),
            RestErrorKind::Rejected => {
                RestError::rejected(status.unwrap_or(500), message.clone(), retryable)
            }
            _ => RestError::new(kind, status, message.clone(), retryable),
        };

        let mut state = self
            .state
            .lock()
            .expect("mock transport mutex poisoned while recording error");
        state.state = RestTransportState::Error;
        state.last_error = Some(message);
        state.last_status = status;
        error
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl RestTransport for MockTransport {
    fn execute(&self, request: RestRequest) -> RestFuture<RestResult<RestResponse>> {
        let transport = self.clone();
        Box::pin(async move {
            let behavior = transport.pop_behavior();
            if let MockBehavior::Delay(duration) = &behavior {
                std::thread::sleep(*duration);
            }

            let start = Instant::now();
            transport.record_request(&request);

            match behavior {
                MockBehavior::Drop => {
                    return Err(transport.fail(
                        RestErrorKind::Timeout,
                        None,
                        "mock transport dropped response",
                        false,
                    ));
                }
                MockBehavior::ConnectError { reason, retryable } => {
                    return Err(transport.fail(RestErrorKind::Connect, None, reason, retryable));
                }
                MockBehavior::TimeoutError { reason, retryable } => {
                    return Err(transport.fail(RestErrorKind::Timeout, None, reason, retryable));
                }
                MockBehavior::Reject { status, reason } => {
                    return Err(transport.fail(
                        RestErrorKind::Rejected,
                        Some(status),
                        reason,
                        true,
                    ));
                }
                MockBehavior::Pass | MockBehavior::Delay(_) => {}
            }

            let response = match transport.next_response(&request) {
                Some(response) => RestResponse {
                    status: response.status,
                    headers: response.headers,
                    body: response.body,
                    elapsed: start.elapsed(),
                },
                // Empty queue means the agent acked with a bare 200.
                None => RestResponse {
                    status: 200,
                    headers: Vec::new(),
                    body: Bytes::new(),
                    elapsed: start.elapsed(),
                },
            };

            transport.record_response(response.status, response.elapsed);
            Ok(response)
        })
    }
}
