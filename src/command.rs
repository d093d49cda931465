//! Role commands understood by the local agent's command listener.
//!
//! The agent exposes `/start` and `/stop` on port 50551 and a `/healthz`
//! probe. Commands are fire-and-forget: the agent acks with a bare status
//! code and launches the container in the background, so callers only care
//! that the request went out at all.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use sonic_rs::to_vec;

use crate::adapter::{Client, RestError, RestRequest, RestResult};

pub const DEFAULT_AGENT_URL: &str = "http://localhost:50551";
pub const START_PATH: &str = "/start";
pub const STOP_PATH: &str = "/stop";
pub const HEALTH_PATH: &str = "/healthz";

const JSON_CONTENT_TYPE: &[u8] = b"application/json";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRoleCommand {
    pub role_id: String,
    pub service_id: String,
    pub image_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopRoleCommand {
    pub role_id: String,
    pub service_id: String,
    pub image_id: String,
    pub remove_container: bool,
}

/// Serializes `payload` and issues exactly one request against `url`.
///
/// The response is discarded, status code included; a non-2xx ack is still a
/// completed send. Transport failures propagate to the caller untouched, and
/// no retry is ever attempted.
pub async fn send<T: Serialize>(
    client: &Client,
    url: impl Into<String>,
    method: Method,
    payload: &T,
) -> RestResult<()> {
    let body = to_vec(payload).map_err(RestError::encode)?;
    let request = RestRequest::new(method, url)
        .with_header("content-type", JSON_CONTENT_TYPE)
        .with_body(body);
    client.execute(request).await?;
    Ok(())
}

pub async fn start_role(
    client: &Client,
    agent_url: &str,
    command: &StartRoleCommand,
) -> RestResult<()> {
    send(client, format!("{agent_url}{START_PATH}"), Method::POST, command).await
}

pub async fn stop_role(
    client: &Client,
    agent_url: &str,
    command: &StopRoleCommand,
) -> RestResult<()> {
    send(client, format!("{agent_url}{STOP_PATH}"), Method::POST, command).await
}

/// Probes the agent's health endpoint. `Ok(false)` means the agent answered
/// with a non-2xx status; an unreachable agent is still an `Err`.
pub async fn health(client: &Client, agent_url: &str) -> RestResult<bool> {
    let request = RestRequest::get(format!("{agent_url}{HEALTH_PATH}"));
    let response = client.execute(request).await?;
    Ok(response.is_success())
}
