//! Manual trigger for the agent's `/stop` endpoint, mirroring `start_role`.

use role_trigger::command::{self, DEFAULT_AGENT_URL};
use role_trigger::{Client, RestError, StopRoleCommand};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), RestError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let command = StopRoleCommand {
        role_id: "role-1".to_string(),
        service_id: "service-1".to_string(),
        image_id: "busybox:latest".to_string(),
        remove_container: false,
    };

    info!(
        role_id = %command.role_id,
        service_id = %command.service_id,
        agent_url = DEFAULT_AGENT_URL,
        "sending stop command"
    );

    let client = Client::new();
    command::stop_role(&client, DEFAULT_AGENT_URL, &command).await
}
