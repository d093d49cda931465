//! Manual trigger: asks the local agent to start one role. Companion to the
//! agent's `/start` endpoint; meant to be run by hand against a dev agent.

use role_trigger::command::{self, DEFAULT_AGENT_URL};
use role_trigger::{Client, RestError, StartRoleCommand};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), RestError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let command = StartRoleCommand {
        role_id: "role-1".to_string(),
        service_id: "service-1".to_string(),
        image_id: "busybox:latest".to_string(),
    };

    info!(
        role_id = %command.role_id,
        service_id = %command.service_id,
        image_id = %command.image_id,
        agent_url = DEFAULT_AGENT_URL,
        "sending start command"
    );

    let client = Client::new();
    command::start_role(&client, DEFAULT_AGENT_URL, &command).await
}
