//! Ad-hoc trigger for the local role-running agent: builds a role command,
//! POSTs it as JSON, and ignores the reply. Ships a reqwest-backed transport
//! plus an in-memory mock transport for fully deterministic tests.

pub mod adapter;
pub mod command;
pub mod mock;

pub use reqwest::Method;

pub use adapter::{
    Client, ReqwestTransport, RestBytes, RestError, RestErrorKind, RestFuture, RestRequest,
    RestResponse, RestResult, RestTransport, RestTransportState,
};
pub use command::{StartRoleCommand, StopRoleCommand, DEFAULT_AGENT_URL};
pub use mock::{MockBehavior, MockBehaviorPlan, MockResponse, MockTransport, MockTransportSnapshot};
