//! Chat orchestration over the model and tool gateways

mod credentials;
mod error;
mod gateways;
mod orchestrator;

pub use credentials::{CredentialValidator, Credentials};
pub use error::{ChatError, Provider};
#[cfg(feature = "test-sim")]
pub use gateways::StaticGateways;
pub use gateways::{DefaultGateways, GatewayFactory};
pub use orchestrator::{ChatOrchestrator, ChatOutcome};
