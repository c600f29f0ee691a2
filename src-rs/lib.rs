pub mod agent;
pub mod calc;
pub mod config;
pub mod error;
pub mod helpers;
pub mod prompts;
pub mod result;

#[path = "llm/lib.rs"]
pub mod llm;
#[path = "tools/lib.rs"]
pub mod tools;
#[path = "pipeline/lib.rs"]
pub mod pipeline;
#[path = "runs/lib.rs"]
pub mod runs;
#[path = "api/lib.rs"]
pub mod api;

pub use agent::{ComparisonAgent, SessionState};
pub use config::AgentConfig;
pub use error::AgentError;
pub use prompts::ComparisonRequest;
pub use result::{AgentResult, SessionError, SessionOutcome};
