pub mod store;
pub mod types;

pub use store::RunStore;
pub use types::{RunRecord, RunStatus};
