pub mod chain;
pub mod extract;
pub mod slots;

pub use chain::{CalculationChain, ChainError, ChainStep, Comparison, TickerReturns};
pub use extract::extract;
pub use slots::{is_complete, CompleteMetrics, Observation, Role, SlotMapper, StockMetrics};
