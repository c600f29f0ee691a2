pub mod calc_client;
pub mod dispatcher;
pub mod registry;
pub mod search;
pub mod types;

pub use calc_client::HttpCalcService;
pub use dispatcher::{CalculationService, Dispatcher, SearchProvider};
pub use registry::ToolRegistry;
pub use search::SerpApiClient;
pub use types::{
    ParamSpec, ParamType, SearchItem, SearchQuery, ToolCategory, ToolDefinition, ToolFailure, ToolKind,
    ToolRequest, ToolResult, ToolSchema, TransportError,
};
