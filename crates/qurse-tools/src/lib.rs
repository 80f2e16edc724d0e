// Tools module - search and utility tools exposed to tool-calling models
pub mod arxiv;
pub mod context;
pub mod registry;
pub mod tool;
pub mod weather;
pub mod web_search;

pub use arxiv::{ArxivClient, ArxivPaper, ArxivSearchTool};
pub use context::{SearchSession, ToolContext};
pub use registry::ToolRegistry;
pub use tool::{ParameterDefinition, Tool, ToolParameters, ToolResult};
pub use weather::{LocationDetectorTool, WeatherTool};
pub use web_search::{AggressiveWebSearchTool, ExaSearchClient};

pub const ARXIV_SEARCH_TOOL: &str = "arxiv_search";
pub const WEB_SEARCH_TOOL: &str = "aggressive_web_search";
pub const WEATHER_TOOL: &str = "weather";
pub const LOCATION_TOOL: &str = "location_detector";
