//! Power system tools
//!
//! ```text
//! ┌──────────────────────────────┐
//! │  PowerToolRegistry           │  name + JSON args -> {status, message, ...}
//! │   - typed args (serde)       │
//! │   - JSON schemas (schemars)  │
//! └──────────────┬───────────────┘
//!                │ Mutex
//!                ▼
//! ┌──────────────────────────────┐
//! │  AnalysisSession             │  load / solve / contingency / info
//! └──────────────────────────────┘
//! ```
//!
//! The registry is served over MCP by `mcp::server` and can be used
//! in-process through `mcp::LocalChannel`.

mod catalog;
mod registry;

pub use catalog::{
    ContingencyArgs, LoadAndRunArgs, LoadNetworkArgs, NoArgs, PowerFlowArgs, PowerTool,
};
pub use registry::{
    error_payload, power_flow_payload, PowerToolRegistry, ToolCallResult, ToolError,
};
