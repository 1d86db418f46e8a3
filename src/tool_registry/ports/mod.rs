//! Port contracts for tool server resolution and startup.

mod config_source;
mod host;

pub use config_source::{ConfigSource, ConfigSourceError, ConfigSourceResult};
pub use host::{
    HostCapabilities, ReleasableResource, StartedServer, ToolServerHost, ToolServerHostError,
    ToolServerHostResult,
};
