//! Domain model for per-consumer tool server resolution and loading.
//!
//! The tool registry domain models server and consumer identity, raw and
//! resolved configuration, connection descriptors, the per-server load state
//! machine and live server handles. Infrastructure concerns remain outside
//! this boundary.

mod config;
mod descriptor;
mod entry;
mod error;
mod handle;
mod ids;
mod load_state;
mod tool;

pub use config::{
    ConfigOrigin, ConsumerConfig, ConsumerConfigLookup, GlobalConfig, ResolutionWarning,
    ResolvedServer, ResolvedServerSet, ServerOrigin,
};
pub use descriptor::{ConnectionDescriptor, NetworkDescriptor, SubprocessDescriptor};
pub use entry::{
    ARGS_KEY, COMMAND_KEY, ENV_KEY, HEADERS_KEY, SUPPRESS_OUTPUT_KEY, ServerConfigEntry,
    TransportKind, URL_KEY, json_type_name,
};
pub use error::{DescriptorRejection, ToolRegistryDomainError, TransportChangeRejected};
pub use handle::{LoadedServerHandle, ReleaseTicket, ScopeId};
pub use ids::{ConsumerName, ConsumerScopeKey, ServerName, SessionId};
pub use load_state::{
    LoadFailure, LoadReport, ServerLoadOutcome, ServerLoadState, ServerLoadTracker, StartupPath,
};
pub use tool::ToolDefinition;
