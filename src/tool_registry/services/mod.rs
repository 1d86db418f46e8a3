//! Application services for resolving and loading consumer tool servers.

pub mod cache;
pub mod descriptor;
pub mod lifecycle;
pub mod loader;
pub mod resolver;
pub mod scope;
pub mod settings;
pub mod starter;
pub mod template;

pub use cache::LoadCache;
pub use descriptor::{
    BuiltDescriptor, DescriptorBuilder, DescriptorWarning, OutputSuppression, QUIET_ENV,
};
pub use lifecycle::{DEFAULT_STARTUP_TIMEOUT, LifecycleManager, LifecycleResult};
pub use loader::{LoaderContext, LoaderError, LoaderResult, ToolLoader};
pub use resolver::{ConfigResolver, DEFAULT_FALLBACK_PREFIXES, LoadOptions};
pub use scope::{CleanupScope, ReleaseFailure, ScopeCloseReport};
pub use settings::LoaderSettings;
pub use starter::{ComposableStarter, ServerStarter, SimpleStarter, StartOutcome, select_starter};
pub use template::{EnvSnapshot, Substitution, SubstitutionWarning, substitute, substitute_str};
