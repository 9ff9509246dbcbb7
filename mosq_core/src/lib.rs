pub mod abi;
pub mod event_registry;
pub mod host;
pub mod lifecycle;
pub mod log_relay;
pub mod logging;
pub mod options;
pub mod plugin_macros;
pub mod runtime;

pub use libc;

pub use abi::{EventCallback, EventKind, MosquittoOpt, PluginId, UserData, UserDataSlot};
pub use event_registry::RegistryError;
pub use host::HostApi;
pub use options::OptionList;
pub use runtime::{DecisionRuntime, PluginSession};

#[cfg(feature = "logging")]
pub use liblogger::{log_debug, log_error, log_info, log_warn};
