pub mod discovery;
pub mod error;
pub mod loader;
pub mod model;
pub mod parser;

pub use discovery::find_config_file;
pub use error::{ConfigError, Result};
pub use loader::{load_fleet, load_fleet_from_path};
pub use model::{
    AppDefinition, Fleet, GlobalSettings, LifecycleConfig, Organization, ProcessKey,
    ProcessRuntimeState, ProcessStatus,
};
pub use parser::{parse_kdl_file, parse_kdl_string};
