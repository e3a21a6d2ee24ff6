//! Engine settings and local configuration files
//!
//! - `EngineSettings`: YAML settings (`~/.config/sophia/engine.yaml`)
//! - `EnvironmentConfigFile`: `config/environments/{env}.json` values

mod traits;
mod settings;
mod local_file;

pub use traits::{ConfigError, ConfigResult};
pub use settings::{EngineSettings, PersistMode, StackMap, TimeoutSettings, ToolSettings};
pub use local_file::{read_dotenv_var, EnvironmentConfigFile};
