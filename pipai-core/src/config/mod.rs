pub mod app;
pub mod error;
pub mod loader;
pub mod paths;
pub mod prompts;
pub mod server;

pub use app::AppConfig;
pub use error::ConfigError;
pub use loader::ensure_env_loaded;
pub use paths::{config_dir, ensure_config_dirs};
pub use prompts::{PromptLibrary, PromptTemplate};
pub use server::{ToolProviderConfig, load_servers};
