mod loader;
mod types;

pub use loader::{COLLECTOR_URL_ENV, ConfigLoader, PROJECT_CONFIG_DIR_ENV, validate_endpoint};
pub use types::LatConfig;
