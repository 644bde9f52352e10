pub mod default;
pub mod hot_reload;
pub mod loader;

pub use default::DEFAULT_POLICY;
pub use hot_reload::PolicyWatcher;
pub use loader::{compile_document, load_policy, parse_policy, PolicyError, PolicyLoader, PolicySource};
