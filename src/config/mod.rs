//! Project configuration and vault password discovery.

pub mod password;
pub mod settings;

pub use password::{resolve_password, FALLBACK_LOCATIONS};
pub use settings::Settings;
