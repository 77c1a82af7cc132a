#[allow(clippy::module_inception)]
pub mod config;
pub mod credentials;
pub mod models;
pub use config::{ParleyConfig, RoutedModel};
pub use credentials::Credentials;
pub use models::{CustomModelEntry, ModelFamily};
