#[allow(clippy::module_inception)]
pub mod history;

pub use history::History;
