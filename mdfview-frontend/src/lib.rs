pub mod cli;
pub mod errors;
pub mod loader;

pub use cli::{EntityReport, InspectReport, RenderOptions};
pub use errors::FrontendError;
