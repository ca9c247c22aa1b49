pub mod context;
pub mod error;
pub mod mirror;
pub mod project_service;
pub mod state;

pub use context::*;
pub use error::*;
pub use mirror::*;
pub use project_service::*;
pub use state::*;
