pub mod clock;
pub mod config_store;
pub mod document_store;
pub mod error_translator;

pub use clock::*;
pub use config_store::*;
pub use document_store::*;
pub use error_translator::*;
