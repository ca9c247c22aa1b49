pub mod datetime;
pub mod environment;
pub mod error;
pub mod event;
pub mod person;
pub mod project;
pub mod report;
pub mod std_doc;

pub use environment::*;
pub use error::*;
pub use event::*;
pub use person::*;
pub use project::*;
pub use std_doc::*;
