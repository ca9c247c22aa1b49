pub mod clock;
pub mod config;
pub mod store;
pub mod translator;

pub use clock::SystemClock;
pub use config::FileConfigStore;
pub use store::LocalDocumentStore;
pub use translator::DefaultErrorTranslator;
