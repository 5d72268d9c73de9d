mod schema;
mod settings;
mod storage;

pub use schema::SchemaManager;
pub use settings::{Database, Logger, Server, Settings, Worker};
pub use storage::Storage;
