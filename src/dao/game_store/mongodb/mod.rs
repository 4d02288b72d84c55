mod config;
mod connection;
mod error;
mod models;
/// `GameStore` and `CoachStore` over MongoDB collections.
pub mod store;

pub use config::MongoConfig;
pub use error::MongoDaoError;
pub use store::MongoStore;
