mod config;
mod error;
mod models;
mod store;

pub use config::{CouchConfig, CouchCredentials};
pub use error::{CouchDaoError, CouchResult};
pub use store::CouchMatchStore;
