//! Infrastructure layer
//!
//! HTTP fetching, configuration, logging, extraction and persistence.

pub mod batch;
pub mod config;
pub mod database_connection;
pub mod extraction;
pub mod http_client;
pub mod logging;
pub mod repository;

pub use batch::{BatchUpsertEngine, FlushError, FlushStats};
pub use database_connection::DatabaseConnection;
pub use http_client::{HttpClient, HttpClientConfig};
pub use repository::ProductRepository;
