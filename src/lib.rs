/// Portfolio site backend and admin image pipeline.
///
/// - `crop`: file reading, crop state and JPEG rendering for uploaded images
/// - `state`: the SQLite catalog, record types and admin form sessions
/// - `server`: the axum REST API over the catalog

pub mod config;
pub mod crop;
pub mod error;
pub mod server;
pub mod state;
