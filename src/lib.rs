//! clipseek: natural-language search over a corpus of CLIP-embedded images.
//!
//! This crate is the service layer around [`clipseek_fusion`]:
//! Config file → logging → HTTP encoder + index → fusion engine → HTTP façade
//!
//! # Architecture
//!
//! - **Config**: `config.toml` sections for the server, encoder, fusion engine and logging
//! - **Encoder**: a remote embedding endpoint reached with `reqwest`, memoised per text
//! - **Reload**: an application-supplied [`SnapshotLoader`] builds backends that are
//!   swapped in atomically
//! - **Server**: an `axum` router exposing search, health and reload

pub mod config;
pub mod encoder;
pub mod error;
pub mod logging;
pub mod reload;
pub mod server;

pub use clipseek_fusion as fusion;
pub use config::ServiceConfig;
pub use encoder::HttpTextEncoder;
pub use error::{Result, ServiceError};
pub use reload::{HttpBackend, ReloadReport, SnapshotLoader, http_backend, reload};
pub use server::{ApiServer, AppState, router};
