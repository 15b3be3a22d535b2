//! docpdf — HTTP gateway that converts DOCX uploads to PDF through a
//! headless LibreOffice subprocess.
//!
//! Each request stages its upload into a disposable working directory and
//! runs the converter with a private profile inside it, so any number of
//! conversions can run concurrently without shared state. Observability is
//! per-request: a correlation ID on every response, one structured JSON log
//! line per request, and a lock-free Prometheus registry.
//!
//! # Endpoints
//!
//! - `POST /convert` — multipart upload (`file` field), returns the PDF
//! - `GET /health` — liveness probe
//! - `GET /metrics` — Prometheus text exposition
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use docpdf::ServerConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::load()?;
//!     docpdf::start_server(config).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod context;
pub mod converter;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ApiError, ApiResult};
pub use server::{build_router, start_server};
pub use state::AppState;
