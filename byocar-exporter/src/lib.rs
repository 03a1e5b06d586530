//! byocar exporter library
//!
//! Configuration, exporters, the polling loop and the HTTP routes of the
//! `byocar-exporter` binary, exposed for testing and embedding.

pub mod config;
pub mod exporter;
pub mod fetcher;
pub mod server;

pub use config::{Config, StoreSelection};
pub use exporter::{render_metrics, Exporter, ExporterSet, InfluxExporter, PrometheusExporter};
pub use fetcher::Fetcher;
pub use server::{create_router, serve, AppState};
