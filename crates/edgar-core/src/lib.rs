//! Shared domain types for the EDGAR ingestion pipeline: entities, domain
//! identifier newtypes, the error taxonomy, and configuration loading.
//! Every other crate in this workspace depends on this one.

pub mod config;
pub mod error;
pub mod ids;
pub mod models;

pub use config::AppConfig;
pub use error::{EdgarError, EdgarResult};
pub use ids::{AccessionNumber, Cik, Ticker};
