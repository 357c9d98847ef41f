//! Batch services: tagging server client, importers, reconciliation, mirror

pub mod csv_source;
pub mod data_importer;
pub mod mirror;
pub mod reconciler;
pub mod retry;
pub mod tagging_client;
pub mod taxonomy_importer;
