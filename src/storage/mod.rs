//! Storage module for persistent data storage
//!
//! Provides SQLite-based persistence for document and chunk metadata.

mod database;

pub use database::MetadataStore;
