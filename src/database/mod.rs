/*!
 * Database module for persistent storage.
 *
 * This module provides SQLite-based persistence for:
 * - The translation memory shared by all batches
 * - Partial batch snapshots used to resume interrupted runs
 */

pub mod schema;
pub mod connection;
pub mod repository;
pub mod models;

// Re-export main types
pub use connection::DatabaseConnection;
pub use repository::{BatchInsertReport, Repository};
