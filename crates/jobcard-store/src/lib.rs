//! # jobcard-store
//!
//! Local storage for repair job cards, backed by SQLite plus a directory of
//! complaint photos.
//!
//! The crate exposes a synchronous `Database` handle that wraps a
//! `rusqlite::Connection` and an [`ImageStore`]. Reads are plain methods on
//! `Database`; writes run inside a [`StoreTx`] so that records and files are
//! committed or discarded together. [`Database::reconcile`] applies a decoded
//! job card form in a single transaction.

pub mod complaint_images;
pub mod complaints;
pub mod database;
pub mod image_store;
pub mod job_cards;
pub mod migrations;
pub mod models;
pub mod reconcile;

mod error;

pub use database::{Database, StoreTx};
pub use error::{Result, StoreError};
pub use image_store::{ImageStore, StoredFile};
pub use models::*;
pub use reconcile::{ReconcileOptions, ReconcileStats, Reconciled, Target};
