//! # jobcard-shared
//!
//! Vocabulary shared by the store and the HTTP server: the repairable item
//! kinds, validated job card fields, and the form decoder that turns a raw
//! submission into complaint slots ready for reconciliation.
//!
//! Nothing in this crate touches the filesystem or the database.

pub mod error;
pub mod form;
pub mod types;

pub use error::FormError;
pub use form::{decode, ComplaintBody, DecodedSubmission, RawForm, SubmissionBody};
pub use types::{ComplaintSlot, ItemKind, JobCardFields, NewImage, UploadedFile};
