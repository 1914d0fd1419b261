//! Domain model structs persisted in the local SQLite database.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be handed
//! straight to the HTTP layer.

use chrono::{DateTime, Utc};
use jobcard_shared::ItemKind;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// JobCard
// ---------------------------------------------------------------------------

/// A repair ticket for one customer and one item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobCard {
    pub id: Uuid,
    pub customer: String,
    pub address: String,
    pub phone: String,
    pub item: ItemKind,
    pub serial: Option<String>,
    pub config: Option<String>,
    /// General notes about the job as a whole.
    pub notes: Option<String>,
    /// Set once on creation, never updated.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Complaint
// ---------------------------------------------------------------------------

/// One reported issue against a job card.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Complaint {
    pub id: Uuid,
    pub job_card_id: Uuid,
    pub description: String,
    pub notes: Option<String>,
    /// Index of the complaint in the last submission that touched it.
    pub position: i64,
}

// ---------------------------------------------------------------------------
// ComplaintImage
// ---------------------------------------------------------------------------

/// One photo evidencing a complaint. The backing file lives in the
/// [`ImageStore`](crate::ImageStore) and is owned by exactly this record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComplaintImage {
    pub id: Uuid,
    pub complaint_id: Uuid,
    /// Path of the file relative to the image store root.
    pub file_path: String,
    /// Name the file was uploaded under.
    pub file_name: String,
    pub content_type: String,
    pub file_size: i64,
    /// BLAKE3 content hash (hex string).
    pub blake3_hash: String,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Nested views
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComplaintDetail {
    #[serde(flatten)]
    pub complaint: Complaint,
    pub images: Vec<ComplaintImage>,
}

/// A job card with its complaints and their images, as listed and edited.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobCardDetail {
    #[serde(flatten)]
    pub job_card: JobCard,
    pub complaints: Vec<ComplaintDetail>,
}
