//! Bringing stored complaints and images in line with a submitted form.
//!
//! One call handles both create and edit; creating is reconciling against a
//! job card that has nothing yet. The order of operations is fixed:
//!
//! 1. explicit image deletions,
//! 2. explicit complaint deletions (scoped to this job card),
//! 3. scalar field update,
//! 4. each surviving slot in submission order: update or create the
//!    complaint, then append its new images,
//! 5. orphan sweep: complaints not touched by step 4 are deleted.
//!
//! All five steps share one [`StoreTx`], so a failure anywhere leaves both
//! the database and the image directory as they were.

use std::collections::HashSet;

use jobcard_shared::{ComplaintSlot, DecodedSubmission};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::database::{Database, StoreTx};
use crate::error::Result;
use crate::models::JobCardDetail;

/// Which job card a submission applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Create,
    Edit(Uuid),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Delete stored complaints that the submission no longer lists.
    pub sweep_orphans: bool,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            sweep_orphans: true,
        }
    }
}

/// What a reconciliation changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileStats {
    pub complaints_created: usize,
    pub complaints_updated: usize,
    pub complaints_deleted: usize,
    pub images_added: usize,
    pub images_deleted: usize,
    /// Explicit delete ids that did not resolve.
    pub stale_ids_skipped: usize,
}

#[derive(Debug, Clone)]
pub struct Reconciled {
    pub job_card: JobCardDetail,
    pub stats: ReconcileStats,
}

impl Database {
    /// Apply a decoded submission. Editing a job card that does not exist
    /// fails with [`StoreError::NotFound`](crate::StoreError::NotFound).
    pub fn reconcile(
        &mut self,
        target: Target,
        submission: &DecodedSubmission,
        options: ReconcileOptions,
    ) -> Result<Reconciled> {
        // Read back before committing so a saved edit never reports failure.
        let (job_card, stats) = self.write(|tx| {
            let (job_card_id, stats) = apply(tx, target, submission, options)?;
            Ok((tx.job_card_detail(job_card_id)?, stats))
        })?;

        info!(
            job_card_id = %job_card.job_card.id,
            created = stats.complaints_created,
            updated = stats.complaints_updated,
            deleted = stats.complaints_deleted,
            images_added = stats.images_added,
            images_deleted = stats.images_deleted,
            skipped = stats.stale_ids_skipped,
            "reconciled job card"
        );

        Ok(Reconciled { job_card, stats })
    }
}

fn apply(
    tx: &mut StoreTx<'_>,
    target: Target,
    submission: &DecodedSubmission,
    options: ReconcileOptions,
) -> Result<(Uuid, ReconcileStats)> {
    let mut stats = ReconcileStats::default();

    let job_card_id = match target {
        Target::Create => tx.create_job_card(&submission.fields)?.id,
        Target::Edit(id) => tx.get_job_card(id)?.id,
    };

    for &image_id in &submission.delete_image_ids {
        match tx.find_image_for(job_card_id, image_id)? {
            Some(image) => {
                tx.delete_image(image.id)?;
                stats.images_deleted += 1;
            }
            None => {
                warn!(job_card_id = %job_card_id, image_id = %image_id, "image marked for deletion not found, skipping");
                stats.stale_ids_skipped += 1;
            }
        }
    }

    for &complaint_id in &submission.delete_complaint_ids {
        match tx.find_complaint_for(job_card_id, complaint_id)? {
            Some(complaint) => {
                stats.images_deleted += delete_complaint(tx, complaint.id)?;
                stats.complaints_deleted += 1;
            }
            None => {
                warn!(job_card_id = %job_card_id, complaint_id = %complaint_id, "complaint marked for deletion not found, skipping");
                stats.stale_ids_skipped += 1;
            }
        }
    }

    if let Target::Edit(id) = target {
        tx.update_job_card(id, &submission.fields)?;
    }

    let mut processed = HashSet::new();
    for (position, slot) in submission.slots.iter().enumerate() {
        let complaint_id = upsert_complaint(tx, job_card_id, slot, position as i64, &processed, &mut stats)?;
        processed.insert(complaint_id);

        for image in &slot.new_images {
            tx.create_image(complaint_id, image)?;
            stats.images_added += 1;
        }
    }

    if options.sweep_orphans {
        for complaint in tx.list_complaints(job_card_id)? {
            if processed.contains(&complaint.id) {
                continue;
            }
            debug!(complaint_id = %complaint.id, "sweeping complaint missing from submission");
            stats.images_deleted += delete_complaint(tx, complaint.id)?;
            stats.complaints_deleted += 1;
        }
    }

    Ok((job_card_id, stats))
}

/// Update the slot's complaint if it still exists here and has not already
/// been claimed by an earlier slot; otherwise create a new one.
fn upsert_complaint(
    tx: &mut StoreTx<'_>,
    job_card_id: Uuid,
    slot: &ComplaintSlot,
    position: i64,
    processed: &HashSet<Uuid>,
    stats: &mut ReconcileStats,
) -> Result<Uuid> {
    let notes = Some(slot.notes.as_str()).filter(|n| !n.is_empty());

    let existing = match slot.id {
        Some(id) if !processed.contains(&id) => tx.find_complaint_for(job_card_id, id)?,
        _ => None,
    };

    match existing {
        Some(complaint) => {
            tx.update_complaint(complaint.id, &slot.description, notes, position)?;
            stats.complaints_updated += 1;
            Ok(complaint.id)
        }
        None => {
            if let Some(id) = slot.id {
                debug!(complaint_id = %id, "slot id does not resolve, creating a new complaint");
            }
            let complaint = tx.create_complaint(job_card_id, &slot.description, notes, position)?;
            stats.complaints_created += 1;
            Ok(complaint.id)
        }
    }
}

/// Returns the number of images removed with the complaint.
fn delete_complaint(tx: &mut StoreTx<'_>, id: Uuid) -> Result<usize> {
    let images = tx.list_images(id)?.len();
    tx.delete_complaint(id)?;
    Ok(images)
}
