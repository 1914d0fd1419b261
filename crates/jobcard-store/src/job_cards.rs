//! CRUD operations for [`JobCard`] records.

use jobcard_shared::{ItemKind, JobCardFields};
use rusqlite::{params, Connection};
use tracing::info;
use uuid::Uuid;

use crate::database::{now, time_col, to_sql_time, uuid_col, Database, StoreTx};
use crate::error::{not_found, Result, StoreError};
use crate::models::{ComplaintDetail, JobCard, JobCardDetail};
use crate::{complaint_images, complaints};

const COLUMNS: &str = "id, customer, address, phone, item, serial, config, notes, created_at";

// ------------------------------------------------------------------
// Reads
// ------------------------------------------------------------------

pub(crate) fn get(conn: &Connection, id: Uuid) -> Result<JobCard> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM job_cards WHERE id = ?1"),
        params![id.to_string()],
        row_to_job_card,
    )
    .map_err(not_found)
}

/// Newest first; ties on `created_at` fall back to the latest insert.
pub(crate) fn list(conn: &Connection) -> Result<Vec<JobCard>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM job_cards ORDER BY created_at DESC, rowid DESC"
    ))?;
    let rows = stmt.query_map([], row_to_job_card)?;
    rows.collect::<std::result::Result<Vec<_>, _>>()
        .map_err(StoreError::Sqlite)
}

pub(crate) fn detail(conn: &Connection, job_card: JobCard) -> Result<JobCardDetail> {
    let mut complaints = Vec::new();
    for complaint in complaints::list(conn, job_card.id)? {
        let images = complaint_images::list(conn, complaint.id)?;
        complaints.push(ComplaintDetail { complaint, images });
    }
    Ok(JobCardDetail {
        job_card,
        complaints,
    })
}

impl Database {
    pub fn get_job_card(&self, id: Uuid) -> Result<JobCard> {
        get(self.conn(), id)
    }

    /// All job cards, newest first.
    pub fn list_job_cards(&self) -> Result<Vec<JobCard>> {
        list(self.conn())
    }

    /// One job card with its complaints and images.
    pub fn job_card_detail(&self, id: Uuid) -> Result<JobCardDetail> {
        detail(self.conn(), get(self.conn(), id)?)
    }

    /// Every job card, newest first, each with complaints and images.
    pub fn list_job_card_details(&self) -> Result<Vec<JobCardDetail>> {
        list(self.conn())?
            .into_iter()
            .map(|job_card| detail(self.conn(), job_card))
            .collect()
    }

    /// Delete a job card together with its complaints, images and files.
    /// Returns `false` if no such job card exists.
    pub fn delete_job_card(&mut self, id: Uuid) -> Result<bool> {
        let deleted = self.write(|tx| tx.delete_job_card(id))?;
        if deleted {
            info!(job_card_id = %id, "deleted job card");
        }
        Ok(deleted)
    }
}

// ------------------------------------------------------------------
// Writes
// ------------------------------------------------------------------

impl StoreTx<'_> {
    pub fn get_job_card(&self, id: Uuid) -> Result<JobCard> {
        get(self.conn(), id)
    }

    /// Detail as seen by this transaction, uncommitted changes included.
    pub fn job_card_detail(&self, id: Uuid) -> Result<JobCardDetail> {
        detail(self.conn(), get(self.conn(), id)?)
    }

    pub fn create_job_card(&mut self, fields: &JobCardFields) -> Result<JobCard> {
        let job_card = JobCard {
            id: Uuid::new_v4(),
            customer: fields.customer.clone(),
            address: fields.address.clone(),
            phone: fields.phone.clone(),
            item: fields.item,
            serial: fields.serial.clone(),
            config: fields.config.clone(),
            notes: fields.notes.clone(),
            created_at: now(),
        };

        self.conn().execute(
            &format!("INSERT INTO job_cards ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
            params![
                job_card.id.to_string(),
                job_card.customer,
                job_card.address,
                job_card.phone,
                job_card.item.as_str(),
                job_card.serial,
                job_card.config,
                job_card.notes,
                to_sql_time(&job_card.created_at),
            ],
        )?;
        Ok(job_card)
    }

    /// Overwrite every mutable field. `created_at` is left alone.
    pub fn update_job_card(&mut self, id: Uuid, fields: &JobCardFields) -> Result<JobCard> {
        let affected = self.conn().execute(
            "UPDATE job_cards
             SET customer = ?2, address = ?3, phone = ?4, item = ?5,
                 serial = ?6, config = ?7, notes = ?8
             WHERE id = ?1",
            params![
                id.to_string(),
                fields.customer,
                fields.address,
                fields.phone,
                fields.item.as_str(),
                fields.serial,
                fields.config,
                fields.notes,
            ],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        get(self.conn(), id)
    }

    /// Cascade bottom-up: each complaint (and its images) goes first.
    pub fn delete_job_card(&mut self, id: Uuid) -> Result<bool> {
        for complaint in complaints::list(self.conn(), id)? {
            self.delete_complaint(complaint.id)?;
        }
        let affected = self
            .conn()
            .execute("DELETE FROM job_cards WHERE id = ?1", params![id.to_string()])?;
        Ok(affected > 0)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn row_to_job_card(row: &rusqlite::Row<'_>) -> rusqlite::Result<JobCard> {
    let item_str: String = row.get(4)?;
    let item = item_str.parse::<ItemKind>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(JobCard {
        id: uuid_col(row, 0)?,
        customer: row.get(1)?,
        address: row.get(2)?,
        phone: row.get(3)?,
        item,
        serial: row.get(5)?,
        config: row.get(6)?,
        notes: row.get(7)?,
        created_at: time_col(row, 8)?,
    })
}
