//! CRUD operations for [`Complaint`] records.

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::complaint_images;
use crate::database::{uuid_col, Database, StoreTx};
use crate::error::{Result, StoreError};
use crate::models::Complaint;

const COLUMNS: &str = "id, job_card_id, description, notes, position";

pub(crate) fn list(conn: &Connection, job_card_id: Uuid) -> Result<Vec<Complaint>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM complaints
         WHERE job_card_id = ?1
         ORDER BY position ASC, rowid ASC"
    ))?;
    let rows = stmt.query_map(params![job_card_id.to_string()], row_to_complaint)?;
    rows.collect::<std::result::Result<Vec<_>, _>>()
        .map_err(StoreError::Sqlite)
}

/// Look up a complaint only if it belongs to `job_card_id`.
pub(crate) fn find_for(conn: &Connection, job_card_id: Uuid, id: Uuid) -> Result<Option<Complaint>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM complaints WHERE id = ?1 AND job_card_id = ?2"),
        params![id.to_string(), job_card_id.to_string()],
        row_to_complaint,
    )
    .optional()
    .map_err(StoreError::Sqlite)
}

impl Database {
    pub fn list_complaints(&self, job_card_id: Uuid) -> Result<Vec<Complaint>> {
        list(self.conn(), job_card_id)
    }
}

impl StoreTx<'_> {
    pub fn list_complaints(&self, job_card_id: Uuid) -> Result<Vec<Complaint>> {
        list(self.conn(), job_card_id)
    }

    pub fn find_complaint_for(&self, job_card_id: Uuid, id: Uuid) -> Result<Option<Complaint>> {
        find_for(self.conn(), job_card_id, id)
    }

    pub fn create_complaint(
        &mut self,
        job_card_id: Uuid,
        description: &str,
        notes: Option<&str>,
        position: i64,
    ) -> Result<Complaint> {
        let complaint = Complaint {
            id: Uuid::new_v4(),
            job_card_id,
            description: description.to_string(),
            notes: notes.map(str::to_string),
            position,
        };

        self.conn().execute(
            &format!("INSERT INTO complaints ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5)"),
            params![
                complaint.id.to_string(),
                complaint.job_card_id.to_string(),
                complaint.description,
                complaint.notes,
                complaint.position,
            ],
        )?;
        Ok(complaint)
    }

    pub fn update_complaint(
        &mut self,
        id: Uuid,
        description: &str,
        notes: Option<&str>,
        position: i64,
    ) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE complaints SET description = ?2, notes = ?3, position = ?4 WHERE id = ?1",
            params![id.to_string(), description, notes, position],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    /// Delete a complaint after deleting each of its images (files queued
    /// for removal first). Returns `false` if no such complaint exists.
    pub fn delete_complaint(&mut self, id: Uuid) -> Result<bool> {
        for image in complaint_images::list(self.conn(), id)? {
            self.delete_image(image.id)?;
        }
        let affected = self
            .conn()
            .execute("DELETE FROM complaints WHERE id = ?1", params![id.to_string()])?;
        Ok(affected > 0)
    }
}

fn row_to_complaint(row: &rusqlite::Row<'_>) -> rusqlite::Result<Complaint> {
    Ok(Complaint {
        id: uuid_col(row, 0)?,
        job_card_id: uuid_col(row, 1)?,
        description: row.get(2)?,
        notes: row.get(3)?,
        position: row.get(4)?,
    })
}
