//! CRUD operations for [`ComplaintImage`] records and their files.

use jobcard_shared::NewImage;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::database::{now, time_col, to_sql_time, uuid_col, Database, StoreTx};
use crate::error::{not_found, Result, StoreError};
use crate::models::ComplaintImage;

const COLUMNS: &str =
    "id, complaint_id, file_path, file_name, content_type, file_size, blake3_hash, created_at";

pub(crate) fn list(conn: &Connection, complaint_id: Uuid) -> Result<Vec<ComplaintImage>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM complaint_images
         WHERE complaint_id = ?1
         ORDER BY rowid ASC"
    ))?;
    let rows = stmt.query_map(params![complaint_id.to_string()], row_to_image)?;
    rows.collect::<std::result::Result<Vec<_>, _>>()
        .map_err(StoreError::Sqlite)
}

fn get(conn: &Connection, id: Uuid) -> Result<ComplaintImage> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM complaint_images WHERE id = ?1"),
        params![id.to_string()],
        row_to_image,
    )
    .map_err(not_found)
}

/// Look up an image only if its complaint belongs to `job_card_id`.
fn find_for(conn: &Connection, job_card_id: Uuid, id: Uuid) -> Result<Option<ComplaintImage>> {
    conn.query_row(
        "SELECT i.id, i.complaint_id, i.file_path, i.file_name, i.content_type,
                i.file_size, i.blake3_hash, i.created_at
         FROM complaint_images i
         JOIN complaints c ON c.id = i.complaint_id
         WHERE i.id = ?1 AND c.job_card_id = ?2",
        params![id.to_string(), job_card_id.to_string()],
        row_to_image,
    )
    .optional()
    .map_err(StoreError::Sqlite)
}

impl Database {
    pub fn list_images(&self, complaint_id: Uuid) -> Result<Vec<ComplaintImage>> {
        list(self.conn(), complaint_id)
    }

    pub fn get_image(&self, id: Uuid) -> Result<ComplaintImage> {
        get(self.conn(), id)
    }

    /// Record and bytes of one image.
    pub fn read_image(&self, id: Uuid) -> Result<(ComplaintImage, Vec<u8>)> {
        let image = get(self.conn(), id)?;
        let data = self.images().read(&image.file_path)?;
        Ok((image, data))
    }
}

impl StoreTx<'_> {
    pub fn list_images(&self, complaint_id: Uuid) -> Result<Vec<ComplaintImage>> {
        list(self.conn(), complaint_id)
    }

    pub fn find_image_for(&self, job_card_id: Uuid, id: Uuid) -> Result<Option<ComplaintImage>> {
        find_for(self.conn(), job_card_id, id)
    }

    /// Write the file, then insert the record pointing at it.
    pub fn create_image(&mut self, complaint_id: Uuid, upload: &NewImage) -> Result<ComplaintImage> {
        let id = Uuid::new_v4();
        let stored = self.images().write(id, &upload.extension, &upload.data)?;
        self.track_written(stored.relative.clone());

        let image = ComplaintImage {
            id,
            complaint_id,
            file_path: stored.relative,
            file_name: upload.file_name.clone(),
            content_type: upload.content_type.clone(),
            file_size: stored.size as i64,
            blake3_hash: stored.blake3_hash,
            created_at: now(),
        };

        self.conn().execute(
            &format!("INSERT INTO complaint_images ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
            params![
                image.id.to_string(),
                image.complaint_id.to_string(),
                image.file_path,
                image.file_name,
                image.content_type,
                image.file_size,
                image.blake3_hash,
                to_sql_time(&image.created_at),
            ],
        )?;
        Ok(image)
    }

    /// Queue the backing file for removal, then delete the record.
    /// Returns `false` if no such image exists.
    pub fn delete_image(&mut self, id: Uuid) -> Result<bool> {
        let image = match get(self.conn(), id) {
            Ok(image) => image,
            Err(StoreError::NotFound) => return Ok(false),
            Err(e) => return Err(e),
        };
        self.queue_removal(image.file_path);
        let affected = self.conn().execute(
            "DELETE FROM complaint_images WHERE id = ?1",
            params![id.to_string()],
        )?;
        Ok(affected > 0)
    }
}

fn row_to_image(row: &rusqlite::Row<'_>) -> rusqlite::Result<ComplaintImage> {
    Ok(ComplaintImage {
        id: uuid_col(row, 0)?,
        complaint_id: uuid_col(row, 1)?,
        file_path: row.get(2)?,
        file_name: row.get(3)?,
        content_type: row.get(4)?,
        file_size: row.get(5)?,
        blake3_hash: row.get(6)?,
        created_at: time_col(row, 7)?,
    })
}
