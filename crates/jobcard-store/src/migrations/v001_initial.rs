//! v001 -- Initial schema creation.
//!
//! Creates `job_cards`, `complaints` and `complaint_images`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Job cards
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS job_cards (
    id         TEXT PRIMARY KEY NOT NULL,   -- UUID v4
    customer   TEXT NOT NULL,
    address    TEXT NOT NULL,
    phone      TEXT NOT NULL,
    item       TEXT NOT NULL,               -- Mouse | Keyboard | CPU | ...
    serial     TEXT,
    config     TEXT,
    notes      TEXT,
    created_at TEXT NOT NULL                -- RFC-3339, fixed microsecond width
);

CREATE INDEX IF NOT EXISTS idx_job_cards_created_at ON job_cards(created_at DESC);

-- ----------------------------------------------------------------
-- Complaints
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS complaints (
    id          TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    job_card_id TEXT NOT NULL,              -- FK -> job_cards(id)
    description TEXT NOT NULL,
    notes       TEXT,
    position    INTEGER NOT NULL DEFAULT 0,

    FOREIGN KEY (job_card_id) REFERENCES job_cards(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_complaints_job_card
    ON complaints(job_card_id, position);

-- ----------------------------------------------------------------
-- Complaint images (file metadata; bytes live in the image store)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS complaint_images (
    id           TEXT PRIMARY KEY NOT NULL, -- UUID v4
    complaint_id TEXT NOT NULL,             -- FK -> complaints(id)
    file_path    TEXT NOT NULL UNIQUE,      -- relative to the image root
    file_name    TEXT NOT NULL,
    content_type TEXT NOT NULL,
    file_size    INTEGER NOT NULL,
    blake3_hash  TEXT NOT NULL,
    created_at   TEXT NOT NULL,

    FOREIGN KEY (complaint_id) REFERENCES complaints(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_complaint_images_complaint
    ON complaint_images(complaint_id);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
