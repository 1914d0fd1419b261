//! Form decoding.
//!
//! A job card submission arrives in one of two shapes:
//!
//! - **nested**: a `payload` field holding a JSON [`SubmissionBody`], with the
//!   files for complaint `i` in parts named `complaints[i][images]`;
//! - **flat**: the classic HTML form with parallel arrays (`complaints[]`,
//!   `notes[]`, `complaint_ids[]`) correlated by position, and files in
//!   `images[i][]`.
//!
//! Both are normalised through [`SubmissionBody`] into a
//! [`DecodedSubmission`]. Decoding is pure: no I/O, no clock, no database.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::FormError;
use crate::types::{ComplaintSlot, ItemKind, JobCardFields, NewImage, UploadedFile};

const CUSTOMER_MAX: usize = 100;
const PHONE_MAX: usize = 15;
const SERIAL_MAX: usize = 100;
const CONFIG_MAX: usize = 255;

/// Every text field and file part of a request, in arrival order.
#[derive(Debug, Clone, Default)]
pub struct RawForm {
    pub fields: Vec<(String, String)>,
    pub files: Vec<(String, UploadedFile)>,
}

impl RawForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_text(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }

    pub fn push_file(&mut self, name: impl Into<String>, file: UploadedFile) {
        self.files.push((name.into(), file));
    }

    /// First value of a single-valued field.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// All values of a repeated field, in order.
    pub fn texts(&self, name: &str) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
            .collect()
    }
}

/// Nested request body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmissionBody {
    pub customer: String,
    pub address: String,
    pub phone: String,
    pub item: String,
    pub serial: Option<String>,
    pub config: Option<String>,
    pub notes: Option<String>,
    pub complaints: Vec<ComplaintBody>,
    pub delete_complaint_ids: Vec<String>,
    pub delete_image_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplaintBody {
    pub id: Option<String>,
    pub description: String,
    pub notes: Option<String>,
}

/// Output of [`decode`]: everything the reconciler needs.
#[derive(Debug, Clone)]
pub struct DecodedSubmission {
    pub fields: JobCardFields,
    pub slots: Vec<ComplaintSlot>,
    pub delete_complaint_ids: Vec<Uuid>,
    pub delete_image_ids: Vec<Uuid>,
}

/// Decode a raw submission, picking the nested shape when a `payload`
/// field is present.
pub fn decode(raw: RawForm) -> Result<DecodedSubmission, FormError> {
    let (body, prefix, suffix) = match raw.text("payload") {
        Some(payload) => {
            let body: SubmissionBody = serde_json::from_str(payload)?;
            (body, "complaints[", "][images]")
        }
        None => (flat_body(&raw), "images[", "]"),
    };
    let files = group_files(raw.files, prefix, suffix, body.complaints.len());
    normalize(body, files)
}

/// Build a [`SubmissionBody`] from parallel arrays. A missing correlated
/// entry is treated as an empty string.
fn flat_body(raw: &RawForm) -> SubmissionBody {
    let descriptions = raw.texts("complaints[]");
    let notes = raw.texts("notes[]");
    let ids = raw.texts("complaint_ids[]");

    let complaints = descriptions
        .iter()
        .enumerate()
        .map(|(i, description)| ComplaintBody {
            id: ids.get(i).map(|s| s.to_string()),
            description: description.to_string(),
            notes: Some(notes.get(i).copied().unwrap_or_default().to_string()),
        })
        .collect();

    let owned = |name: &str| raw.text(name).unwrap_or_default().to_string();

    SubmissionBody {
        customer: owned("customer"),
        address: owned("address"),
        phone: owned("phone"),
        item: owned("item"),
        serial: raw.text("serial").map(str::to_string),
        config: raw.text("config").map(str::to_string),
        notes: raw.text("general_notes").map(str::to_string),
        complaints,
        delete_complaint_ids: owned_all(raw, "delete_complaint_ids[]"),
        delete_image_ids: owned_all(raw, "delete_image_ids[]"),
    }
}

fn owned_all(raw: &RawForm, name: &str) -> Vec<String> {
    raw.texts(name).into_iter().map(str::to_string).collect()
}

/// Bucket file parts by the slot index embedded in their name, e.g.
/// `images[2][]` or `complaints[2][images]`. Blank parts, parts whose name
/// carries no index, and parts pointing past the last slot are dropped.
fn group_files(
    files: Vec<(String, UploadedFile)>,
    prefix: &str,
    suffix: &str,
    slot_count: usize,
) -> Vec<Vec<UploadedFile>> {
    let mut grouped: Vec<Vec<UploadedFile>> = (0..slot_count).map(|_| Vec::new()).collect();
    for (name, file) in files {
        if file.is_blank() {
            continue;
        }
        let Some(bucket) = slot_index(&name, prefix, suffix).and_then(|i| grouped.get_mut(i)) else {
            continue;
        };
        bucket.push(file);
    }
    grouped
}

fn slot_index(name: &str, prefix: &str, suffix: &str) -> Option<usize> {
    let rest = name.strip_prefix(prefix)?;
    let rest = rest.strip_suffix("[]").unwrap_or(rest);
    let digits = rest.strip_suffix(suffix)?;
    digits.parse().ok()
}

fn normalize(
    body: SubmissionBody,
    mut files: Vec<Vec<UploadedFile>>,
) -> Result<DecodedSubmission, FormError> {
    let fields = JobCardFields {
        customer: required("customer", &body.customer, Some(CUSTOMER_MAX))?,
        address: required("address", &body.address, None)?,
        phone: required("phone", &body.phone, Some(PHONE_MAX))?,
        item: required("item", &body.item, None)?.parse::<ItemKind>()?,
        serial: optional("serial", body.serial.as_deref(), Some(SERIAL_MAX))?,
        config: optional("config", body.config.as_deref(), Some(CONFIG_MAX))?,
        notes: optional("notes", body.notes.as_deref(), None)?,
    };

    let mut slots = Vec::with_capacity(body.complaints.len());
    for (i, complaint) in body.complaints.into_iter().enumerate() {
        let uploads = files.get_mut(i).map(std::mem::take).unwrap_or_default();

        let description = complaint.description.trim();
        if description.is_empty() {
            // Dropped slot: its uploads go with it, unexamined.
            continue;
        }

        let new_images = uploads
            .into_iter()
            .map(sniff_image)
            .collect::<Result<Vec<_>, _>>()?;

        slots.push(ComplaintSlot {
            id: complaint.id.as_deref().and_then(parse_id),
            description: description.to_string(),
            notes: complaint.notes.as_deref().unwrap_or_default().trim().to_string(),
            new_images,
        });
    }

    Ok(DecodedSubmission {
        fields,
        slots,
        delete_complaint_ids: parse_ids(&body.delete_complaint_ids),
        delete_image_ids: parse_ids(&body.delete_image_ids),
    })
}

fn required(field: &'static str, value: &str, max: Option<usize>) -> Result<String, FormError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(FormError::Missing(field));
    }
    check_length(field, value, max)?;
    Ok(value.to_string())
}

fn optional(
    field: &'static str,
    value: Option<&str>,
    max: Option<usize>,
) -> Result<Option<String>, FormError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => {
            check_length(field, v, max)?;
            Ok(Some(v.to_string()))
        }
        _ => Ok(None),
    }
}

fn check_length(field: &'static str, value: &str, max: Option<usize>) -> Result<(), FormError> {
    match max {
        Some(max) if value.chars().count() > max => Err(FormError::TooLong { field, max }),
        _ => Ok(()),
    }
}

fn parse_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw.trim()).ok()
}

// Ids that are not UUIDs can never resolve, so they are dropped here.
fn parse_ids(raw: &[String]) -> Vec<Uuid> {
    raw.iter().filter_map(|s| parse_id(s)).collect()
}

fn sniff_image(upload: UploadedFile) -> Result<NewImage, FormError> {
    let format = image::guess_format(&upload.data).map_err(|_| FormError::NotAnImage {
        file_name: upload.file_name.clone(),
    })?;
    let extension = format
        .extensions_str()
        .first()
        .copied()
        .unwrap_or("img")
        .to_string();

    Ok(NewImage {
        file_name: upload.file_name.trim().to_string(),
        content_type: format.to_mime_type().to_string(),
        extension,
        data: upload.data,
    })
}
