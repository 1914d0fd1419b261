use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::FormError;

/// The kind of item brought in for repair.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Mouse,
    Keyboard,
    #[serde(rename = "CPU")]
    Cpu,
    Laptop,
    Desktop,
    Printer,
    Monitor,
    Other,
}

impl ItemKind {
    pub const ALL: [ItemKind; 8] = [
        ItemKind::Mouse,
        ItemKind::Keyboard,
        ItemKind::Cpu,
        ItemKind::Laptop,
        ItemKind::Desktop,
        ItemKind::Printer,
        ItemKind::Monitor,
        ItemKind::Other,
    ];

    /// Canonical spelling, as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Mouse => "Mouse",
            ItemKind::Keyboard => "Keyboard",
            ItemKind::Cpu => "CPU",
            ItemKind::Laptop => "Laptop",
            ItemKind::Desktop => "Desktop",
            ItemKind::Printer => "Printer",
            ItemKind::Monitor => "Monitor",
            ItemKind::Other => "Other",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemKind {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        ItemKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| FormError::InvalidItem(s.to_string()))
    }
}

/// Scalar fields of a job card after trimming and validation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobCardFields {
    pub customer: String,
    pub address: String,
    pub phone: String,
    pub item: ItemKind,
    pub serial: Option<String>,
    pub config: Option<String>,
    pub notes: Option<String>,
}

/// A file part exactly as it arrived in the request.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl UploadedFile {
    /// Browsers send an empty, nameless part for a file input left blank.
    pub fn is_blank(&self) -> bool {
        self.file_name.trim().is_empty() && self.data.is_empty()
    }
}

/// An upload that has been sniffed and confirmed to be an image.
#[derive(Debug, Clone)]
pub struct NewImage {
    /// Original file name, for display only.
    pub file_name: String,
    /// MIME type derived from the file's magic bytes.
    pub content_type: String,
    /// Extension used for the stored file (no leading dot).
    pub extension: String,
    pub data: Bytes,
}

/// A decoded, not-yet-persisted complaint entry.
#[derive(Debug, Clone)]
pub struct ComplaintSlot {
    /// Persisted complaint this slot updates; `None` means "create".
    pub id: Option<Uuid>,
    pub description: String,
    pub notes: String,
    pub new_images: Vec<NewImage>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_kind_parses_case_insensitively() {
        assert_eq!("laptop".parse::<ItemKind>().unwrap(), ItemKind::Laptop);
        assert_eq!(" cpu ".parse::<ItemKind>().unwrap(), ItemKind::Cpu);
        assert_eq!(ItemKind::Cpu.to_string(), "CPU");
    }

    #[test]
    fn item_kind_rejects_unknown() {
        assert!(matches!(
            "toaster".parse::<ItemKind>(),
            Err(FormError::InvalidItem(s)) if s == "toaster"
        ));
    }

    #[test]
    fn item_kind_serializes_canonically() {
        let json = serde_json::to_string(&ItemKind::Cpu).unwrap();
        assert_eq!(json, "\"CPU\"");
        for kind in ItemKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn blank_upload_detected() {
        let blank = UploadedFile {
            file_name: String::new(),
            content_type: Some("application/octet-stream".into()),
            data: Bytes::new(),
        };
        assert!(blank.is_blank());
    }
}
