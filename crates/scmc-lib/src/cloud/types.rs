//! Records exchanged with the myCloud API. Field names follow the upstream
//! PascalCase JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Account identity returned by `GET /me`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct IdentityResponse {
    pub identifier: String,
    pub first_name: String,
    pub last_name: String,
    pub user_name: String,
    pub email: String,
    pub email_confirmed: bool,
    pub phone_number: String,
    pub phone_number_confirmed: bool,
    pub terms_accepted: bool,
    pub analytics_identifier: String,
    pub subscription: Subscription,
    pub editions: Value,
    pub login_provider_bearer: String,
    #[serde(rename = "HashID")]
    pub hash_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Subscription {
    pub name: String,
    pub identifier: String,
    pub max_file_size: u64,
    pub is_upgradable: bool,
    pub is_downgradable: bool,
    pub timestamp: String,
    pub created: String,
    pub reference: String,
    pub reference_name: String,
    pub reference_description: String,
}

/// Storage usage per category returned by `GET /usage`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct UsageResponse {
    pub backup_bytes: u64,
    pub documents_bytes: u64,
    pub drive_bytes: u64,
    pub movies_bytes: u64,
    pub music_bytes: u64,
    pub photos_bytes: u64,
    #[serde(rename = "TVBytes")]
    pub tv_bytes: u64,
    pub total_bytes: u64,
}

impl UsageResponse {
    /// `(label, bytes)` pairs in display order.
    pub fn categories(&self) -> [(&'static str, u64); 8] {
        [
            ("Backup", self.backup_bytes),
            ("Documents", self.documents_bytes),
            ("Drive", self.drive_bytes),
            ("Movies", self.movies_bytes),
            ("Music", self.music_bytes),
            ("Photos", self.photos_bytes),
            ("TV", self.tv_bytes),
            ("Total", self.total_bytes),
        ]
    }
}

/// Echo returned when an object is created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CreateObjectResponse {
    pub name: String,
    pub path: String,
    pub length: u64,
    pub creation_time: String,
    pub modification_time: String,
}

/// File or directory metadata from `GET /metadata`.
///
/// The file-only fields stay at their defaults for directories; the child
/// lists stay empty for files.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Metadata {
    pub length: u64,
    pub etag: String,
    pub mime: String,
    pub extension: String,
    pub name: String,
    pub path: String,
    pub creation_time: Option<DateTime<Utc>>,
    pub modification_time: Option<DateTime<Utc>>,
    pub files: Vec<FileEntry>,
    pub directories: Vec<DirectoryEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct FileEntry {
    pub name: String,
    pub path: String,
    pub etag: String,
    pub mime: String,
    pub length: u64,
    pub extension: String,
    pub creation_time: Option<DateTime<Utc>>,
    pub modification_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DirectoryEntry {
    pub name: String,
    pub path: String,
    pub creation_time: Option<DateTime<Utc>>,
    pub modification_time: Option<DateTime<Utc>>,
}

/// Body of `PUT /trash/items`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DeleteRequest {
    pub items: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DeleteResponse {
    pub completed: Vec<String>,
    pub failed: Vec<String>,
}
