//! restic REST backend vocabulary: media types, path shapes, the `data/`
//! key sharding and the repository layout.

use std::borrow::Cow;

use serde::Serialize;
use serde_json::Value;

pub const MEDIA_TYPE_V1: &str = "application/vnd.x.restic.rest.v1";
pub const MEDIA_TYPE_V2: &str = "application/vnd.x.restic.rest.v2";

/// Repository areas. `config` is a file; the rest are directories.
pub const REPOSITORY_AREAS: [&str; 6] = ["data", "index", "keys", "locks", "snapshots", "config"];
pub const DATA_AREA: &str = "data";
pub const CONFIG_FILE: &str = "config";

/// Listing format negotiated through the `Accept` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApiVersion {
    /// Bare names.
    #[default]
    V1,
    /// `{name, size}` objects.
    V2,
}

impl ApiVersion {
    pub fn from_accept(accept: Option<&str>) -> Self {
        let wants_v2 = accept
            .map(|value| {
                value
                    .split(',')
                    .any(|part| part.split(';').next().unwrap_or("").trim() == MEDIA_TYPE_V2)
            })
            .unwrap_or(false);
        if wants_v2 {
            ApiVersion::V2
        } else {
            ApiVersion::V1
        }
    }

    pub fn media_type(&self) -> &'static str {
        match self {
            ApiVersion::V1 => MEDIA_TYPE_V1,
            ApiVersion::V2 => MEDIA_TYPE_V2,
        }
    }
}

/// Collections end with `/`, items never do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    Collection,
    Item,
}

impl PathKind {
    pub fn of(path: &str) -> Self {
        if path.ends_with('/') {
            PathKind::Collection
        } else {
            PathKind::Item
        }
    }
}

/// Nest a `/{repo}/data/{hash}` key under its two-character shard
/// directory: `/{repo}/data/{hash[..2]}/{hash}`.
///
/// Only item paths of exactly three segments with `data` in the middle and
/// a name starting with two hex digits are rewritten.
pub fn rewrite_data_key(path: &str) -> Cow<'_, str> {
    if path.ends_with('/') {
        return Cow::Borrowed(path);
    }
    let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
    match segments.as_slice() {
        [repo, area, name]
            if !repo.is_empty()
                && *area == DATA_AREA
                && name.len() >= 2
                && name.as_bytes()[..2].iter().all(u8::is_ascii_hexdigit) =>
        {
            Cow::Owned(format!("/{repo}/{DATA_AREA}/{}/{name}", &name[..2]))
        }
        _ => Cow::Borrowed(path),
    }
}

/// `true` for a `.../data/` collection, whose listing spans all shards.
pub fn is_data_collection(path: &str) -> bool {
    path.ends_with('/') && path.trim_matches('/').ends_with("/data")
}

/// The 256 shard directory names, `00` through `ff`.
pub fn shard_names() -> impl Iterator<Item = String> {
    (0u16..256).map(|i| format!("{i:02x}"))
}

/// Directories making up a fresh repository at collection path `repo`
/// (ending with `/`): the root, each area except `config`, then every
/// `data/xx/` shard.
pub fn layout_directories(repo: &str) -> Vec<String> {
    let mut dirs = Vec::with_capacity(1 + REPOSITORY_AREAS.len() - 1 + 256);
    dirs.push(repo.to_string());
    dirs.extend(
        REPOSITORY_AREAS
            .iter()
            .filter(|area| **area != CONFIG_FILE)
            .map(|area| format!("{repo}{area}/")),
    );
    dirs.extend(shard_names().map(|shard| format!("{repo}{DATA_AREA}/{shard}/")));
    dirs
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListEntry {
    pub name: String,
    pub size: u64,
}

/// Render a file listing in the negotiated format. Empty renders as `[]`.
pub fn render_listing(version: ApiVersion, entries: Vec<ListEntry>) -> Value {
    match version {
        ApiVersion::V1 => {
            Value::Array(entries.into_iter().map(|e| Value::String(e.name)).collect())
        }
        ApiVersion::V2 => {
            serde_json::to_value(entries).unwrap_or_else(|_| Value::Array(Vec::new()))
        }
    }
}
