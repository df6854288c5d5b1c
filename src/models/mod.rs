use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// Coarse aspect-ratio bucket of a published video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Landscape,
    Portrait,
    Other,
    Unset,
}

impl Orientation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Landscape => "landscape",
            Orientation::Portrait => "portrait",
            Orientation::Other => "other",
            Orientation::Unset => "unset",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Orientation {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "landscape" => Ok(Orientation::Landscape),
            "portrait" => Ok(Orientation::Portrait),
            "other" => Ok(Orientation::Other),
            "unset" => Ok(Orientation::Unset),
            other => Err(anyhow::anyhow!("unknown orientation: {}", other)),
        }
    }
}

/// Location of a published object. Bucket and key are kept apart so neither
/// can be confused with a delimiter inside the other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StorageReference {
    pub bucket: String,
    pub key: String,
}

impl StorageReference {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

/// Where a video's content can be found.
///
/// The record store only ever persists `Stored`. `Signed` exists solely on
/// copies handed back to clients by the URL signer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VideoLocation {
    Stored(StorageReference),
    Signed { url: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VideoAsset {
    pub id: Uuid,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub orientation: Orientation,
    pub location: Option<VideoLocation>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VideoAsset {
    pub fn storage_reference(&self) -> Option<&StorageReference> {
        match &self.location {
            Some(VideoLocation::Stored(reference)) => Some(reference),
            _ => None,
        }
    }
}

/// Fields accepted when a video record is first created.
#[derive(Debug, Clone)]
pub struct NewVideo {
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
}

/// Upload container formats the ingest path knows how to remux.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerFormat {
    pub content_type: &'static str,
    pub extension: &'static str,
    /// ffmpeg muxer name passed to `-f`
    pub muxer: &'static str,
}

pub const KNOWN_FORMATS: &[ContainerFormat] = &[
    ContainerFormat {
        content_type: "video/mp4",
        extension: ".mp4",
        muxer: "mp4",
    },
    ContainerFormat {
        content_type: "video/quicktime",
        extension: ".mov",
        muxer: "mov",
    },
];

impl ContainerFormat {
    pub fn for_content_type(media_type: &str) -> Option<ContainerFormat> {
        KNOWN_FORMATS
            .iter()
            .find(|f| f.content_type.eq_ignore_ascii_case(media_type))
            .copied()
    }
}
