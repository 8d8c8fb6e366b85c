use std::fmt;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::{Error, Result};

/// Media kind as encoded by the `media_type` field of the saved-posts feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaType {
    Image,
    Video,
    Carousel,
}

impl MediaType {
    pub fn from_code(code: i64) -> Result<Self> {
        match code {
            1 => Ok(MediaType::Image),
            2 => Ok(MediaType::Video),
            8 => Ok(MediaType::Carousel),
            other => Err(Error::UnrecognizedMediaType(other)),
        }
    }

    pub fn code(self) -> i64 {
        match self {
            MediaType::Image => 1,
            MediaType::Video => 2,
            MediaType::Carousel => 8,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Video => "video",
            MediaType::Carousel => "carousel",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Input records ────────────────────────────────────────────────

/// One saved post as delivered by the API client, plus its verbatim JSON text.
#[derive(Debug, Clone)]
pub struct PostRecord {
    pub media: Media,
    pub raw: String,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    media: Media,
}

impl PostRecord {
    /// Parse a `{"media": {...}}` document, keeping the text as-is for `post_json`.
    pub fn from_json(json: &str) -> Result<Self> {
        let envelope: Envelope = serde_json::from_str(json)?;
        Ok(Self {
            media: envelope.media,
            raw: json.to_string(),
        })
    }

    /// Build from an already-parsed JSON value. The raw text is the compact serialization.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let raw = value.to_string();
        let envelope: Envelope = serde_json::from_value(value)?;
        Ok(Self {
            media: envelope.media,
            raw,
        })
    }

    pub fn pk(&self) -> &str {
        &self.media.pk
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Media {
    #[serde(deserialize_with = "de::id")]
    pub pk: String,
    pub code: String,
    #[serde(deserialize_with = "de::integer")]
    pub taken_at: i64,
    #[serde(deserialize_with = "de::flag")]
    pub comment_likes_enabled: bool,
    #[serde(deserialize_with = "de::flag")]
    pub comment_threading_enabled: bool,
    #[serde(deserialize_with = "de::flag")]
    pub has_more_comments: bool,
    pub user: User,
    #[serde(deserialize_with = "de::flag")]
    pub photo_of_you: bool,
    pub caption: Option<Caption>,
    #[serde(deserialize_with = "de::integer")]
    pub like_count: i64,
    #[serde(deserialize_with = "de::flag")]
    pub has_viewer_saved: bool,
    #[serde(deserialize_with = "de::ids")]
    pub saved_collection_ids: Vec<String>,
    #[serde(flatten)]
    pub content: MediaContent,
}

impl Media {
    pub fn caption_text(&self) -> &str {
        self.caption.as_ref().map(|c| c.text.as_str()).unwrap_or("")
    }
}

/// The media-bearing part of a post; carousel children have the same shape.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaContent {
    #[serde(deserialize_with = "de::integer")]
    pub media_type: i64,
    pub image_versions2: Option<ImageVersions>,
    pub video_versions: Option<Vec<VideoVersion>>,
    pub carousel_media: Option<Vec<MediaContent>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageVersions {
    pub candidates: Vec<ImageCandidate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageCandidate {
    pub width: u32,
    pub height: u32,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VideoVersion {
    pub width: u32,
    pub height: u32,
    pub url: String,
    #[serde(rename = "type", default)]
    pub kind: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct User {
    #[serde(deserialize_with = "de::id")]
    pub pk: String,
    pub username: String,
    pub full_name: String,
    #[serde(deserialize_with = "de::flag")]
    pub is_private: bool,
    pub profile_pic_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Caption {
    pub text: String,
}

// ── Stored rows ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    pub pk: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostUrl {
    pub post_pk: String,
    pub url: String,
    pub index: u32,
    pub media_type: i64,
    pub height: u32,
    pub width: u32,
    pub download_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPost {
    pub pk: String,
    pub code: String,
    pub taken_at: i64,
    pub media_type: i64,
    pub comment_likes_enabled: bool,
    pub comment_threading_enabled: bool,
    pub has_more_comments: bool,
    pub user_pk: String,
    pub photo_of_you: bool,
    pub caption_text: String,
    pub post_json: String,
    pub like_count: i64,
    pub has_viewer_saved: bool,
}

impl StoredPost {
    pub fn taken_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.taken_at, 0)
    }
}

/// A media URL row that still has no local file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDownload {
    pub post_pk: String,
    pub code: String,
    pub url: String,
    pub index: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogStats {
    pub total_users: usize,
    pub total_collections: usize,
    pub unnamed_collections: usize,
    pub total_posts: usize,
    pub total_urls: usize,
    pub downloaded_urls: usize,
}

/// Lenient scalar decoding: the feed sends ids and timestamps both as strings and numbers.
mod de {
    use serde::{de, Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Loose {
        Str(String),
        Int(i64),
        UInt(u64),
        Bool(bool),
    }

    pub fn id<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        loose_id(Loose::deserialize(d)?)
    }

    pub fn ids<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
        Vec::<Loose>::deserialize(d)?
            .into_iter()
            .map(loose_id)
            .collect()
    }

    pub fn integer<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
        match Loose::deserialize(d)? {
            Loose::Int(n) => Ok(n),
            Loose::UInt(n) => i64::try_from(n).map_err(de::Error::custom),
            Loose::Str(s) => s.trim().parse().map_err(de::Error::custom),
            Loose::Bool(_) => Err(de::Error::custom("expected an integer, found a boolean")),
        }
    }

    pub fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        match Loose::deserialize(d)? {
            Loose::Bool(b) => Ok(b),
            Loose::Int(n) => Ok(n != 0),
            Loose::UInt(n) => Ok(n != 0),
            Loose::Str(s) => Err(de::Error::custom(format!(
                "expected a boolean, found string {s:?}"
            ))),
        }
    }

    fn loose_id<E: de::Error>(value: Loose) -> Result<String, E> {
        match value {
            Loose::Str(s) => Ok(s),
            Loose::Int(n) => Ok(n.to_string()),
            Loose::UInt(n) => Ok(n.to_string()),
            Loose::Bool(_) => Err(E::custom("expected a string or integer id, found a boolean")),
        }
    }
}
