/// Data models for microblog-service
///
/// This module defines structures for:
/// - User: registered accounts (local or linked to an external identity)
/// - Post: text posts with optional embedded image/video
/// - Session / PendingRegistration: short-lived auth records
/// - FeedPost: a post enriched for display
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

/// Path the avatar endpoint serves for a username
pub fn avatar_path(username: &str) -> String {
    format!("/avatar/{}", urlencoding::encode(username))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub avatar_url: Option<String>,
    pub member_since: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub external_id: Option<String>,
}

impl User {
    /// Avatar URL, synthesized when the stored value is unset
    pub fn avatar_url_or_default(&self) -> String {
        self.avatar_url
            .clone()
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| avatar_path(&self.username))
    }
}

/// Raw post row including media payloads
#[derive(Debug, Clone, FromRow)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub likes: i64,
    pub image: Option<Vec<u8>>,
    pub image_type: Option<String>,
    pub video: Option<Vec<u8>>,
    pub video_type: Option<String>,
}

/// Binary media attached to a post (upload payload and download body)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Media {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// Feed ordering key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedSort {
    #[default]
    Recency,
    Likes,
}

impl FeedSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedSort::Recency => "recency",
            FeedSort::Likes => "likes",
        }
    }
}

impl fmt::Display for FeedSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedSort {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "recency" | "recent" | "latest" => Ok(FeedSort::Recency),
            "likes" | "popular" => Ok(FeedSort::Likes),
            other => Err(format!("unknown sort option '{}'", other)),
        }
    }
}

/// Media inlined into a rendered page (`data:{mime_type};base64,{data}`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbeddedMedia {
    pub mime_type: String,
    pub data: String,
}

/// A post enriched with author metadata, ready for display
#[derive(Debug, Clone, Serialize)]
pub struct FeedPost {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub username: String,
    pub avatar_url: String,
    pub timestamp: String,
    pub likes: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<EmbeddedMedia>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<EmbeddedMedia>,
}

/// Server-side session keyed by the cookie token
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub token: String,
    pub user_id: Option<i64>,
    pub sort_option: String,
    pub view_option: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }

    /// Stored sort preference; rows written by older builds fall back to recency
    pub fn sort(&self) -> FeedSort {
        self.sort_option.parse().unwrap_or_default()
    }
}

/// External identity waiting for its owner to pick a username
#[derive(Debug, Clone, FromRow)]
pub struct PendingRegistration {
    pub token: String,
    pub external_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl PendingRegistration {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

/// Result of a like toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LikeToggle {
    pub liked: bool,
    pub likes: i64,
}
