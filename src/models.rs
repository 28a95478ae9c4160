//! Story records kept by the client

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::license::LicenseType;

/// Whether a story body is inline text or an uploaded PDF
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Text,
    Pdf,
}

impl ContentType {
    pub fn mime(self) -> &'static str {
        match self {
            ContentType::Text => "text/plain",
            ContentType::Pdf => "application/pdf",
        }
    }
}

/// A local file chosen by the user (PDF body or cover image)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRef {
    pub file_name: String,
    pub mime_type: String,
    pub path: PathBuf,
}

impl FileRef {
    pub fn new(path: impl Into<PathBuf>, mime_type: impl Into<String>) -> Self {
        let path = path.into();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "upload".to_string());
        Self {
            file_name,
            mime_type: mime_type.into(),
            path,
        }
    }

    pub async fn read(&self) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(&self.path).await
    }
}

/// An in-progress story
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryDraft {
    pub id: String,
    pub title: String,
    pub description: String,
    pub content_type: ContentType,
    /// Body text; used when `content_type` is text
    #[serde(default)]
    pub content: String,
    /// Uploaded document; used when `content_type` is pdf
    #[serde(default)]
    pub file: Option<FileRef>,
    #[serde(default)]
    pub license_types: Vec<LicenseType>,
    #[serde(default)]
    pub cover_image: Option<FileRef>,
    /// Unix millis of the last persisted write
    #[serde(default)]
    pub last_saved: i64,
    #[serde(default)]
    pub autosaved: bool,
}

impl StoryDraft {
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: String::new(),
            description: String::new(),
            content_type: ContentType::Text,
            content: String::new(),
            file: None,
            license_types: Vec::new(),
            cover_image: None,
            last_saved: 0,
            autosaved: false,
        }
    }

    /// Autosave only bothers with drafts that have something typed in
    pub fn has_content(&self) -> bool {
        !self.title.trim().is_empty() || !self.content.trim().is_empty()
    }
}

impl Default for StoryDraft {
    fn default() -> Self {
        Self::new()
    }
}

/// A story registered on chain. Never changes after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedStory {
    /// On-chain IP asset id
    pub id: String,
    pub title: String,
    pub description: String,
    pub author: String,
    pub content_type: ContentType,
    pub content_cid: String,
    pub content_url: String,
    pub image_cid: String,
    pub image_url: String,
    pub license_types: Vec<LicenseType>,
    pub tx_hash: String,
    pub token_id: String,
    pub explorer_url: String,
    pub published_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemixStatus {
    Draft,
    Published,
}

/// A derivative of another story
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemixedStory {
    /// Local id, kept for the remix's lifetime; the on-chain id lands in `ip_id`
    pub id: String,
    pub original_id: String,
    pub original_title: String,
    pub original_author: String,
    pub parent_license_terms_id: String,
    pub status: RemixStatus,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub license_type: Option<LicenseType>,
    #[serde(default)]
    pub content_cid: Option<String>,
    #[serde(default)]
    pub image_cid: Option<String>,
    #[serde(default)]
    pub ip_id: Option<String>,
    #[serde(default)]
    pub tx_hash: Option<String>,
    #[serde(default)]
    pub token_id: Option<String>,
    #[serde(default)]
    pub explorer_url: Option<String>,
    pub created_at: i64,
    #[serde(default)]
    pub published_at: Option<i64>,
}

/// Reading position for one story
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingProgress {
    pub story_id: String,
    /// 0-100
    pub percentage: u8,
    pub last_read: i64,
    pub bookmarked: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPrefs {
    pub on_publish: bool,
    pub on_remix: bool,
}

impl Default for NotificationPrefs {
    fn default() -> Self {
        Self {
            on_publish: true,
            on_remix: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    #[serde(default)]
    pub theme: Theme,
    #[serde(default = "default_reading_speed")]
    pub reading_speed_wpm: u32,
    #[serde(default = "default_true")]
    pub autosave: bool,
    #[serde(default)]
    pub notifications: NotificationPrefs,
}

fn default_reading_speed() -> u32 {
    200
}

fn default_true() -> bool {
    true
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            reading_speed_wpm: default_reading_speed(),
            autosave: true,
            notifications: NotificationPrefs::default(),
        }
    }
}

/// Current time in unix millis
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_content() {
        let mut draft = StoryDraft::new();
        assert!(!draft.has_content());
        draft.title = "   ".into();
        assert!(!draft.has_content());
        draft.content = "Once upon a time".into();
        assert!(draft.has_content());
    }

    #[test]
    fn test_preferences_defaults_fill_missing_fields() {
        let prefs: UserPreferences = serde_json::from_str(r#"{"theme":"dark"}"#).unwrap();
        assert_eq!(prefs.theme, Theme::Dark);
        assert_eq!(prefs.reading_speed_wpm, 200);
        assert!(prefs.autosave);
    }

    #[test]
    fn test_file_ref_name() {
        let f = FileRef::new("/tmp/covers/dragon.png", "image/png");
        assert_eq!(f.file_name, "dragon.png");
    }
}
