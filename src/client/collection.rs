//! Story collection: published stories, remixes, bookmarks and reading progress

use std::collections::BTreeMap;

use tracing::info;

use super::store::{KvStore, StoreName};
use crate::error::FolioError;
use crate::license::LicenseType;
use crate::models::{now_millis, PublishedStory, ReadingProgress, RemixStatus, RemixedStory};

pub const COLLECTION_STORE: StoreName = StoreName::new("folio.collection", 1);

const PUBLISHED: &str = "published";
const REMIXES: &str = "remixes";
const BOOKMARKS: &str = "bookmarks";
const PROGRESS: &str = "progress";

/// Parent story a remix starts from
#[derive(Debug, Clone)]
pub struct RemixSource {
    pub original_id: String,
    pub original_title: String,
    pub original_author: String,
    pub parent_license_terms_id: String,
}

/// Final story fields and registration result, applied to a remix in one
/// write when it is published
#[derive(Debug, Clone)]
pub struct RemixPublication {
    pub title: String,
    pub description: String,
    pub author: String,
    pub license_type: LicenseType,
    pub ip_id: String,
    pub tx_hash: String,
    pub token_id: String,
    pub explorer_url: String,
    pub content_cid: String,
    pub image_cid: String,
}

#[derive(Clone)]
pub struct CollectionStore {
    kv: KvStore,
}

impl CollectionStore {
    pub fn new(kv: KvStore) -> Self {
        Self { kv }
    }

    fn load_list<T: serde::de::DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, FolioError> {
        Ok(self.kv.get(COLLECTION_STORE, key)?.unwrap_or_default())
    }

    /// Published stories, newest first
    pub fn published(&self) -> Result<Vec<PublishedStory>, FolioError> {
        self.load_list(PUBLISHED)
    }

    /// Prepend a newly registered story. Existing entries are never touched,
    /// so re-publishing an id is rejected.
    pub fn add_published(&self, story: PublishedStory) -> Result<(), FolioError> {
        let mut list = self.published()?;
        if list.iter().any(|s| s.id == story.id) {
            return Err(FolioError::Validation(format!(
                "Story {} is already published",
                story.id
            )));
        }

        info!(ip_id = %story.id, title = %story.title, "Adding published story");
        list.insert(0, story);
        self.kv.put(COLLECTION_STORE, PUBLISHED, &list)
    }

    pub fn find_published(&self, id: &str) -> Result<Option<PublishedStory>, FolioError> {
        Ok(self.published()?.into_iter().find(|s| s.id == id))
    }

    pub fn remixes(&self) -> Result<Vec<RemixedStory>, FolioError> {
        self.load_list(REMIXES)
    }

    pub fn find_remix(&self, id: &str) -> Result<Option<RemixedStory>, FolioError> {
        Ok(self.remixes()?.into_iter().find(|r| r.id == id))
    }

    /// Start a derivative of `source` in draft status
    pub fn begin_remix(&self, source: RemixSource) -> Result<RemixedStory, FolioError> {
        let remix = RemixedStory {
            id: uuid::Uuid::new_v4().to_string(),
            original_id: source.original_id,
            original_title: source.original_title,
            original_author: source.original_author,
            parent_license_terms_id: source.parent_license_terms_id,
            status: RemixStatus::Draft,
            title: String::new(),
            description: String::new(),
            author: String::new(),
            license_type: None,
            content_cid: None,
            image_cid: None,
            ip_id: None,
            tx_hash: None,
            token_id: None,
            explorer_url: None,
            created_at: now_millis(),
            published_at: None,
        };

        let mut list = self.remixes()?;
        list.insert(0, remix.clone());
        self.kv.put(COLLECTION_STORE, REMIXES, &list)?;
        Ok(remix)
    }

    /// Update the editable fields of a draft remix
    pub fn update_remix<F>(&self, id: &str, edit: F) -> Result<RemixedStory, FolioError>
    where
        F: FnOnce(&mut RemixedStory),
    {
        let mut list = self.remixes()?;
        let remix = list
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| FolioError::NotFound(format!("Remix {} not found", id)))?;
        if remix.status == RemixStatus::Published {
            return Err(FolioError::Validation("Published remixes cannot be edited".to_string()));
        }

        edit(remix);
        // The edit closure must not smuggle a status change in
        remix.status = RemixStatus::Draft;
        let updated = remix.clone();
        self.kv.put(COLLECTION_STORE, REMIXES, &list)?;
        Ok(updated)
    }

    /// Move a remix from draft to published. There is no way back.
    pub fn mark_remix_published(&self, id: &str, publication: RemixPublication) -> Result<RemixedStory, FolioError> {
        let mut list = self.remixes()?;
        let remix = list
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| FolioError::NotFound(format!("Remix {} not found", id)))?;
        if remix.status == RemixStatus::Published {
            return Err(FolioError::Validation(format!("Remix {} is already published", id)));
        }

        remix.status = RemixStatus::Published;
        remix.title = publication.title;
        remix.description = publication.description;
        remix.author = publication.author;
        remix.license_type = Some(publication.license_type);
        remix.ip_id = Some(publication.ip_id);
        remix.tx_hash = Some(publication.tx_hash);
        remix.token_id = Some(publication.token_id);
        remix.explorer_url = Some(publication.explorer_url);
        remix.content_cid = Some(publication.content_cid);
        remix.image_cid = Some(publication.image_cid);
        remix.published_at = Some(now_millis());

        let updated = remix.clone();
        self.kv.put(COLLECTION_STORE, REMIXES, &list)?;
        info!(remix_id = %id, ip_id = ?updated.ip_id, "Remix published");
        Ok(updated)
    }

    pub fn bookmarks(&self) -> Result<Vec<String>, FolioError> {
        self.load_list(BOOKMARKS)
    }

    pub fn is_bookmarked(&self, story_id: &str) -> Result<bool, FolioError> {
        Ok(self.bookmarks()?.iter().any(|b| b == story_id))
    }

    /// Flip the bookmark on a story; returns the new state
    pub fn toggle_bookmark(&self, story_id: &str) -> Result<bool, FolioError> {
        let mut bookmarks = self.bookmarks()?;
        let bookmarked = if let Some(pos) = bookmarks.iter().position(|b| b == story_id) {
            bookmarks.remove(pos);
            false
        } else {
            bookmarks.insert(0, story_id.to_string());
            true
        };
        self.kv.put(COLLECTION_STORE, BOOKMARKS, &bookmarks)?;

        let mut progress = self.all_progress()?;
        let entry = progress
            .entry(story_id.to_string())
            .or_insert_with(|| ReadingProgress {
                story_id: story_id.to_string(),
                percentage: 0,
                last_read: now_millis(),
                bookmarked,
            });
        entry.bookmarked = bookmarked;
        self.kv.put(COLLECTION_STORE, PROGRESS, &progress)?;

        Ok(bookmarked)
    }

    fn all_progress(&self) -> Result<BTreeMap<String, ReadingProgress>, FolioError> {
        Ok(self.kv.get(COLLECTION_STORE, PROGRESS)?.unwrap_or_default())
    }

    pub fn progress(&self, story_id: &str) -> Result<Option<ReadingProgress>, FolioError> {
        Ok(self.all_progress()?.remove(story_id))
    }

    /// Upsert reading progress; percentages above 100 are clamped
    pub fn record_progress(&self, story_id: &str, percentage: u8) -> Result<ReadingProgress, FolioError> {
        let mut progress = self.all_progress()?;
        let bookmarked = self.is_bookmarked(story_id)?;
        let record = ReadingProgress {
            story_id: story_id.to_string(),
            percentage: percentage.min(100),
            last_read: now_millis(),
            bookmarked,
        };
        progress.insert(story_id.to_string(), record.clone());
        self.kv.put(COLLECTION_STORE, PROGRESS, &progress)?;
        Ok(record)
    }
}
