//! Upload and registration orchestrator
//!
//! A submission pins the story body and cover image, asks the registration
//! client to register the IP asset, then records the result locally. Every
//! outcome is flattened into a [`SubmitStatus`] for the caller to render.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};

use super::collection::{CollectionStore, RemixPublication};
use super::drafts::DraftStore;
use super::schema::{ContentFields, PublishForm, RemixForm, Step, WizardForm};
use crate::api::{RegisterDerivativeRequest, RegisterStoryRequest, RegistrationClient, RegistrationData};
use crate::error::FolioError;
use crate::license::{check_derivative, LicenseType};
use crate::models::{now_millis, ContentType, PublishedStory, RemixedStory};
use crate::pinning::{ContentPinner, FileUpload, PinnedContent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    Error,
    Success,
}

/// What the caller shows after a submission; `kind` is `None` when idle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SubmitStatus {
    #[serde(rename = "type")]
    pub kind: Option<StatusKind>,
    pub message: String,
}

impl SubmitStatus {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: Some(StatusKind::Success),
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: Some(StatusKind::Error),
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.kind == Some(StatusKind::Success)
    }
}

/// Clears the in-flight flag when a submission ends, however it ends
struct SubmitGuard<'a>(&'a AtomicBool);

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Orchestrator {
    pinner: Arc<dyn ContentPinner>,
    registrar: Arc<dyn RegistrationClient>,
    collection: CollectionStore,
    drafts: DraftStore,
    submitting: AtomicBool,
}

impl Orchestrator {
    pub fn new(
        pinner: Arc<dyn ContentPinner>,
        registrar: Arc<dyn RegistrationClient>,
        collection: CollectionStore,
        drafts: DraftStore,
    ) -> Self {
        Self {
            pinner,
            registrar,
            collection,
            drafts,
            submitting: AtomicBool::new(false),
        }
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::Acquire)
    }

    fn begin(&self) -> Option<SubmitGuard<'_>> {
        self.submitting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SubmitGuard(&self.submitting))
    }

    /// Publish a new story. On success the story lands at the front of the
    /// collection and `draft_id`, if given, is discarded.
    pub async fn publish(&self, draft_id: Option<&str>, form: &PublishForm, author: &str) -> SubmitStatus {
        let Some(_guard) = self.begin() else {
            return SubmitStatus::error("A submission is already in progress");
        };

        match self.try_publish(draft_id, form, author).await {
            Ok(story) => SubmitStatus::success(format!("Story published! IP ID: {}", story.id)),
            Err(e) => {
                error!(error = %e, "Publish failed");
                SubmitStatus::error(e.public_message())
            }
        }
    }

    async fn try_publish(
        &self,
        draft_id: Option<&str>,
        form: &PublishForm,
        author: &str,
    ) -> Result<PublishedStory, FolioError> {
        ensure_valid(form)?;
        let author = require_author(author)?;

        let (content, image) = self.upload_content(&form.fields).await?;

        let request = RegisterStoryRequest {
            title: form.fields.title.trim().to_string(),
            description: form.fields.description.trim().to_string(),
            content_cid: content.cid.clone(),
            image_cid: image.cid.clone(),
            author: author.to_string(),
            license_types: form.license_types.clone(),
            content_type: form.fields.content_type,
        };
        let registration = self.registrar.register_story(&request).await?;
        require_ip_id(&registration)?;

        let story = PublishedStory {
            id: registration.ip_id.clone(),
            title: request.title,
            description: request.description,
            author: request.author,
            content_type: request.content_type,
            content_url: content.url,
            content_cid: content.cid,
            image_url: image.url,
            image_cid: image.cid,
            license_types: request.license_types,
            tx_hash: registration.tx_hash,
            token_id: registration.token_id,
            explorer_url: registration.explorer_url,
            published_at: now_millis(),
        };
        self.collection.add_published(story.clone())?;

        if let Some(id) = draft_id {
            if let Err(e) = self.drafts.discard(id) {
                warn!(draft_id = %id, error = %e, "Could not discard published draft");
            }
        }

        info!(ip_id = %story.id, title = %story.title, "Story published");
        Ok(story)
    }

    /// Publish a draft remix as a derivative of its parent
    pub async fn publish_remix(&self, remix_id: &str, form: &RemixForm, author: &str) -> SubmitStatus {
        let Some(_guard) = self.begin() else {
            return SubmitStatus::error("A submission is already in progress");
        };

        match self.try_publish_remix(remix_id, form, author).await {
            Ok(remix) => SubmitStatus::success(format!(
                "Remix published! IP ID: {}",
                remix.ip_id.unwrap_or_default()
            )),
            Err(e) => {
                error!(remix_id = %remix_id, error = %e, "Remix publish failed");
                SubmitStatus::error(e.public_message())
            }
        }
    }

    async fn try_publish_remix(
        &self,
        remix_id: &str,
        form: &RemixForm,
        author: &str,
    ) -> Result<RemixedStory, FolioError> {
        ensure_valid(form)?;
        let author = require_author(author)?;
        let license = form
            .effective_license()
            .ok_or_else(|| FolioError::Validation("Select a license for the remix".to_string()))?;

        let remix = self
            .collection
            .find_remix(remix_id)?
            .ok_or_else(|| FolioError::NotFound(format!("Remix {} not found", remix_id)))?;
        check_remix_parent(&remix, form, license)?;

        let (content, image) = self.upload_content(&form.fields).await?;

        let request = RegisterDerivativeRequest {
            title: form.fields.title.trim().to_string(),
            description: form.fields.description.trim().to_string(),
            content_cid: content.cid.clone(),
            image_cid: image.cid.clone(),
            author: author.to_string(),
            parent_ip_id: remix.original_id.clone(),
            parent_license_terms_id: remix.parent_license_terms_id.clone(),
            derivative_license_type: license,
            content_type: form.fields.content_type,
        };
        let registration = self.registrar.register_derivative(&request).await?;
        require_ip_id(&registration)?;

        self.collection.mark_remix_published(
            remix_id,
            RemixPublication {
                title: request.title,
                description: request.description,
                author: request.author,
                license_type: license,
                ip_id: registration.ip_id,
                tx_hash: registration.tx_hash,
                token_id: registration.token_id,
                explorer_url: registration.explorer_url,
                content_cid: content.cid,
                image_cid: image.cid,
            },
        )
    }

    /// Pin the body, then the cover. Stops at the first failure.
    async fn upload_content(&self, fields: &ContentFields) -> Result<(PinnedContent, PinnedContent), FolioError> {
        let body = match fields.content_type {
            ContentType::Text => FileUpload {
                file_name: format!("{}.txt", slug(&fields.title)),
                mime_type: ContentType::Text.mime().to_string(),
                bytes: fields.content.clone().into_bytes(),
            },
            ContentType::Pdf => {
                let file = fields
                    .file
                    .as_ref()
                    .ok_or_else(|| FolioError::Validation("A PDF file is required".to_string()))?;
                FileUpload {
                    file_name: file.file_name.clone(),
                    mime_type: file.mime_type.clone(),
                    bytes: file.read().await?,
                }
            }
        };
        let content = self.pin(body, "story content").await?;

        let cover = fields
            .cover_image
            .as_ref()
            .ok_or_else(|| FolioError::Validation("Cover image is required".to_string()))?;
        let image = self
            .pin(
                FileUpload {
                    file_name: cover.file_name.clone(),
                    mime_type: cover.mime_type.clone(),
                    bytes: cover.read().await?,
                },
                "cover image",
            )
            .await?;

        Ok((content, image))
    }

    async fn pin(&self, upload: FileUpload, what: &str) -> Result<PinnedContent, FolioError> {
        let pinned = self.pinner.pin_file(upload).await?;
        if pinned.cid.trim().is_empty() {
            return Err(FolioError::Upstream(format!("Uploading {} returned no content identifier", what)));
        }
        Ok(pinned)
    }
}

fn ensure_valid<F: WizardForm>(form: &F) -> Result<(), FolioError> {
    match form.check(Step::Review).into_iter().next() {
        Some(first) => Err(FolioError::Validation(first.message)),
        None => Ok(()),
    }
}

/// The form must describe the parent the remix was started from, under
/// that parent's recorded license
fn check_remix_parent(remix: &RemixedStory, form: &RemixForm, license: LicenseType) -> Result<(), FolioError> {
    let form_parent = form.parent_ip_id.trim();
    if !form_parent.eq_ignore_ascii_case(remix.original_id.trim()) {
        return Err(FolioError::Validation(format!(
            "Remix {} derives from {}, not {}",
            remix.id, remix.original_id, form_parent
        )));
    }
    check_derivative(&remix.parent_license_terms_id, license).map_err(FolioError::Validation)?;
    Ok(())
}

fn require_author(author: &str) -> Result<&str, FolioError> {
    let author = author.trim();
    if author.is_empty() {
        return Err(FolioError::Validation("Connect a wallet to publish".to_string()));
    }
    Ok(author)
}

fn require_ip_id(registration: &RegistrationData) -> Result<(), FolioError> {
    if registration.ip_id.trim().is_empty() {
        return Err(FolioError::Upstream("Registration returned no IP id".to_string()));
    }
    Ok(())
}

/// File-name friendly version of a title
fn slug(title: &str) -> String {
    let slug: String = title
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    if slug.is_empty() {
        "story".to_string()
    } else {
        slug
    }
}
