//! Per-step form validation for the publish and remix wizards
//!
//! Each wizard step owns a slice of the form. `check(step)` returns one
//! [`FieldError`] per violated constraint; the review step checks the union
//! of every other step.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::api::is_evm_address;
use crate::license::{resolve_inheritance, Inheritance, LicenseType};
use crate::models::{ContentType, FileRef, StoryDraft};

pub const TITLE_MAX: usize = 100;
pub const DESCRIPTION_MIN: usize = 10;
pub const DESCRIPTION_MAX: usize = 1000;
pub const TEXT_CONTENT_MIN: usize = 50;
pub const PDF_MIME: &str = "application/pdf";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Step {
    Content,
    License,
    Review,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Title,
    Description,
    Content,
    File,
    CoverImage,
    LicenseTypes,
    ParentIpId,
    SelectedLicense,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: Field,
    pub message: String,
}

impl FieldError {
    fn new(field: Field, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.field, self.message)
    }
}

/// A form driven by a [`StepController`](super::wizard::StepController)
pub trait WizardForm {
    /// Step order, first to last. The last step is the review step.
    const STEPS: &'static [Step];

    fn check(&self, step: Step) -> Vec<FieldError>;
}

/// Story fields shared by both wizards
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentFields {
    pub title: String,
    pub description: String,
    pub content_type: ContentType,
    pub content: String,
    pub file: Option<FileRef>,
    pub cover_image: Option<FileRef>,
}

impl ContentFields {
    pub fn check(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();

        let title_len = self.title.trim().chars().count();
        if title_len == 0 {
            errors.push(FieldError::new(Field::Title, "Title is required"));
        } else if title_len > TITLE_MAX {
            errors.push(FieldError::new(
                Field::Title,
                format!("Title must be at most {} characters", TITLE_MAX),
            ));
        }

        let description_len = self.description.trim().chars().count();
        if description_len < DESCRIPTION_MIN {
            errors.push(FieldError::new(
                Field::Description,
                format!("Description must be at least {} characters", DESCRIPTION_MIN),
            ));
        } else if description_len > DESCRIPTION_MAX {
            errors.push(FieldError::new(
                Field::Description,
                format!("Description must be at most {} characters", DESCRIPTION_MAX),
            ));
        }

        match self.content_type {
            ContentType::Text => {
                if self.content.trim().chars().count() < TEXT_CONTENT_MIN {
                    errors.push(FieldError::new(
                        Field::Content,
                        format!("Story content must be at least {} characters", TEXT_CONTENT_MIN),
                    ));
                }
                if self.file.is_some() {
                    errors.push(FieldError::new(Field::File, "A text story cannot also carry a file"));
                }
            }
            ContentType::Pdf => {
                match &self.file {
                    None => errors.push(FieldError::new(Field::File, "A PDF file is required")),
                    Some(file) if file.mime_type != PDF_MIME => {
                        errors.push(FieldError::new(Field::File, "File must be a PDF"))
                    }
                    Some(_) => {}
                }
                if !self.content.trim().is_empty() {
                    errors.push(FieldError::new(Field::Content, "A PDF story cannot also carry body text"));
                }
            }
        }

        match &self.cover_image {
            None => errors.push(FieldError::new(Field::CoverImage, "Cover image is required")),
            Some(image) if !image.mime_type.starts_with("image/") => {
                errors.push(FieldError::new(Field::CoverImage, "Cover must be an image"))
            }
            Some(_) => {}
        }

        errors
    }
}

/// Licenses must be a non-empty set
fn check_license_set(licenses: &[LicenseType]) -> Vec<FieldError> {
    if licenses.is_empty() {
        return vec![FieldError::new(Field::LicenseTypes, "Select at least one license")];
    }
    let unique: HashSet<_> = licenses.iter().collect();
    if unique.len() != licenses.len() {
        return vec![FieldError::new(Field::LicenseTypes, "Licenses must not repeat")];
    }
    Vec::new()
}

/// New story
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PublishForm {
    pub fields: ContentFields,
    pub license_types: Vec<LicenseType>,
}

impl From<&StoryDraft> for PublishForm {
    fn from(draft: &StoryDraft) -> Self {
        Self {
            fields: ContentFields {
                title: draft.title.clone(),
                description: draft.description.clone(),
                content_type: draft.content_type,
                content: draft.content.clone(),
                file: draft.file.clone(),
                cover_image: draft.cover_image.clone(),
            },
            license_types: draft.license_types.clone(),
        }
    }
}

impl WizardForm for PublishForm {
    const STEPS: &'static [Step] = &[Step::Content, Step::License, Step::Review];

    fn check(&self, step: Step) -> Vec<FieldError> {
        match step {
            Step::Content => self.fields.check(),
            Step::License => check_license_set(&self.license_types),
            Step::Review => {
                let mut errors = self.fields.check();
                errors.extend(check_license_set(&self.license_types));
                errors
            }
        }
    }
}

/// Derivative of an existing story. Licensing comes first because it
/// decides whether a remix is possible at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemixForm {
    pub fields: ContentFields,
    pub parent_ip_id: String,
    /// License flavors attached to the parent
    pub parent_licenses: Vec<LicenseType>,
    /// Author's pick when the parent offers several compatible licenses
    pub selected_license: Option<LicenseType>,
}

impl RemixForm {
    pub fn inheritance(&self) -> Inheritance {
        resolve_inheritance(&self.parent_licenses)
    }

    /// The license the derivative will be registered under, once decided
    pub fn effective_license(&self) -> Option<LicenseType> {
        match self.inheritance() {
            Inheritance::Disallowed { .. } => None,
            Inheritance::Inherited { license } => Some(license),
            Inheritance::SelectionRequired { options } => {
                self.selected_license.filter(|s| options.contains(s))
            }
        }
    }

    fn check_license(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();

        if !is_evm_address(self.parent_ip_id.trim()) {
            errors.push(FieldError::new(
                Field::ParentIpId,
                "Original story id must be a 0x-prefixed 40 hex digit address",
            ));
        }

        match self.inheritance() {
            Inheritance::Disallowed { error } => {
                errors.push(FieldError::new(Field::LicenseTypes, error));
            }
            Inheritance::Inherited { .. } => {}
            Inheritance::SelectionRequired { options } => match self.selected_license {
                None => errors.push(FieldError::new(Field::SelectedLicense, "Select a license for the remix")),
                Some(choice) if !options.contains(&choice) => errors.push(FieldError::new(
                    Field::SelectedLicense,
                    format!("License '{}' is not offered by the original story", choice),
                )),
                Some(_) => {}
            },
        }

        errors
    }
}

impl WizardForm for RemixForm {
    const STEPS: &'static [Step] = &[Step::License, Step::Content, Step::Review];

    fn check(&self, step: Step) -> Vec<FieldError> {
        match step {
            Step::License => self.check_license(),
            Step::Content => self.fields.check(),
            Step::Review => {
                let mut errors = self.check_license();
                errors.extend(self.fields.check());
                errors
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use LicenseType::*;

    const PARENT: &str = "0x1111111111111111111111111111111111111111";

    fn valid_fields() -> ContentFields {
        ContentFields {
            title: "The Lantern Keeper".into(),
            description: "A keeper of lights on a forgotten coast.".into(),
            content_type: ContentType::Text,
            content: "The lantern burned all night long, and nobody came to see it.".into(),
            file: None,
            cover_image: Some(FileRef::new("/tmp/cover.png", "image/png")),
        }
    }

    fn fields_of(errors: &[FieldError]) -> Vec<Field> {
        errors.iter().map(|e| e.field).collect()
    }

    #[test]
    fn test_valid_content_passes() {
        assert!(valid_fields().check().is_empty());
    }

    #[test]
    fn test_title_bounds() {
        let mut f = valid_fields();
        f.title = "  ".into();
        assert_eq!(fields_of(&f.check()), vec![Field::Title]);

        f.title = "x".repeat(TITLE_MAX);
        assert!(f.check().is_empty());
        f.title = "x".repeat(TITLE_MAX + 1);
        assert_eq!(fields_of(&f.check()), vec![Field::Title]);
    }

    #[test]
    fn test_description_bounds() {
        let mut f = valid_fields();
        f.description = "too short".into();
        assert_eq!(fields_of(&f.check()), vec![Field::Description]);
        f.description = "x".repeat(DESCRIPTION_MAX + 1);
        assert_eq!(fields_of(&f.check()), vec![Field::Description]);
    }

    #[test]
    fn test_content_type_decides_mandatory_body() {
        let mut f = valid_fields();
        f.content = "short".into();
        assert_eq!(fields_of(&f.check()), vec![Field::Content]);

        f.content = String::new();
        f.content_type = ContentType::Pdf;
        assert_eq!(fields_of(&f.check()), vec![Field::File]);

        f.file = Some(FileRef::new("/tmp/story.docx", "application/msword"));
        assert_eq!(fields_of(&f.check()), vec![Field::File]);

        f.file = Some(FileRef::new("/tmp/story.pdf", PDF_MIME));
        assert!(f.check().is_empty());
    }

    #[test]
    fn test_body_text_and_file_are_exclusive() {
        let mut f = valid_fields();
        f.title = "T".into();
        f.description = "twelve chars".into();
        f.content = "x".repeat(60);
        assert!(f.check().is_empty());

        f.file = Some(FileRef::new("/tmp/story.pdf", PDF_MIME));
        assert_eq!(fields_of(&f.check()), vec![Field::File]);

        f.content_type = ContentType::Pdf;
        assert_eq!(fields_of(&f.check()), vec![Field::Content]);

        f.content = "   ".into();
        assert!(f.check().is_empty());
    }

    #[test]
    fn test_cover_image_rules() {
        let mut f = valid_fields();
        f.cover_image = None;
        assert_eq!(fields_of(&f.check()), vec![Field::CoverImage]);
        f.cover_image = Some(FileRef::new("/tmp/cover.pdf", PDF_MIME));
        assert_eq!(fields_of(&f.check()), vec![Field::CoverImage]);
    }

    #[test]
    fn test_one_error_per_violated_constraint() {
        let form = PublishForm::default();
        let errors = form.check(Step::Review);
        assert_eq!(
            fields_of(&errors),
            vec![
                Field::Title,
                Field::Description,
                Field::Content,
                Field::CoverImage,
                Field::LicenseTypes
            ]
        );
    }

    #[test]
    fn test_license_set() {
        let mut form = PublishForm {
            fields: valid_fields(),
            license_types: vec![],
        };
        assert_eq!(fields_of(&form.check(Step::License)), vec![Field::LicenseTypes]);

        form.license_types = vec![NonCommercial, NonCommercial];
        assert_eq!(fields_of(&form.check(Step::License)), vec![Field::LicenseTypes]);

        form.license_types = vec![NonCommercial, CommercialUse];
        assert!(form.check(Step::Review).is_empty());
    }

    #[test]
    fn test_remix_inherits_single_license() {
        let form = RemixForm {
            fields: valid_fields(),
            parent_ip_id: PARENT.into(),
            parent_licenses: vec![CommercialUse, NonCommercial],
            selected_license: None,
        };
        assert!(form.check(Step::License).is_empty());
        assert_eq!(form.effective_license(), Some(NonCommercial));
    }

    #[test]
    fn test_remix_requires_selection_from_options() {
        let mut form = RemixForm {
            fields: valid_fields(),
            parent_ip_id: PARENT.into(),
            parent_licenses: vec![NonCommercial, CommercialRemix],
            selected_license: None,
        };
        assert_eq!(fields_of(&form.check(Step::License)), vec![Field::SelectedLicense]);
        assert_eq!(form.effective_license(), None);

        form.selected_license = Some(CommercialUse);
        assert_eq!(fields_of(&form.check(Step::License)), vec![Field::SelectedLicense]);

        form.selected_license = Some(CommercialRemix);
        assert!(form.check(Step::Review).is_empty());
        assert_eq!(form.effective_license(), Some(CommercialRemix));
    }

    #[test]
    fn test_remix_disallowed_and_bad_parent() {
        let form = RemixForm {
            fields: valid_fields(),
            parent_ip_id: "0x1234".into(),
            parent_licenses: vec![CommercialUse],
            selected_license: None,
        };
        let errors = form.check(Step::License);
        assert_eq!(fields_of(&errors), vec![Field::ParentIpId, Field::LicenseTypes]);
        assert!(!errors[1].message.is_empty());
    }

    #[test]
    fn test_publish_form_from_draft() {
        let mut draft = StoryDraft::new();
        draft.title = "T".into();
        draft.license_types = vec![CommercialRemix];
        let form = PublishForm::from(&draft);
        assert_eq!(form.fields.title, "T");
        assert_eq!(form.license_types, vec![CommercialRemix]);
    }
}
