//! Linear step controller for the publish and remix wizards

use std::collections::BTreeMap;
use std::marker::PhantomData;

use tracing::debug;

use super::schema::{FieldError, Step, WizardForm};

/// Cursor over `F::STEPS`, 1-based. Position N (the review step) is terminal.
#[derive(Debug)]
pub struct StepController<F: WizardForm> {
    position: usize,
    errors: BTreeMap<Step, Vec<FieldError>>,
    _form: PhantomData<fn(&F)>,
}

impl<F: WizardForm> Default for StepController<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: WizardForm> StepController<F> {
    pub fn new() -> Self {
        Self {
            position: 1,
            errors: BTreeMap::new(),
            _form: PhantomData,
        }
    }

    pub fn steps(&self) -> &'static [Step] {
        F::STEPS
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn current(&self) -> Step {
        F::STEPS[self.position - 1]
    }

    pub fn is_first(&self) -> bool {
        self.position == 1
    }

    pub fn is_last(&self) -> bool {
        self.position == F::STEPS.len()
    }

    /// Run one step's schema. Failures are recorded per field; a pass clears
    /// whatever was recorded for that step before.
    pub fn validate(&mut self, step: Step, form: &F) -> bool {
        let errors = form.check(step);
        if errors.is_empty() {
            self.errors.remove(&step);
            true
        } else {
            debug!(?step, count = errors.len(), "Step validation failed");
            self.errors.insert(step, errors);
            false
        }
    }

    /// Move forward when the current step validates. Returns whether the
    /// cursor moved; it never moves past the review step.
    pub fn advance(&mut self, form: &F) -> bool {
        if self.is_last() {
            return false;
        }
        if !self.validate(self.current(), form) {
            return false;
        }
        self.position += 1;
        true
    }

    /// Step back without validating
    pub fn retreat(&mut self) -> bool {
        if self.is_first() {
            return false;
        }
        self.position -= 1;
        true
    }

    /// Submission is allowed only from the review step with a clean form
    pub fn can_submit(&mut self, form: &F) -> bool {
        self.is_last() && self.validate(self.current(), form)
    }

    pub fn errors(&self, step: Step) -> &[FieldError] {
        self.errors.get(&step).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn all_errors(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.values().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::schema::{ContentFields, Field, PublishForm, RemixForm};
    use crate::license::LicenseType;
    use crate::models::{ContentType, FileRef};

    fn content() -> ContentFields {
        ContentFields {
            title: "The Lantern Keeper".into(),
            description: "A keeper of lights on a forgotten coast.".into(),
            content_type: ContentType::Text,
            content: "The lantern burned all night long, and nobody came to see it.".into(),
            file: None,
            cover_image: Some(FileRef::new("/tmp/cover.png", "image/png")),
        }
    }

    fn publish_form() -> PublishForm {
        PublishForm {
            fields: content(),
            license_types: vec![LicenseType::NonCommercial],
        }
    }

    #[test]
    fn test_advance_blocked_by_invalid_step() {
        let mut wizard = StepController::<PublishForm>::new();
        let mut form = publish_form();
        form.fields.title.clear();

        assert!(!wizard.advance(&form));
        assert_eq!(wizard.position(), 1);
        assert_eq!(wizard.errors(Step::Content)[0].field, Field::Title);

        form.fields.title = "Back again".into();
        assert!(wizard.advance(&form));
        assert_eq!(wizard.current(), Step::License);
        assert!(wizard.errors(Step::Content).is_empty());
    }

    #[test]
    fn test_advance_is_idempotent_at_terminal_step() {
        let mut wizard = StepController::<PublishForm>::new();
        let form = publish_form();
        assert!(wizard.advance(&form));
        assert!(wizard.advance(&form));
        assert!(wizard.is_last());

        for _ in 0..3 {
            assert!(!wizard.advance(&form));
            assert_eq!(wizard.position(), 3);
        }
        assert!(wizard.can_submit(&form));
    }

    #[test]
    fn test_retreat_does_not_validate() {
        let mut wizard = StepController::<PublishForm>::new();
        let form = publish_form();
        wizard.advance(&form);
        wizard.advance(&form);

        assert!(wizard.retreat());
        assert!(wizard.retreat());
        assert!(!wizard.retreat());
        assert_eq!(wizard.position(), 1);
        assert_eq!(wizard.all_errors().count(), 0);
    }

    #[test]
    fn test_can_submit_only_at_review() {
        let mut wizard = StepController::<PublishForm>::new();
        let mut form = publish_form();
        assert!(!wizard.can_submit(&form));

        wizard.advance(&form);
        wizard.advance(&form);
        form.license_types.clear();
        assert!(!wizard.can_submit(&form));
        assert_eq!(wizard.errors(Step::Review)[0].field, Field::LicenseTypes);
    }

    #[test]
    fn test_remix_runs_license_first() {
        let mut wizard = StepController::<RemixForm>::new();
        assert_eq!(wizard.steps(), &[Step::License, Step::Content, Step::Review]);

        let mut form = RemixForm {
            fields: ContentFields::default(),
            parent_ip_id: "0x1111111111111111111111111111111111111111".into(),
            parent_licenses: vec![LicenseType::CommercialUse],
            selected_license: None,
        };
        assert!(!wizard.advance(&form));

        form.parent_licenses.push(LicenseType::CommercialRemix);
        assert!(wizard.advance(&form));
        assert_eq!(wizard.current(), Step::Content);

        // Content is still empty
        assert!(!wizard.advance(&form));
        form.fields = content();
        assert!(wizard.advance(&form));
        assert!(wizard.can_submit(&form));
    }
}
