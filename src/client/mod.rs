//! Client-side publishing workflow
//!
//! Persisted stores, the step-controlled wizard, autosave and the
//! upload/registration orchestrator. A front end or the `folio` CLI drives
//! these; nothing here depends on the gateway internals.

pub mod collection;
pub mod drafts;
pub mod http;
pub mod orchestrator;
pub mod preferences;
pub mod schema;
pub mod store;
pub mod wizard;

pub use collection::{CollectionStore, RemixPublication, RemixSource};
pub use drafts::{Autosaver, DraftStore, AUTOSAVE_INTERVAL};
pub use http::HttpRegistrationClient;
pub use orchestrator::{Orchestrator, StatusKind, SubmitStatus};
pub use preferences::PreferencesStore;
pub use schema::{ContentFields, Field, FieldError, PublishForm, RemixForm, Step, WizardForm};
pub use store::{KvStore, StoreName};
pub use wizard::StepController;
