//! Folio: publish fiction as on-chain IP assets
//!
//! - `client` - persisted stores, the publish/remix wizard, autosave and the
//!   upload/registration orchestrator
//! - `server` - the HTTP gateway over the asset API and the registration SDK
//!
//! The shared pieces (wire types, license rules, pinning, errors) live at the
//! crate root so both halves can use them without depending on each other.

pub mod api;
pub mod error;
pub mod license;
pub mod models;
pub mod pinning;

#[cfg(feature = "client")]
pub mod client;

#[cfg(feature = "server")]
pub mod server;

pub use error::{ErrorKind, FolioError, Result};
pub use license::{check_derivative, resolve_inheritance, Inheritance, LicenseType};
