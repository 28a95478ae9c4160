//! License terms and derivative inheritance
//!
//! Three fixed license flavors can be attached to a story. Each maps to a
//! static descriptor and to the license terms id registered for it on chain.
//!
//! The inheritance resolver answers one question for a remix: given the
//! licenses on the parent asset, is a derivative disallowed, automatically
//! inherited, or does the author have to pick?

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Terms id of the commercial-use-only flavor (no derivatives).
pub const COMMERCIAL_USE_TERMS_ID: &str = "2";

/// A license flavor a story can be published under
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LicenseType {
    NonCommercial,
    CommercialUse,
    CommercialRemix,
}

/// Static description of a license flavor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseDescriptor {
    pub license_type: LicenseType,
    pub name: &'static str,
    pub commercial: bool,
    /// Revenue share owed to the parent, in percent
    pub revenue_share: u8,
    pub attribution: bool,
    pub allows_derivatives: bool,
    pub terms_id: &'static str,
}

const DESCRIPTORS: [LicenseDescriptor; 3] = [
    LicenseDescriptor {
        license_type: LicenseType::NonCommercial,
        name: "Non-Commercial Social Remixing",
        commercial: false,
        revenue_share: 0,
        attribution: true,
        allows_derivatives: true,
        terms_id: "1",
    },
    LicenseDescriptor {
        license_type: LicenseType::CommercialUse,
        name: "Commercial Use",
        commercial: true,
        revenue_share: 0,
        attribution: true,
        allows_derivatives: false,
        terms_id: COMMERCIAL_USE_TERMS_ID,
    },
    LicenseDescriptor {
        license_type: LicenseType::CommercialRemix,
        name: "Commercial Remix",
        commercial: true,
        revenue_share: 5,
        attribution: true,
        allows_derivatives: true,
        terms_id: "3",
    },
];

impl LicenseType {
    pub const ALL: [LicenseType; 3] = [
        LicenseType::NonCommercial,
        LicenseType::CommercialUse,
        LicenseType::CommercialRemix,
    ];

    pub fn descriptor(self) -> &'static LicenseDescriptor {
        match self {
            LicenseType::NonCommercial => &DESCRIPTORS[0],
            LicenseType::CommercialUse => &DESCRIPTORS[1],
            LicenseType::CommercialRemix => &DESCRIPTORS[2],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LicenseType::NonCommercial => "non-commercial",
            LicenseType::CommercialUse => "commercial-use",
            LicenseType::CommercialRemix => "commercial-remix",
        }
    }

    pub fn allows_derivatives(self) -> bool {
        self.descriptor().allows_derivatives
    }

    pub fn terms_id(self) -> &'static str {
        self.descriptor().terms_id
    }

    /// Reverse lookup from an on-chain license terms id
    pub fn from_terms_id(terms_id: &str) -> Option<LicenseType> {
        DESCRIPTORS
            .iter()
            .find(|d| d.terms_id == terms_id.trim())
            .map(|d| d.license_type)
    }
}

impl fmt::Display for LicenseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LicenseType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LicenseType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("Unknown license type: {}", s))
    }
}

/// Outcome of resolving a parent's licenses for a derivative
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Inheritance {
    /// Parent forbids derivatives
    Disallowed { error: String },
    /// Exactly one derivative-compatible license; it is inherited
    Inherited { license: LicenseType },
    /// Several derivative-compatible licenses; the author picks one
    SelectionRequired { options: Vec<LicenseType> },
}

impl Inheritance {
    pub fn is_allowed(&self) -> bool {
        !matches!(self, Inheritance::Disallowed { .. })
    }

    pub fn requires_selection(&self) -> bool {
        matches!(self, Inheritance::SelectionRequired { .. })
    }

    pub fn inherited_license(&self) -> Option<LicenseType> {
        match self {
            Inheritance::Inherited { license } => Some(*license),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Inheritance::Disallowed { error } => Some(error),
            _ => None,
        }
    }

    /// Licenses the derivative may be registered under
    pub fn options(&self) -> Vec<LicenseType> {
        match self {
            Inheritance::Disallowed { .. } => Vec::new(),
            Inheritance::Inherited { license } => vec![*license],
            Inheritance::SelectionRequired { options } => options.clone(),
        }
    }
}

/// Classify a parent's license tags for a derivative submission.
///
/// Tags are treated as a set, so duplicates count once.
pub fn resolve_inheritance(parent: &[LicenseType]) -> Inheritance {
    let mut compatible: Vec<LicenseType> = parent
        .iter()
        .copied()
        .filter(|t| t.allows_derivatives())
        .collect();
    compatible.sort();
    compatible.dedup();

    match compatible.len() {
        0 => Inheritance::Disallowed {
            error: "The original story's license does not allow derivative works".to_string(),
        },
        1 => Inheritance::Inherited { license: compatible[0] },
        _ => Inheritance::SelectionRequired { options: compatible },
    }
}

/// Check that a derivative under `derivative` may attach to a parent license
/// identified by its on-chain terms id.
///
/// A derivative inherits its parent's terms, so the flavors must match and
/// the parent must allow derivatives.
pub fn check_derivative(parent_terms_id: &str, derivative: LicenseType) -> Result<LicenseType, String> {
    let parent = LicenseType::from_terms_id(parent_terms_id)
        .ok_or_else(|| format!("Unknown parent license terms id: {}", parent_terms_id))?;

    if !parent.allows_derivatives() {
        return Err(format!(
            "Parent license '{}' does not allow derivative works",
            parent.descriptor().name
        ));
    }

    if parent != derivative {
        return Err(format!(
            "Derivative license '{}' is not compatible with parent license '{}'",
            derivative, parent
        ));
    }

    Ok(parent)
}
