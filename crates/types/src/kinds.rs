//! Closed enumerations that tag every stored document.
//!
//! Both enums serialise to a short kebab-case code (the value stored in the `type` and
//! `product_type` columns) and parse back from the same code.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Errors returned when parsing a document type or product category code.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum KindError {
    #[error("unknown document type: '{0}'")]
    UnknownDocumentType(String),
    #[error("unknown product category: '{0}'")]
    UnknownProductCategory(String),
}

/// The content category of a PDF document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentType {
    /// Technical data sheet. Also the fallback when nothing else can be inferred.
    #[default]
    Tds,
    Esr,
    Msds,
    Leed,
    Installation,
    Warranty,
    Acoustic,
    PartSpec,
}

impl DocumentType {
    pub const ALL: [DocumentType; 8] = [
        DocumentType::Tds,
        DocumentType::Esr,
        DocumentType::Msds,
        DocumentType::Leed,
        DocumentType::Installation,
        DocumentType::Warranty,
        DocumentType::Acoustic,
        DocumentType::PartSpec,
    ];

    /// Stable code used in storage and on the wire.
    pub fn code(&self) -> &'static str {
        match self {
            DocumentType::Tds => "tds",
            DocumentType::Esr => "esr",
            DocumentType::Msds => "msds",
            DocumentType::Leed => "leed",
            DocumentType::Installation => "installation",
            DocumentType::Warranty => "warranty",
            DocumentType::Acoustic => "acoustic",
            DocumentType::PartSpec => "part-spec",
        }
    }

    /// Canonical human-readable label, used as the display name of new documents.
    pub fn label(&self) -> &'static str {
        match self {
            DocumentType::Tds => "Technical Data Sheet",
            DocumentType::Esr => "Evaluation Report",
            DocumentType::Msds => "Material Safety Data Sheet",
            DocumentType::Leed => "LEED Credit Guide",
            DocumentType::Installation => "Installation Guide",
            DocumentType::Warranty => "Warranty",
            DocumentType::Acoustic => "Acoustic Performance",
            DocumentType::PartSpec => "Part Specification",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for DocumentType {
    type Err = KindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        DocumentType::ALL
            .into_iter()
            .find(|kind| kind.code().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| KindError::UnknownDocumentType(s.to_owned()))
    }
}

/// The product line a document describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProductCategory {
    Ceilings,
    Walls,
    Baffles,
    Clouds,
    Other,
}

impl ProductCategory {
    pub const ALL: [ProductCategory; 5] = [
        ProductCategory::Ceilings,
        ProductCategory::Walls,
        ProductCategory::Baffles,
        ProductCategory::Clouds,
        ProductCategory::Other,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            ProductCategory::Ceilings => "ceilings",
            ProductCategory::Walls => "walls",
            ProductCategory::Baffles => "baffles",
            ProductCategory::Clouds => "clouds",
            ProductCategory::Other => "other",
        }
    }
}

impl fmt::Display for ProductCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for ProductCategory {
    type Err = KindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ProductCategory::ALL
            .into_iter()
            .find(|category| category.code().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| KindError::UnknownProductCategory(s.to_owned()))
    }
}
