//! Shared value types for the spec-sheet document service.
//!
//! These types are used by the core store, the REST API and the CLI so that document
//! categories and validated text cross crate boundaries with one spelling.

mod kinds;
mod text;

pub use kinds::{DocumentType, KindError, ProductCategory};
pub use text::{NonEmptyText, TextError};
