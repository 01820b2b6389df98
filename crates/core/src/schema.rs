//! Relational schema for hosting the collection in a Postgres backend.
//!
//! The migration creates the `documents` table, turns on row-level security (anyone may read,
//! only the `authenticated` role may write) and installs a trigger that refreshes `updated_at`
//! on every row update. [`DOCUMENT_COLUMNS`] must stay in step with the fields of
//! [`crate::Document`].

pub const DOCUMENTS_TABLE: &str = "documents";

pub const DOCUMENTS_MIGRATION: &str = include_str!("../migrations/0001_create_documents.sql");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub sql_type: &'static str,
    pub default: Option<&'static str>,
}

const fn column(name: &'static str, sql_type: &'static str, default: Option<&'static str>) -> Column {
    Column {
        name,
        sql_type,
        default,
    }
}

/// Columns of `documents` in table order. Every column is `not null`.
pub const DOCUMENT_COLUMNS: &[Column] = &[
    column("id", "uuid", Some("gen_random_uuid()")),
    column("name", "text", None),
    column("description", "text", Some("''")),
    column("filename", "text", None),
    column("file_url", "text", None),
    column("size", "integer", Some("0")),
    column("type", "text", None),
    column("product_type", "text", None),
    column("required", "boolean", Some("false")),
    column("created_at", "timestamptz", Some("now()")),
    column("updated_at", "timestamptz", Some("now()")),
];

pub fn column_names() -> impl Iterator<Item = &'static str> {
    DOCUMENT_COLUMNS.iter().map(|c| c.name)
}
