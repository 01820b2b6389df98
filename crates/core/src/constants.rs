//! Constants used throughout the core crate.
//!
//! Path and filename constants live here so that both storage backends and the binaries
//! agree on the on-disk layout.

/// Default data directory when none is configured.
pub const DEFAULT_DATA_DIR: &str = "specsheet_data";

/// Filename of the whole-collection snapshot.
pub const SNAPSHOT_FILENAME: &str = "documents.json";

/// Directory name for per-record storage.
pub const RECORDS_DIR_NAME: &str = "records";

/// Filename of a single record inside its sharded directory.
pub const RECORD_FILENAME: &str = "document.yaml";

/// Default timeout for fetching remote content during export.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;

/// Default lifetime of an admin session.
pub const DEFAULT_SESSION_TTL_MINS: i64 = 8 * 60;
