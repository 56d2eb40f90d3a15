//! System-wide default constants.
//!
//! Grouped by subsystem for easy discovery.

// ============================================================================
// Paths
// ============================================================================

/// Root of the per-field archive directories.
pub const SOURCE_DIR: &str = "data/zip_files";

/// Root of the per-field reference-table directories.
pub const TABLES_DIR: &str = "data/raw_tables";

/// Root of the per-field output directories.
pub const DESTINATION_DIR: &str = "data/las_files";

/// Error ledger location.
pub const LEDGER_PATH: &str = "reports/02_LAS_update_error_report.json";

// ============================================================================
// Processing
// ============================================================================

/// Archive file extension (case-insensitive, no leading dot).
pub const ARCHIVE_EXTENSION: &str = "zip";

/// Well-log file extension (case-insensitive, no leading dot).
pub const LOG_EXTENSION: &str = "las";

/// Seconds a single file may take before its group is abandoned.
pub const FILE_TIMEOUT_SECS: u64 = 300;

/// Upper bound on configured worker concurrency.
pub const MAX_CONCURRENCY: usize = 512;

// ============================================================================
// Output
// ============================================================================

/// Decimal places for curve values.
pub const CURVE_PRECISION: usize = 4;

/// Decimal places for the depth column.
pub const DEPTH_PRECISION: usize = 2;

// ============================================================================
// Reference tables
// ============================================================================

pub const WELLS_PREFIX: &str = "Wells_";
pub const LOGS_PREFIX: &str = "Logs_";
pub const TOPS_PREFIX: &str = "Tops_";
pub const INDEX_PREFIX: &str = "LAS_";
