//! Database schema definition.

/// Initial schema (version 1).
pub const SCHEMA_V1: &str = r"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Daemon settings, one row per field
CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
";

/// Default data to insert after schema creation.
pub const DEFAULT_DATA: &str = r"
INSERT OR IGNORE INTO settings (key, value) VALUES
    ('level', '50'),
    ('mute', '0'),
    ('warning_level', '100'),
    ('volume_curve', '0'),
    ('mixer_name', 'Digital'),
    ('mixer_mode', 'hardware');
";
