//! Shared fixtures for unit tests.

use std::sync::OnceLock;

use crate::tables::engine_tables::EngineTables;

/// Tables are built once per test binary.
pub(crate) fn tables() -> &'static EngineTables {
    static TABLES: OnceLock<EngineTables> = OnceLock::new();
    TABLES.get_or_init(EngineTables::new)
}
