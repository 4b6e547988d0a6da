//! Video rows.

use rusqlite::Row;
use serde::Serialize;

/// A video stored in the album's `video/` directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Video {
    pub id: i64,
    pub name: String,
    pub added_at: String,
}

pub(crate) const COLUMNS: &str = "id, name, added_at";

impl Video {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            added_at: row.get(2)?,
        })
    }
}
