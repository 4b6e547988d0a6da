//! Extracted image rows.

use rusqlite::Row;
use serde::Serialize;

/// A still image in the album's `image/` directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Image {
    pub id: i64,
    pub definition_id: i64,
    pub name: String,
    /// Position in the sampling sequence of the run that produced it,
    /// counting frames that were skipped.
    pub index_in_definition: i64,
    pub added_at: String,
}

pub(crate) const COLUMNS: &str = "id, definition_id, name, index_in_definition, added_at";

impl Image {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            definition_id: row.get(1)?,
            name: row.get(2)?,
            index_in_definition: row.get(3)?,
            added_at: row.get(4)?,
        })
    }
}
