//! Album catalog backed by SQLite.
//!
//! Reads go through [`CatalogRead`], implemented both by the [`Catalog`]
//! itself and by an open [`CatalogTx`]. All writes happen inside a
//! transaction; dropping a `CatalogTx` without committing rolls it back.

mod schema;
pub mod definitions;
pub mod images;
pub mod videos;

use rusqlite::{params, Connection, OptionalExtension, Params, Row, Transaction};
use std::path::Path;

pub use definitions::CropDefinition;
pub use images::Image;
pub use schema::SCHEMA;
pub use videos::Video;

use crate::ids::{EntityKind, EMPTY};
use crate::naming::Namespace;

/// Current time as stored in `added_at` columns.
pub fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn query_rows<T, P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
    map: fn(&Row<'_>) -> rusqlite::Result<T>,
) -> rusqlite::Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, map)?.collect::<rusqlite::Result<Vec<T>>>();
    rows
}

/// Read access shared by the catalog and its transactions.
pub trait CatalogRead {
    fn conn(&self) -> &Connection;

    fn video(&self, id: i64) -> rusqlite::Result<Option<Video>> {
        let result = self.conn().query_row(
            &format!("SELECT {} FROM videos WHERE id = ?", videos::COLUMNS),
            [id],
            Video::from_row,
        );
        match result {
            Ok(video) => Ok(Some(video)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn videos(&self) -> rusqlite::Result<Vec<Video>> {
        query_rows(
            self.conn(),
            &format!("SELECT {} FROM videos ORDER BY id", videos::COLUMNS),
            [],
            Video::from_row,
        )
    }

    fn video_exists(&self, id: i64) -> rusqlite::Result<bool> {
        self.conn()
            .query_row("SELECT EXISTS(SELECT 1 FROM videos WHERE id = ?)", [id], |row| row.get(0))
    }

    fn crop_definition(&self, id: i64) -> rusqlite::Result<Option<CropDefinition>> {
        self.conn()
            .query_row(
                &format!("SELECT {} FROM crop_definitions WHERE id = ?", definitions::COLUMNS),
                [id],
                CropDefinition::from_row,
            )
            .optional()
    }

    fn crop_definitions(&self) -> rusqlite::Result<Vec<CropDefinition>> {
        query_rows(
            self.conn(),
            &format!("SELECT {} FROM crop_definitions ORDER BY id", definitions::COLUMNS),
            [],
            CropDefinition::from_row,
        )
    }

    fn crop_definitions_for_video(&self, video_id: i64) -> rusqlite::Result<Vec<CropDefinition>> {
        query_rows(
            self.conn(),
            &format!(
                "SELECT {} FROM crop_definitions WHERE video_id = ? ORDER BY id",
                definitions::COLUMNS
            ),
            [video_id],
            CropDefinition::from_row,
        )
    }

    /// Ids of definitions that have not been extracted yet.
    fn pending_crop_definition_ids(&self) -> rusqlite::Result<Vec<i64>> {
        query_rows(
            self.conn(),
            "SELECT id FROM crop_definitions WHERE done = 0 ORDER BY id",
            [],
            |row| row.get(0),
        )
    }

    fn images(&self) -> rusqlite::Result<Vec<Image>> {
        query_rows(
            self.conn(),
            &format!("SELECT {} FROM images ORDER BY id", images::COLUMNS),
            [],
            Image::from_row,
        )
    }

    fn images_for_definition(&self, definition_id: i64) -> rusqlite::Result<Vec<Image>> {
        query_rows(
            self.conn(),
            &format!(
                "SELECT {} FROM images WHERE definition_id = ? ORDER BY id",
                images::COLUMNS
            ),
            [definition_id],
            Image::from_row,
        )
    }

    fn images_for_video(&self, video_id: i64) -> rusqlite::Result<Vec<Image>> {
        query_rows(
            self.conn(),
            r#"
            SELECT i.id, i.definition_id, i.name, i.index_in_definition, i.added_at
            FROM images i
            JOIN crop_definitions d ON i.definition_id = d.id
            WHERE d.video_id = ?
            ORDER BY i.id
            "#,
            [video_id],
            Image::from_row,
        )
    }

    /// Whether `name` was ever handed out in `namespace`, even if its row is gone.
    fn name_issued(&self, namespace: Namespace, name: &str) -> rusqlite::Result<bool> {
        self.conn().query_row(
            "SELECT EXISTS(SELECT 1 FROM issued_names WHERE namespace = ? AND name = ?)",
            params![namespace.key(), name],
            |row| row.get(0),
        )
    }

    /// Largest id ever issued for `kind`, or [`EMPTY`].
    fn last_issued_id(&self, kind: EntityKind) -> rusqlite::Result<i64> {
        let max_row: Option<i64> = self.conn().query_row(
            &format!("SELECT MAX(id) FROM {}", kind.table()),
            [],
            |row| row.get(0),
        )?;
        let watermark: Option<i64> = self
            .conn()
            .query_row(
                "SELECT last_id FROM id_watermarks WHERE kind = ?",
                [kind.key()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(max_row.into_iter().chain(watermark).fold(EMPTY, i64::max))
    }
}

pub struct Catalog {
    conn: Connection,
}

impl Catalog {
    pub fn open(path: &Path) -> rusqlite::Result<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> rusqlite::Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> rusqlite::Result<Self> {
        conn.pragma_update(None, "foreign_keys", true)?;
        Ok(Self { conn })
    }

    pub fn initialize(&self) -> rusqlite::Result<()> {
        self.conn.execute_batch(SCHEMA)
    }

    pub fn transaction(&mut self) -> rusqlite::Result<CatalogTx<'_>> {
        Ok(CatalogTx {
            tx: self.conn.transaction()?,
        })
    }
}

impl CatalogRead for Catalog {
    fn conn(&self) -> &Connection {
        &self.conn
    }
}

/// One atomic batch of catalog changes.
pub struct CatalogTx<'a> {
    tx: Transaction<'a>,
}

impl CatalogRead for CatalogTx<'_> {
    fn conn(&self) -> &Connection {
        &self.tx
    }
}

impl CatalogTx<'_> {
    pub fn commit(self) -> rusqlite::Result<()> {
        self.tx.commit()
    }

    pub fn insert_video(&self, video: &Video) -> rusqlite::Result<()> {
        self.tx.execute(
            "INSERT INTO videos (id, name, added_at) VALUES (?, ?, ?)",
            params![video.id, video.name, video.added_at],
        )?;
        self.record_issued_name(Namespace::Video, &video.name)?;
        self.raise_watermark(EntityKind::Video, video.id)
    }

    pub fn delete_video(&self, id: i64) -> rusqlite::Result<usize> {
        self.tx.execute("DELETE FROM videos WHERE id = ?", [id])
    }

    pub fn insert_crop_definition(&self, definition: &CropDefinition) -> rusqlite::Result<()> {
        let rect = definition.rect;
        self.tx.execute(
            r#"
            INSERT INTO crop_definitions (
                id, video_id, description, done, index_start, index_end, index_step,
                pixel_left, pixel_top, pixel_right, pixel_bottom, added_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                definition.id,
                definition.video_id,
                definition.description,
                definition.done,
                definition.range.start,
                definition.range.end,
                definition.range.step,
                rect.map(|r| r.left),
                rect.map(|r| r.top),
                rect.map(|r| r.right),
                rect.map(|r| r.bottom),
                definition.added_at,
            ],
        )?;
        self.raise_watermark(EntityKind::CropDefinition, definition.id)
    }

    pub fn delete_crop_definition(&self, id: i64) -> rusqlite::Result<usize> {
        self.tx.execute("DELETE FROM crop_definitions WHERE id = ?", [id])
    }

    pub fn mark_done(&self, definition_id: i64) -> rusqlite::Result<()> {
        self.tx.execute(
            "UPDATE crop_definitions SET done = 1 WHERE id = ?",
            [definition_id],
        )?;
        Ok(())
    }

    pub fn insert_image(&self, image: &Image) -> rusqlite::Result<()> {
        self.tx.execute(
            "INSERT INTO images (id, definition_id, name, index_in_definition, added_at) VALUES (?, ?, ?, ?, ?)",
            params![
                image.id,
                image.definition_id,
                image.name,
                image.index_in_definition,
                image.added_at
            ],
        )?;
        self.record_issued_name(Namespace::Image, &image.name)?;
        self.raise_watermark(EntityKind::Image, image.id)
    }

    pub fn delete_images_for_definition(&self, definition_id: i64) -> rusqlite::Result<usize> {
        self.tx
            .execute("DELETE FROM images WHERE definition_id = ?", [definition_id])
    }

    fn record_issued_name(&self, namespace: Namespace, name: &str) -> rusqlite::Result<()> {
        self.tx.execute(
            "INSERT OR IGNORE INTO issued_names (namespace, name) VALUES (?, ?)",
            params![namespace.key(), name],
        )?;
        Ok(())
    }

    fn raise_watermark(&self, kind: EntityKind, id: i64) -> rusqlite::Result<()> {
        self.tx.execute(
            r#"
            INSERT INTO id_watermarks (kind, last_id) VALUES (?1, ?2)
            ON CONFLICT(kind) DO UPDATE SET last_id = MAX(last_id, excluded.last_id)
            "#,
            params![kind.key(), id],
        )?;
        Ok(())
    }
}
