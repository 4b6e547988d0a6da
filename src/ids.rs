//! Identifier allocation for catalog entities.
//!
//! Each entity kind has its own counter. Counters are seeded once when the
//! album is opened and then live in memory for the rest of the session; they
//! are never re-read from the catalog mid-session, so deleting the row with
//! the highest id cannot make that id come back.

use std::fmt;

/// Value of a counter for a kind that has never issued an id.
pub const EMPTY: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Video,
    CropDefinition,
    Image,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [
        EntityKind::Video,
        EntityKind::CropDefinition,
        EntityKind::Image,
    ];

    /// Catalog table holding rows of this kind.
    pub fn table(&self) -> &'static str {
        match self {
            EntityKind::Video => "videos",
            EntityKind::CropDefinition => "crop_definitions",
            EntityKind::Image => "images",
        }
    }

    /// Stable key used when persisting the high-water mark.
    pub fn key(&self) -> &'static str {
        match self {
            EntityKind::Video => "video",
            EntityKind::CropDefinition => "crop_definition",
            EntityKind::Image => "image",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Video => "video",
            EntityKind::CropDefinition => "crop definition",
            EntityKind::Image => "image",
        };
        f.write_str(name)
    }
}

/// Saved counter state, taken before an operation so it can be undone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocatorSnapshot {
    video: i64,
    definition: i64,
    image: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdAllocator {
    video: i64,
    definition: i64,
    image: i64,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self {
            video: EMPTY,
            definition: EMPTY,
            image: EMPTY,
        }
    }
}

impl IdAllocator {
    /// Build an allocator from the last id issued for each kind.
    pub fn seeded<E>(mut last_issued: impl FnMut(EntityKind) -> Result<i64, E>) -> Result<Self, E> {
        let mut allocator = Self::default();
        for kind in EntityKind::ALL {
            *allocator.slot(kind) = last_issued(kind)?.max(EMPTY);
        }
        Ok(allocator)
    }

    /// Issue the next id for `kind`.
    pub fn next(&mut self, kind: EntityKind) -> i64 {
        let slot = self.slot(kind);
        *slot += 1;
        *slot
    }

    /// Last id issued for `kind`, or [`EMPTY`].
    pub fn last(&self, kind: EntityKind) -> i64 {
        match kind {
            EntityKind::Video => self.video,
            EntityKind::CropDefinition => self.definition,
            EntityKind::Image => self.image,
        }
    }

    pub fn snapshot(&self) -> AllocatorSnapshot {
        AllocatorSnapshot {
            video: self.video,
            definition: self.definition,
            image: self.image,
        }
    }

    pub fn restore(&mut self, snapshot: AllocatorSnapshot) {
        self.video = snapshot.video;
        self.definition = snapshot.definition;
        self.image = snapshot.image;
    }

    fn slot(&mut self, kind: EntityKind) -> &mut i64 {
        match kind {
            EntityKind::Video => &mut self.video,
            EntityKind::CropDefinition => &mut self.definition,
            EntityKind::Image => &mut self.image,
        }
    }
}
