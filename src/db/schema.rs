pub const SCHEMA: &str = r#"
-- Source videos copied or moved into the album
CREATE TABLE IF NOT EXISTS videos (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    added_at TEXT NOT NULL
);

-- Crop recipes: frame range plus optional rectangle
CREATE TABLE IF NOT EXISTS crop_definitions (
    id INTEGER PRIMARY KEY,
    video_id INTEGER NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    done INTEGER NOT NULL DEFAULT 0,
    index_start INTEGER NOT NULL,
    index_end INTEGER NOT NULL,
    index_step INTEGER NOT NULL,
    pixel_left INTEGER,
    pixel_top INTEGER,
    pixel_right INTEGER,
    pixel_bottom INTEGER,
    added_at TEXT NOT NULL,
    FOREIGN KEY (video_id) REFERENCES videos(id)
);

CREATE INDEX IF NOT EXISTS idx_crop_definitions_video ON crop_definitions(video_id);
CREATE INDEX IF NOT EXISTS idx_crop_definitions_done ON crop_definitions(done);

-- Still images produced by running a crop definition
CREATE TABLE IF NOT EXISTS images (
    id INTEGER PRIMARY KEY,
    definition_id INTEGER NOT NULL,
    name TEXT NOT NULL UNIQUE,
    index_in_definition INTEGER NOT NULL,
    added_at TEXT NOT NULL,
    FOREIGN KEY (definition_id) REFERENCES crop_definitions(id)
);

CREATE INDEX IF NOT EXISTS idx_images_definition ON images(definition_id);

-- Every file name ever handed out, per namespace ('video' or 'image')
CREATE TABLE IF NOT EXISTS issued_names (
    namespace TEXT NOT NULL,
    name TEXT NOT NULL,
    PRIMARY KEY (namespace, name)
);

-- Highest id ever issued per entity kind
CREATE TABLE IF NOT EXISTS id_watermarks (
    kind TEXT PRIMARY KEY,
    last_id INTEGER NOT NULL
);
"#;
