use rusqlite::Connection;

const UP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS stamps (
    id             TEXT PRIMARY KEY NOT NULL,   -- UUID v4
    name           TEXT NOT NULL,
    description    TEXT NOT NULL DEFAULT '',
    rarity         TEXT NOT NULL,               -- common | rare | epic | legendary
    image_url      TEXT NOT NULL,
    purchasable    INTEGER NOT NULL DEFAULT 0,
    price          INTEGER NOT NULL DEFAULT 0,  -- coins, 0 unless purchasable
    tmdb_id        INTEGER,
    series_title   TEXT,
    req_type       TEXT NOT NULL DEFAULT 'none',  -- none | post_count
    req_value      INTEGER NOT NULL DEFAULT 0,
    max_supply     INTEGER,
    current_supply INTEGER NOT NULL DEFAULT 0,
    created_at     TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_stamps_rule ON stamps(req_type, tmdb_id);

-- One row per (user, stamp): the unique index is what makes concurrent
-- grants of the same stamp collapse into a single award.
CREATE TABLE IF NOT EXISTS user_stamps (
    id          TEXT PRIMARY KEY NOT NULL,
    user_id     TEXT NOT NULL,
    stamp_id    TEXT NOT NULL,
    obtained_at TEXT NOT NULL,

    FOREIGN KEY (user_id)  REFERENCES profiles(id) ON DELETE CASCADE,
    FOREIGN KEY (stamp_id) REFERENCES stamps(id) ON DELETE CASCADE
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_user_stamps_unique ON user_stamps(user_id, stamp_id);
"#;

pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
