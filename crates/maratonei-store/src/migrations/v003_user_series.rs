use rusqlite::Connection;

const UP_SQL: &str = r#"
-- Watchlist: series a user added to their profile
CREATE TABLE IF NOT EXISTS user_series (
    id          TEXT PRIMARY KEY NOT NULL,   -- UUID v4
    user_id     TEXT NOT NULL,               -- FK -> profiles(id)
    tmdb_id     INTEGER NOT NULL,
    title       TEXT NOT NULL,
    poster_path TEXT,
    status      TEXT NOT NULL DEFAULT 'watching',
    rating      INTEGER,                     -- 1..3
    review      TEXT,
    created_at  TEXT NOT NULL,

    FOREIGN KEY (user_id) REFERENCES profiles(id) ON DELETE CASCADE
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_user_series_unique ON user_series(user_id, tmdb_id);
"#;

pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
