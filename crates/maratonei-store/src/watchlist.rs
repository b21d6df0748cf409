use rusqlite::params;

use crate::codec::{now, parse_col, parse_ts, ts};
use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{NewWatchEntry, SeriesId, SeriesRef, UserId, WatchEntry, WatchEntryId};

impl Database {
    /// Add a series to `user`'s profile. Adding the same series twice yields
    /// [`StoreError::AlreadyExists`].
    pub fn add_watch_entry(&self, user: UserId, new: &NewWatchEntry) -> Result<WatchEntry> {
        new.validate()?;

        let entry = WatchEntry {
            id: WatchEntryId::new(),
            user_id: user,
            series: new.series.clone(),
            poster_path: new.poster_path.clone(),
            status: new.status,
            rating: new.rating,
            review: new.review.clone(),
            created_at: now(),
        };

        self.conn()
            .execute(
                "INSERT INTO user_series (id, user_id, tmdb_id, title, poster_path, status,
                                          rating, review, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    entry.id.to_string(),
                    user.to_string(),
                    entry.series.id.0,
                    entry.series.title,
                    entry.poster_path,
                    entry.status.as_str(),
                    entry.rating,
                    entry.review,
                    ts(&entry.created_at),
                ],
            )
            .map_err(StoreError::from_insert)?;

        Ok(entry)
    }

    /// Newest first.
    pub fn list_watch_entries(&self, user: UserId) -> Result<Vec<WatchEntry>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, user_id, tmdb_id, title, poster_path, status, rating, review, created_at
             FROM user_series
             WHERE user_id = ?1
             ORDER BY created_at DESC, rowid DESC",
        )?;
        let rows = stmt.query_map(params![user.to_string()], row_to_entry)?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    pub fn remove_watch_entry(&self, id: WatchEntryId, user: UserId) -> Result<()> {
        let affected = self.conn().execute(
            "DELETE FROM user_series WHERE id = ?1 AND user_id = ?2",
            params![id.to_string(), user.to_string()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<WatchEntry> {
    let id: String = row.get(0)?;
    let user: String = row.get(1)?;
    let status: String = row.get(5)?;
    let created_at: String = row.get(8)?;

    Ok(WatchEntry {
        id: parse_col(0, &id)?,
        user_id: parse_col(1, &user)?,
        series: SeriesRef {
            id: SeriesId(row.get(2)?),
            title: row.get(3)?,
        },
        poster_path: row.get(4)?,
        status: parse_col(5, &status)?,
        rating: row.get(6)?,
        review: row.get(7)?,
        created_at: parse_ts(8, &created_at)?,
    })
}
