use rusqlite::params;

use crate::codec::{now, parse_col, parse_ts, series_ref, ts};
use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{
    NewNotification, NewStamp, Requirement, RequirementKind, SeriesId, Stamp, StampId, UserId,
    UserStamp,
};
use crate::notifications::insert_notification;

/// Stamp columns, indexes 0..=13.
const STAMP_COLUMNS: &str = "s.id, s.name, s.description, s.rarity, s.image_url, s.purchasable,
    s.price, s.tmdb_id, s.series_title, s.req_type, s.req_value, s.max_supply,
    s.current_supply, s.created_at";

impl Database {
    pub fn create_stamp(&self, new: &NewStamp) -> Result<Stamp> {
        new.validate()?;

        let stamp = Stamp {
            id: StampId::new(),
            name: new.name.trim().to_string(),
            description: new.description.clone(),
            rarity: new.rarity,
            image_url: new.image_url.clone(),
            price: new.price,
            series: new.series.clone(),
            requirement: new.requirement,
            max_supply: new.max_supply,
            current_supply: 0,
            created_at: now(),
        };

        self.conn().execute(
            "INSERT INTO stamps (id, name, description, rarity, image_url, purchasable, price,
                                 tmdb_id, series_title, req_type, req_value, max_supply,
                                 current_supply, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, 0, ?13)",
            params![
                stamp.id.to_string(),
                stamp.name,
                stamp.description,
                stamp.rarity.as_str(),
                stamp.image_url,
                stamp.price.is_some(),
                stamp.price.unwrap_or(0),
                stamp.series.as_ref().map(|s| s.id.0),
                stamp.series.as_ref().map(|s| s.title.as_str()),
                stamp.requirement.kind().as_str(),
                stamp.requirement.threshold(),
                stamp.max_supply,
                ts(&stamp.created_at),
            ],
        )?;

        tracing::info!(stamp = %stamp.id, name = %stamp.name, "stamp created");
        Ok(stamp)
    }

    pub fn get_stamp(&self, id: StampId) -> Result<Stamp> {
        self.conn()
            .query_row(
                &format!("SELECT {STAMP_COLUMNS} FROM stamps s WHERE s.id = ?1"),
                params![id.to_string()],
                row_to_stamp,
            )
            .map_err(StoreError::from_query)
    }

    /// The whole catalog, newest first.
    pub fn list_stamps(&self) -> Result<Vec<Stamp>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {STAMP_COLUMNS} FROM stamps s ORDER BY s.created_at DESC, s.rowid DESC"
        ))?;
        let rows = stmt.query_map([], row_to_stamp)?;

        let mut stamps = Vec::new();
        for row in rows {
            stamps.push(row?);
        }
        Ok(stamps)
    }

    /// Removing a stamp also removes it from every collection.
    pub fn delete_stamp(&self, id: StampId) -> Result<()> {
        let affected = self
            .conn()
            .execute("DELETE FROM stamps WHERE id = ?1", params![id.to_string()])?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        tracing::info!(stamp = %id, "stamp deleted");
        Ok(())
    }

    /// Stamps linked to `series` with the given requirement kind, ordered by
    /// ascending threshold (oldest first among equal thresholds).
    pub fn stamps_for_series(&self, series: SeriesId, kind: RequirementKind) -> Result<Vec<Stamp>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {STAMP_COLUMNS} FROM stamps s
             WHERE s.tmdb_id = ?1 AND s.req_type = ?2
             ORDER BY s.req_value ASC, s.created_at ASC, s.rowid ASC"
        ))?;
        let rows = stmt.query_map(params![series.0, kind.as_str()], row_to_stamp)?;

        let mut stamps = Vec::new();
        for row in rows {
            stamps.push(row?);
        }
        Ok(stamps)
    }

    pub fn has_stamp(&self, user: UserId, stamp: StampId) -> Result<bool> {
        let owned: bool = self.conn().query_row(
            "SELECT EXISTS(SELECT 1 FROM user_stamps WHERE user_id = ?1 AND stamp_id = ?2)",
            params![user.to_string(), stamp.to_string()],
            |row| row.get(0),
        )?;
        Ok(owned)
    }

    /// Put `stamp` in `user`'s collection and write its `badge_earned`
    /// notification in the same transaction. Returns `false` when they
    /// already held it; the unique (user, stamp) index makes racing grants
    /// collapse into one row, one supply increment and one notification.
    pub fn grant_stamp(&self, user: UserId, stamp: &Stamp) -> Result<bool> {
        let tx = self.conn().unchecked_transaction()?;
        let inserted = tx
            .execute(
                "INSERT OR IGNORE INTO user_stamps (id, user_id, stamp_id, obtained_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    uuid::Uuid::new_v4().to_string(),
                    user.to_string(),
                    stamp.id.to_string(),
                    ts(&now()),
                ],
            )
            .map_err(StoreError::from_insert)?;

        if inserted == 0 {
            return Ok(false);
        }

        tx.execute(
            "UPDATE stamps SET current_supply = current_supply + 1 WHERE id = ?1",
            params![stamp.id.to_string()],
        )?;
        insert_notification(&tx, &NewNotification::badge_earned(user, stamp))?;
        tx.commit()?;

        tracing::info!(%user, stamp = %stamp.id, "stamp granted");
        Ok(true)
    }

    /// A user's collection, most recently obtained first.
    pub fn user_stamps(&self, user: UserId) -> Result<Vec<UserStamp>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {STAMP_COLUMNS}, us.obtained_at
             FROM user_stamps us
             JOIN stamps s ON s.id = us.stamp_id
             WHERE us.user_id = ?1
             ORDER BY us.obtained_at DESC, us.rowid DESC"
        ))?;
        let rows = stmt.query_map(params![user.to_string()], |row| {
            let obtained_at: String = row.get(14)?;
            Ok(UserStamp {
                stamp: row_to_stamp(row)?,
                obtained_at: parse_ts(14, &obtained_at)?,
            })
        })?;

        let mut owned = Vec::new();
        for row in rows {
            owned.push(row?);
        }
        Ok(owned)
    }
}

fn row_to_stamp(row: &rusqlite::Row<'_>) -> rusqlite::Result<Stamp> {
    let id: String = row.get(0)?;
    let rarity: String = row.get(3)?;
    let purchasable: bool = row.get(5)?;
    let price: u32 = row.get(6)?;
    let req_type: String = row.get(9)?;
    let req_value: u32 = row.get(10)?;
    let created_at: String = row.get(13)?;

    let kind: RequirementKind = parse_col(9, &req_type)?;

    Ok(Stamp {
        id: parse_col(0, &id)?,
        name: row.get(1)?,
        description: row.get(2)?,
        rarity: parse_col(3, &rarity)?,
        image_url: row.get(4)?,
        price: purchasable.then_some(price),
        series: series_ref(row.get(7)?, row.get(8)?),
        requirement: Requirement::from_parts(kind, req_value),
        max_supply: row.get(11)?,
        current_supply: row.get(12)?,
        created_at: parse_ts(13, &created_at)?,
    })
}
