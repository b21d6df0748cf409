use maratonei_shared::constants::NOTIFICATION_PAGE_SIZE;
use rusqlite::{params, Connection};

use crate::codec::{now, parse_col, parse_ts, ts};
use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{NewNotification, Notification, NotificationId, UserId};

impl Database {
    pub fn create_notification(&self, new: &NewNotification) -> Result<Notification> {
        insert_notification(self.conn(), new)
    }

    /// Latest notifications for `user`, newest first.
    pub fn list_notifications(&self, user: UserId) -> Result<Vec<Notification>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, user_id, actor_id, type, content, read, link, created_at
             FROM notifications
             WHERE user_id = ?1
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(
            params![user.to_string(), NOTIFICATION_PAGE_SIZE as i64],
            row_to_notification,
        )?;

        let mut notifications = Vec::new();
        for row in rows {
            notifications.push(row?);
        }
        Ok(notifications)
    }

    /// Mark one of `recipient`'s notifications as read. Marking an already
    /// read notification again is a no-op.
    pub fn mark_notification_read(&self, id: NotificationId, recipient: UserId) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE notifications SET read = 1 WHERE id = ?1 AND user_id = ?2",
            params![id.to_string(), recipient.to_string()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    /// Returns how many notifications flipped to read.
    pub fn mark_all_notifications_read(&self, recipient: UserId) -> Result<usize> {
        let affected = self.conn().execute(
            "UPDATE notifications SET read = 1 WHERE user_id = ?1 AND read = 0",
            params![recipient.to_string()],
        )?;
        Ok(affected)
    }

    pub fn unread_count(&self, recipient: UserId) -> Result<u64> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND read = 0",
            params![recipient.to_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

/// Insert on an arbitrary connection so follow / like / comment writes can
/// share their transaction with the notification.
pub(crate) fn insert_notification(conn: &Connection, new: &NewNotification) -> Result<Notification> {
    let notification = Notification {
        id: NotificationId::new(),
        recipient_id: new.recipient_id,
        actor_id: new.actor_id,
        kind: new.kind,
        text: new.text.clone(),
        read: false,
        link: new.link.clone(),
        created_at: now(),
    };

    conn.execute(
        "INSERT INTO notifications (id, user_id, actor_id, type, content, read, link, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?7)",
        params![
            notification.id.to_string(),
            notification.recipient_id.to_string(),
            notification.actor_id.to_string(),
            notification.kind.as_str(),
            notification.text,
            notification.link,
            ts(&notification.created_at),
        ],
    )?;

    tracing::debug!(
        recipient = %notification.recipient_id,
        kind = notification.kind.as_str(),
        "notification stored"
    );
    Ok(notification)
}

fn row_to_notification(row: &rusqlite::Row<'_>) -> rusqlite::Result<Notification> {
    let id: String = row.get(0)?;
    let recipient: String = row.get(1)?;
    let actor: String = row.get(2)?;
    let kind: String = row.get(3)?;
    let created_at: String = row.get(7)?;

    Ok(Notification {
        id: parse_col(0, &id)?,
        recipient_id: parse_col(1, &recipient)?,
        actor_id: parse_col(2, &actor)?,
        kind: parse_col(3, &kind)?,
        text: row.get(4)?,
        read: row.get(5)?,
        link: row.get(6)?,
        created_at: parse_ts(7, &created_at)?,
    })
}
