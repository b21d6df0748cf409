use maratonei_shared::ValidationError;
use rusqlite::params;

use crate::codec::{now, ts};
use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{NewNotification, UserId};
use crate::notifications::insert_notification;

impl Database {
    /// `follower` starts following `following` and the followed user is
    /// notified. Following twice yields [`StoreError::AlreadyExists`].
    pub fn follow(&self, follower: UserId, following: UserId) -> Result<()> {
        if follower == following {
            return Err(ValidationError::SelfFollow.into());
        }

        let tx = self.conn().unchecked_transaction()?;
        tx.execute(
            "INSERT INTO follows (follower_id, following_id, created_at) VALUES (?1, ?2, ?3)",
            params![follower.to_string(), following.to_string(), ts(&now())],
        )
        .map_err(StoreError::from_insert)?;
        insert_notification(&tx, &NewNotification::follow(following, follower))?;
        tx.commit()?;
        Ok(())
    }

    /// Returns whether a follow existed.
    pub fn unfollow(&self, follower: UserId, following: UserId) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM follows WHERE follower_id = ?1 AND following_id = ?2",
            params![follower.to_string(), following.to_string()],
        )?;
        Ok(affected > 0)
    }

    pub fn is_following(&self, follower: UserId, following: UserId) -> Result<bool> {
        let exists: bool = self.conn().query_row(
            "SELECT EXISTS(SELECT 1 FROM follows WHERE follower_id = ?1 AND following_id = ?2)",
            params![follower.to_string(), following.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    pub fn follower_count(&self, user: UserId) -> Result<u64> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM follows WHERE following_id = ?1",
            params![user.to_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    pub fn following_count(&self, user: UserId) -> Result<u64> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM follows WHERE follower_id = ?1",
            params![user.to_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NotificationKind;
    use crate::test_support::{db, user};

    #[test]
    fn follow_counts_and_notifies() {
        let db = db();
        let maria = user(&db, "maria@example.com");
        let joao = user(&db, "joao@example.com");

        db.follow(joao.id, maria.id).unwrap();

        assert!(db.is_following(joao.id, maria.id).unwrap());
        assert!(!db.is_following(maria.id, joao.id).unwrap());
        assert_eq!(db.follower_count(maria.id).unwrap(), 1);
        assert_eq!(db.following_count(joao.id).unwrap(), 1);

        let inbox = db.list_notifications(maria.id).unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].kind, NotificationKind::Follow);
        assert_eq!(inbox[0].actor_id, joao.id);
    }

    #[test]
    fn duplicate_follow_is_a_conflict_without_second_notification() {
        let db = db();
        let maria = user(&db, "maria@example.com");
        let joao = user(&db, "joao@example.com");

        db.follow(joao.id, maria.id).unwrap();
        assert!(matches!(
            db.follow(joao.id, maria.id),
            Err(StoreError::AlreadyExists)
        ));
        assert_eq!(db.list_notifications(maria.id).unwrap().len(), 1);
    }

    #[test]
    fn cannot_follow_self() {
        let db = db();
        let maria = user(&db, "maria@example.com");
        assert!(matches!(
            db.follow(maria.id, maria.id),
            Err(StoreError::Validation(ValidationError::SelfFollow))
        ));
    }

    #[test]
    fn unfollow_reports_whether_anything_changed() {
        let db = db();
        let maria = user(&db, "maria@example.com");
        let joao = user(&db, "joao@example.com");

        assert!(!db.unfollow(joao.id, maria.id).unwrap());
        db.follow(joao.id, maria.id).unwrap();
        assert!(db.unfollow(joao.id, maria.id).unwrap());
        assert_eq!(db.follower_count(maria.id).unwrap(), 0);
    }
}
