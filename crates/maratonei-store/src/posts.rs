use maratonei_shared::constants::DEFAULT_FEED_PAGE_SIZE;
use maratonei_shared::ValidationError;
use rusqlite::{params, Connection};

use crate::codec::{now, parse_col, parse_ts, series_ref, ts};
use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{
    Comment, CommentId, FeedItem, FeedScope, NewNotification, NewPost, Post, PostId, SeriesId,
    UserId, UserSummary,
};
use crate::notifications::insert_notification;

/// Post columns plus like and comment counts. Indexes 0..=8.
const POST_SELECT: &str = "SELECT p.id, p.user_id, p.content, p.image_url, p.tmdb_id,
        p.series_title, p.created_at,
        (SELECT COUNT(*) FROM post_likes l WHERE l.post_id = p.id),
        (SELECT COUNT(*) FROM post_comments c WHERE c.post_id = p.id)
     FROM posts p";

impl Database {
    /// Validate and persist a post. Side effects (mentions, badges) are the
    /// caller's business.
    pub fn create_post(&self, new: &NewPost) -> Result<Post> {
        new.validate()?;

        let post = Post {
            id: PostId::new(),
            author_id: new.author_id,
            content: new.content.clone(),
            image_url: new.image_url.clone(),
            series: new.series.clone(),
            created_at: now(),
            like_count: 0,
            comment_count: 0,
        };

        self.conn()
            .execute(
                "INSERT INTO posts (id, user_id, content, image_url, tmdb_id, series_title, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    post.id.to_string(),
                    post.author_id.to_string(),
                    post.content,
                    post.image_url,
                    post.series.as_ref().map(|s| s.id.0),
                    post.series.as_ref().map(|s| s.title.as_str()),
                    ts(&post.created_at),
                ],
            )
            .map_err(StoreError::from_insert)?;

        tracing::debug!(post = %post.id, author = %post.author_id, "post stored");
        Ok(post)
    }

    pub fn get_post(&self, id: PostId) -> Result<Post> {
        self.conn()
            .query_row(
                &format!("{POST_SELECT} WHERE p.id = ?1"),
                params![id.to_string()],
                row_to_post,
            )
            .map_err(StoreError::from_query)
    }

    /// Posts by `author`, newest first, with like and comment counts.
    pub fn list_posts_by_author(&self, author: UserId) -> Result<Vec<Post>> {
        let mut stmt = self.conn().prepare(&format!(
            "{POST_SELECT} WHERE p.user_id = ?1 ORDER BY p.created_at DESC, p.rowid DESC"
        ))?;
        let rows = stmt.query_map(params![author.to_string()], row_to_post)?;

        let mut posts = Vec::new();
        for row in rows {
            posts.push(row?);
        }
        Ok(posts)
    }

    /// One page of the feed, newest first. Pages start at 1; a zero page or
    /// limit falls back to the first page / default size. The `Following`
    /// scope needs a viewer and is empty when they follow nobody.
    pub fn feed(
        &self,
        scope: FeedScope,
        viewer: Option<UserId>,
        page: u32,
        limit: u32,
    ) -> Result<Vec<FeedItem>> {
        let limit = if limit == 0 { DEFAULT_FEED_PAGE_SIZE } else { limit };
        let offset = u64::from(page.max(1) - 1) * u64::from(limit);
        let viewer_id = viewer.map(|v| v.to_string());

        let filter = match (scope, &viewer_id) {
            (FeedScope::Global, _) => "",
            (FeedScope::Following, Some(_)) => {
                "WHERE p.user_id IN (SELECT following_id FROM follows WHERE follower_id = ?1)"
            }
            (FeedScope::Following, None) => return Ok(Vec::new()),
        };

        let mut stmt = self.conn().prepare(&format!(
            "SELECT p.id, p.user_id, p.content, p.image_url, p.tmdb_id,
                    p.series_title, p.created_at,
                    (SELECT COUNT(*) FROM post_likes l WHERE l.post_id = p.id),
                    (SELECT COUNT(*) FROM post_comments c WHERE c.post_id = p.id),
                    a.name, a.handle, a.avatar,
                    EXISTS(SELECT 1 FROM post_likes v WHERE v.post_id = p.id AND v.user_id = ?1)
             FROM posts p
             JOIN profiles a ON a.id = p.user_id
             {filter}
             ORDER BY p.created_at DESC, p.rowid DESC
             LIMIT ?2 OFFSET ?3"
        ))?;

        let rows = stmt.query_map(
            params![viewer_id, i64::from(limit), offset as i64],
            |row| {
                let post = row_to_post(row)?;
                let author = UserSummary {
                    id: post.author_id,
                    name: row.get(9)?,
                    handle: row.get(10)?,
                    avatar: row.get(11)?,
                };
                Ok(FeedItem {
                    post,
                    author,
                    liked_by_viewer: row.get(12)?,
                })
            },
        )?;

        let mut items = Vec::new();
        for row in rows {
            items.push(row?);
        }
        Ok(items)
    }

    /// Only the author may delete a post.
    pub fn delete_post(&self, id: PostId, requester: UserId) -> Result<()> {
        let author = post_author(self.conn(), id)?;
        if author != requester {
            return Err(StoreError::Forbidden("only the author can delete a post"));
        }
        self.conn()
            .execute("DELETE FROM posts WHERE id = ?1", params![id.to_string()])?;
        tracing::info!(post = %id, "post deleted");
        Ok(())
    }

    /// Posts by `user` tagged with `series`. Drives post-count badges.
    pub fn count_posts_for_series(&self, user: UserId, series: SeriesId) -> Result<u64> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM posts WHERE user_id = ?1 AND tmdb_id = ?2",
            params![user.to_string(), series.0],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Like a post, notifying its author unless they liked their own post.
    pub fn like_post(&self, post: PostId, user: UserId) -> Result<()> {
        let tx = self.conn().unchecked_transaction()?;
        let author = post_author(&tx, post)?;
        tx.execute(
            "INSERT INTO post_likes (post_id, user_id, created_at) VALUES (?1, ?2, ?3)",
            params![post.to_string(), user.to_string(), ts(&now())],
        )
        .map_err(StoreError::from_insert)?;
        if author != user {
            insert_notification(&tx, &NewNotification::like(author, user))?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Returns whether a like existed.
    pub fn unlike_post(&self, post: PostId, user: UserId) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM post_likes WHERE post_id = ?1 AND user_id = ?2",
            params![post.to_string(), user.to_string()],
        )?;
        Ok(affected > 0)
    }

    pub fn has_liked(&self, post: PostId, user: UserId) -> Result<bool> {
        let liked: bool = self.conn().query_row(
            "SELECT EXISTS(SELECT 1 FROM post_likes WHERE post_id = ?1 AND user_id = ?2)",
            params![post.to_string(), user.to_string()],
            |row| row.get(0),
        )?;
        Ok(liked)
    }

    /// Comment on a post, notifying its author unless they commented on their
    /// own post.
    pub fn add_comment(&self, post: PostId, author: UserId, content: &str) -> Result<Comment> {
        if content.trim().is_empty() {
            return Err(ValidationError::EmptyContent.into());
        }

        let comment = Comment {
            id: CommentId::new(),
            post_id: post,
            author_id: author,
            content: content.to_string(),
            created_at: now(),
        };

        let tx = self.conn().unchecked_transaction()?;
        let owner = post_author(&tx, post)?;
        tx.execute(
            "INSERT INTO post_comments (id, post_id, user_id, content, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                comment.id.to_string(),
                post.to_string(),
                author.to_string(),
                comment.content,
                ts(&comment.created_at),
            ],
        )
        .map_err(StoreError::from_insert)?;
        if owner != author {
            insert_notification(&tx, &NewNotification::comment(owner, author))?;
        }
        tx.commit()?;
        Ok(comment)
    }

    /// Comments on `post`, oldest first.
    pub fn list_comments(&self, post: PostId) -> Result<Vec<Comment>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, post_id, user_id, content, created_at
             FROM post_comments
             WHERE post_id = ?1
             ORDER BY created_at ASC, rowid ASC",
        )?;
        let rows = stmt.query_map(params![post.to_string()], row_to_comment)?;

        let mut comments = Vec::new();
        for row in rows {
            comments.push(row?);
        }
        Ok(comments)
    }
}

fn post_author(conn: &Connection, post: PostId) -> Result<UserId> {
    let raw: String = conn
        .query_row(
            "SELECT user_id FROM posts WHERE id = ?1",
            params![post.to_string()],
            |row| row.get(0),
        )
        .map_err(StoreError::from_query)?;
    Ok(raw.parse()?)
}

fn row_to_post(row: &rusqlite::Row<'_>) -> rusqlite::Result<Post> {
    let id: String = row.get(0)?;
    let author: String = row.get(1)?;
    let created_at: String = row.get(6)?;
    let likes: i64 = row.get(7)?;
    let comments: i64 = row.get(8)?;

    Ok(Post {
        id: parse_col(0, &id)?,
        author_id: parse_col(1, &author)?,
        content: row.get(2)?,
        image_url: row.get(3)?,
        series: series_ref(row.get(4)?, row.get(5)?),
        created_at: parse_ts(6, &created_at)?,
        like_count: likes as u32,
        comment_count: comments as u32,
    })
}

fn row_to_comment(row: &rusqlite::Row<'_>) -> rusqlite::Result<Comment> {
    let id: String = row.get(0)?;
    let post: String = row.get(1)?;
    let author: String = row.get(2)?;
    let created_at: String = row.get(4)?;

    Ok(Comment {
        id: parse_col(0, &id)?,
        post_id: parse_col(1, &post)?,
        author_id: parse_col(2, &author)?,
        content: row.get(3)?,
        created_at: parse_ts(4, &created_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NotificationKind, SeriesRef};
    use crate::test_support::{db, user};

    fn breaking_bad() -> SeriesRef {
        SeriesRef {
            id: SeriesId(1396),
            title: "Breaking Bad".into(),
        }
    }

    fn post(db: &Database, author: UserId, content: &str, series: Option<SeriesRef>) -> Post {
        db.create_post(&NewPost {
            author_id: author,
            content: content.into(),
            image_url: None,
            series,
        })
        .unwrap()
    }

    #[test]
    fn create_and_fetch() {
        let db = db();
        let maria = user(&db, "maria@example.com");
        let created = post(&db, maria.id, "Que final!", Some(breaking_bad()));

        let fetched = db.get_post(created.id).unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.series, Some(breaking_bad()));
    }

    #[test]
    fn blank_content_is_rejected_before_insert() {
        let db = db();
        let maria = user(&db, "maria@example.com");
        let err = db
            .create_post(&NewPost {
                author_id: maria.id,
                content: "  \n ".into(),
                image_url: None,
                series: None,
            })
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validation(ValidationError::EmptyContent)
        ));
        assert!(db.list_posts_by_author(maria.id).unwrap().is_empty());
    }

    #[test]
    fn unknown_author_is_not_found() {
        let db = db();
        let err = db
            .create_post(&NewPost {
                author_id: UserId::new(),
                content: "oi".into(),
                image_url: None,
                series: None,
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[test]
    fn series_count_only_counts_that_series() {
        let db = db();
        let maria = user(&db, "maria@example.com");
        let joao = user(&db, "joao@example.com");

        post(&db, maria.id, "one", Some(breaking_bad()));
        post(&db, maria.id, "two", Some(breaking_bad()));
        post(&db, maria.id, "untagged", None);
        post(
            &db,
            maria.id,
            "other",
            Some(SeriesRef {
                id: SeriesId(70523),
                title: "Dark".into(),
            }),
        );
        post(&db, joao.id, "his", Some(breaking_bad()));

        assert_eq!(db.count_posts_for_series(maria.id, SeriesId(1396)).unwrap(), 2);
        assert_eq!(db.count_posts_for_series(joao.id, SeriesId(1396)).unwrap(), 1);
        assert_eq!(db.count_posts_for_series(joao.id, SeriesId(70523)).unwrap(), 0);
    }

    #[test]
    fn author_listing_is_newest_first_with_counts() {
        let db = db();
        let maria = user(&db, "maria@example.com");
        let joao = user(&db, "joao@example.com");

        let first = post(&db, maria.id, "first", None);
        let second = post(&db, maria.id, "second", None);
        db.like_post(first.id, joao.id).unwrap();
        db.add_comment(first.id, joao.id, "boa").unwrap();

        let posts = db.list_posts_by_author(maria.id).unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].id, second.id);
        assert_eq!(posts[1].id, first.id);
        assert_eq!(posts[1].like_count, 1);
        assert_eq!(posts[1].comment_count, 1);
    }

    #[test]
    fn feed_pages_and_scopes() {
        let db = db();
        let maria = user(&db, "maria@example.com");
        let joao = user(&db, "joao@example.com");
        let ana = user(&db, "ana@example.com");

        for i in 0..6 {
            post(&db, maria.id, &format!("maria {i}"), None);
        }
        let by_ana = post(&db, ana.id, "ana", None);

        let page1 = db.feed(FeedScope::Global, Some(joao.id), 1, 0).unwrap();
        assert_eq!(page1.len(), DEFAULT_FEED_PAGE_SIZE as usize);
        assert_eq!(page1[0].post.id, by_ana.id);
        assert_eq!(page1[0].author.handle.as_deref(), Some("@ana"));
        let page2 = db.feed(FeedScope::Global, Some(joao.id), 2, 0).unwrap();
        assert_eq!(page2.len(), 2);
        assert_eq!(db.feed(FeedScope::Global, None, 0, 3).unwrap().len(), 3);

        assert!(db
            .feed(FeedScope::Following, Some(joao.id), 1, 10)
            .unwrap()
            .is_empty());
        assert!(db.feed(FeedScope::Following, None, 1, 10).unwrap().is_empty());

        db.follow(joao.id, ana.id).unwrap();
        let following = db.feed(FeedScope::Following, Some(joao.id), 1, 10).unwrap();
        assert_eq!(following.len(), 1);
        assert_eq!(following[0].post.id, by_ana.id);
        assert!(!following[0].liked_by_viewer);

        db.like_post(by_ana.id, joao.id).unwrap();
        let following = db.feed(FeedScope::Following, Some(joao.id), 1, 10).unwrap();
        assert!(following[0].liked_by_viewer);
        assert_eq!(following[0].post.like_count, 1);
    }

    #[test]
    fn only_author_deletes() {
        let db = db();
        let maria = user(&db, "maria@example.com");
        let joao = user(&db, "joao@example.com");
        let p = post(&db, maria.id, "mine", None);

        assert!(matches!(
            db.delete_post(p.id, joao.id),
            Err(StoreError::Forbidden(_))
        ));
        assert!(matches!(
            db.delete_post(PostId::new(), maria.id),
            Err(StoreError::NotFound)
        ));
        db.delete_post(p.id, maria.id).unwrap();
        assert!(matches!(db.get_post(p.id), Err(StoreError::NotFound)));
    }

    #[test]
    fn likes_notify_author_once_and_skip_self() {
        let db = db();
        let maria = user(&db, "maria@example.com");
        let joao = user(&db, "joao@example.com");
        let p = post(&db, maria.id, "curtam", None);

        db.like_post(p.id, maria.id).unwrap();
        assert!(db.list_notifications(maria.id).unwrap().is_empty());

        db.like_post(p.id, joao.id).unwrap();
        assert!(matches!(
            db.like_post(p.id, joao.id),
            Err(StoreError::AlreadyExists)
        ));
        assert!(db.has_liked(p.id, joao.id).unwrap());

        let inbox = db.list_notifications(maria.id).unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].kind, NotificationKind::Like);

        assert!(db.unlike_post(p.id, joao.id).unwrap());
        assert!(!db.unlike_post(p.id, joao.id).unwrap());
        assert!(!db.has_liked(p.id, joao.id).unwrap());
    }

    #[test]
    fn comments_are_ordered_and_notify_author() {
        let db = db();
        let maria = user(&db, "maria@example.com");
        let joao = user(&db, "joao@example.com");
        let p = post(&db, maria.id, "opiniões?", None);

        let c1 = db.add_comment(p.id, joao.id, "primeiro").unwrap();
        let c2 = db.add_comment(p.id, maria.id, "obrigada").unwrap();

        let listed = db.list_comments(p.id).unwrap();
        assert_eq!(
            listed.iter().map(|c| c.id).collect::<Vec<_>>(),
            vec![c1.id, c2.id]
        );

        let inbox = db.list_notifications(maria.id).unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].kind, NotificationKind::Comment);

        assert!(matches!(
            db.add_comment(p.id, joao.id, " "),
            Err(StoreError::Validation(ValidationError::EmptyContent))
        ));
        assert!(matches!(
            db.add_comment(PostId::new(), joao.id, "oi"),
            Err(StoreError::NotFound)
        ));
    }
}
