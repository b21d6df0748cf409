use maratonei_shared::constants::{DEFAULT_BIO, STARTING_COINS, USER_SEARCH_LIMIT};
use maratonei_shared::ValidationError;
use rand::Rng;
use rusqlite::{params, OptionalExtension};

use crate::codec::{like_pattern, now, parse_col, parse_ts, ts};
use crate::database::Database;
use crate::error::{is_unique_violation, Result, StoreError};
use crate::models::{Profile, Role, UserId, UserSummary};

/// Inserts attempted before a colliding handle gives up.
const HANDLE_ATTEMPTS: usize = 5;

const PROFILE_COLUMNS: &str = "id, email, name, handle, avatar, bio, coins, role, created_at";

impl Database {
    /// Create the profile of a freshly signed-in user.
    ///
    /// The display name is the capitalized local part of `email` and the
    /// handle is `@local`. A taken handle is retried with a random numeric
    /// suffix. Calling this again for an existing id returns the stored
    /// profile unchanged.
    pub fn create_profile(&self, id: UserId, email: &str) -> Result<Profile> {
        match self.get_profile(id) {
            Ok(existing) => return Ok(existing),
            Err(StoreError::NotFound) => {}
            Err(e) => return Err(e),
        }

        let local = email_local_part(email)?;
        let name = capitalize(local);
        let base = handle_base(local);
        let mut handle = format!("@{base}");

        for _ in 0..HANDLE_ATTEMPTS {
            let inserted = self.conn().execute(
                "INSERT INTO profiles (id, email, name, handle, bio, coins, role, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    id.to_string(),
                    email,
                    name,
                    handle,
                    DEFAULT_BIO,
                    STARTING_COINS,
                    Role::User.as_str(),
                    ts(&now()),
                ],
            );

            match inserted {
                Ok(_) => {
                    tracing::info!(user = %id, %handle, "profile created");
                    return self.get_profile(id);
                }
                Err(e) if is_unique_violation(&e) => {
                    let suffix: u16 = rand::thread_rng().gen_range(1000..10000);
                    tracing::debug!(%handle, "handle taken, retrying with suffix");
                    handle = format!("@{base}_{suffix}");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(StoreError::AlreadyExists)
    }

    pub fn get_profile(&self, id: UserId) -> Result<Profile> {
        self.conn()
            .query_row(
                &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = ?1"),
                params![id.to_string()],
                row_to_profile,
            )
            .map_err(StoreError::from_query)
    }

    pub fn set_role(&self, id: UserId, role: Role) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE profiles SET role = ?2 WHERE id = ?1",
            params![id.to_string(), role.as_str()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    /// Case-insensitive substring search over names and handles. Case is
    /// folded with Unicode rules, so accented names match too.
    pub fn search_users(&self, query: &str) -> Result<Vec<UserSummary>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let mut stmt = self.conn().prepare(
            "SELECT id, name, handle, avatar FROM profiles
             WHERE fold_case(name) LIKE ?1 ESCAPE '\\'
                OR fold_case(handle) LIKE ?1 ESCAPE '\\'
             ORDER BY fold_case(name), name
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(
            params![like_pattern(&query.to_lowercase()), USER_SEARCH_LIMIT as i64],
            row_to_summary,
        )?;

        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        Ok(users)
    }

    /// Resolve a mention target: exact handle (with or without the leading
    /// `@`) first, then exact display name.
    pub fn find_by_handle(&self, handle: &str) -> Result<Option<UserSummary>> {
        let bare = handle.trim_start_matches('@');
        if bare.is_empty() {
            return Ok(None);
        }

        let found = self
            .conn()
            .query_row(
                "SELECT id, name, handle, avatar FROM profiles
                 WHERE handle = ?1 OR handle = ?2 OR name = ?2
                 ORDER BY CASE WHEN handle = ?1 THEN 0 WHEN handle = ?2 THEN 1 ELSE 2 END
                 LIMIT 1",
                params![format!("@{bare}"), bare],
                row_to_summary,
            )
            .optional()?;
        Ok(found)
    }
}

fn email_local_part(email: &str) -> std::result::Result<&str, ValidationError> {
    match email.trim().split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(local),
        _ => Err(ValidationError::InvalidEmail(email.to_string())),
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn handle_base(local: &str) -> String {
    let base: String = local
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '_' | '.'))
        .flat_map(char::to_lowercase)
        .collect();
    if base.is_empty() {
        "user".to_string()
    } else {
        base
    }
}

fn row_to_profile(row: &rusqlite::Row<'_>) -> rusqlite::Result<Profile> {
    let id: String = row.get(0)?;
    let role: String = row.get(7)?;
    let created_at: String = row.get(8)?;

    Ok(Profile {
        id: parse_col(0, &id)?,
        email: row.get(1)?,
        name: row.get(2)?,
        handle: row.get(3)?,
        avatar: row.get(4)?,
        bio: row.get(5)?,
        coins: row.get(6)?,
        role: parse_col(7, &role)?,
        created_at: parse_ts(8, &created_at)?,
    })
}

pub(crate) fn row_to_summary(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserSummary> {
    let id: String = row.get(0)?;
    Ok(UserSummary {
        id: parse_col(0, &id)?,
        name: row.get(1)?,
        handle: row.get(2)?,
        avatar: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{db, user};

    #[test]
    fn creates_profile_from_email() {
        let db = db();
        let profile = user(&db, "maria@example.com");

        assert_eq!(profile.name, "Maria");
        assert_eq!(profile.handle, "@maria");
        assert_eq!(profile.coins, STARTING_COINS);
        assert_eq!(profile.bio.as_deref(), Some(DEFAULT_BIO));
        assert_eq!(profile.role, Role::User);
    }

    #[test]
    fn create_is_idempotent_per_id() {
        let db = db();
        let first = user(&db, "joao@example.com");
        let again = db.create_profile(first.id, "other@example.com").unwrap();
        assert_eq!(first, again);
    }

    #[test]
    fn handle_collision_gets_suffix() {
        let db = db();
        let first = user(&db, "ana@one.com");
        let second = user(&db, "ana@two.com");

        assert_eq!(first.handle, "@ana");
        assert!(second.handle.starts_with("@ana_"), "{}", second.handle);
        assert_eq!(second.name, "Ana");
    }

    #[test]
    fn rejects_malformed_email() {
        let db = db();
        let err = db.create_profile(UserId::new(), "no-at-sign").unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validation(ValidationError::InvalidEmail(_))
        ));
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let db = db();
        user(&db, "mariana@example.com");
        user(&db, "marcos@example.com");
        user(&db, "pedro@example.com");

        let found = db.search_users("MAR").unwrap();
        let names: Vec<_> = found.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["Marcos", "Mariana"]);

        assert!(db.search_users("   ").unwrap().is_empty());
        assert!(db.search_users("%").unwrap().is_empty());
    }

    #[test]
    fn search_folds_accented_case() {
        let db = db();
        user(&db, "ação@example.com");
        user(&db, "joão@example.com");

        let found = db.search_users("AÇÃO").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Ação");

        let found = db.search_users("JOÃ").unwrap();
        assert_eq!(found[0].handle.as_deref(), Some("@joão"));
    }

    #[test]
    fn find_by_handle_accepts_bare_or_prefixed() {
        let db = db();
        let maria = user(&db, "maria@example.com");

        let bare = db.find_by_handle("maria").unwrap().unwrap();
        let prefixed = db.find_by_handle("@maria").unwrap().unwrap();
        let by_name = db.find_by_handle("Maria").unwrap().unwrap();
        assert_eq!(bare.id, maria.id);
        assert_eq!(prefixed.id, maria.id);
        assert_eq!(by_name.id, maria.id);

        assert!(db.find_by_handle("nobody").unwrap().is_none());
        assert!(db.find_by_handle("@").unwrap().is_none());
    }

    #[test]
    fn role_can_be_promoted() {
        let db = db();
        let maria = user(&db, "maria@example.com");
        db.set_role(maria.id, Role::Admin).unwrap();
        assert!(db.get_profile(maria.id).unwrap().is_admin());

        assert!(matches!(
            db.set_role(UserId::new(), Role::Admin),
            Err(StoreError::NotFound)
        ));
    }
}
