use crate::models::{CommentRow, SessionRow, UserRow};
use crate::{Database, format_timestamp};
use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row};
use storefront_types::models::Role;

const USER_COLUMNS: &str = "id, email, name, password, role, created_at, updated_at";
const COMMENT_COLUMNS: &str = "id, product_id, user_id, content, created_at, updated_at";

impl Database {
    // -- Users --

    /// Returns the new user's id.
    pub fn create_user(&self, email: &str, name: &str, password_hash: &str) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (email, name, password) VALUES (?1, ?2, ?3)",
                (email, name, password_hash),
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email = ?1", email))
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id = ?1", id))
    }

    /// Returns false when no user has that email.
    pub fn set_user_role(&self, email: &str, role: Role) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE users SET role = ?1, updated_at = datetime('now') WHERE email = ?2",
                (role.as_str(), email),
            )?;
            Ok(changed > 0)
        })
    }

    // -- Sessions --

    pub fn create_session(&self, id: &str, user_id: i64, expires_at: DateTime<Utc>) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO sessions (id, user_id, expires_at) VALUES (?1, ?2, ?3)",
                (id, user_id, format_timestamp(expires_at)),
            )?;
            Ok(())
        })
    }

    /// Session and owning user in one lookup. Expired sessions are returned
    /// as well; deciding validity is up to the caller.
    pub fn get_session_with_user(&self, session_id: &str) -> Result<Option<(SessionRow, UserRow)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT s.id, s.user_id, s.expires_at, s.created_at,
                        u.id, u.email, u.name, u.password, u.role, u.created_at, u.updated_at
                 FROM sessions s
                 INNER JOIN users u ON u.id = s.user_id
                 WHERE s.id = ?1",
            )?;

            let row = stmt
                .query_row([session_id], |row| {
                    let session = SessionRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        expires_at: row.get(2)?,
                        created_at: row.get(3)?,
                    };
                    let user = UserRow {
                        id: row.get(4)?,
                        email: row.get(5)?,
                        name: row.get(6)?,
                        password: row.get(7)?,
                        role: row.get(8)?,
                        created_at: row.get(9)?,
                        updated_at: row.get(10)?,
                    };
                    Ok((session, user))
                })
                .optional()?;

            Ok(row)
        })
    }

    /// Returns false when there was nothing to delete.
    pub fn delete_session(&self, session_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let deleted = conn.execute("DELETE FROM sessions WHERE id = ?1", [session_id])?;
            Ok(deleted > 0)
        })
    }

    // -- Comments --

    /// Newest first. Ties on the second-resolution timestamp fall back to id.
    pub fn list_comments(&self, product_id: i64) -> Result<Vec<CommentRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {COMMENT_COLUMNS} FROM comments
                 WHERE product_id = ?1
                 ORDER BY created_at DESC, id DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([product_id], comment_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_comment(&self, id: i64) -> Result<Option<CommentRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = ?1");
            let row = conn.query_row(&sql, [id], comment_from_row).optional()?;
            Ok(row)
        })
    }

    pub fn insert_comment(&self, product_id: i64, user_id: i64, content: &str) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO comments (product_id, user_id, content) VALUES (?1, ?2, ?3)",
                (product_id, user_id, content),
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Updates only a comment owned by `user_id`. Returns false when no row
    /// matched, without saying whether it was missing or someone else's.
    pub fn update_comment_owned(&self, id: i64, user_id: i64, content: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE comments SET content = ?1, updated_at = datetime('now')
                 WHERE id = ?2 AND user_id = ?3",
                (content, id, user_id),
            )?;
            Ok(changed > 0)
        })
    }

    /// Same ownership rule as [`Database::update_comment_owned`].
    pub fn delete_comment_owned(&self, id: i64, user_id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let deleted = conn.execute(
                "DELETE FROM comments WHERE id = ?1 AND user_id = ?2",
                (id, user_id),
            )?;
            Ok(deleted > 0)
        })
    }

    pub fn count_comments(&self, product_id: i64) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM comments WHERE product_id = ?1",
                [product_id],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
    }

    // -- Ratings --

    /// `(average, count)` over a product's ratings; `(0.0, 0)` when there are none.
    pub fn rating_aggregate(&self, product_id: i64) -> Result<(f64, u64)> {
        self.with_conn(|conn| {
            let (avg, count): (Option<f64>, i64) = conn.query_row(
                "SELECT AVG(rating), COUNT(*) FROM ratings WHERE product_id = ?1",
                [product_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            Ok((avg.unwrap_or(0.0), count as u64))
        })
    }

    /// Fails with a UNIQUE violation if the user already rated the product.
    pub fn insert_rating(&self, product_id: i64, user_id: i64, rating: u8) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO ratings (product_id, user_id, rating) VALUES (?1, ?2, ?3)",
                (product_id, user_id, rating),
            )?;
            Ok(())
        })
    }

    pub fn get_user_rating(&self, product_id: i64, user_id: i64) -> Result<Option<u8>> {
        self.with_conn(|conn| {
            let rating = conn
                .query_row(
                    "SELECT rating FROM ratings WHERE product_id = ?1 AND user_id = ?2",
                    (product_id, user_id),
                    |row| row.get(0),
                )
                .optional()?;
            Ok(rating)
        })
    }
}

fn query_user<P: rusqlite::ToSql>(conn: &Connection, predicate: &str, value: P) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {predicate}");
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                email: row.get(1)?,
                name: row.get(2)?,
                password: row.get(3)?,
                role: row.get(4)?,
                created_at: row.get(5)?,
                updated_at: row.get(6)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<CommentRow> {
    Ok(CommentRow {
        id: row.get(0)?,
        product_id: row.get(1)?,
        user_id: row.get(2)?,
        content: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
