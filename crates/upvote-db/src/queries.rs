use crate::Database;
use crate::models::{FeatureFilter, FeatureListRow, FeaturePage, FeatureRow, UserRow, VoteAttempt};
use anyhow::Result;
use rusqlite::{Connection, ffi};
use tracing::{debug, warn};
use upvote_types::models::VoteToggle;

/// Shared WHERE clause for the listing and its count. `?1` is the status,
/// `?2` the search term; either may be NULL to disable that filter.
const FEATURE_FILTER: &str = "(?1 IS NULL OR f.status = ?1)
    AND (?2 IS NULL
         OR instr(fold_case(f.title), fold_case(?2)) > 0
         OR instr(fold_case(f.description), fold_case(?2)) > 0)";

impl Database {
    // -- Users --

    /// Returns `false` if the email is already registered.
    pub fn create_user(
        &self,
        id: &str,
        email: &str,
        name: &str,
        password_hash: &str,
        created_at: &str,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO users (id, email, name, password, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                (id, email, name, password_hash, created_at),
            );
            match inserted {
                Ok(_) => Ok(true),
                Err(e) if is_unique_violation(&e) => Ok(false),
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    // -- Features --

    /// Returns `false` if the creator does not exist.
    pub fn insert_feature(&self, feature: &FeatureRow) -> Result<bool> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO features (id, title, description, status, creator_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    feature.id,
                    feature.title,
                    feature.description,
                    feature.status,
                    feature.creator_id,
                    feature.created_at,
                ],
            );
            match inserted {
                Ok(_) => {
                    debug!("Inserted feature {}", feature.id);
                    Ok(true)
                }
                Err(e) if is_foreign_key_violation(&e) => Ok(false),
                Err(e) => Err(e.into()),
            }
        })
    }

    /// Ranked, filtered, paginated listing. Rows are ordered by vote count
    /// (descending), then creation time (oldest first), then id.
    ///
    /// `viewer` scopes the per-row `voted` flag; without one it is `None`.
    pub fn list_features(
        &self,
        filter: &FeatureFilter,
        viewer: Option<&str>,
        limit: u32,
        offset: u64,
    ) -> Result<FeaturePage> {
        let status = filter.status.map(|s| s.as_str());
        let search = filter.search.as_deref();

        self.with_conn(|conn| {
            let total: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM features f WHERE {FEATURE_FILTER}"),
                rusqlite::params![status, search],
                |row| row.get(0),
            )?;

            let mut stmt = conn.prepare(&format!(
                "SELECT f.id, f.title, f.description, f.status, f.creator_id,
                        COALESCE(u.name, ''), f.created_at,
                        (SELECT COUNT(*) FROM votes v WHERE v.feature_id = f.id) AS vote_count,
                        CASE WHEN ?3 IS NULL THEN NULL
                             ELSE EXISTS(SELECT 1 FROM votes mv WHERE mv.feature_id = f.id AND mv.user_id = ?3)
                        END
                 FROM features f
                 LEFT JOIN users u ON u.id = f.creator_id
                 WHERE {FEATURE_FILTER}
                 ORDER BY vote_count DESC, f.created_at ASC, f.id ASC
                 LIMIT ?4 OFFSET ?5"
            ))?;

            let offset = i64::try_from(offset).unwrap_or(i64::MAX);
            let rows = stmt
                .query_map(
                    rusqlite::params![status, search, viewer, limit, offset],
                    |row| {
                        Ok(FeatureListRow {
                            id: row.get(0)?,
                            title: row.get(1)?,
                            description: row.get(2)?,
                            status: row.get(3)?,
                            creator_id: row.get(4)?,
                            creator_name: row.get(5)?,
                            created_at: row.get(6)?,
                            vote_count: row.get(7)?,
                            voted: row.get(8)?,
                        })
                    },
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(FeaturePage {
                rows,
                total: total.max(0) as u64,
            })
        })
    }

    // -- Votes --

    /// Toggle a vote: removes it if present, inserts it if not.
    pub fn toggle_vote(&self, user_id: &str, feature_id: &str) -> Result<VoteAttempt> {
        self.with_conn(|conn| {
            if !row_exists(conn, "features", feature_id)? {
                return Ok(VoteAttempt::FeatureMissing);
            }
            if !row_exists(conn, "users", user_id)? {
                return Ok(VoteAttempt::VoterMissing);
            }

            let existing = conn
                .query_row(
                    "SELECT 1 FROM votes WHERE user_id = ?1 AND feature_id = ?2",
                    [user_id, feature_id],
                    |_| Ok(()),
                )
                .optional()?;

            let outcome = if existing.is_some() {
                delete_vote(conn, user_id, feature_id)?
            } else {
                insert_vote(conn, user_id, feature_id)?
            };

            debug!("Vote {:?} by {} on {}", outcome, user_id, feature_id);
            Ok(VoteAttempt::Toggled(outcome))
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT id, email, name, password, created_at FROM users WHERE {column} = ?1"
    ))?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                email: row.get(1)?,
                name: row.get(2)?,
                password: row.get(3)?,
                created_at: row.get(4)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn row_exists(conn: &Connection, table: &str, id: &str) -> Result<bool> {
    let found = conn
        .query_row(&format!("SELECT 1 FROM {table} WHERE id = ?1"), [id], |_| Ok(()))
        .optional()?;
    Ok(found.is_some())
}

/// A concurrent toggle may have inserted the same pair first; the primary key
/// rejects the duplicate and the vote is already in the state we wanted.
fn insert_vote(conn: &Connection, user_id: &str, feature_id: &str) -> Result<VoteToggle> {
    match conn.execute(
        "INSERT INTO votes (user_id, feature_id) VALUES (?1, ?2)",
        [user_id, feature_id],
    ) {
        Ok(_) => Ok(VoteToggle::Added),
        Err(e) if is_unique_violation(&e) => {
            warn!("Vote by {} on {} already present", user_id, feature_id);
            Ok(VoteToggle::Added)
        }
        Err(e) => Err(e.into()),
    }
}

/// Zero affected rows means a concurrent toggle already removed the vote.
fn delete_vote(conn: &Connection, user_id: &str, feature_id: &str) -> Result<VoteToggle> {
    let removed = conn.execute(
        "DELETE FROM votes WHERE user_id = ?1 AND feature_id = ?2",
        [user_id, feature_id],
    )?;
    if removed == 0 {
        warn!("Vote by {} on {} already absent", user_id, feature_id);
    }
    Ok(VoteToggle::Removed)
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                || e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

fn is_foreign_key_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.extended_code == ffi::SQLITE_CONSTRAINT_FOREIGNKEY
    )
}

/// Extension trait for optional query results
trait OptionalExt<T> {
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
