//! The activity ledger.
//!
//! Every piece of content and every action passes through here: each user,
//! post, comment, like, and role is paired with exactly one ledger entry, and
//! the entry carries the attribution of whoever performed the creating
//! action. Entries are what opinions attach to, which is what lets posts and
//! comments share one like/dislike mechanism.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::{Deserialize, Serialize};

use crate::content::User;
use crate::{CommentId, EntryId, Error, LikeId, PostId, Result, RoleId, Store, UserId};

/// The object a ledger entry was created for.
///
/// Exactly one origin per entry. The five nullable reference columns exist
/// only in the persisted shape; a row that decodes to zero or several set
/// references is an integrity violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum EntryOrigin {
    User(UserId),
    Role(RoleId),
    Post(PostId),
    Comment(CommentId),
    Like(LikeId),
}

/// A row in the activity ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    pub id: EntryId,
    pub origin: EntryOrigin,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Store {
    /// Insert a ledger entry for the given origin, with no attribution.
    ///
    /// The origin row itself must already exist; its lifecycle and the
    /// entry's are bound together by the schema's cascades.
    pub fn create_entry_for(&mut self, origin: EntryOrigin) -> Result<Entry> {
        let tx = self.conn.transaction()?;
        let entry = create_entry(&tx, origin)?;
        tx.commit()?;
        Ok(entry)
    }

    /// Insert a ledger entry for the given origin and, when an actor is
    /// present, record the attribution in the same transaction.
    pub fn create_entry_for_user(
        &mut self,
        actor: Option<UserId>,
        origin: EntryOrigin,
    ) -> Result<Entry> {
        let tx = self.conn.transaction()?;
        let entry = create_entry_for_user(&tx, actor, origin)?;
        tx.commit()?;
        Ok(entry)
    }

    /// Look up a ledger entry by id.
    pub fn entry(&self, id: EntryId) -> Result<Entry> {
        self.conn
            .query_row(
                &format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE id = ?1"),
                params![id.0],
                entry_from_row,
            )
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("entry {id}")))
    }

    /// Look up the ledger entry bound to the given origin row.
    pub fn entry_for(&self, origin: EntryOrigin) -> Result<Entry> {
        let (column, id) = match origin {
            EntryOrigin::User(id) => ("user_id", id.0),
            EntryOrigin::Role(id) => ("role_id", id.0),
            EntryOrigin::Post(id) => ("post_id", id.0),
            EntryOrigin::Comment(id) => ("post_comment_id", id.0),
            EntryOrigin::Like(id) => ("like_id", id.0),
        };
        self.conn
            .query_row(
                &format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE {column} = ?1"),
                params![id],
                entry_from_row,
            )
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("entry for {origin:?}")))
    }

    /// The user recorded as having performed the action that produced this
    /// entry, if any.
    ///
    /// The attribution join is unique on the entry id, so this yields zero or
    /// one user. Finding more than one means the schema's invariant has been
    /// violated; that is reported loudly instead of guessing which
    /// attribution is correct.
    pub fn attributed_user(&self, entry: EntryId) -> Result<Option<User>> {
        let mut stmt = self.conn.prepare(
            "SELECT u.id, u.name, u.email, u.scrambler_algorithm, u.created_at, u.updated_at
             FROM users u
             JOIN user_actions ua ON ua.user_id = u.id
             WHERE ua.entry_id = ?1",
        )?;
        let users = stmt
            .query_map(params![entry.0], User::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        if users.len() > 1 {
            tracing::error!(%entry, count = users.len(), "entry has multiple attributed users");
            return Err(Error::Integrity(format!(
                "entry {entry} has {} attributed users",
                users.len()
            )));
        }
        Ok(users.into_iter().next())
    }
}

pub(crate) const ENTRY_COLUMNS: &str =
    "id, user_id, role_id, post_id, post_comment_id, like_id, created_at, updated_at";

/// Insert an entry row for `origin` on an existing connection or transaction.
pub(crate) fn create_entry(conn: &Connection, origin: EntryOrigin) -> Result<Entry> {
    let now = Utc::now();
    let mut refs: [Option<i64>; 5] = [None; 5];
    match origin {
        EntryOrigin::User(id) => refs[0] = Some(id.0),
        EntryOrigin::Role(id) => refs[1] = Some(id.0),
        EntryOrigin::Post(id) => refs[2] = Some(id.0),
        EntryOrigin::Comment(id) => refs[3] = Some(id.0),
        EntryOrigin::Like(id) => refs[4] = Some(id.0),
    }
    conn.execute(
        "INSERT INTO entries (user_id, role_id, post_id, post_comment_id, like_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![refs[0], refs[1], refs[2], refs[3], refs[4], now, now],
    )?;
    Ok(Entry {
        id: EntryId(conn.last_insert_rowid()),
        origin,
        created_at: now,
        updated_at: now,
    })
}

/// Insert an entry row and, when an actor is present, its attribution.
pub(crate) fn create_entry_for_user(
    conn: &Connection,
    actor: Option<UserId>,
    origin: EntryOrigin,
) -> Result<Entry> {
    let entry = create_entry(conn, origin)?;
    if let Some(user) = actor {
        conn.execute(
            "INSERT INTO user_actions (user_id, entry_id) VALUES (?1, ?2)",
            params![user.0, entry.id.0],
        )?;
    }
    Ok(entry)
}

/// Bump the `updated_at` of the entry bound to `origin`; an origin row and
/// its ledger entry share a lifecycle, timestamps included.
pub(crate) fn touch_entry(conn: &Connection, origin: EntryOrigin) -> Result<()> {
    let (column, id) = match origin {
        EntryOrigin::User(id) => ("user_id", id.0),
        EntryOrigin::Role(id) => ("role_id", id.0),
        EntryOrigin::Post(id) => ("post_id", id.0),
        EntryOrigin::Comment(id) => ("post_comment_id", id.0),
        EntryOrigin::Like(id) => ("like_id", id.0),
    };
    conn.execute(
        &format!("UPDATE entries SET updated_at = ?1 WHERE {column} = ?2"),
        params![Utc::now(), id],
    )?;
    Ok(())
}

pub(crate) fn entry_from_row(row: &Row) -> rusqlite::Result<Entry> {
    let id = EntryId(row.get(0)?);
    let user: Option<i64> = row.get(1)?;
    let role: Option<i64> = row.get(2)?;
    let post: Option<i64> = row.get(3)?;
    let comment: Option<i64> = row.get(4)?;
    let like: Option<i64> = row.get(5)?;

    let origin = match (user, role, post, comment, like) {
        (Some(v), None, None, None, None) => EntryOrigin::User(UserId(v)),
        (None, Some(v), None, None, None) => EntryOrigin::Role(RoleId(v)),
        (None, None, Some(v), None, None) => EntryOrigin::Post(PostId(v)),
        (None, None, None, Some(v), None) => EntryOrigin::Comment(CommentId(v)),
        (None, None, None, None, Some(v)) => EntryOrigin::Like(LikeId(v)),
        _ => {
            tracing::error!(entry = %id, "entry row does not have exactly one origin reference");
            return Err(rusqlite::Error::FromSqlConversionFailure(
                1,
                rusqlite::types::Type::Integer,
                format!("entry {id} does not have exactly one origin reference").into(),
            ));
        }
    };

    Ok(Entry {
        id,
        origin,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_user() -> (Store, User) {
        let mut store = Store::in_memory().unwrap();
        let user = store.create_user("ada", "ada@example.com", 0).unwrap();
        (store, user)
    }

    /// Insert a bare post row without going through the content layer, so
    /// the ledger operations can be exercised on their own.
    fn bare_post(store: &Store, author: UserId) -> PostId {
        store
            .conn
            .execute(
                "INSERT INTO posts (title, body, scrambled_body, user_id, created_at, updated_at)
                 VALUES ('t', 'b', 'b', ?1, '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z')",
                params![author.0],
            )
            .unwrap();
        PostId(store.conn.last_insert_rowid())
    }

    #[test]
    fn every_entry_has_exactly_one_origin_reference() {
        let (mut store, user) = store_with_user();
        let post = bare_post(&store, user.id);
        store.create_entry_for(EntryOrigin::Post(post)).unwrap();

        let off_invariant: i64 = store
            .conn
            .query_row(
                "SELECT COUNT(*) FROM entries
                 WHERE (user_id IS NOT NULL) + (role_id IS NOT NULL) + (post_id IS NOT NULL)
                     + (post_comment_id IS NOT NULL) + (like_id IS NOT NULL) != 1",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(off_invariant, 0);
    }

    #[test]
    fn create_entry_for_sets_the_matching_reference() {
        let (mut store, user) = store_with_user();
        let post = bare_post(&store, user.id);
        let entry = store.create_entry_for(EntryOrigin::Post(post)).unwrap();

        assert_eq!(entry.origin, EntryOrigin::Post(post));
        assert_eq!(store.entry(entry.id).unwrap().origin, EntryOrigin::Post(post));
        assert_eq!(store.entry_for(EntryOrigin::Post(post)).unwrap().id, entry.id);
        assert!(store.attributed_user(entry.id).unwrap().is_none());
    }

    #[test]
    fn create_entry_for_user_records_attribution() {
        let (mut store, user) = store_with_user();
        let post = bare_post(&store, user.id);
        let entry = store
            .create_entry_for_user(Some(user.id), EntryOrigin::Post(post))
            .unwrap();

        let attributed = store.attributed_user(entry.id).unwrap().unwrap();
        assert_eq!(attributed.id, user.id);
    }

    #[test]
    fn registration_entry_is_attributed_to_the_user() {
        let (mut store, user) = store_with_user();
        let entry = store.entry_for(EntryOrigin::User(user.id)).unwrap();
        let attributed = store.attributed_user(entry.id).unwrap().unwrap();
        assert_eq!(attributed.id, user.id);
    }

    #[test]
    fn duplicate_attribution_is_rejected_by_schema() {
        let (mut store, user) = store_with_user();
        let other = store.create_user("brin", "brin@example.com", 0).unwrap();
        let entry = store.entry_for(EntryOrigin::User(user.id)).unwrap();

        let err = store
            .conn
            .execute(
                "INSERT INTO user_actions (user_id, entry_id) VALUES (?1, ?2)",
                params![other.id.0, entry.id.0],
            )
            .unwrap_err();
        assert!(matches!(err, rusqlite::Error::SqliteFailure(..)));
    }

    #[test]
    fn entry_for_unknown_origin_is_not_found() {
        let (store, _user) = store_with_user();
        let missing = store.entry_for(EntryOrigin::Post(PostId(999)));
        assert!(matches!(missing, Err(Error::NotFound(_))));
    }
}
