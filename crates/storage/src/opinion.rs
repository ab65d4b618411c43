//! Like/dislike state per `(user, entry)`.
//!
//! Three logical states: neutral, liked, disliked. Transitions run in one
//! transaction and the `UNIQUE (user_id, likeable_id)` index is the backstop
//! against concurrent toggles: the loser of a racing insert re-reads and
//! returns the winner's row instead of surfacing a constraint error.

use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::{Deserialize, Serialize};

use crate::entry::{EntryOrigin, create_entry_for_user};
use crate::{EntryId, Error, LikeId, Result, Store, UserId};

/// A like or dislike of a ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Like {
    pub id: LikeId,
    pub is_like: bool,
    pub user_id: UserId,
    pub likeable_id: EntryId,
}

/// A user's opinion of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Opinion {
    Neutral,
    Liked,
    Disliked,
}

impl Store {
    /// Record that `user` likes `entry`.
    ///
    /// Already liked: no-op, returns the existing row. Disliked: the dislike
    /// is deleted (cascading its ledger entry and attribution) and replaced.
    /// The new like gets its own attributed ledger entry.
    pub fn like(&mut self, user: UserId, entry: EntryId) -> Result<Like> {
        self.set_opinion(user, entry, true)
    }

    /// Record that `user` dislikes `entry`. Symmetric with [`Store::like`].
    pub fn dislike(&mut self, user: UserId, entry: EntryId) -> Result<Like> {
        self.set_opinion(user, entry, false)
    }

    fn set_opinion(&mut self, user: UserId, entry: EntryId, is_like: bool) -> Result<Like> {
        let tx = self.conn.transaction()?;

        let like = match find_like(&tx, user, entry)? {
            Some(previous) if previous.is_like == is_like => previous,
            previous => {
                if let Some(previous) = previous {
                    // Deleting the row cascades its entry and attribution.
                    tx.execute("DELETE FROM likes WHERE id = ?1", params![previous.id.0])?;
                }
                insert_like(&tx, user, entry, is_like)?
            }
        };

        tx.commit()?;
        Ok(like)
    }

    /// Remove `user`'s opinion of `entry`, if any. Returns whether a like or
    /// dislike was actually removed.
    pub fn remove_opinion(&mut self, user: UserId, entry: EntryId) -> Result<bool> {
        self.remove_opinion_if(user, entry, |_| true)
    }

    /// Remove `user`'s opinion of `entry` unless `guard` cancels it.
    ///
    /// The guard sees the row that is about to be removed; returning `false`
    /// cancels the removal. Removal cascades the like's ledger entry and
    /// attribution.
    pub fn remove_opinion_if<F>(&mut self, user: UserId, entry: EntryId, guard: F) -> Result<bool>
    where
        F: FnOnce(&Like) -> bool,
    {
        let tx = self.conn.transaction()?;

        let Some(like) = find_like(&tx, user, entry)? else {
            return Ok(false);
        };
        if !guard(&like) {
            return Ok(false);
        }

        tx.execute("DELETE FROM likes WHERE id = ?1", params![like.id.0])?;
        tx.commit()?;
        Ok(true)
    }

    /// `user`'s current opinion of `entry`.
    pub fn opinion_of(&self, user: UserId, entry: EntryId) -> Result<Opinion> {
        Ok(match find_like(&self.conn, user, entry)? {
            None => Opinion::Neutral,
            Some(like) if like.is_like => Opinion::Liked,
            Some(_) => Opinion::Disliked,
        })
    }

    /// Number of likes referencing `entry`.
    pub fn like_count(&self, entry: EntryId) -> Result<u64> {
        count_likes(&self.conn, entry, true)
    }

    /// Number of dislikes referencing `entry`.
    pub fn dislike_count(&self, entry: EntryId) -> Result<u64> {
        count_likes(&self.conn, entry, false)
    }
}

/// Insert a like row plus its attributed ledger entry, absorbing a lost race
/// on the unique index by returning the winner's row.
fn insert_like(conn: &Connection, user: UserId, entry: EntryId, is_like: bool) -> Result<Like> {
    let inserted = conn.execute(
        "INSERT INTO likes (is_like, user_id, likeable_id) VALUES (?1, ?2, ?3)",
        params![is_like, user.0, entry.0],
    );

    match inserted {
        Ok(_) => {
            let like = Like {
                id: LikeId(conn.last_insert_rowid()),
                is_like,
                user_id: user,
                likeable_id: entry,
            };
            create_entry_for_user(conn, Some(user), EntryOrigin::Like(like.id))?;
            Ok(like)
        }
        Err(err) if is_unique_violation(&err) => {
            tracing::debug!(%user, %entry, "lost opinion race, returning current state");
            find_like(conn, user, entry)?.ok_or(Error::Database(err))
        }
        Err(err) => Err(err.into()),
    }
}

fn count_likes(conn: &Connection, entry: EntryId, is_like: bool) -> Result<u64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM likes WHERE likeable_id = ?1 AND is_like = ?2",
        params![entry.0, is_like],
        |row| row.get(0),
    )?;
    Ok(count as u64)
}

pub(crate) fn find_like(conn: &Connection, user: UserId, entry: EntryId) -> Result<Option<Like>> {
    Ok(conn
        .query_row(
            "SELECT id, is_like, user_id, likeable_id FROM likes
             WHERE user_id = ?1 AND likeable_id = ?2",
            params![user.0, entry.0],
            like_from_row,
        )
        .optional()?)
}

fn like_from_row(row: &Row) -> rusqlite::Result<Like> {
    Ok(Like {
        id: LikeId(row.get(0)?),
        is_like: row.get(1)?,
        user_id: UserId(row.get(2)?),
        likeable_id: EntryId(row.get(3)?),
    })
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::User;

    fn liked_post(store: &mut Store) -> (User, User, EntryId) {
        let author = store.create_user("ada", "ada@example.com", 0).unwrap();
        let reader = store.create_user("brin", "brin@example.com", 0).unwrap();
        let post = store
            .create_post(author.id, "title", "body", "body")
            .unwrap();
        let entry = store.entry_for(EntryOrigin::Post(post.id)).unwrap();
        (author, reader, entry.id)
    }

    #[test]
    fn like_twice_is_idempotent() {
        let mut store = Store::in_memory().unwrap();
        let (_, reader, entry) = liked_post(&mut store);

        let first = store.like(reader.id, entry).unwrap();
        let second = store.like(reader.id, entry).unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(store.like_count(entry).unwrap(), 1);
        assert_eq!(store.opinion_of(reader.id, entry).unwrap(), Opinion::Liked);
    }

    #[test]
    fn dislike_replaces_like() {
        let mut store = Store::in_memory().unwrap();
        let (_, reader, entry) = liked_post(&mut store);

        let like = store.like(reader.id, entry).unwrap();
        let dislike = store.dislike(reader.id, entry).unwrap();

        assert_ne!(like.id, dislike.id);
        assert_eq!(store.like_count(entry).unwrap(), 0);
        assert_eq!(store.dislike_count(entry).unwrap(), 1);
        assert_eq!(
            store.opinion_of(reader.id, entry).unwrap(),
            Opinion::Disliked
        );

        // Exactly one like row remains for the pair.
        let rows: i64 = store
            .conn
            .query_row(
                "SELECT COUNT(*) FROM likes WHERE user_id = ?1 AND likeable_id = ?2",
                params![reader.id.0, entry.0],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn opinions_are_attributed_ledger_actions() {
        let mut store = Store::in_memory().unwrap();
        let (_, reader, entry) = liked_post(&mut store);

        let like = store.like(reader.id, entry).unwrap();
        let like_entry = store.entry_for(EntryOrigin::Like(like.id)).unwrap();
        let attributed = store.attributed_user(like_entry.id).unwrap().unwrap();
        assert_eq!(attributed.id, reader.id);
    }

    #[test]
    fn remove_opinion_destroys_entry_and_attribution() {
        let mut store = Store::in_memory().unwrap();
        let (_, reader, entry) = liked_post(&mut store);

        let like = store.like(reader.id, entry).unwrap();
        assert!(store.remove_opinion(reader.id, entry).unwrap());

        assert_eq!(store.opinion_of(reader.id, entry).unwrap(), Opinion::Neutral);
        assert_eq!(store.like_count(entry).unwrap(), 0);
        assert!(matches!(
            store.entry_for(EntryOrigin::Like(like.id)),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn remove_opinion_without_opinion_is_false() {
        let mut store = Store::in_memory().unwrap();
        let (_, reader, entry) = liked_post(&mut store);
        assert!(!store.remove_opinion(reader.id, entry).unwrap());
    }

    #[test]
    fn remove_opinion_guard_can_cancel() {
        let mut store = Store::in_memory().unwrap();
        let (_, reader, entry) = liked_post(&mut store);

        store.like(reader.id, entry).unwrap();
        let removed = store
            .remove_opinion_if(reader.id, entry, |_| false)
            .unwrap();

        assert!(!removed);
        assert_eq!(store.opinion_of(reader.id, entry).unwrap(), Opinion::Liked);
    }

    #[test]
    fn at_most_one_opinion_per_user_and_entry() {
        let mut store = Store::in_memory().unwrap();
        let (_, reader, entry) = liked_post(&mut store);

        store.like(reader.id, entry).unwrap();
        let err = store
            .conn
            .execute(
                "INSERT INTO likes (is_like, user_id, likeable_id) VALUES (0, ?1, ?2)",
                params![reader.id.0, entry.0],
            )
            .unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[test]
    fn lost_insert_race_returns_winner_state() {
        let mut store = Store::in_memory().unwrap();
        let (_, reader, entry) = liked_post(&mut store);

        store.like(reader.id, entry).unwrap();
        // Simulate the loser's insert attempt after the winner committed.
        let like = insert_like(&store.conn, reader.id, entry, true).unwrap();
        assert!(like.is_like);
        assert_eq!(store.like_count(entry).unwrap(), 1);
    }
}
