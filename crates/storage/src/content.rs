//! Users, posts, and comments.
//!
//! Content rows and their ledger entries are written in one transaction;
//! deletions are single statements and the schema's cascades take the ledger
//! entry, any likes on it, those likes' entries, and all attributions down
//! with the row.

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row, params};
use serde::{Deserialize, Serialize};

use crate::entry::{EntryOrigin, create_entry_for_user, touch_entry};
use crate::{CommentId, Error, PostId, Result, Store, UserId};

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    /// Selector for the content scrambler applied to this user's text when
    /// shown to other viewers. Opaque to the storage layer.
    pub scrambler_algorithm: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A post, the top-level content unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub title: String,
    pub body: String,
    pub scrambled_body: String,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A comment on a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub content: String,
    pub scrambled_content: String,
    pub post_id: PostId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub(crate) const USER_COLUMNS: &str =
    "u.id, u.name, u.email, u.scrambler_algorithm, u.created_at, u.updated_at";

impl Store {
    /// Create a user. The user's ledger entry is attributed to the user
    /// themself: registering is the first action anyone performs.
    pub fn create_user(&mut self, name: &str, email: &str, scrambler_algorithm: i64) -> Result<User> {
        let tx = self.conn.transaction()?;
        let now = Utc::now();
        tx.execute(
            "INSERT INTO users (name, email, scrambler_algorithm, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![name, email, scrambler_algorithm, now, now],
        )?;
        let user = User {
            id: UserId(tx.last_insert_rowid()),
            name: name.to_string(),
            email: email.to_string(),
            scrambler_algorithm,
            created_at: now,
            updated_at: now,
        };
        create_entry_for_user(&tx, Some(user.id), EntryOrigin::User(user.id))?;
        tx.commit()?;
        Ok(user)
    }

    pub fn user(&self, id: UserId) -> Result<User> {
        self.conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users u WHERE u.id = ?1"),
                params![id.0],
                User::from_row,
            )
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("user {id}")))
    }

    pub fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users u WHERE u.email = ?1"),
                params![email],
                User::from_row,
            )
            .optional()?)
    }

    pub fn users(&self) -> Result<Vec<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {USER_COLUMNS} FROM users u ORDER BY u.id"))?;
        let users = stmt
            .query_map([], User::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(users)
    }

    /// Delete a user and, through the schema's cascades, their posts,
    /// comments, opinions, memberships, attributions, and ledger entries.
    pub fn delete_user(&mut self, id: UserId) -> Result<()> {
        let deleted = self
            .conn
            .execute("DELETE FROM users WHERE id = ?1", params![id.0])?;
        if deleted == 0 {
            return Err(Error::NotFound(format!("user {id}")));
        }
        Ok(())
    }

    /// Create a post and its attributed ledger entry in one transaction.
    pub fn create_post(
        &mut self,
        author: UserId,
        title: &str,
        body: &str,
        scrambled_body: &str,
    ) -> Result<Post> {
        let tx = self.conn.transaction()?;
        let now = Utc::now();
        tx.execute(
            "INSERT INTO posts (title, body, scrambled_body, user_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![title, body, scrambled_body, author.0, now, now],
        )?;
        let post = Post {
            id: PostId(tx.last_insert_rowid()),
            title: title.to_string(),
            body: body.to_string(),
            scrambled_body: scrambled_body.to_string(),
            user_id: author,
            created_at: now,
            updated_at: now,
        };
        create_entry_for_user(&tx, Some(author), EntryOrigin::Post(post.id))?;
        tx.commit()?;
        Ok(post)
    }

    pub fn post(&self, id: PostId) -> Result<Post> {
        self.conn
            .query_row(
                &format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?1"),
                params![id.0],
                post_from_row,
            )
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("post {id}")))
    }

    /// All posts, newest first.
    pub fn posts(&self) -> Result<Vec<Post>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {POST_COLUMNS} FROM posts ORDER BY created_at DESC, id DESC"
        ))?;
        let posts = stmt
            .query_map([], post_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(posts)
    }

    pub fn update_post(
        &mut self,
        id: PostId,
        title: &str,
        body: &str,
        scrambled_body: &str,
    ) -> Result<Post> {
        let tx = self.conn.transaction()?;
        let changed = tx.execute(
            "UPDATE posts SET title = ?1, body = ?2, scrambled_body = ?3, updated_at = ?4
             WHERE id = ?5",
            params![title, body, scrambled_body, Utc::now(), id.0],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("post {id}")));
        }
        touch_entry(&tx, EntryOrigin::Post(id))?;
        tx.commit()?;
        self.post(id)
    }

    /// Delete a post. Comments, ledger entries, likes, and attributions all
    /// go through the cascade chain.
    pub fn delete_post(&mut self, id: PostId) -> Result<()> {
        let deleted = self
            .conn
            .execute("DELETE FROM posts WHERE id = ?1", params![id.0])?;
        if deleted == 0 {
            return Err(Error::NotFound(format!("post {id}")));
        }
        Ok(())
    }

    /// Create a comment and its attributed ledger entry in one transaction.
    pub fn create_comment(
        &mut self,
        author: UserId,
        post: PostId,
        content: &str,
        scrambled_content: &str,
    ) -> Result<Comment> {
        let tx = self.conn.transaction()?;
        let now = Utc::now();
        tx.execute(
            "INSERT INTO post_comments (content, scrambled_content, post_id, user_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![content, scrambled_content, post.0, author.0, now, now],
        )?;
        let comment = Comment {
            id: CommentId(tx.last_insert_rowid()),
            content: content.to_string(),
            scrambled_content: scrambled_content.to_string(),
            post_id: post,
            user_id: author,
            created_at: now,
            updated_at: now,
        };
        create_entry_for_user(&tx, Some(author), EntryOrigin::Comment(comment.id))?;
        tx.commit()?;
        Ok(comment)
    }

    pub fn comment(&self, id: CommentId) -> Result<Comment> {
        self.conn
            .query_row(
                &format!("SELECT {COMMENT_COLUMNS} FROM post_comments WHERE id = ?1"),
                params![id.0],
                comment_from_row,
            )
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("comment {id}")))
    }

    /// Comments on a post, oldest first.
    pub fn comments_for(&self, post: PostId) -> Result<Vec<Comment>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COMMENT_COLUMNS} FROM post_comments
             WHERE post_id = ?1 ORDER BY created_at ASC, id ASC"
        ))?;
        let comments = stmt
            .query_map(params![post.0], comment_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(comments)
    }

    pub fn update_comment(
        &mut self,
        id: CommentId,
        content: &str,
        scrambled_content: &str,
    ) -> Result<Comment> {
        let tx = self.conn.transaction()?;
        let changed = tx.execute(
            "UPDATE post_comments SET content = ?1, scrambled_content = ?2, updated_at = ?3
             WHERE id = ?4",
            params![content, scrambled_content, Utc::now(), id.0],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("comment {id}")));
        }
        touch_entry(&tx, EntryOrigin::Comment(id))?;
        tx.commit()?;
        self.comment(id)
    }

    pub fn delete_comment(&mut self, id: CommentId) -> Result<()> {
        let deleted = self
            .conn
            .execute("DELETE FROM post_comments WHERE id = ?1", params![id.0])?;
        if deleted == 0 {
            return Err(Error::NotFound(format!("comment {id}")));
        }
        Ok(())
    }
}

const POST_COLUMNS: &str = "id, title, body, scrambled_body, user_id, created_at, updated_at";
const COMMENT_COLUMNS: &str =
    "id, content, scrambled_content, post_id, user_id, created_at, updated_at";

impl User {
    pub(crate) fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(User {
            id: UserId(row.get(0)?),
            name: row.get(1)?,
            email: row.get(2)?,
            scrambler_algorithm: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }
}

fn post_from_row(row: &Row) -> rusqlite::Result<Post> {
    Ok(Post {
        id: PostId(row.get(0)?),
        title: row.get(1)?,
        body: row.get(2)?,
        scrambled_body: row.get(3)?,
        user_id: UserId(row.get(4)?),
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn comment_from_row(row: &Row) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: CommentId(row.get(0)?),
        content: row.get(1)?,
        scrambled_content: row.get(2)?,
        post_id: PostId(row.get(3)?),
        user_id: UserId(row.get(4)?),
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}
