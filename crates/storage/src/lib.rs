//! SQLite-backed storage for the scuttlebutt content platform.
//!
//! This crate owns the data model: users, posts, comments, roles, opinions,
//! and the activity ledger that ties all of them together. Every row of
//! content and every action lands in the ledger, which is what gives the
//! platform a single place to answer "who did this?" and a single thing for
//! opinions to attach to.
//!
//! # Overview
//!
//! The storage layer has four responsibilities:
//!
//! 1. **Activity ledger** — every user, post, comment, like, and role is
//!    bound 1:1 to an [`Entry`], optionally attributed to the user whose
//!    action created it.
//!
//! 2. **Opinions** — the like/dislike toggle. A user holds at most one
//!    opinion per entry, enforced by a unique index that doubles as the
//!    race-condition backstop.
//!
//! 3. **Roles** — many-to-many user/role membership, with the hardcoded
//!    "Administrator" and "Disabled" roles the policy layer relies on.
//!
//! 4. **Content** — the user, post, and comment rows themselves.
//!
//! # Core Concepts
//!
//! ## Store
//!
//! The [`Store`] is the primary interface. It wraps a SQLite database with
//! foreign-key enforcement on; every mutating operation runs in a single
//! transaction and all lifecycle coupling (content row ↔ ledger entry ↔
//! likes ↔ attributions) is expressed as `ON DELETE CASCADE` in the schema,
//! so no code path can leave an orphaned ledger row behind.
//!
//! ## EntryOrigin
//!
//! An [`Entry`] records exactly one origin object. In the database this is
//! five nullable reference columns; in the API it is the [`EntryOrigin`]
//! enum, so "exactly one reference" is a compile-time guarantee everywhere
//! except the persistence boundary, where a malformed row surfaces as
//! [`Error::Integrity`].
//!
//! # Example
//!
//! ```no_run
//! use storage::{EntryOrigin, Opinion, Store};
//!
//! let mut store = Store::open("scuttlebutt.db")?;
//! store.ensure_default_roles()?;
//!
//! let author = store.create_user("ada", "ada@example.com", 0)?;
//! let reader = store.create_user("brin", "brin@example.com", 0)?;
//!
//! let post = store.create_post(author.id, "hello", "first post", "first post")?;
//! let entry = store.entry_for(EntryOrigin::Post(post.id))?;
//!
//! store.like(reader.id, entry.id)?;
//! assert_eq!(store.like_count(entry.id)?, 1);
//! assert_eq!(store.opinion_of(reader.id, entry.id)?, Opinion::Liked);
//! # Ok::<(), storage::Error>(())
//! ```

mod content;
mod entry;
mod error;
mod opinion;
mod role;
mod store;
mod types;

pub use content::{Comment, Post, User};
pub use entry::{Entry, EntryOrigin};
pub use error::{Error, Result};
pub use opinion::{Like, Opinion};
pub use role::Role;
pub use store::Store;
pub use types::{CommentId, EntryId, LikeId, PostId, RoleId, UserId};
