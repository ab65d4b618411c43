//! Scuttlebutt platform core — policy-guarded operations over the store.
//!
//! This crate glues the policy engine to the storage layer: every operation
//! resolves the acting user's role snapshot, asks [`policy::evaluate`] for a
//! decision, and only then runs the storage transaction. Denials carry their
//! reason to the caller unmodified.
//!
//! The content scrambler lives here too, as [`scramble`]: a cosmetic
//! collaborator of the serialization layer with no influence on any ledger
//! invariant.
//!
//! # Example
//!
//! ```no_run
//! use service::Platform;
//!
//! # fn example() -> service::Result<()> {
//! let mut platform = Platform::open("scuttlebutt.db")?;
//!
//! let ada = platform.register_user("ada", "ada@example.com", 0)?;
//! let brin = platform.register_user("brin", "brin@example.com", 0)?;
//!
//! let post = platform.create_post(ada.id, "hello", "first post")?;
//! platform.like_post(brin.id, post.id)?;
//!
//! let reactions = platform.post_reactions(Some(brin.id), post.id)?;
//! assert_eq!(reactions.likes, 1);
//! # Ok(())
//! # }
//! ```

mod error;
mod platform;
pub mod scramble;

pub use error::{Error, Result};
pub use platform::{Platform, Reactions};
