//! Guarded platform operations.

use policy::{Action, Actor, ContentKind, Decision, evaluate};
use rand::SeedableRng;
use rand::rngs::StdRng;
use storage::{
    Comment, CommentId, EntryOrigin, Like, Opinion, Post, PostId, Role, RoleId, Store, User,
    UserId,
};

use crate::Result;
use crate::scramble::{ScrambleAlgorithm, scramble};

/// Like/dislike counts plus the viewer's own opinion of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reactions {
    pub likes: u64,
    pub dislikes: u64,
    pub opinion: Opinion,
}

/// The platform core: every operation is policy-checked before any mutation
/// is attempted, and every mutation runs as one storage transaction.
///
/// This is the surface a request-handling layer calls into. Actors are
/// passed by id; the platform resolves the role snapshot the policy engine
/// needs. Denials surface as [`Error::Denied`] with their reason intact.
pub struct Platform {
    store: Store,
    rng: StdRng,
}

impl Platform {
    /// Open or create a platform database at the given path. Hardcoded roles
    /// are seeded if missing.
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        Self::with_store(Store::open(path)?, StdRng::from_entropy())
    }

    /// In-memory platform (useful for testing).
    pub fn in_memory() -> Result<Self> {
        Self::with_store(Store::in_memory()?, StdRng::from_entropy())
    }

    /// Build a platform over an existing store with an explicit RNG for the
    /// scrambler. Seeds the hardcoded roles.
    pub fn with_store(mut store: Store, rng: StdRng) -> Result<Self> {
        store.ensure_default_roles()?;
        Ok(Self { store, rng })
    }

    /// Read-only access to the underlying store.
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Evaluate an action for a (possibly anonymous) viewer without
    /// performing it. This is what the serialization layer uses to decide
    /// which fields (email, roles, scrambler info) appear in output.
    pub fn authorize(&self, viewer: Option<UserId>, action: &Action) -> Result<Decision> {
        let snapshot = self.snapshot_opt(viewer)?;
        Ok(evaluate(snapshot.as_ref(), action))
    }

    fn snapshot(&self, user: UserId) -> Result<Actor> {
        let roles = self.store.roles_of(user)?;
        Ok(Actor {
            id: user,
            is_administrator: roles.iter().any(Role::is_administrator_role),
            is_disabled: roles.iter().any(Role::is_disabled_role),
            role_ids: roles.iter().map(|role| role.id).collect(),
        })
    }

    fn snapshot_opt(&self, user: Option<UserId>) -> Result<Option<Actor>> {
        user.map(|id| self.snapshot(id)).transpose()
    }

    fn require(&self, actor: UserId, action: &Action) -> Result<Actor> {
        let snapshot = self.snapshot(actor)?;
        evaluate(Some(&snapshot), action).require()?;
        Ok(snapshot)
    }

    // ---- users ----

    /// Register a user. Registration is handled upstream (sessions, email
    /// verification) so no policy applies here; the user's ledger entry is
    /// attributed to themself.
    pub fn register_user(&mut self, name: &str, email: &str, scrambler: i64) -> Result<User> {
        let user = self.store.create_user(name, email, scrambler)?;
        tracing::info!(user = %user.id, "registered user");
        Ok(user)
    }

    /// Grant the Administrator role directly, bypassing policy.
    ///
    /// Only for local bootstrap: a fresh database has no administrator to
    /// authorize the first grant.
    pub fn bootstrap_administrator(&mut self, user: UserId) -> Result<()> {
        let admin = self
            .store
            .role_by_name(Role::ADMIN)?
            .ok_or_else(|| storage::Error::NotFound(Role::ADMIN.to_string()))?;
        self.store.add_role(user, admin.id)?;
        tracing::warn!(%user, "bootstrapped administrator");
        Ok(())
    }

    pub fn delete_user(&mut self, actor: UserId, target: UserId) -> Result<()> {
        self.require(actor, &Action::DeleteUser { target })?;
        self.store.delete_user(target)?;
        tracing::info!(%actor, %target, "deleted user");
        Ok(())
    }

    // ---- posts ----

    pub fn create_post(&mut self, actor: UserId, title: &str, body: &str) -> Result<Post> {
        self.require(actor, &Action::CreateContent(ContentKind::Post))?;
        let author = self.store.user(actor)?;
        let scrambled = scramble(
            ScrambleAlgorithm::from_selector(author.scrambler_algorithm),
            &mut self.rng,
            author.id,
            None,
            body,
        );
        let post = self.store.create_post(author.id, title, body, &scrambled)?;
        tracing::info!(%actor, post = %post.id, "created post");
        Ok(post)
    }

    pub fn update_post(
        &mut self,
        actor: UserId,
        post: PostId,
        title: &str,
        body: &str,
    ) -> Result<Post> {
        let current = self.store.post(post)?;
        self.require(
            actor,
            &Action::UpdateContent { kind: ContentKind::Post, owner: current.user_id },
        )?;
        let owner = self.store.user(current.user_id)?;
        let scrambled = scramble(
            ScrambleAlgorithm::from_selector(owner.scrambler_algorithm),
            &mut self.rng,
            owner.id,
            None,
            body,
        );
        Ok(self.store.update_post(post, title, body, &scrambled)?)
    }

    pub fn delete_post(&mut self, actor: UserId, post: PostId) -> Result<()> {
        let current = self.store.post(post)?;
        self.require(
            actor,
            &Action::DeleteContent { kind: ContentKind::Post, owner: current.user_id },
        )?;
        self.store.delete_post(post)?;
        tracing::info!(%actor, %post, "deleted post");
        Ok(())
    }

    pub fn post(&self, viewer: Option<UserId>, post: PostId) -> Result<Post> {
        self.authorize(viewer, &Action::ViewContent(ContentKind::Post))?
            .require()?;
        Ok(self.store.post(post)?)
    }

    /// All posts, newest first.
    pub fn posts(&self, viewer: Option<UserId>) -> Result<Vec<Post>> {
        self.authorize(viewer, &Action::ViewAnyContent(ContentKind::Post))?
            .require()?;
        Ok(self.store.posts()?)
    }

    // ---- comments ----

    pub fn create_comment(&mut self, actor: UserId, post: PostId, content: &str) -> Result<Comment> {
        self.require(actor, &Action::CreateContent(ContentKind::Comment))?;
        // The post must exist; commenting on a deleted post is a NotFound,
        // not a policy matter.
        let post = self.store.post(post)?;
        let author = self.store.user(actor)?;
        let scrambled = scramble(
            ScrambleAlgorithm::from_selector(author.scrambler_algorithm),
            &mut self.rng,
            author.id,
            None,
            content,
        );
        let comment = self
            .store
            .create_comment(author.id, post.id, content, &scrambled)?;
        tracing::info!(%actor, comment = %comment.id, "created comment");
        Ok(comment)
    }

    pub fn update_comment(
        &mut self,
        actor: UserId,
        comment: CommentId,
        content: &str,
    ) -> Result<Comment> {
        let current = self.store.comment(comment)?;
        self.require(
            actor,
            &Action::UpdateContent { kind: ContentKind::Comment, owner: current.user_id },
        )?;
        let owner = self.store.user(current.user_id)?;
        let scrambled = scramble(
            ScrambleAlgorithm::from_selector(owner.scrambler_algorithm),
            &mut self.rng,
            owner.id,
            None,
            content,
        );
        Ok(self.store.update_comment(comment, content, &scrambled)?)
    }

    pub fn delete_comment(&mut self, actor: UserId, comment: CommentId) -> Result<()> {
        let current = self.store.comment(comment)?;
        self.require(
            actor,
            &Action::DeleteContent { kind: ContentKind::Comment, owner: current.user_id },
        )?;
        self.store.delete_comment(comment)?;
        tracing::info!(%actor, %comment, "deleted comment");
        Ok(())
    }

    /// Comments on a post, oldest first.
    pub fn comments(&self, viewer: Option<UserId>, post: PostId) -> Result<Vec<Comment>> {
        self.authorize(viewer, &Action::ViewAnyContent(ContentKind::Comment))?
            .require()?;
        Ok(self.store.comments_for(post)?)
    }

    // ---- opinions ----

    pub fn like_post(&mut self, actor: UserId, post: PostId) -> Result<Like> {
        self.require(actor, &Action::LikeContent(ContentKind::Post))?;
        let entry = self.store.entry_for(EntryOrigin::Post(post))?;
        Ok(self.store.like(actor, entry.id)?)
    }

    pub fn dislike_post(&mut self, actor: UserId, post: PostId) -> Result<Like> {
        self.require(actor, &Action::DislikeContent(ContentKind::Post))?;
        let entry = self.store.entry_for(EntryOrigin::Post(post))?;
        Ok(self.store.dislike(actor, entry.id)?)
    }

    /// Remove the actor's opinion of a post. Policy is evaluated up front
    /// and again inside the removal guard with the concrete like row, so
    /// policy success alone does not guarantee a removal happened.
    pub fn unlike_post(&mut self, actor: UserId, post: PostId) -> Result<bool> {
        let snapshot = self.require(actor, &Action::UnlikeContent(ContentKind::Post))?;
        let entry = self.store.entry_for(EntryOrigin::Post(post))?;
        Ok(self.store.remove_opinion_if(actor, entry.id, |_like| {
            evaluate(Some(&snapshot), &Action::UnlikeContent(ContentKind::Post)).is_allowed()
        })?)
    }

    pub fn like_comment(&mut self, actor: UserId, comment: CommentId) -> Result<Like> {
        self.require(actor, &Action::LikeContent(ContentKind::Comment))?;
        let entry = self.store.entry_for(EntryOrigin::Comment(comment))?;
        Ok(self.store.like(actor, entry.id)?)
    }

    pub fn dislike_comment(&mut self, actor: UserId, comment: CommentId) -> Result<Like> {
        self.require(actor, &Action::DislikeContent(ContentKind::Comment))?;
        let entry = self.store.entry_for(EntryOrigin::Comment(comment))?;
        Ok(self.store.dislike(actor, entry.id)?)
    }

    pub fn unlike_comment(&mut self, actor: UserId, comment: CommentId) -> Result<bool> {
        let snapshot = self.require(actor, &Action::UnlikeContent(ContentKind::Comment))?;
        let entry = self.store.entry_for(EntryOrigin::Comment(comment))?;
        Ok(self.store.remove_opinion_if(actor, entry.id, |_like| {
            evaluate(Some(&snapshot), &Action::UnlikeContent(ContentKind::Comment)).is_allowed()
        })?)
    }

    pub fn post_reactions(&self, viewer: Option<UserId>, post: PostId) -> Result<Reactions> {
        let entry = self.store.entry_for(EntryOrigin::Post(post))?;
        self.reactions(viewer, ContentKind::Post, entry.id)
    }

    pub fn comment_reactions(&self, viewer: Option<UserId>, comment: CommentId) -> Result<Reactions> {
        let entry = self.store.entry_for(EntryOrigin::Comment(comment))?;
        self.reactions(viewer, ContentKind::Comment, entry.id)
    }

    fn reactions(
        &self,
        viewer: Option<UserId>,
        kind: ContentKind,
        entry: storage::EntryId,
    ) -> Result<Reactions> {
        self.authorize(viewer, &Action::ViewLikes(kind))?.require()?;
        self.authorize(viewer, &Action::ViewDislikes(kind))?.require()?;
        let opinion = match viewer {
            Some(user) => self.store.opinion_of(user, entry)?,
            None => Opinion::Neutral,
        };
        Ok(Reactions {
            likes: self.store.like_count(entry)?,
            dislikes: self.store.dislike_count(entry)?,
            opinion,
        })
    }

    // ---- roles ----

    pub fn create_role(&mut self, actor: UserId, name: &str) -> Result<Role> {
        self.require(actor, &Action::CreateRole)?;
        let role = self.store.create_role(Some(actor), name)?;
        tracing::info!(%actor, role = %role.id, "created role");
        Ok(role)
    }

    pub fn rename_role(&mut self, actor: UserId, role: RoleId, name: &str) -> Result<Role> {
        let current = self.store.role(role)?;
        self.require(actor, &Action::UpdateRole(&current))?;
        Ok(self.store.rename_role(role, name)?)
    }

    pub fn delete_role(&mut self, actor: UserId, role: RoleId) -> Result<()> {
        let current = self.store.role(role)?;
        self.require(actor, &Action::DeleteRole(&current))?;
        self.store.delete_role(role)?;
        tracing::info!(%actor, %role, "deleted role");
        Ok(())
    }

    pub fn grant_role(&mut self, actor: UserId, role: RoleId, target: UserId) -> Result<()> {
        let current = self.store.role(role)?;
        self.require(actor, &Action::GrantRole { role: &current, target })?;
        self.store.add_role(target, role)?;
        tracing::info!(%actor, %role, %target, "granted role");
        Ok(())
    }

    /// Remove a role from a user. Returns whether a pairing existed.
    pub fn revoke_role(&mut self, actor: UserId, role: RoleId, target: UserId) -> Result<bool> {
        let current = self.store.role(role)?;
        self.require(actor, &Action::RevokeRole { role: &current, target })?;
        Ok(self.store.remove_role(target, role)?)
    }

    /// All users holding a role, visible per the member-listing rule.
    pub fn role_members(&self, viewer: Option<UserId>, role: RoleId) -> Result<Vec<User>> {
        let current = self.store.role(role)?;
        self.authorize(viewer, &Action::ShowRoleMembers(&current))?
            .require()?;
        Ok(self.store.users_with_role(role)?)
    }

    /// All roles on the platform. Visible to anyone.
    pub fn roles(&self, viewer: Option<UserId>) -> Result<Vec<Role>> {
        self.authorize(viewer, &Action::ViewAnyRoles)?.require()?;
        Ok(self.store.roles()?)
    }
}
