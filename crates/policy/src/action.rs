//! Actions, decisions, and deny reasons.

use serde::Serialize;
use std::collections::HashSet;
use storage::{Role, RoleId, UserId};

/// Snapshot of the acting user, resolved by the caller before evaluation.
///
/// Keeping the role facts in a plain value is what lets the engine stay a
/// pure function: it never touches the database and can be called
/// concurrently without synchronization.
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: UserId,
    pub is_administrator: bool,
    pub is_disabled: bool,
    pub role_ids: HashSet<RoleId>,
}

impl Actor {
    pub fn holds(&self, role: RoleId) -> bool {
        self.role_ids.contains(&role)
    }
}

/// Whether a content-level action targets a post or a comment. The rules for
/// the two are identical; the kind only picks the deny message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Post,
    Comment,
}

/// An action a (possibly anonymous) user is requesting to perform.
///
/// Payloads carry only the facts the rules consult: the owner of the target
/// content, the role being managed, the user a role change or profile view
/// targets.
#[derive(Debug, Clone)]
pub enum Action<'a> {
    // Posts and comments.
    ViewAnyContent(ContentKind),
    ViewContent(ContentKind),
    ViewLikes(ContentKind),
    ViewDislikes(ContentKind),
    CreateContent(ContentKind),
    UpdateContent { kind: ContentKind, owner: UserId },
    DeleteContent { kind: ContentKind, owner: UserId },
    LikeContent(ContentKind),
    DislikeContent(ContentKind),
    UnlikeContent(ContentKind),

    // Role management.
    ViewAnyRoles,
    ViewRole,
    /// List all users holding a role.
    ShowRoleMembers(&'a Role),
    CreateRole,
    UpdateRole(&'a Role),
    DeleteRole(&'a Role),
    GrantRole { role: &'a Role, target: UserId },
    RevokeRole { role: &'a Role, target: UserId },

    // User profiles.
    ViewEmail { target: UserId },
    ViewScramblerInfo,
    /// View one role on one user's profile.
    ViewUserRole { target: UserId, role: &'a Role },
    ViewAllInfo { target: UserId },
    DeleteUser { target: UserId },
}

/// Result of evaluating an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// Turn a denial into an error, for call sites that stop on deny.
    pub fn require(self) -> crate::Result<()> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => Err(crate::Error::Denied(reason)),
        }
    }
}

/// Why an action was denied.
///
/// The message strings are part of the external contract: they are shown to
/// users as-is and must never be rewritten on the way to the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    Disabled,
    NotAuthenticated,
    NotOwner(ContentKind),
    RoleMembersHidden,
    CannotCreateRoles,
    CannotEditRoles,
    CannotDeleteRoles,
    CannotGrantRoles,
    OnlySelfRevoke,
    RestrictionRole,
    HardcodedRole,
    EmailHidden,
    ScramblerHidden,
    RoleHidden,
    ProfileRestricted,
    CannotDeleteUser,
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenyReason::Disabled => "You are disabled and can't do anything",
            DenyReason::NotAuthenticated => "You must be signed in to do this.",
            DenyReason::NotOwner(ContentKind::Post) => "You do not own this post.",
            DenyReason::NotOwner(ContentKind::Comment) => "You do not own this comment.",
            DenyReason::RoleMembersHidden => "You can't see all users that have this role.",
            DenyReason::CannotCreateRoles => "You can't create new roles.",
            DenyReason::CannotEditRoles => "You can't change existing roles.",
            DenyReason::CannotDeleteRoles => "You can't remove existing roles.",
            DenyReason::CannotGrantRoles => "You can't add roles to users.",
            DenyReason::OnlySelfRevoke => "You can only remove roles from yourself.",
            DenyReason::RestrictionRole => "You can't remove this role from yourself.",
            DenyReason::HardcodedRole => "This role is hardcoded and can't be changed.",
            DenyReason::EmailHidden => "You can't view the email of this user.",
            DenyReason::ScramblerHidden => {
                "You can't view any information about how content is processed."
            }
            DenyReason::RoleHidden => "You can't view some roles for this user.",
            DenyReason::ProfileRestricted => "You can only see some info about this user.",
            DenyReason::CannotDeleteUser => "You can not delete other users.",
        }
    }
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
