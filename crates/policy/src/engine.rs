//! The decision function.

use crate::{Action, Actor, Decision, DenyReason};

/// Decide whether `actor` may perform `action`.
///
/// Pure and side-effect-free. Evaluation order, first match wins:
///
/// 1. Administrators may do anything, except update or delete a hardcoded
///    role — those stay denied even for admins.
/// 2. Disabled users may not mutate content (create/update/delete/like/
///    dislike/unlike on posts and comments).
/// 3. The per-action rule.
pub fn evaluate(actor: Option<&Actor>, action: &Action) -> Decision {
    if let Some(actor) = actor {
        if actor.is_administrator {
            return match action {
                Action::UpdateRole(role) | Action::DeleteRole(role) if role.is_hardcoded() => {
                    Decision::Deny(DenyReason::HardcodedRole)
                }
                _ => Decision::Allow,
            };
        }
        if actor.is_disabled && mutates_content(action) {
            return Decision::Deny(DenyReason::Disabled);
        }
    }

    match action {
        // Anyone, even guests, can view content, opinion counts, and roles.
        Action::ViewAnyContent(_)
        | Action::ViewContent(_)
        | Action::ViewLikes(_)
        | Action::ViewDislikes(_)
        | Action::ViewAnyRoles
        | Action::ViewRole => Decision::Allow,

        Action::CreateContent(_)
        | Action::LikeContent(_)
        | Action::DislikeContent(_)
        | Action::UnlikeContent(_) => match actor {
            Some(_) => Decision::Allow,
            None => Decision::Deny(DenyReason::NotAuthenticated),
        },

        Action::UpdateContent { kind, owner } | Action::DeleteContent { kind, owner } => {
            match actor {
                Some(actor) if actor.id == *owner => Decision::Allow,
                Some(_) => Decision::Deny(DenyReason::NotOwner(*kind)),
                None => Decision::Deny(DenyReason::NotAuthenticated),
            }
        }

        // Holders of a role can see who else holds it, unless the role is a
        // restriction.
        Action::ShowRoleMembers(role) => match actor {
            Some(actor) if actor.holds(role.id) && !role.is_restriction() => Decision::Allow,
            _ => Decision::Deny(DenyReason::RoleMembersHidden),
        },

        // Role management is admin-only; admins short-circuited above.
        Action::CreateRole => Decision::Deny(DenyReason::CannotCreateRoles),
        Action::UpdateRole(_) => Decision::Deny(DenyReason::CannotEditRoles),
        Action::DeleteRole(_) => Decision::Deny(DenyReason::CannotDeleteRoles),
        Action::GrantRole { .. } => Decision::Deny(DenyReason::CannotGrantRoles),

        // Users may shed their own roles, but not restriction roles.
        Action::RevokeRole { role, target } => match actor {
            Some(actor) if actor.id == *target => {
                if role.is_restriction() {
                    Decision::Deny(DenyReason::RestrictionRole)
                } else {
                    Decision::Allow
                }
            }
            _ => Decision::Deny(DenyReason::OnlySelfRevoke),
        },

        Action::ViewEmail { target } => allow_self(actor, *target, DenyReason::EmailHidden),

        Action::ViewScramblerInfo => Decision::Deny(DenyReason::ScramblerHidden),

        // Your own roles are visible to you. Otherwise visibility follows
        // ShowRoleMembers: if you could list everyone with the role anyway,
        // seeing it on one profile reveals nothing new.
        Action::ViewUserRole { target, role } => {
            if actor.is_some_and(|a| a.id == *target) {
                return Decision::Allow;
            }
            match evaluate(actor, &Action::ShowRoleMembers(*role)) {
                Decision::Allow => Decision::Allow,
                Decision::Deny(_) => Decision::Deny(DenyReason::RoleHidden),
            }
        }

        Action::ViewAllInfo { target } => {
            allow_self(actor, *target, DenyReason::ProfileRestricted)
        }

        Action::DeleteUser { target } => allow_self(actor, *target, DenyReason::CannotDeleteUser),
    }
}

fn allow_self(actor: Option<&Actor>, target: storage::UserId, otherwise: DenyReason) -> Decision {
    match actor {
        Some(actor) if actor.id == target => Decision::Allow,
        _ => Decision::Deny(otherwise),
    }
}

fn mutates_content(action: &Action) -> bool {
    matches!(
        action,
        Action::CreateContent(_)
            | Action::UpdateContent { .. }
            | Action::DeleteContent { .. }
            | Action::LikeContent(_)
            | Action::DislikeContent(_)
            | Action::UnlikeContent(_)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ContentKind;
    use chrono::Utc;
    use std::collections::HashSet;
    use storage::{Role, RoleId, UserId};

    fn role(id: i64, name: &str) -> Role {
        let now = Utc::now();
        Role {
            id: RoleId(id),
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn user(id: i64) -> Actor {
        Actor {
            id: UserId(id),
            is_administrator: false,
            is_disabled: false,
            role_ids: HashSet::new(),
        }
    }

    fn admin(id: i64) -> Actor {
        Actor {
            is_administrator: true,
            ..user(id)
        }
    }

    fn disabled(id: i64) -> Actor {
        Actor {
            is_disabled: true,
            ..user(id)
        }
    }

    fn with_role(mut actor: Actor, role: &Role) -> Actor {
        actor.role_ids.insert(role.id);
        actor
    }

    #[test]
    fn admin_bypasses_everything_but_hardcoded_roles() {
        let admin = admin(1);
        let custom = role(10, "Editors");
        let hardcoded = role(11, Role::DISABLED);

        let allowed = [
            Action::CreateRole,
            Action::GrantRole { role: &custom, target: UserId(2) },
            Action::UpdateRole(&custom),
            Action::DeleteRole(&custom),
            Action::DeleteContent { kind: ContentKind::Post, owner: UserId(2) },
            Action::ViewScramblerInfo,
            Action::ViewEmail { target: UserId(2) },
            Action::DeleteUser { target: UserId(2) },
        ];
        for action in &allowed {
            assert!(evaluate(Some(&admin), action).is_allowed(), "{action:?}");
        }

        assert_eq!(
            evaluate(Some(&admin), &Action::UpdateRole(&hardcoded)),
            Decision::Deny(DenyReason::HardcodedRole)
        );
        assert_eq!(
            evaluate(Some(&admin), &Action::DeleteRole(&hardcoded)),
            Decision::Deny(DenyReason::HardcodedRole)
        );
        // Granting a hardcoded role is still fine; only edit/delete are
        // protected.
        assert!(
            evaluate(Some(&admin), &Action::GrantRole { role: &hardcoded, target: UserId(2) })
                .is_allowed()
        );
    }

    #[test]
    fn disabled_users_cannot_mutate_content_but_can_view() {
        let actor = disabled(1);

        assert_eq!(
            evaluate(Some(&actor), &Action::CreateContent(ContentKind::Post)),
            Decision::Deny(DenyReason::Disabled)
        );
        assert_eq!(
            evaluate(Some(&actor), &Action::LikeContent(ContentKind::Comment)),
            Decision::Deny(DenyReason::Disabled)
        );
        assert_eq!(
            evaluate(
                Some(&actor),
                &Action::UpdateContent { kind: ContentKind::Post, owner: UserId(1) }
            ),
            Decision::Deny(DenyReason::Disabled)
        );
        assert!(evaluate(Some(&actor), &Action::ViewContent(ContentKind::Post)).is_allowed());
        assert!(evaluate(Some(&actor), &Action::ViewLikes(ContentKind::Post)).is_allowed());
    }

    #[test]
    fn anonymous_viewing_is_allowed() {
        assert!(evaluate(None, &Action::ViewAnyContent(ContentKind::Post)).is_allowed());
        assert!(evaluate(None, &Action::ViewDislikes(ContentKind::Comment)).is_allowed());
        assert!(evaluate(None, &Action::ViewAnyRoles).is_allowed());
        assert!(evaluate(None, &Action::ViewRole).is_allowed());
    }

    #[test]
    fn anonymous_mutation_is_denied() {
        assert_eq!(
            evaluate(None, &Action::CreateContent(ContentKind::Post)),
            Decision::Deny(DenyReason::NotAuthenticated)
        );
        assert_eq!(
            evaluate(None, &Action::LikeContent(ContentKind::Post)),
            Decision::Deny(DenyReason::NotAuthenticated)
        );
    }

    #[test]
    fn only_owners_update_and_delete_content() {
        let owner = user(1);
        let other = user(2);
        let update = Action::UpdateContent { kind: ContentKind::Post, owner: UserId(1) };
        let delete = Action::DeleteContent { kind: ContentKind::Comment, owner: UserId(1) };

        assert!(evaluate(Some(&owner), &update).is_allowed());
        assert!(evaluate(Some(&owner), &delete).is_allowed());
        assert_eq!(
            evaluate(Some(&other), &update),
            Decision::Deny(DenyReason::NotOwner(ContentKind::Post))
        );
        assert_eq!(
            evaluate(Some(&other), &delete),
            Decision::Deny(DenyReason::NotOwner(ContentKind::Comment))
        );
    }

    #[test]
    fn role_members_visible_to_holders_of_non_restriction_roles() {
        let editors = role(10, "Editors");
        let disabled_role = role(11, Role::DISABLED);
        let holder = with_role(user(1), &editors);
        let punished = with_role(user(2), &disabled_role);

        assert!(evaluate(Some(&holder), &Action::ShowRoleMembers(&editors)).is_allowed());
        assert_eq!(
            evaluate(Some(&holder), &Action::ShowRoleMembers(&disabled_role)),
            Decision::Deny(DenyReason::RoleMembersHidden)
        );
        // Even holding the restriction role does not reveal its members.
        assert_eq!(
            evaluate(Some(&punished), &Action::ShowRoleMembers(&disabled_role)),
            Decision::Deny(DenyReason::RoleMembersHidden)
        );
        assert_eq!(
            evaluate(None, &Action::ShowRoleMembers(&editors)),
            Decision::Deny(DenyReason::RoleMembersHidden)
        );
    }

    #[test]
    fn role_management_is_admin_only() {
        let actor = user(1);
        let editors = role(10, "Editors");

        assert_eq!(
            evaluate(Some(&actor), &Action::CreateRole),
            Decision::Deny(DenyReason::CannotCreateRoles)
        );
        assert_eq!(
            evaluate(Some(&actor), &Action::UpdateRole(&editors)),
            Decision::Deny(DenyReason::CannotEditRoles)
        );
        assert_eq!(
            evaluate(Some(&actor), &Action::DeleteRole(&editors)),
            Decision::Deny(DenyReason::CannotDeleteRoles)
        );
        assert_eq!(
            evaluate(Some(&actor), &Action::GrantRole { role: &editors, target: UserId(1) }),
            Decision::Deny(DenyReason::CannotGrantRoles)
        );
    }

    #[test]
    fn self_revocation_allowed_except_restriction_roles() {
        let editors = role(10, "Editors");
        let disabled_role = role(11, Role::DISABLED);
        let actor = user(1);

        assert!(
            evaluate(Some(&actor), &Action::RevokeRole { role: &editors, target: UserId(1) })
                .is_allowed()
        );
        assert_eq!(
            evaluate(
                Some(&actor),
                &Action::RevokeRole { role: &disabled_role, target: UserId(1) }
            ),
            Decision::Deny(DenyReason::RestrictionRole)
        );
        assert_eq!(
            evaluate(Some(&actor), &Action::RevokeRole { role: &editors, target: UserId(2) }),
            Decision::Deny(DenyReason::OnlySelfRevoke)
        );
    }

    #[test]
    fn profile_fields_are_self_only() {
        let actor = user(1);

        assert!(evaluate(Some(&actor), &Action::ViewEmail { target: UserId(1) }).is_allowed());
        assert_eq!(
            evaluate(Some(&actor), &Action::ViewEmail { target: UserId(2) }),
            Decision::Deny(DenyReason::EmailHidden)
        );
        assert_eq!(
            evaluate(Some(&actor), &Action::ViewScramblerInfo),
            Decision::Deny(DenyReason::ScramblerHidden)
        );
        assert!(evaluate(Some(&actor), &Action::ViewAllInfo { target: UserId(1) }).is_allowed());
        assert_eq!(
            evaluate(Some(&actor), &Action::ViewAllInfo { target: UserId(2) }),
            Decision::Deny(DenyReason::ProfileRestricted)
        );
        assert!(evaluate(Some(&actor), &Action::DeleteUser { target: UserId(1) }).is_allowed());
        assert_eq!(
            evaluate(Some(&actor), &Action::DeleteUser { target: UserId(2) }),
            Decision::Deny(DenyReason::CannotDeleteUser)
        );
    }

    #[test]
    fn viewing_user_roles_follows_member_visibility() {
        let editors = role(10, "Editors");
        let holder = with_role(user(1), &editors);
        let outsider = user(2);

        // Own profile: always visible.
        assert!(
            evaluate(Some(&outsider), &Action::ViewUserRole { target: UserId(2), role: &editors })
                .is_allowed()
        );
        // Shared role: visible via the member-listing rule.
        assert!(
            evaluate(Some(&holder), &Action::ViewUserRole { target: UserId(2), role: &editors })
                .is_allowed()
        );
        // No shared role: hidden, with the profile-specific reason.
        assert_eq!(
            evaluate(Some(&outsider), &Action::ViewUserRole { target: UserId(1), role: &editors }),
            Decision::Deny(DenyReason::RoleHidden)
        );
    }

    #[test]
    fn deny_messages_are_stable() {
        assert_eq!(
            DenyReason::Disabled.as_str(),
            "You are disabled and can't do anything"
        );
        assert_eq!(
            DenyReason::NotOwner(ContentKind::Post).as_str(),
            "You do not own this post."
        );
        assert_eq!(
            DenyReason::OnlySelfRevoke.as_str(),
            "You can only remove roles from yourself."
        );
        assert_eq!(
            DenyReason::RoleMembersHidden.as_str(),
            "You can't see all users that have this role."
        );
    }

    #[test]
    fn require_surfaces_reason_verbatim() {
        let err = Decision::Deny(DenyReason::Disabled).require().unwrap_err();
        assert_eq!(err.reason(), Some(DenyReason::Disabled));
        assert!(err.to_string().contains("You are disabled and can't do anything"));
    }
}
