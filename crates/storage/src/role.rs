//! Roles and user-role membership.

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row, params};
use serde::{Deserialize, Serialize};

use crate::content::{USER_COLUMNS, User};
use crate::entry::{EntryOrigin, create_entry_for_user};
use crate::{Error, Result, RoleId, Store, UserId};

/// A named role a user can hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Role {
    /// Name of the role that grants every permission.
    pub const ADMIN: &'static str = "Administrator";
    /// Name of the punitive role that blocks all content mutation.
    pub const DISABLED: &'static str = "Disabled";

    pub fn is_administrator_role(&self) -> bool {
        self.name == Self::ADMIN
    }

    pub fn is_disabled_role(&self) -> bool {
        self.name == Self::DISABLED
    }

    /// `true` if this role restricts what a user can do.
    ///
    /// Restriction roles get special treatment: they are not visible to other
    /// holders of the same role, and users cannot remove them from
    /// themselves.
    pub fn is_restriction(&self) -> bool {
        self.is_disabled_role()
    }

    /// `true` if the policy engine relies on this role's name, which
    /// therefore cannot be renamed or deleted through normal role
    /// management.
    pub fn is_hardcoded(&self) -> bool {
        self.is_disabled_role() || self.is_administrator_role()
    }
}

impl Store {
    /// Create the hardcoded roles if they are missing. Seeded roles carry no
    /// ledger entry; they exist before any user does.
    pub fn ensure_default_roles(&mut self) -> Result<()> {
        let now = Utc::now();
        for name in [Role::ADMIN, Role::DISABLED] {
            self.conn.execute(
                "INSERT OR IGNORE INTO roles (name, created_at, updated_at) VALUES (?1, ?2, ?3)",
                params![name, now, now],
            )?;
        }
        Ok(())
    }

    /// Create a role together with its ledger entry, attributed to the
    /// acting user when present.
    pub fn create_role(&mut self, actor: Option<UserId>, name: &str) -> Result<Role> {
        let tx = self.conn.transaction()?;
        let now = Utc::now();
        tx.execute(
            "INSERT INTO roles (name, created_at, updated_at) VALUES (?1, ?2, ?3)",
            params![name, now, now],
        )?;
        let role = Role {
            id: RoleId(tx.last_insert_rowid()),
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        };
        create_entry_for_user(&tx, actor, EntryOrigin::Role(role.id))?;
        tx.commit()?;
        Ok(role)
    }

    pub fn rename_role(&mut self, role: RoleId, name: &str) -> Result<Role> {
        let tx = self.conn.transaction()?;
        let changed = tx.execute(
            "UPDATE roles SET name = ?1, updated_at = ?2 WHERE id = ?3",
            params![name, Utc::now(), role.0],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("role {role}")));
        }
        crate::entry::touch_entry(&tx, EntryOrigin::Role(role))?;
        tx.commit()?;
        self.role(role)
    }

    /// Delete a role. Memberships and the role's ledger entry go with it.
    pub fn delete_role(&mut self, role: RoleId) -> Result<()> {
        let deleted = self
            .conn
            .execute("DELETE FROM roles WHERE id = ?1", params![role.0])?;
        if deleted == 0 {
            return Err(Error::NotFound(format!("role {role}")));
        }
        Ok(())
    }

    pub fn role(&self, id: RoleId) -> Result<Role> {
        self.conn
            .query_row(
                "SELECT id, name, created_at, updated_at FROM roles WHERE id = ?1",
                params![id.0],
                role_from_row,
            )
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("role {id}")))
    }

    pub fn role_by_name(&self, name: &str) -> Result<Option<Role>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, name, created_at, updated_at FROM roles WHERE name = ?1",
                params![name],
                role_from_row,
            )
            .optional()?)
    }

    pub fn roles(&self) -> Result<Vec<Role>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, created_at, updated_at FROM roles ORDER BY id")?;
        let roles = stmt
            .query_map([], role_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(roles)
    }

    /// Grant `role` to `user`. Idempotent; never removes other roles the
    /// user holds.
    pub fn add_role(&mut self, user: UserId, role: RoleId) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO user_roles (user_id, role_id) VALUES (?1, ?2)",
            params![user.0, role.0],
        )?;
        Ok(())
    }

    /// Remove `role` from `user`. Returns whether a pairing existed.
    pub fn remove_role(&mut self, user: UserId, role: RoleId) -> Result<bool> {
        let deleted = self.conn.execute(
            "DELETE FROM user_roles WHERE user_id = ?1 AND role_id = ?2",
            params![user.0, role.0],
        )?;
        Ok(deleted > 0)
    }

    pub fn has_role(&self, user: UserId, role: RoleId) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM user_roles WHERE user_id = ?1 AND role_id = ?2",
            params![user.0, role.0],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn has_named_role(&self, user: UserId, name: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM user_roles ur
             JOIN roles r ON r.id = ur.role_id
             WHERE ur.user_id = ?1 AND r.name = ?2",
            params![user.0, name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn is_administrator(&self, user: UserId) -> Result<bool> {
        self.has_named_role(user, Role::ADMIN)
    }

    pub fn is_disabled(&self, user: UserId) -> Result<bool> {
        self.has_named_role(user, Role::DISABLED)
    }

    /// All roles held by `user`.
    pub fn roles_of(&self, user: UserId) -> Result<Vec<Role>> {
        let mut stmt = self.conn.prepare(
            "SELECT r.id, r.name, r.created_at, r.updated_at FROM roles r
             JOIN user_roles ur ON ur.role_id = r.id
             WHERE ur.user_id = ?1 ORDER BY r.id",
        )?;
        let roles = stmt
            .query_map(params![user.0], role_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(roles)
    }

    /// All users holding `role`.
    pub fn users_with_role(&self, role: RoleId) -> Result<Vec<User>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users u
             JOIN user_roles ur ON ur.user_id = u.id
             WHERE ur.role_id = ?1 ORDER BY u.id"
        ))?;
        let users = stmt
            .query_map(params![role.0], User::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(users)
    }
}

fn role_from_row(row: &Row) -> rusqlite::Result<Role> {
    Ok(Role {
        id: RoleId(row.get(0)?),
        name: row.get(1)?,
        created_at: row.get(2)?,
        updated_at: row.get(3)?,
    })
}
