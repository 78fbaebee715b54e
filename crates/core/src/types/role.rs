//! Store membership roles.

use serde::{Deserialize, Serialize};

/// A user's permission level within a single store.
///
/// Roles are totally ordered: `Owner > Admin > Staff`. Access checks compare
/// against a minimum role with [`StoreRole::satisfies`] instead of matching on
/// role names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "store_role", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StoreRole {
    /// Day-to-day catalog, customer and order work.
    Staff,
    /// Store settings and member management.
    Admin,
    /// Everything, including deleting the store and managing owners.
    Owner,
}

impl StoreRole {
    /// Position in the role hierarchy; higher is more privileged.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Staff => 1,
            Self::Admin => 2,
            Self::Owner => 3,
        }
    }

    /// Whether this role grants at least the `required` level of access.
    #[must_use]
    pub const fn satisfies(self, required: Self) -> bool {
        self.rank() >= required.rank()
    }

    /// Wire name of this role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Staff => "STAFF",
            Self::Admin => "ADMIN",
            Self::Owner => "OWNER",
        }
    }
}

impl PartialOrd for StoreRole {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for StoreRole {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl core::fmt::Display for StoreRole {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const ALL: [StoreRole; 3] = [StoreRole::Staff, StoreRole::Admin, StoreRole::Owner];

    #[test]
    fn test_owner_satisfies_everything() {
        assert!(ALL.iter().all(|r| StoreRole::Owner.satisfies(*r)));
    }

    #[test]
    fn test_staff_satisfies_only_staff() {
        assert!(StoreRole::Staff.satisfies(StoreRole::Staff));
        assert!(!StoreRole::Staff.satisfies(StoreRole::Admin));
        assert!(!StoreRole::Staff.satisfies(StoreRole::Owner));
    }

    #[test]
    fn test_admin_cannot_act_as_owner() {
        assert!(StoreRole::Admin.satisfies(StoreRole::Staff));
        assert!(!StoreRole::Admin.satisfies(StoreRole::Owner));
    }

    #[test]
    fn test_ordering() {
        assert!(StoreRole::Owner > StoreRole::Admin);
        assert!(StoreRole::Admin > StoreRole::Staff);
        assert_eq!(ALL.iter().max(), Some(&StoreRole::Owner));
    }

    #[test]
    fn test_serde() {
        assert_eq!(serde_json::to_string(&StoreRole::Admin).unwrap(), "\"ADMIN\"");
        let role: StoreRole = serde_json::from_str("\"OWNER\"").unwrap();
        assert_eq!(role, StoreRole::Owner);
    }
}
