use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The fixed role catalog. Ids match the seeded `perfil` rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum RoleKind {
    #[serde(rename = "Administrador")]
    Administrator,
    #[serde(rename = "Gestor")]
    Manager,
    #[serde(rename = "Fiscal")]
    Inspector,
}

impl RoleKind {
    pub const ALL: [RoleKind; 3] = [RoleKind::Administrator, RoleKind::Manager, RoleKind::Inspector];

    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            1 => Some(RoleKind::Administrator),
            2 => Some(RoleKind::Manager),
            3 => Some(RoleKind::Inspector),
            _ => None,
        }
    }

    pub fn id(self) -> i64 {
        match self {
            RoleKind::Administrator => 1,
            RoleKind::Manager => 2,
            RoleKind::Inspector => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            RoleKind::Administrator => "Administrador",
            RoleKind::Manager => "Gestor",
            RoleKind::Inspector => "Fiscal",
        }
    }

    /// Lower number wins when choosing the initial active role.
    pub fn priority(self) -> u8 {
        match self {
            RoleKind::Administrator => 1,
            RoleKind::Manager => 2,
            RoleKind::Inspector => 3,
        }
    }
}

impl std::fmt::Display for RoleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip_through_catalog() {
        for role in RoleKind::ALL {
            assert_eq!(RoleKind::from_id(role.id()), Some(role));
        }
        assert_eq!(RoleKind::from_id(4), None);
        assert_eq!(RoleKind::from_id(0), None);
    }

    #[test]
    fn priority_orders_admin_manager_inspector() {
        let mut roles = vec![RoleKind::Inspector, RoleKind::Administrator, RoleKind::Manager];
        roles.sort_by_key(|r| r.priority());
        assert_eq!(roles, vec![RoleKind::Administrator, RoleKind::Manager, RoleKind::Inspector]);
    }
}
