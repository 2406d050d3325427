use crate::models::contract::Contract;
use crate::session::RoleKind;

/// Mutating operations gated by the active role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CreateContract,
    UpdateContract,
    DeleteContract,
    CreatePendency,
    CancelPendency,
    SubmitReport,
    AnalyseReport,
    ManageUsers,
    ManageGrants,
    ManageContractedParties,
}

/// Which contracts a role can see, before binding the viewer's id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeRule {
    All,
    AssignedManager,
    AssignedInspector,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub contracts: ScopeRule,
    pub create_contract: bool,
    pub create_pendency: bool,
    pub submit_report: bool,
    pub analyse_report: bool,
    pub manage_users: bool,
}

const ADMINISTRATOR: Capabilities = Capabilities {
    contracts: ScopeRule::All,
    create_contract: true,
    create_pendency: true,
    submit_report: false,
    analyse_report: true,
    manage_users: true,
};

const MANAGER: Capabilities = Capabilities {
    contracts: ScopeRule::AssignedManager,
    create_contract: false,
    create_pendency: false,
    submit_report: false,
    analyse_report: false,
    manage_users: false,
};

const INSPECTOR: Capabilities = Capabilities {
    contracts: ScopeRule::AssignedInspector,
    create_contract: false,
    create_pendency: false,
    submit_report: true,
    analyse_report: false,
    manage_users: false,
};

pub const fn capabilities(role: RoleKind) -> Capabilities {
    match role {
        RoleKind::Administrator => ADMINISTRATOR,
        RoleKind::Manager => MANAGER,
        RoleKind::Inspector => INSPECTOR,
    }
}

impl Capabilities {
    pub fn allows(&self, action: Action) -> bool {
        match action {
            // Contract maintenance and contracted parties follow contract creation.
            Action::CreateContract
            | Action::UpdateContract
            | Action::DeleteContract
            | Action::ManageContractedParties => self.create_contract,
            // Cancelling is part of pendency administration.
            Action::CreatePendency | Action::CancelPendency => self.create_pendency,
            Action::SubmitReport => self.submit_report,
            Action::AnalyseReport => self.analyse_report,
            Action::ManageUsers | Action::ManageGrants => self.manage_users,
        }
    }

    pub fn scope_for(&self, user_id: i64) -> ContractScope {
        match self.contracts {
            ScopeRule::All => ContractScope::All,
            ScopeRule::AssignedManager => ContractScope::Managed(user_id),
            ScopeRule::AssignedInspector => ContractScope::Inspected(user_id),
        }
    }
}

/// Contract visibility bound to a viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractScope {
    All,
    Managed(i64),
    /// Titular or substitute inspector.
    Inspected(i64),
}

impl ContractScope {
    /// SQL predicate over the `contrato` table aliased as `alias`; bind with [`Self::bind_values`].
    pub fn predicate(&self, alias: &str) -> String {
        match self {
            ContractScope::All => "1 = 1".to_string(),
            ContractScope::Managed(_) => format!("{alias}.gestor_id = ?"),
            ContractScope::Inspected(_) => {
                format!("({alias}.fiscal_id = ? OR {alias}.fiscal_substituto_id = ?)")
            }
        }
    }

    pub fn bind_values(&self) -> Vec<i64> {
        match *self {
            ContractScope::All => Vec::new(),
            ContractScope::Managed(user_id) => vec![user_id],
            ContractScope::Inspected(user_id) => vec![user_id, user_id],
        }
    }

    pub fn includes(&self, contract: &Contract) -> bool {
        match *self {
            ContractScope::All => true,
            ContractScope::Managed(user_id) => contract.gestor_id == user_id,
            ContractScope::Inspected(user_id) => {
                contract.fiscal_id == user_id || contract.fiscal_substituto_id == Some(user_id)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn contract(gestor_id: i64, fiscal_id: i64, substitute: Option<i64>) -> Contract {
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        Contract {
            id: 1,
            nr_contrato: "1/2024".to_string(),
            objeto: "Obra".to_string(),
            data_inicio: day,
            data_fim: day,
            valor_global: 10.0,
            contratado_id: 1,
            modalidade_id: 1,
            status_id: 1,
            gestor_id,
            fiscal_id,
            fiscal_substituto_id: substitute,
            ativo: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn policy_table_matches_roles() {
        let admin = capabilities(RoleKind::Administrator);
        assert!(admin.allows(Action::CreateContract));
        assert!(admin.allows(Action::CreatePendency));
        assert!(!admin.allows(Action::SubmitReport));
        assert!(admin.allows(Action::AnalyseReport));
        assert!(admin.allows(Action::ManageUsers));

        let manager = capabilities(RoleKind::Manager);
        for action in [
            Action::CreateContract,
            Action::CreatePendency,
            Action::SubmitReport,
            Action::AnalyseReport,
            Action::ManageUsers,
        ] {
            assert!(!manager.allows(action), "manager must not {action:?}");
        }

        let inspector = capabilities(RoleKind::Inspector);
        assert!(inspector.allows(Action::SubmitReport));
        assert!(!inspector.allows(Action::CreateContract));
        assert!(!inspector.allows(Action::CreatePendency));
        assert!(!inspector.allows(Action::AnalyseReport));
        assert!(!inspector.allows(Action::ManageGrants));
    }

    #[test]
    fn derived_actions_stay_administrative() {
        for role in [RoleKind::Manager, RoleKind::Inspector] {
            let caps = capabilities(role);
            assert!(!caps.allows(Action::UpdateContract));
            assert!(!caps.allows(Action::DeleteContract));
            assert!(!caps.allows(Action::CancelPendency));
            assert!(!caps.allows(Action::ManageContractedParties));
        }
    }

    #[test]
    fn scopes_follow_assignment() {
        let c = contract(10, 20, Some(30));

        assert!(capabilities(RoleKind::Administrator).scope_for(99).includes(&c));
        assert!(capabilities(RoleKind::Manager).scope_for(10).includes(&c));
        assert!(!capabilities(RoleKind::Manager).scope_for(20).includes(&c));
        assert!(capabilities(RoleKind::Inspector).scope_for(20).includes(&c));
        assert!(capabilities(RoleKind::Inspector).scope_for(30).includes(&c));
        assert!(!capabilities(RoleKind::Inspector).scope_for(10).includes(&c));
    }

    #[test]
    fn predicate_placeholders_match_bind_values() {
        for scope in [ContractScope::All, ContractScope::Managed(1), ContractScope::Inspected(1)] {
            let placeholders = scope.predicate("c").matches('?').count();
            assert_eq!(placeholders, scope.bind_values().len());
        }
    }
}
