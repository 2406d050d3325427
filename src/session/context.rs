use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::catalog::RoleKind;
use crate::errors::AppError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct AvailableRole {
    #[schema(example = 2)]
    pub id: i64,
    #[schema(example = "Gestor")]
    pub nome: String,
}

impl From<RoleKind> for AvailableRole {
    fn from(role: RoleKind) -> Self {
        Self {
            id: role.id(),
            nome: role.name().to_string(),
        }
    }
}

/// Per-session view of which role currently governs authorization.
///
/// Always rebuilt from the user's active grants; the only remembered input is
/// the explicit role the session switched to.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionContext {
    pub usuario_id: i64,
    pub perfil_ativo_id: i64,
    #[schema(example = "Gestor")]
    pub perfil_ativo_nome: String,
    pub perfis_disponiveis: Vec<AvailableRole>,
    pub pode_alternar: bool,
    pub sessao_id: String,
    #[serde(skip)]
    pub active_role: RoleKind,
    #[serde(skip)]
    pub granted: Vec<RoleKind>,
}

impl SessionContext {
    pub fn session_uuid(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.sessao_id).map_err(|err| AppError::internal(format!("invalid session id: {err}")))
    }
}

/// Builds the context from the granted roles and the session's preferred role.
///
/// A preferred role that is no longer granted is ignored and the
/// highest-priority grant takes over.
pub fn derive_context(
    user_id: i64,
    session_id: Uuid,
    granted: &[RoleKind],
    preferred: Option<RoleKind>,
) -> Result<SessionContext, AppError> {
    let mut roles: Vec<RoleKind> = granted.to_vec();
    roles.sort_by_key(|role| role.priority());
    roles.dedup();

    let first = *roles.first().ok_or(AppError::NoActiveRole)?;
    let active = preferred.filter(|role| roles.contains(role)).unwrap_or(first);

    Ok(SessionContext {
        usuario_id: user_id,
        perfil_ativo_id: active.id(),
        perfil_ativo_nome: active.name().to_string(),
        perfis_disponiveis: roles.iter().copied().map(AvailableRole::from).collect(),
        pode_alternar: roles.len() > 1,
        sessao_id: session_id.to_string(),
        active_role: active,
        granted: roles,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchOutcome {
    Unchanged,
    Switched(RoleKind),
}

/// Validates a switch request against a freshly derived context.
pub fn plan_switch(context: &SessionContext, requested_role_id: i64) -> Result<SwitchOutcome, AppError> {
    match context.granted.len() {
        0 => return Err(AppError::NoActiveRole),
        1 => return Err(AppError::SingleRole),
        _ => {}
    }

    let target = RoleKind::from_id(requested_role_id)
        .filter(|role| context.granted.contains(role))
        .ok_or(AppError::RoleNotAvailable(requested_role_id))?;

    if target == context.active_role {
        Ok(SwitchOutcome::Unchanged)
    } else {
        Ok(SwitchOutcome::Switched(target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use RoleKind::{Administrator, Inspector, Manager};

    #[test]
    fn no_grants_means_no_context() {
        let err = derive_context(1, Uuid::new_v4(), &[], None).unwrap_err();
        assert!(matches!(err, AppError::NoActiveRole));
    }

    #[test]
    fn single_grant_cannot_switch() {
        let ctx = derive_context(1, Uuid::new_v4(), &[Inspector], None).unwrap();
        assert_eq!(ctx.active_role, Inspector);
        assert!(!ctx.pode_alternar);
        assert_eq!(ctx.perfis_disponiveis.len(), 1);
    }

    #[test]
    fn highest_priority_grant_is_initial_role() {
        let ctx = derive_context(1, Uuid::new_v4(), &[Inspector, Manager], None).unwrap();
        assert_eq!(ctx.perfil_ativo_id, 2);
        assert_eq!(ctx.perfil_ativo_nome, "Gestor");
        assert!(ctx.pode_alternar);

        let ctx = derive_context(1, Uuid::new_v4(), &[Inspector, Administrator, Manager], None).unwrap();
        assert_eq!(ctx.active_role, Administrator);
        let ids: Vec<i64> = ctx.perfis_disponiveis.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn duplicated_grants_collapse() {
        let ctx = derive_context(1, Uuid::new_v4(), &[Inspector, Inspector], None).unwrap();
        assert_eq!(ctx.perfis_disponiveis.len(), 1);
        assert!(!ctx.pode_alternar);
    }

    #[test]
    fn preferred_role_is_kept_while_granted() {
        let ctx = derive_context(1, Uuid::new_v4(), &[Manager, Inspector], Some(Inspector)).unwrap();
        assert_eq!(ctx.active_role, Inspector);
    }

    #[test]
    fn revoked_preferred_role_falls_back() {
        let ctx = derive_context(1, Uuid::new_v4(), &[Manager], Some(Inspector)).unwrap();
        assert_eq!(ctx.active_role, Manager);
        assert!(!ctx.pode_alternar);
    }

    #[test]
    fn single_role_refuses_even_same_target() {
        let ctx = derive_context(1, Uuid::new_v4(), &[Inspector], None).unwrap();
        assert!(matches!(plan_switch(&ctx, 3), Err(AppError::SingleRole)));
        assert!(matches!(plan_switch(&ctx, 1), Err(AppError::SingleRole)));
    }

    #[test]
    fn switch_target_must_be_granted() {
        let ctx = derive_context(1, Uuid::new_v4(), &[Manager, Inspector], None).unwrap();
        assert!(matches!(plan_switch(&ctx, 1), Err(AppError::RoleNotAvailable(1))));
        assert!(matches!(plan_switch(&ctx, 99), Err(AppError::RoleNotAvailable(99))));
    }

    #[test]
    fn switch_to_current_role_is_a_no_op() {
        let ctx = derive_context(1, Uuid::new_v4(), &[Manager, Inspector], None).unwrap();
        assert_eq!(plan_switch(&ctx, 2).unwrap(), SwitchOutcome::Unchanged);
        assert_eq!(plan_switch(&ctx, 3).unwrap(), SwitchOutcome::Switched(Inspector));
    }

    #[test]
    fn context_json_shape() {
        let session_id = Uuid::new_v4();
        let ctx = derive_context(7, session_id, &[Manager, Inspector], None).unwrap();
        let value = serde_json::to_value(&ctx).unwrap();

        assert_eq!(
            value,
            serde_json::json!({
                "usuario_id": 7,
                "perfil_ativo_id": 2,
                "perfil_ativo_nome": "Gestor",
                "perfis_disponiveis": [{"id": 2, "nome": "Gestor"}, {"id": 3, "nome": "Fiscal"}],
                "pode_alternar": true,
                "sessao_id": session_id.to_string(),
            })
        );
    }
}
