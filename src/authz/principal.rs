use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use super::policy::{capabilities, Action, ContractScope};
use crate::app::AppState;
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthUser;
use crate::session::{load_context, RoleKind, SessionContext};

/// Authenticated user together with the session's current role.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: i64,
    pub context: SessionContext,
}

impl Principal {
    pub fn new(context: SessionContext) -> Self {
        Self {
            user_id: context.usuario_id,
            context,
        }
    }

    pub fn role(&self) -> RoleKind {
        self.context.active_role
    }

    pub fn can(&self, action: Action) -> bool {
        capabilities(self.role()).allows(action)
    }

    /// Fails with 403 when the active role may not perform `action`.
    pub fn require(&self, action: Action) -> AppResult<()> {
        if self.can(action) {
            return Ok(());
        }

        tracing::debug!(
            user_id = self.user_id,
            role = %self.role(),
            action = ?action,
            "action denied"
        );
        Err(AppError::forbidden(format!(
            "active role {} may not perform this action",
            self.role()
        )))
    }

    pub fn contract_scope(&self) -> ContractScope {
        capabilities(self.role()).scope_for(self.user_id)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Principal {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth = AuthUser::from_request_parts(parts, state).await?;

        let active: Option<bool> = sqlx::query_scalar("SELECT ativo FROM usuario WHERE id = ?")
            .bind(auth.user_id)
            .fetch_optional(&state.pool)
            .await?;
        if active != Some(true) {
            return Err(AppError::unauthorized("user is inactive or does not exist"));
        }

        let context = load_context(&state.pool, auth.user_id, auth.session_id).await?;
        Ok(Principal::new(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::derive_context;
    use uuid::Uuid;

    fn principal(granted: &[RoleKind], preferred: Option<RoleKind>) -> Principal {
        Principal::new(derive_context(5, Uuid::new_v4(), granted, preferred).unwrap())
    }

    #[test]
    fn decisions_follow_active_role_not_grant_set() {
        let as_manager = principal(&[RoleKind::Manager, RoleKind::Inspector], None);
        assert!(matches!(as_manager.require(Action::SubmitReport), Err(AppError::Forbidden(_))));
        assert_eq!(as_manager.contract_scope(), ContractScope::Managed(5));

        let as_inspector = principal(&[RoleKind::Manager, RoleKind::Inspector], Some(RoleKind::Inspector));
        assert!(as_inspector.require(Action::SubmitReport).is_ok());
        assert_eq!(as_inspector.contract_scope(), ContractScope::Inspected(5));
    }

    #[test]
    fn admin_with_inspector_grant_still_cannot_submit_while_admin() {
        let admin = principal(&[RoleKind::Administrator, RoleKind::Inspector], None);
        assert_eq!(admin.role(), RoleKind::Administrator);
        assert!(!admin.can(Action::SubmitReport));
        assert!(admin.can(Action::AnalyseReport));
    }
}
