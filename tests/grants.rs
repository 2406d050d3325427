mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

use common::{spawn_app, FISCAL, GESTOR};

#[tokio::test]
async fn granting_is_idempotent() -> Result<()> {
    let t = spawn_app().await?;
    t.seed_admin().await?;
    let admin = t.token_for("admin@sigescon.test").await?;
    let user_id = t.seed_user("Gil", "gil@sigescon.test", "70000000001", &[FISCAL]).await?;

    for _ in 0..2 {
        let (status, grants) = t
            .call(
                "POST",
                &format!("/usuarios/{user_id}/perfis/conceder"),
                Some(&admin),
                Some(json!({"perfil_ids": [GESTOR, FISCAL, GESTOR], "observacoes": "acúmulo"})),
            )
            .await?;
        assert_eq!(status, StatusCode::OK, "{grants}");
        assert_eq!(grants.as_array().map(Vec::len), Some(2));
    }

    let active: i64 = sqlx::query_scalar(
        "SELECT COUNT(1) FROM usuario_perfil WHERE usuario_id = ? AND perfil_id = ? AND ativo = 1",
    )
    .bind(user_id)
    .bind(GESTOR)
    .fetch_one(&t.pool)
    .await?;
    assert_eq!(active, 1, "at most one active grant per (user, role)");

    let (status, listed) = t.call("GET", &format!("/usuarios/{user_id}/perfis"), Some(&admin), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().map(Vec::len), Some(2));

    // the new role shows up on the next login
    let (_, login) = t.login("gil@sigescon.test").await?;
    assert_eq!(login["contexto_sessao"]["pode_alternar"], true);

    Ok(())
}

#[tokio::test]
async fn grant_errors() -> Result<()> {
    let t = spawn_app().await?;
    t.seed_admin().await?;
    let admin = t.token_for("admin@sigescon.test").await?;
    let user_id = t.seed_user("Hugo", "hugo@sigescon.test", "70000000002", &[GESTOR]).await?;

    let (status, _) = t
        .call("POST", "/usuarios/9999/perfis/conceder", Some(&admin), Some(json!({"perfil_ids": [FISCAL]})))
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = t
        .call("POST", &format!("/usuarios/{user_id}/perfis/conceder"), Some(&admin), Some(json!({"perfil_ids": [42]})))
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, err) = t
        .call("POST", &format!("/usuarios/{user_id}/perfis/conceder"), Some(&admin), Some(json!({"perfil_ids": []})))
        .await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{err}");

    let (status, _) = t.call("DELETE", &format!("/usuarios/{user_id}/perfis/{FISCAL}"), Some(&admin), None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND, "no active Fiscal grant to revoke");

    // only administrators manage grants
    let token = t.token_for("hugo@sigescon.test").await?;
    let (status, _) = t
        .call("POST", &format!("/usuarios/{user_id}/perfis/conceder"), Some(&token), Some(json!({"perfil_ids": [FISCAL]})))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    Ok(())
}

#[tokio::test]
async fn deactivating_a_user_ends_their_sessions() -> Result<()> {
    let t = spawn_app().await?;
    t.seed_admin().await?;
    let admin = t.token_for("admin@sigescon.test").await?;
    let user_id = t.seed_user("Iris", "iris@sigescon.test", "70000000003", &[FISCAL]).await?;
    let token = t.token_for("iris@sigescon.test").await?;

    let (status, _) = t.call("DELETE", &format!("/usuarios/{user_id}"), Some(&admin), None).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = t.call("GET", "/auth/contexto", Some(&token), None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = t.login("iris@sigescon.test").await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn created_user_receives_initial_role() -> Result<()> {
    let t = spawn_app().await?;
    t.seed_admin().await?;
    let admin = t.token_for("admin@sigescon.test").await?;

    let (status, user) = t
        .call(
            "POST",
            "/usuarios",
            Some(&admin),
            Some(json!({
                "nome": "Joana",
                "email": "joana@sigescon.test",
                "cpf": "700.000.000-04",
                "senha": common::PASSWORD,
                "perfil_id": FISCAL
            })),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{user}");
    assert_eq!(user["cpf"], "70000000004");

    let (status, body) = t.login("joana@sigescon.test").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["contexto_sessao"]["perfil_ativo_nome"], "Fiscal");

    let (status, _) = t
        .call(
            "POST",
            "/usuarios",
            Some(&admin),
            Some(json!({
                "nome": "Joana Clone",
                "email": "joana@sigescon.test",
                "cpf": "70000000005",
                "senha": common::PASSWORD
            })),
        )
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    Ok(())
}

#[tokio::test]
async fn failed_initial_grant_leaves_no_user_behind() -> Result<()> {
    let t = spawn_app().await?;
    t.seed_admin().await?;
    let admin = t.token_for("admin@sigescon.test").await?;

    sqlx::query("UPDATE perfil SET ativo = 0 WHERE id = ?")
        .bind(FISCAL)
        .execute(&t.pool)
        .await?;

    let body = json!({
        "nome": "Karla",
        "email": "karla@sigescon.test",
        "cpf": "70000000009",
        "senha": common::PASSWORD,
        "perfil_id": FISCAL
    });
    let (status, err) = t.call("POST", "/usuarios", Some(&admin), Some(body.clone())).await?;
    assert_eq!(status, StatusCode::NOT_FOUND, "{err}");

    let users: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM usuario WHERE email = ?")
        .bind("karla@sigescon.test")
        .fetch_one(&t.pool)
        .await?;
    assert_eq!(users, 0);

    // the same identity is free to be registered once the role is usable again
    sqlx::query("UPDATE perfil SET ativo = 1 WHERE id = ?")
        .bind(FISCAL)
        .execute(&t.pool)
        .await?;
    let (status, user) = t.call("POST", "/usuarios", Some(&admin), Some(body)).await?;
    assert_eq!(status, StatusCode::CREATED, "{user}");

    Ok(())
}
