#![allow(dead_code)]

use anyhow::Result;
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use tempfile::{tempdir, TempDir};
use tower::util::ServiceExt; // for `oneshot`

use sigescon::create_app;
use sigescon::db::seed::ensure_admin;
use sigescon::routes::users::insert_user;
use sigescon::session::grants;

pub const PASSWORD: &str = "senha-segura-123";

pub const ADMINISTRADOR: i64 = 1;
pub const GESTOR: i64 = 2;
pub const FISCAL: i64 = 3;

pub struct TestApp {
    pub app: Router,
    pub pool: SqlitePool,
    // dropped last, removes the database file
    _dir: TempDir,
}

pub async fn spawn_app() -> Result<TestApp> {
    let dir = tempdir()?;
    let db_path = dir.path().join("test.db");

    let opts = SqliteConnectOptions::new()
        .filename(db_path.as_path())
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(opts).await?;

    let migrator = sqlx::migrate::Migrator::new(std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations")).await?;
    migrator.run(&pool).await?;

    std::env::set_var("JWT_SECRET", "test-secret");
    let app = create_app(pool.clone()).await?;

    Ok(TestApp { app, pool, _dir: dir })
}

impl TestApp {
    pub async fn seed_admin(&self) -> Result<i64> {
        Ok(ensure_admin(&self.pool, "Admin", "admin@sigescon.test", "000.000.000-00", PASSWORD).await?)
    }

    /// Creates a user holding exactly `roles` as active grants.
    pub async fn seed_user(&self, nome: &str, email: &str, cpf: &str, roles: &[i64]) -> Result<i64> {
        let mut conn = self.pool.acquire().await?;
        let user = insert_user(&mut conn, nome, email, cpf, PASSWORD, None).await?;
        if !roles.is_empty() {
            grants::grant_roles(&mut conn, None, user.id, roles, None).await?;
        }
        Ok(user.id)
    }

    pub async fn login(&self, email: &str) -> Result<(StatusCode, Value)> {
        let req = Request::builder()
            .method("POST")
            .uri("/auth/login")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(format!("username={email}&password={PASSWORD}")))?;
        let resp = self.app.clone().oneshot(req).await?;
        let status = resp.status();
        let bytes = body::to_bytes(resp.into_body(), 10_485_760).await?;
        Ok((status, parse_body(&bytes)?))
    }

    /// Logs in and returns the bearer token, failing the test on any other outcome.
    pub async fn token_for(&self, email: &str) -> Result<String> {
        let (status, body) = self.login(email).await?;
        assert_eq!(status, StatusCode::OK, "login failed for {email}: {body}");
        let token = body
            .get("access_token")
            .and_then(|t| t.as_str())
            .ok_or_else(|| anyhow::anyhow!("no access_token in {body}"))?;
        Ok(token.to_string())
    }

    pub async fn call(&self, method: &str, uri: &str, token: Option<&str>, payload: Option<Value>) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let req = match payload {
            Some(payload) => builder
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))?,
            None => builder.body(Body::empty())?,
        };

        let resp = self.app.clone().oneshot(req).await?;
        let status = resp.status();
        let bytes = body::to_bytes(resp.into_body(), 10_485_760).await?;
        Ok((status, parse_body(&bytes)?))
    }

    /// Creates a contracted party and a contract as the administrator; returns the contract id.
    pub async fn seed_contract(&self, admin_token: &str, nr: &str, gestor_id: i64, fiscal_id: i64) -> Result<i64> {
        let digits: String = nr.chars().filter(|c| c.is_ascii_digit()).collect();
        let cnpj = format!("{digits:0>14}");
        let (status, contracted) = self
            .call(
                "POST",
                "/contratados",
                Some(admin_token),
                Some(json!({
                    "nome": format!("Fornecedor {nr}"),
                    "email": "fornecedor@empresa.test",
                    "cnpj": cnpj
                })),
            )
            .await?;
        assert_eq!(status, StatusCode::CREATED, "contracted party: {contracted}");

        let (status, contract) = self
            .call(
                "POST",
                "/contratos",
                Some(admin_token),
                Some(json!({
                    "nr_contrato": nr,
                    "objeto": "Serviços de manutenção predial",
                    "data_inicio": "2024-01-01",
                    "data_fim": "2024-12-31",
                    "valor_global": 120000.0,
                    "contratado_id": contracted["id"],
                    "modalidade_id": 1,
                    "status_id": 1,
                    "gestor_id": gestor_id,
                    "fiscal_id": fiscal_id
                })),
            )
            .await?;
        assert_eq!(status, StatusCode::CREATED, "contract: {contract}");

        contract["id"]
            .as_i64()
            .ok_or_else(|| anyhow::anyhow!("contract id missing in {contract}"))
    }
}

fn parse_body(bytes: &[u8]) -> Result<Value> {
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_slice(bytes)?)
}
