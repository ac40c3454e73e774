//! Integration tests for the auth service against a real Postgres
//! instance. Each test gets a fresh database. Run with
//! `cargo test -- --ignored` once Postgres is reachable with the
//! configured credentials.

use std::net::TcpListener;

use serde_json::{json, Value};
use sqlx::{Connection, Executor, PgConnection, PgPool, Row};
use uuid::Uuid;

use feedgate::auth::{generate_refresh_token, hash_token, validate_access_token};
use feedgate::configuration::{get_auth_configuration, DatabaseSettings, JwtSettings};
use feedgate::db::init_schema;
use feedgate::startup::run_auth;

pub struct TestApp {
    pub address: String,
    pub db_pool: PgPool,
    pub jwt: JwtSettings,
}

async fn spawn_app() -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let mut configuration = get_auth_configuration().expect("Failed to read configuration.");
    configuration.database.database_name = Uuid::new_v4().to_string();
    let connection_pool = configure_database(&configuration.database).await;

    let jwt = configuration.jwt.clone();
    let server = run_auth(listener, connection_pool.clone(), configuration.jwt)
        .expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        db_pool: connection_pool,
        jwt,
    }
}

pub async fn configure_database(config: &DatabaseSettings) -> PgPool {
    let mut connection = PgConnection::connect(&config.connection_string_without_db())
        .await
        .expect("Failed to connect to Postgres");
    connection
        .execute(&*format!(r#"CREATE DATABASE "{}";"#, config.database_name))
        .await
        .expect("Failed to create database.");

    let connection_pool = PgPool::connect(&config.connection_string())
        .await
        .expect("Failed to connect to Postgres.");
    init_schema(&connection_pool)
        .await
        .expect("Failed to initialize schema.");
    connection_pool
}

async fn register_user(app: &TestApp, username: &str, email: &str, password: &str) -> Value {
    let response = reqwest::Client::new()
        .post(&format!("{}/auth/register", &app.address))
        .json(&json!({ "username": username, "email": email, "password": password }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(201, response.status().as_u16());
    response.json().await.expect("Failed to parse response")
}

async fn login_user(app: &TestApp, identifier: &str, password: &str) -> Value {
    let response = reqwest::Client::new()
        .post(&format!("{}/auth/login", &app.address))
        .json(&json!({ "emailOrUsername": identifier, "password": password }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(200, response.status().as_u16());
    response.json().await.expect("Failed to parse response")
}

// --- Registration ---

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn register_returns_201_and_persists_the_user() {
    let app = spawn_app().await;

    let body = register_user(&app, "alice", "alice@example.com", "CorrectHorse1").await;
    assert_eq!(body["username"], json!("alice"));
    assert_eq!(body["email"], json!("alice@example.com"));
    assert!(body.get("id").is_some());

    let row = sqlx::query("SELECT username, email FROM users WHERE username = 'alice'")
        .fetch_one(&app.db_pool)
        .await
        .expect("Failed to fetch created user");
    assert_eq!(row.get::<String, _>("email"), "alice@example.com");
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn register_returns_400_for_invalid_payloads() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let invalid_bodies = vec![
        (json!({ "email": "a@example.com", "password": "pw" }), "missing username"),
        (json!({ "username": "alice", "password": "pw" }), "missing email"),
        (json!({ "username": "alice", "email": "a@example.com" }), "missing password"),
        (
            json!({ "username": "alice", "email": "notanemail", "password": "GoodEnough1" }),
            "malformed email",
        ),
        (
            json!({ "username": "a b", "email": "a@example.com", "password": "GoodEnough1" }),
            "malformed username",
        ),
    ];

    for (body, reason) in invalid_bodies {
        let response = client
            .post(&format!("{}/auth/register", &app.address))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request.");

        assert_eq!(
            400,
            response.status().as_u16(),
            "Should reject payload: {}",
            reason
        );
        let body: Value = response.json().await.expect("Failed to parse response");
        assert!(body.get("error").is_some());
    }
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn register_returns_400_for_duplicate_username_or_email() {
    let app = spawn_app().await;
    register_user(&app, "alice", "alice@example.com", "CorrectHorse1").await;

    let client = reqwest::Client::new();
    for body in [
        json!({ "username": "alice", "email": "other@example.com", "password": "CorrectHorse1" }),
        json!({ "username": "other", "email": "alice@example.com", "password": "CorrectHorse1" }),
    ] {
        let response = client
            .post(&format!("{}/auth/register", &app.address))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request.");

        assert_eq!(400, response.status().as_u16());
        let body: Value = response.json().await.expect("Failed to parse response");
        assert_eq!(body["error"], json!("Email or username already used"));
    }
}

// --- Login ---

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn login_returns_tokens_whose_subject_is_the_registered_user() {
    let app = spawn_app().await;
    let registered = register_user(&app, "alice", "alice@example.com", "CorrectHorse1").await;

    let body = login_user(&app, "alice", "CorrectHorse1").await;
    assert!(body.get("refreshToken").is_some());
    assert_eq!(body["user"]["id"], registered["id"]);
    assert_eq!(body["user"]["username"], json!("alice"));
    assert_eq!(body["user"]["email"], json!("alice@example.com"));

    // The access token verifies and carries the registered user's id.
    let access_token = body["accessToken"].as_str().expect("Missing access token");
    let claims = validate_access_token(access_token, &app.jwt.access_secret)
        .expect("Access token must verify");
    assert_eq!(json!(claims.sub), registered["id"]);

    // Login by email works the same way.
    let body = login_user(&app, "alice@example.com", "CorrectHorse1").await;
    assert_eq!(body["user"]["username"], json!("alice"));
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn login_with_wrong_password_returns_400_and_appends_an_audit_record() {
    let app = spawn_app().await;
    register_user(&app, "alice", "alice@example.com", "CorrectHorse1").await;

    let response = reqwest::Client::new()
        .post(&format!("{}/auth/login", &app.address))
        .json(&json!({ "emailOrUsername": "alice", "password": "wrong" }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(400, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body, json!({ "error": "Invalid credentials" }));

    let row = sqlx::query(
        "SELECT COUNT(*) AS failures FROM auth_logs WHERE action = 'LOGIN_FAILED' AND user_id IS NOT NULL",
    )
    .fetch_one(&app.db_pool)
    .await
    .expect("Failed to query auth_logs");
    assert_eq!(row.get::<i64, _>("failures"), 1);
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn login_with_unknown_identifier_is_indistinguishable() {
    let app = spawn_app().await;
    register_user(&app, "alice", "alice@example.com", "CorrectHorse1").await;

    let response = reqwest::Client::new()
        .post(&format!("{}/auth/login", &app.address))
        .json(&json!({ "emailOrUsername": "nobody", "password": "CorrectHorse1" }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(400, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body, json!({ "error": "Invalid credentials" }));
}

// --- Refresh ---

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn refresh_token_is_reusable_and_mints_fresh_access_tokens() {
    let app = spawn_app().await;
    register_user(&app, "alice", "alice@example.com", "CorrectHorse1").await;
    let login = login_user(&app, "alice", "CorrectHorse1").await;
    let refresh_token = login["refreshToken"].as_str().expect("Missing refresh token");

    let client = reqwest::Client::new();
    let mut access_tokens = Vec::new();
    for _ in 0..2 {
        let response = client
            .post(&format!("{}/auth/refresh", &app.address))
            .json(&json!({ "refreshToken": refresh_token }))
            .send()
            .await
            .expect("Failed to execute request.");

        assert_eq!(200, response.status().as_u16());
        let body: Value = response.json().await.expect("Failed to parse response");
        access_tokens.push(body["accessToken"].as_str().expect("Missing token").to_string());

        // Distinct issue timestamps so the minted tokens differ.
        tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
    }

    assert_ne!(access_tokens[0], access_tokens[1]);
    for token in &access_tokens {
        validate_access_token(token, &app.jwt.access_secret).expect("Minted token must verify");
    }

    // The refresh token row is untouched — no rotation.
    let row = sqlx::query("SELECT COUNT(*) AS tokens FROM refresh_tokens")
        .fetch_one(&app.db_pool)
        .await
        .expect("Failed to query refresh_tokens");
    assert_eq!(row.get::<i64, _>("tokens"), 1);
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn refresh_fails_once_the_stored_row_is_gone() {
    let app = spawn_app().await;
    register_user(&app, "alice", "alice@example.com", "CorrectHorse1").await;
    let login = login_user(&app, "alice", "CorrectHorse1").await;
    let refresh_token = login["refreshToken"].as_str().expect("Missing refresh token");

    sqlx::query("DELETE FROM refresh_tokens WHERE token_hash = $1")
        .bind(hash_token(refresh_token))
        .execute(&app.db_pool)
        .await
        .expect("Failed to delete refresh token");

    // Signature is still valid; the missing row alone must sink it.
    let response = reqwest::Client::new()
        .post(&format!("{}/auth/refresh", &app.address))
        .json(&json!({ "refreshToken": refresh_token }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body, json!({ "error": "Invalid refresh token" }));
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn refresh_rejects_a_well_signed_token_that_was_never_issued() {
    let app = spawn_app().await;

    let forged = generate_refresh_token(Uuid::new_v4(), "alice", &app.jwt)
        .expect("Failed to generate token");

    let response = reqwest::Client::new()
        .post(&format!("{}/auth/refresh", &app.address))
        .json(&json!({ "refreshToken": forged }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body, json!({ "error": "Invalid refresh token" }));
}

// --- Current user ---

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn me_returns_the_authenticated_user() {
    let app = spawn_app().await;
    register_user(&app, "alice", "alice@example.com", "CorrectHorse1").await;
    let login = login_user(&app, "alice", "CorrectHorse1").await;
    let access_token = login["accessToken"].as_str().expect("Missing access token");

    let response = reqwest::Client::new()
        .get(&format!("{}/auth/me", &app.address))
        .header("Authorization", format!("Bearer {}", access_token))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["username"], json!("alice"));
    assert_eq!(body["email"], json!("alice@example.com"));
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn me_without_a_token_is_rejected() {
    let app = spawn_app().await;

    let response = reqwest::Client::new()
        .get(&format!("{}/auth/me", &app.address))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body, json!({ "error": "No token" }));
}
