// tests/common/mod.rs

#![allow(dead_code)]

use exam_portal::{config::Config, db, routes, state::AppState};
use serde_json::{Value, json};
use sqlx::SqlitePool;

pub const ADMIN_EMAIL: &str = "admin@exam.com";
pub const ADMIN_PASSWORD: &str = "admin123";

pub struct TestApp {
    pub address: String,
    pub pool: SqlitePool,
    pub client: reqwest::Client,
}

/// Spawns the app on a random port against a fresh in-memory database
/// with a seeded admin account.
pub async fn spawn_app() -> TestApp {
    let pool = db::connect_in_memory()
        .await
        .expect("Failed to open in-memory database");

    db::migrate(&pool).await.expect("Failed to migrate database");

    let mut config = Config::for_tests("test_secret_for_integration_tests");
    config.admin_email = Some(ADMIN_EMAIL.to_string());
    config.admin_password = Some(ADMIN_PASSWORD.to_string());

    db::seed_admin_user(&pool, &config)
        .await
        .expect("Failed to seed admin");

    let state = AppState {
        pool: pool.clone(),
        config,
    };
    let app = routes::create_router(state);

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        pool,
        client: reqwest::Client::new(),
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn login(&self, email: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn token_for(&self, email: &str, password: &str) -> String {
        let body: Value = self.login(email, password).await.json().await.unwrap();
        body["token"]
            .as_str()
            .expect("login response has a token")
            .to_string()
    }

    pub async fn admin_token(&self) -> String {
        self.token_for(ADMIN_EMAIL, ADMIN_PASSWORD).await
    }

    pub async fn register_student(&self, email: &str, roll_number: &str) -> reqwest::Response {
        self.client
            .post(self.url("/api/auth/register"))
            .json(&json!({
                "name": "Test Student",
                "email": email,
                "password": "password123",
                "confirm_password": "password123",
                "roll_number": roll_number,
                "department": "CS",
            }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Registers a student and returns their bearer token.
    pub async fn student_token(&self, email: &str, roll_number: &str) -> String {
        let resp = self.register_student(email, roll_number).await;
        assert_eq!(resp.status().as_u16(), 201);
        self.token_for(email, "password123").await
    }

    pub async fn get(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn post(&self, path: &str, token: &str, body: Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn put(&self, path: &str, token: &str, body: Value) -> reqwest::Response {
        self.client
            .put(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn delete(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Creates an exam whose questions have the given correct labels, each
    /// with four options. Returns (exam id, question ids in order).
    pub async fn create_exam(&self, admin: &str, title: &str, key: &[&str]) -> (i64, Vec<i64>) {
        let exam: Value = self
            .post(
                "/api/admin/exams",
                admin,
                json!({
                    "title": title,
                    "duration_minutes": 30,
                    "pass_marks": 2,
                }),
            )
            .await
            .json()
            .await
            .unwrap();
        let exam_id = exam["id"].as_i64().expect("exam id");

        let mut question_ids = Vec::new();
        for (i, correct) in key.iter().enumerate() {
            let resp = self
                .post(
                    &format!("/api/admin/exams/{exam_id}/questions"),
                    admin,
                    json!({
                        "prompt": format!("Question {}", i + 1),
                        "options": ["first", "second", "third", "fourth"],
                        "correct_option": correct,
                    }),
                )
                .await;
            assert_eq!(resp.status().as_u16(), 201);
            let q: Value = resp.json().await.unwrap();
            question_ids.push(q["id"].as_i64().unwrap());
        }

        (exam_id, question_ids)
    }
}
