// tests/admin_tests.rs

mod common;

use common::spawn_app;
use serde_json::{Value, json};

#[tokio::test]
async fn subject_crud() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let created = app
        .post(
            "/api/admin/subjects",
            &admin,
            json!({ "name": "Algorithms", "code": "CS201" }),
        )
        .await;
    assert_eq!(created.status().as_u16(), 201);
    let subject: Value = created.json().await.unwrap();
    let id = subject["id"].as_i64().unwrap();

    let duplicate = app
        .post(
            "/api/admin/subjects",
            &admin,
            json!({ "name": "Algorithms II", "code": "CS201" }),
        )
        .await;
    assert_eq!(duplicate.status().as_u16(), 409);

    let updated = app
        .put(
            &format!("/api/admin/subjects/{id}"),
            &admin,
            json!({ "description": "Sorting and <script>x</script>searching" }),
        )
        .await;
    assert_eq!(updated.status().as_u16(), 200);

    let list: Vec<Value> = app
        .get("/api/admin/subjects", &admin)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["description"], "Sorting and searching");

    assert_eq!(
        app.delete(&format!("/api/admin/subjects/{id}"), &admin).await.status().as_u16(),
        204
    );
    assert_eq!(
        app.delete(&format!("/api/admin/subjects/{id}"), &admin).await.status().as_u16(),
        404
    );
}

#[tokio::test]
async fn exam_crud_and_question_validation() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let (exam_id, question_ids) = app.create_exam(&admin, "Midterm", &["A", "C"]).await;
    assert_eq!(question_ids.len(), 2);

    // Correct option outside the option list.
    let bad = app
        .post(
            &format!("/api/admin/exams/{exam_id}/questions"),
            &admin,
            json!({
                "prompt": "Broken",
                "options": ["yes", "no"],
                "correct_option": "C",
            }),
        )
        .await;
    assert_eq!(bad.status().as_u16(), 400);

    // Too few options.
    let bad = app
        .post(
            &format!("/api/admin/exams/{exam_id}/questions"),
            &admin,
            json!({
                "prompt": "Lonely",
                "options": ["only"],
                "correct_option": "A",
            }),
        )
        .await;
    assert_eq!(bad.status().as_u16(), 400);

    // Shrinking options below the current key is rejected.
    let shrink = app
        .put(
            &format!("/api/admin/questions/{}", question_ids[1]),
            &admin,
            json!({ "options": ["x", "y"] }),
        )
        .await;
    assert_eq!(shrink.status().as_u16(), 400);

    let retarget = app
        .put(
            &format!("/api/admin/questions/{}", question_ids[1]),
            &admin,
            json!({ "options": ["x", "y"], "correct_option": "b", "marks": 3 }),
        )
        .await;
    assert_eq!(retarget.status().as_u16(), 200);

    let detail: Value = app
        .get(&format!("/api/admin/exams/{exam_id}"), &admin)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(detail["title"], "Midterm");
    assert_eq!(detail["question_count"], 2);
    assert_eq!(detail["total_marks"], 4);
    assert_eq!(detail["questions"][1]["correct_option"], "B");

    let update = app
        .put(
            &format!("/api/admin/exams/{exam_id}"),
            &admin,
            json!({ "title": "Midterm (rev)", "duration_minutes": 45 }),
        )
        .await;
    assert_eq!(update.status().as_u16(), 200);

    let exams: Vec<Value> = app.get("/api/admin/exams", &admin).await.json().await.unwrap();
    assert_eq!(exams.len(), 1);
    assert_eq!(exams[0]["title"], "Midterm (rev)");
    assert_eq!(exams[0]["duration_minutes"], 45);

    assert_eq!(
        app.delete(&format!("/api/admin/questions/{}", question_ids[0]), &admin)
            .await
            .status()
            .as_u16(),
        204
    );

    assert_eq!(
        app.delete(&format!("/api/admin/exams/{exam_id}"), &admin).await.status().as_u16(),
        204
    );
    assert_eq!(
        app.get(&format!("/api/admin/exams/{exam_id}"), &admin).await.status().as_u16(),
        404
    );

    // Questions went with the exam.
    let left: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(left, 0);
}

#[tokio::test]
async fn exam_window_must_be_ordered() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let response = app
        .post(
            "/api/admin/exams",
            &admin,
            json!({
                "title": "Backwards",
                "duration_minutes": 10,
                "starts_at": "2030-01-02T10:00:00Z",
                "ends_at": "2030-01-01T10:00:00Z",
            }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 400);

    let response = app
        .post(
            "/api/admin/exams",
            &admin,
            json!({ "title": "Orphan", "duration_minutes": 10, "subject_id": 999 }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn students_are_searchable_and_paginated() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    for i in 0..12 {
        let resp = app
            .register_student(&format!("s{i}@example.com"), &format!("ROLL-{i:02}"))
            .await;
        assert_eq!(resp.status().as_u16(), 201);
    }

    let first: Value = app
        .get("/api/admin/students?page=1", &admin)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(first["total"], 12);
    assert_eq!(first["per_page"], 10);
    assert_eq!(first["total_pages"], 2);
    assert_eq!(first["items"].as_array().unwrap().len(), 10);

    let second: Value = app
        .get("/api/admin/students?page=2", &admin)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(second["items"].as_array().unwrap().len(), 2);

    let search: Value = app
        .get("/api/admin/students?search=ROLL-07", &admin)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(search["total"], 1);
    assert_eq!(search["items"][0]["email"], "s7@example.com");
}

#[tokio::test]
async fn deleting_a_student_removes_their_account() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let token = app.student_token("gone@example.com", "G-1").await;

    let me: Value = app.get("/api/auth/me", &token).await.json().await.unwrap();
    let user_id = me["id"].as_i64().unwrap();

    assert_eq!(
        app.delete(&format!("/api/admin/students/{user_id}"), &admin)
            .await
            .status()
            .as_u16(),
        204
    );

    assert_eq!(app.login("gone@example.com", "password123").await.status().as_u16(), 401);

    let profiles: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM students")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(profiles, 0);

    // Admins are not students.
    let admin_me: Value = app.get("/api/auth/me", &admin).await.json().await.unwrap();
    let admin_id = admin_me["id"].as_i64().unwrap();
    assert_eq!(
        app.delete(&format!("/api/admin/students/{admin_id}"), &admin)
            .await
            .status()
            .as_u16(),
        404
    );
}

#[tokio::test]
async fn dashboard_counts_records() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    app.student_token("dash@example.com", "D-1").await;
    app.create_exam(&admin, "Quiz", &["A"]).await;

    let body: Value = app
        .get("/api/admin/dashboard", &admin)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["total_students"], 1);
    assert_eq!(body["total_exams"], 1);
    assert_eq!(body["total_results"], 0);
    assert_eq!(body["recent_students"][0]["email"], "dash@example.com");
}

#[tokio::test]
async fn huge_page_numbers_return_an_empty_page() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    app.student_token("pager@example.com", "P-1").await;

    for path in [
        "/api/admin/results?page=9223372036854775807",
        "/api/admin/students?page=9223372036854775807",
        "/api/admin/students?page=9223372036854775807&search=P-1",
    ] {
        let response = app.get(path, &admin).await;
        assert_eq!(response.status().as_u16(), 200, "{path}");
        let body: Value = response.json().await.unwrap();
        assert!(body["items"].as_array().unwrap().is_empty(), "{path}");
    }
}

#[tokio::test]
async fn plain_text_is_stored_as_given() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let exam: Value = app
        .post(
            "/api/admin/exams",
            &admin,
            json!({ "title": "Math & Logic", "duration_minutes": 10 }),
        )
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(exam["title"], "Math & Logic");
    let exam_id = exam["id"].as_i64().unwrap();

    let created = app
        .post(
            &format!("/api/admin/exams/{exam_id}/questions"),
            &admin,
            json!({
                "prompt": "Is x < 5 when x = 3?",
                "options": ["x < 5", "<notatag>"],
                "correct_option": "A",
            }),
        )
        .await;
    assert_eq!(created.status().as_u16(), 201);
    let question: Value = created.json().await.unwrap();
    assert_eq!(question["prompt"], "Is x < 5 when x = 3?");
    assert_eq!(question["options"], json!(["x < 5", "<notatag>"]));

    let subject: Value = app
        .post(
            "/api/admin/subjects",
            &admin,
            json!({ "name": "R&D", "code": "RD-1" }),
        )
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(subject["name"], "R&D");
}

#[tokio::test]
async fn blank_text_is_rejected() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let response = app
        .post(
            "/api/admin/exams",
            &admin,
            json!({ "title": "   ", "duration_minutes": 10 }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 400);

    let (exam_id, _) = app.create_exam(&admin, "Blank", &[]).await;
    let response = app
        .post(
            &format!("/api/admin/exams/{exam_id}/questions"),
            &admin,
            json!({ "prompt": "Pick", "options": ["yes", "   "], "correct_option": "A" }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn updates_to_missing_rows_are_404() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    for path in [
        "/api/admin/exams/9999",
        "/api/admin/questions/9999",
        "/api/admin/subjects/9999",
    ] {
        let empty = app.put(path, &admin, json!({})).await;
        assert_eq!(empty.status().as_u16(), 404, "{path}");
    }

    let response = app
        .put("/api/admin/exams/9999", &admin, json!({ "title": "Ghost" }))
        .await;
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn exam_window_can_be_cleared() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let exam: Value = app
        .post(
            "/api/admin/exams",
            &admin,
            json!({
                "title": "Scheduled",
                "duration_minutes": 10,
                "starts_at": "2030-01-01T09:00:00Z",
                "ends_at": "2030-01-01T12:00:00Z",
            }),
        )
        .await
        .json()
        .await
        .unwrap();
    let exam_id = exam["id"].as_i64().unwrap();

    // Omitted bounds stay as they were.
    let response = app
        .put(
            &format!("/api/admin/exams/{exam_id}"),
            &admin,
            json!({ "title": "Scheduled (rev)" }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);
    let detail: Value = app
        .get(&format!("/api/admin/exams/{exam_id}"), &admin)
        .await
        .json()
        .await
        .unwrap();
    assert!(detail["starts_at"].is_string());
    assert!(detail["ends_at"].is_string());

    let response = app
        .put(
            &format!("/api/admin/exams/{exam_id}"),
            &admin,
            json!({ "starts_at": null, "ends_at": null }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);
    let detail: Value = app
        .get(&format!("/api/admin/exams/{exam_id}"), &admin)
        .await
        .json()
        .await
        .unwrap();
    assert!(detail["starts_at"].is_null());
    assert!(detail["ends_at"].is_null());

    // A new start must still precede the existing end.
    app.put(
        &format!("/api/admin/exams/{exam_id}"),
        &admin,
        json!({ "ends_at": "2030-01-01T12:00:00Z" }),
    )
    .await;
    let response = app
        .put(
            &format!("/api/admin/exams/{exam_id}"),
            &admin,
            json!({ "starts_at": "2030-01-02T09:00:00Z" }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 400);
}
