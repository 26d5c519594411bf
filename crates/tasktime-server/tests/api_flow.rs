//! HTTP tests driving the router in-process with a manual clock.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use chrono::{DateTime, Duration, Utc};
use insta::assert_snapshot;
use serde_json::{Value, json};
use tasktime_core::ManualClock;
use tasktime_db::Database;
use tasktime_server::auth::TokenKeys;
use tasktime_server::{AppState, router};
use tower::ServiceExt;

const SECRET: &str = "integration-test-secret-0123456789";

fn at(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

struct TestApp {
    router: Router,
    clock: Arc<ManualClock>,
}

impl TestApp {
    fn new() -> Self {
        let clock = Arc::new(ManualClock::new(at("2025-03-10T10:00:00+05:30")));
        let state = AppState::new(
            Database::open_in_memory().unwrap(),
            clock.clone(),
            TokenKeys::new(SECRET, 3600),
        );
        Self {
            router: router(state, &[]),
            clock,
        }
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn register(&self, email: &str) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/users/register",
                None,
                Some(json!({ "name": "Asha", "email": email, "password": "secret123" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["token"].as_str().unwrap().to_string()
    }

    async fn create_task(&self, token: &str, title: &str) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/tasks",
                Some(token),
                Some(json!({ "title": title })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn track_a_task_for_65_seconds() {
    let app = TestApp::new();
    let token = app.register("a@x.com").await;
    let task = app.create_task(&token, "Write report").await;

    let (status, started) = app
        .send(Method::POST, &format!("/timelog/start/{task}"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(started["task"]["title"], "Write report");
    assert_eq!(started["endTime"], Value::Null);
    let log = started["id"].as_str().unwrap().to_string();

    app.clock.advance(Duration::seconds(65));
    let (status, stopped) = app
        .send(Method::POST, &format!("/timelog/stop/{log}"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stopped["duration"], 65);

    let (_, tasks) = app.send(Method::GET, "/tasks", Some(&token), None).await;
    assert_eq!(tasks[0]["timeSpent"], 65);

    let (status, summary) = app
        .send(
            Method::GET,
            "/summary/today?date=2025-03-10",
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["totalTimeToday"], 65);
    assert_eq!(summary["tasksWorkedOn"], 1);
    assert_eq!(
        summary["taskBreakdown"],
        json!([{ "title": "Write report", "timeSpent": 65 }])
    );
    assert_eq!(summary["hourlyBreakdown"][10], 65);

    let (_, total) = app
        .send(Method::GET, &format!("/timelog/total/{task}"), Some(&token), None)
        .await;
    assert_eq!(total, json!({ "totalTimeMs": 65_000, "totalTimeMinutes": 1 }));

    let (_, day) = app
        .send(Method::GET, "/timelog/day?date=2025-03-10", Some(&token), None)
        .await;
    assert_eq!(day.as_array().unwrap().len(), 1);
    assert_eq!(day[0]["taskTitle"], "Write report");
    assert_eq!(day[0]["duration"], 65);
}

#[tokio::test]
async fn stopping_twice_is_rejected_without_double_counting() {
    let app = TestApp::new();
    let token = app.register("a@x.com").await;
    let task = app.create_task(&token, "Write report").await;
    let (_, started) = app
        .send(Method::POST, &format!("/timelog/start/{task}"), Some(&token), None)
        .await;
    let log = started["id"].as_str().unwrap().to_string();
    app.clock.advance(Duration::seconds(30));
    app.send(Method::POST, &format!("/timelog/stop/{log}"), Some(&token), None)
        .await;

    app.clock.advance(Duration::seconds(30));
    let (status, body) = app
        .send(Method::POST, &format!("/timelog/stop/{log}"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_timer_state");

    let (_, tasks) = app.send(Method::GET, "/tasks", Some(&token), None).await;
    assert_eq!(tasks[0]["timeSpent"], 30);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_starts_leave_one_running_timer() {
    let app = TestApp::new();
    let token = app.register("a@x.com").await;
    let first = app.create_task(&token, "Write report").await;
    let second = app.create_task(&token, "Review").await;

    let first_uri = format!("/timelog/start/{first}");
    let second_uri = format!("/timelog/start/{second}");
    let (a, b) = tokio::join!(
        app.send(Method::POST, &first_uri, Some(&token), None),
        app.send(Method::POST, &second_uri, Some(&token), None),
    );

    let mut statuses = [a.0, b.0];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::CREATED, StatusCode::BAD_REQUEST]);
    let rejected = if a.0 == StatusCode::BAD_REQUEST { a.1 } else { b.1 };
    assert_snapshot!(
        rejected.to_string(),
        @r#"{"error":"A task is already being tracked. Please stop it first.","kind":"timer_already_active"}"#
    );

    let (_, active) = app
        .send(Method::GET, "/timelog/active", Some(&token), None)
        .await;
    assert_eq!(active.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn active_timer_survives_reload_and_clears_on_stop() {
    let app = TestApp::new();
    let token = app.register("a@x.com").await;
    let task = app.create_task(&token, "Write report").await;
    let (_, started) = app
        .send(Method::POST, &format!("/timelog/start/{task}"), Some(&token), None)
        .await;

    let (status, active) = app
        .send(Method::GET, "/timelog/active", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(active[0]["id"], started["id"]);
    assert_eq!(active[0]["task"]["id"], task.as_str());
    assert_eq!(active[0]["startTime"], started["startTime"]);

    let log = started["id"].as_str().unwrap();
    app.clock.advance(Duration::seconds(5));
    app.send(Method::POST, &format!("/timelog/stop/{log}"), Some(&token), None)
        .await;
    let (_, active) = app
        .send(Method::GET, "/timelog/active", Some(&token), None)
        .await;
    assert_eq!(active, json!([]));

    let (_, logs) = app
        .send(Method::GET, &format!("/timelog/{task}"), Some(&token), None)
        .await;
    assert_eq!(logs.as_array().unwrap().len(), 1);
    assert_eq!(logs[0]["duration"], 5);
}

#[tokio::test]
async fn protected_routes_need_a_valid_token() {
    let app = TestApp::new();

    let (status, body) = app.send(Method::GET, "/tasks", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["kind"], "unauthenticated");

    let (status, _) = app
        .send(Method::GET, "/tasks", Some("not-a-token"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = app.register("a@x.com").await;
    app.clock.advance(Duration::hours(2));
    let (status, body) = app.send(Method::GET, "/tasks", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Token expired");
}

#[tokio::test]
async fn tasks_of_other_users_are_off_limits() {
    let app = TestApp::new();
    let alice = app.register("a@x.com").await;
    let bob = app.register("b@x.com").await;
    let task = app.create_task(&alice, "Write report").await;

    let (status, body) = app
        .send(Method::POST, &format!("/timelog/start/{task}"), Some(&bob), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["kind"], "forbidden");

    let (status, body) = app
        .send(
            Method::PUT,
            &format!("/tasks/{task}"),
            Some(&bob),
            Some(json!({ "title": "Hijacked" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["kind"], "forbidden");

    let (status, body) = app
        .send(Method::POST, "/timelog/start/missing", Some(&bob), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");

    let (_, tasks) = app.send(Method::GET, "/tasks", Some(&bob), None).await;
    assert_eq!(tasks, json!([]));
}

#[tokio::test]
async fn task_edits_and_deletes() {
    let app = TestApp::new();
    let token = app.register("a@x.com").await;
    let task = app.create_task(&token, "Write report").await;

    let (status, updated) = app
        .send(
            Method::PUT,
            &format!("/tasks/{task}"),
            Some(&token),
            Some(json!({ "status": "completed" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "completed");

    let (_, summary) = app
        .send(
            Method::GET,
            "/summary/today?date=2025-03-10",
            Some(&token),
            None,
        )
        .await;
    assert_eq!(summary["tasksCompleted"], 1);
    assert_eq!(summary["completedTaskTitles"], json!(["Write report"]));

    let (status, _) = app
        .send(Method::DELETE, &format!("/tasks/{task}"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, tasks) = app.send(Method::GET, "/tasks", Some(&token), None).await;
    assert_eq!(tasks, json!([]));

    let (status, body) = app
        .send(
            Method::POST,
            "/tasks",
            Some(&token),
            Some(json!({ "title": "   " })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation_error");
}

#[tokio::test]
async fn day_queries_need_a_date() {
    let app = TestApp::new();
    let token = app.register("a@x.com").await;

    for uri in [
        "/timelog/day",
        "/summary/today",
        "/summary/today?date=10-03-2025",
        "/summary/today?date=-262143-01-01",
        "/timelog/day?date=-262143-01-01",
    ] {
        let (status, body) = app.send(Method::GET, uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["kind"], "validation_error", "{uri}");
    }

    let (status, summary) = app
        .send(
            Method::GET,
            "/summary/today?date=2025-03-11",
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["totalTimeToday"], 0);
    assert_eq!(summary["hourlyBreakdown"].as_array().unwrap().len(), 24);
}

#[tokio::test]
async fn bad_request_bodies_are_validation_errors() {
    let app = TestApp::new();
    let token = app.register("a@x.com").await;
    let task = app.create_task(&token, "Write report").await;

    let cases = [
        (Method::POST, "/tasks".to_string(), Some(token.as_str()), json!({})),
        (
            Method::POST,
            "/tasks".to_string(),
            Some(token.as_str()),
            json!({ "title": 42 }),
        ),
        (
            Method::PUT,
            format!("/tasks/{task}"),
            Some(token.as_str()),
            json!({ "status": "done" }),
        ),
        (
            Method::POST,
            "/users/register".to_string(),
            None,
            json!({ "email": "b@x.com", "password": "secret123" }),
        ),
        (
            Method::POST,
            "/users/login".to_string(),
            None,
            json!({ "email": "a@x.com" }),
        ),
    ];
    for (method, uri, token, body) in cases {
        let (status, response) = app.send(method, &uri, token, Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}: {response}");
        assert_eq!(response["kind"], "validation_error", "{uri}");
        assert!(response["error"].is_string(), "{uri}");
    }

    let request = Request::builder()
        .method(Method::POST)
        .uri("/tasks")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"title\": "))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["kind"], "validation_error");

    let request = Request::builder()
        .method(Method::POST)
        .uri("/users/login")
        .body(Body::from(r#"{"email":"a@x.com","password":"secret123"}"#))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let (status, tasks) = app.send(Method::GET, "/tasks", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tasks.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn registration_and_login() {
    let app = TestApp::new();
    app.register("a@x.com").await;

    let (status, body) = app
        .send(
            Method::POST,
            "/users/register",
            None,
            Some(json!({ "name": "Other", "email": "A@X.com", "password": "secret123" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "email_taken");

    let (status, body) = app
        .send(
            Method::POST,
            "/users/register",
            None,
            Some(json!({ "name": "Short", "email": "s@x.com", "password": "short" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation_error");

    let (status, body) = app
        .send(
            Method::POST,
            "/users/login",
            None,
            Some(json!({ "email": "a@x.com", "password": "wrong-password" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["kind"], "invalid_credentials");

    let (status, body) = app
        .send(
            Method::POST,
            "/users/login",
            None,
            Some(json!({ "email": "A@x.com", "password": "secret123" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "a@x.com");
    assert!(body["user"].get("passwordHash").is_none());

    let token = body["token"].as_str().unwrap();
    let (status, _) = app.send(Method::GET, "/tasks", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn health_reports_ok() {
    let app = TestApp::new();
    let (status, body) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}
