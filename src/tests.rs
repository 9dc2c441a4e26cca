//! Integration tests for the Takween backend.

use std::sync::Arc;

use chrono::NaiveTime;
use reqwest::{Client, Method, StatusCode};
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::config::Config;
use crate::db::{init_database, seed_demo_data, Repository};
use crate::events::NotificationHub;
use crate::insights::InsightClient;
use crate::models::TaskStatus;
use crate::search::SearchIndex;
use crate::{create_router, AppState};

const ADMIN: &str = "emp-1";
const INTERIOR_MANAGER: &str = "emp-2";

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    hub: NotificationHub,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        Self::with_psk(Some("test-api-key".to_string())).await
    }

    async fn with_psk(psk: Option<String>) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.sqlite");
        let index_path = temp_dir.path().join("index");

        // Initialize database with the demo data set
        let pool = init_database(&db_path).await.expect("Failed to init DB");
        let repo = Arc::new(Repository::new(pool));
        seed_demo_data(&repo).await.expect("Failed to seed DB");

        // Initialize search index
        let search = Arc::new(SearchIndex::open(&index_path).expect("Failed to init search"));
        let tasks = repo.list_tasks().await.expect("Failed to list tasks");
        search.rebuild(&tasks).await.expect("Failed to build index");

        let config = Config {
            api_psk: psk.clone(),
            db_path,
            index_path,
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "warn".to_string(),
            seed_demo_data: true,
            insight_url: None,
            late_after: NaiveTime::from_hms_opt(9, 15, 0).unwrap(),
        };

        let hub = NotificationHub::new();
        let state = AppState {
            repo,
            search,
            config: Arc::new(config),
            hub: hub.clone(),
            insights: InsightClient::new(None),
        };

        let app = create_router(state);

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        let mut client_builder = Client::builder();
        if let Some(key) = psk {
            let mut headers = reqwest::header::HeaderMap::new();
            headers.insert("x-api-key", key.parse().unwrap());
            client_builder = client_builder.default_headers(headers);
        }

        TestFixture {
            client: client_builder.build().unwrap(),
            base_url,
            hub,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request on behalf of `actor` and decode the envelope.
    async fn call(
        &self,
        method: Method,
        path: &str,
        actor: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = self
            .client
            .request(method, self.url(path))
            .header("x-actor-id", actor);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let resp = request.send().await.unwrap();
        let status = resp.status();
        (status, resp.json().await.unwrap())
    }

    async fn get(&self, path: &str, actor: &str) -> (StatusCode, Value) {
        self.call(Method::GET, path, actor, None).await
    }

    async fn post(&self, path: &str, actor: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, path, actor, Some(body)).await
    }

    async fn put(&self, path: &str, actor: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::PUT, path, actor, Some(body)).await
    }

    /// First active employee with `role` in `department`.
    async fn find_employee(&self, role: &str, department: &str) -> String {
        let (_, body) = self.get("/api/employees", ADMIN).await;
        body["data"]
            .as_array()
            .unwrap()
            .iter()
            .find(|e| e["role"] == role && e["departmentId"] == department)
            .map(|e| e["id"].as_str().unwrap().to_string())
            .expect("no matching employee in demo data")
    }
}

fn ids(list: &Value) -> Vec<String> {
    list.as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_auth_missing_psk() {
    let fixture = TestFixture::new().await;

    // Request without API key
    let resp = Client::new()
        .get(fixture.url("/api/datastore"))
        .header("x-actor-id", ADMIN)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_auth_invalid_psk() {
    let fixture = TestFixture::new().await;

    let resp = Client::new()
        .get(fixture.url("/api/datastore"))
        .header("x-api-key", "wrong-key")
        .header("x-actor-id", ADMIN)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_actor_header_required() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/api/tasks"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let (status, body) = fixture.get("/api/tasks", "emp-unknown").await;
    assert_eq!(status, 401);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_pending_account_is_forbidden() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture
        .post(
            "/api/employees/register",
            ADMIN,
            json!({ "name": "Nour Hassan", "email": "nour@takween.com" }),
        )
        .await;
    assert_eq!(status, 200);
    let pending_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["status"], "PENDING");

    let (status, body) = fixture.get("/api/tasks", &pending_id).await;
    assert_eq!(status, 403);
    assert_eq!(body["error"]["code"], "FORBIDDEN");
}

#[tokio::test]
async fn test_datastore_for_admin() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture.get("/api/datastore", ADMIN).await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["schemaVersion"], 1);
    assert!(body["data"]["revisionId"].is_number());
    assert_eq!(body["data"]["departments"].as_array().unwrap().len(), 6);
    assert_eq!(body["data"]["employees"].as_array().unwrap().len(), 48);
    assert_eq!(body["data"]["projects"].as_array().unwrap().len(), 3);
    assert_eq!(body["data"]["kpiRules"].as_array().unwrap().len(), 5);
    assert!(ids(&body["data"]["tasks"]).contains(&"task-1".to_string()));
}

#[tokio::test]
async fn test_datastore_filtered_by_department() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture.get("/api/datastore", INTERIOR_MANAGER).await;
    assert_eq!(status, 200);

    let employees = body["data"]["employees"].as_array().unwrap();
    assert!(!employees.is_empty());
    assert!(employees.iter().all(|e| e["departmentId"] == "interior"));
    assert!(!ids(&body["data"]["tasks"]).contains(&"task-1".to_string()));
    assert_eq!(ids(&body["data"]["projects"]), vec!["proj-2".to_string()]);
    assert_eq!(ids(&body["data"]["sprints"]), vec!["spr-2".to_string()]);
}

#[tokio::test]
async fn test_datastore_revision() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture.get("/api/datastore/revision", ADMIN).await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert!(body["data"]["revisionId"].is_number());
}

#[tokio::test]
async fn test_hidden_task_is_not_found() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture.get("/api/tasks/task-1", INTERIOR_MANAGER).await;
    assert_eq!(status, 404);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (status, body) = fixture.get("/api/tasks/task-1", ADMIN).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["id"], "task-1");
}

#[tokio::test]
async fn test_create_task_defaults() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture
        .post(
            "/api/tasks",
            ADMIN,
            json!({ "title": "Site survey", "assignedTo": ADMIN }),
        )
        .await;
    assert_eq!(status, 200);
    let task = &body["data"];
    assert_eq!(task["status"], "NEW");
    assert_eq!(task["priority"], "MEDIUM");
    assert_eq!(task["departmentId"], "arch");
    assert_eq!(task["estimatedHours"], 8.0);
    assert_eq!(task["kpiPoints"], 25);
    assert_eq!(task["weight"], 10);
    assert_eq!(task["actualHours"], 0.0);
}

#[tokio::test]
async fn test_create_task_from_kpi_rule() {
    let fixture = TestFixture::new().await;

    let (_, rules) = fixture.get("/api/kpi-rules", ADMIN).await;
    let rule = rules["data"][0].clone();

    let (status, body) = fixture
        .post(
            "/api/tasks",
            ADMIN,
            json!({ "assignedTo": ADMIN, "kpiRuleId": rule["id"] }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["title"], rule["title"]);
    assert_eq!(body["data"]["kpiPoints"], rule["defaultPoints"]);
    assert_eq!(body["data"]["estimatedHours"], rule["defaultHours"]);
}

#[tokio::test]
async fn test_move_task_changes_only_status() {
    let fixture = TestFixture::new().await;

    let (_, before) = fixture.get("/api/tasks/task-1", ADMIN).await;
    let (status, after) = fixture
        .put("/api/tasks/task-1/status", ADMIN, json!({ "status": "REVIEW" }))
        .await;
    assert_eq!(status, 200);

    let before = &before["data"];
    let after = &after["data"];
    assert_eq!(after["status"], "REVIEW");
    for field in [
        "title",
        "description",
        "priority",
        "assignedTo",
        "departmentId",
        "projectId",
        "dueDate",
        "estimatedHours",
        "actualHours",
        "kpiPoints",
        "weight",
    ] {
        assert_eq!(before[field], after[field], "{} changed", field);
    }

    let (_, activity) = fixture.get("/api/activity", ADMIN).await;
    assert_eq!(activity["data"][0]["action"], "moved task to REVIEW");
    assert_eq!(activity["data"][0]["userId"], ADMIN);
}

#[tokio::test]
async fn test_board_columns() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture.get("/api/board", ADMIN).await;
    assert_eq!(status, 200);
    let columns: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["status"].as_str().unwrap())
        .collect();
    assert_eq!(
        columns,
        vec!["NEW", "IN_PROGRESS", "REVIEW", "PENDING", "COMPLETED"]
    );
    assert_eq!(body["data"][1]["tasks"][0]["id"], "task-1");
}

#[tokio::test]
async fn test_optimistic_concurrency_conflict() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture
        .put(
            "/api/tasks/task-1",
            ADMIN,
            json!({ "title": "Renamed", "expectedVersion": 99 }),
        )
        .await;
    assert_eq!(status, 409);
    assert_eq!(body["error"]["code"], "VERSION_MISMATCH");
    assert!(body["error"]["details"]["currentVersion"].is_number());

    let (_, body) = fixture.get("/api/tasks/task-1", ADMIN).await;
    assert_ne!(body["data"]["title"], "Renamed");
}

#[tokio::test]
async fn test_sprint_reopen_requires_admin() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture
        .put(
            "/api/sprints/spr-2/status",
            INTERIOR_MANAGER,
            json!({ "status": "ACTIVE" }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["status"], "ACTIVE");

    let (status, _) = fixture
        .put(
            "/api/sprints/spr-2/status",
            INTERIOR_MANAGER,
            json!({ "status": "CLOSED" }),
        )
        .await;
    assert_eq!(status, 200);

    let (_, before) = fixture.get("/api/sprints", INTERIOR_MANAGER).await;
    let (status, body) = fixture
        .put(
            "/api/sprints/spr-2/status",
            INTERIOR_MANAGER,
            json!({ "status": "ACTIVE" }),
        )
        .await;
    assert_eq!(status, 403);
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    let (_, after) = fixture.get("/api/sprints", INTERIOR_MANAGER).await;
    assert_eq!(after["data"][0]["status"], "CLOSED");
    assert_eq!(before["data"][0]["version"], after["data"][0]["version"]);

    let (status, body) = fixture
        .put("/api/sprints/spr-2/status", ADMIN, json!({ "status": "ACTIVE" }))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["status"], "ACTIVE");
}

#[tokio::test]
async fn test_sprint_invalid_transition() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture
        .put("/api/sprints/spr-2/status", ADMIN, json!({ "status": "CLOSED" }))
        .await;
    assert_eq!(status, 409);
    assert_eq!(body["error"]["code"], "INVALID_TRANSITION");
}

#[tokio::test]
async fn test_sprint_extension_ledger() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture
        .post(
            "/api/sprints/spr-1/extensions",
            ADMIN,
            json!({ "newEndDate": "2024-06-15", "reason": "Client review slipped" }),
        )
        .await;
    assert_eq!(status, 200);
    let sprint = &body["data"];
    assert_eq!(sprint["endDate"], "2024-06-15");
    let extensions = sprint["extensions"].as_array().unwrap();
    assert_eq!(extensions.len(), 1);
    assert_eq!(extensions[0]["oldEndDate"], "2024-05-30");
    assert_eq!(extensions[0]["newEndDate"], "2024-06-15");
    assert_eq!(extensions[0]["extendedBy"], ADMIN);

    let (status, _) = fixture
        .post(
            "/api/sprints/spr-1/extensions",
            ADMIN,
            json!({ "newEndDate": "2024-06-20", "reason": "  " }),
        )
        .await;
    assert_eq!(status, 400);

    let (_, body) = fixture.get("/api/sprints", ADMIN).await;
    let stored = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["id"] == "spr-1")
        .cloned()
        .unwrap();
    assert_eq!(stored["extensions"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_sprint_extension_by_manager_is_forbidden() {
    let fixture = TestFixture::new().await;

    let (status, _) = fixture
        .put(
            "/api/sprints/spr-2/status",
            INTERIOR_MANAGER,
            json!({ "status": "ACTIVE" }),
        )
        .await;
    assert_eq!(status, 200);

    let (status, _) = fixture
        .post(
            "/api/sprints/spr-2/extensions",
            INTERIOR_MANAGER,
            json!({ "newEndDate": "2030-01-01", "reason": "More time" }),
        )
        .await;
    assert_eq!(status, 403);
}

#[tokio::test]
async fn test_kpi_report_permissions() {
    let fixture = TestFixture::new().await;
    let employee = fixture.find_employee("EMPLOYEE", "arch").await;

    let (status, body) = fixture.get("/api/analytics/kpi", &employee).await;
    assert_eq!(status, 403);
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    let (status, body) = fixture.get("/api/analytics/kpi", ADMIN).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["employeeCount"], 48);
    assert_eq!(body["data"]["departments"].as_array().unwrap().len(), 6);
    let ranking = body["data"]["ranking"].as_array().unwrap();
    let scores: Vec<f64> = ranking.iter().map(|r| r["kpi"].as_f64().unwrap()).collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
}

#[tokio::test]
async fn test_project_progress_follows_steps() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture
        .post(
            "/api/projects",
            ADMIN,
            json!({
                "name": "Riverside Villa",
                "client": "Private",
                "budget": 250000.0,
                "deadline": "2030-06-30",
                "managerId": ADMIN,
                "steps": [
                    { "title": "Concept", "weight": 30 },
                    { "title": "Permits", "weight": 70 }
                ]
            }),
        )
        .await;
    assert_eq!(status, 200);
    let project_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["progress"], 0);
    assert_eq!(body["data"]["weightTotal"], 100);
    assert_eq!(body["data"]["weightWarning"], false);

    let permits = body["data"]["tasks"]
        .as_array()
        .unwrap()
        .iter()
        .find(|t| t["title"] == "Permits")
        .map(|t| t["id"].as_str().unwrap().to_string())
        .unwrap();

    let (status, body) = fixture
        .post(&format!("/api/tasks/{}/toggle", permits), ADMIN, json!({}))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["status"], "COMPLETED");

    let (_, body) = fixture
        .get(&format!("/api/projects/{}", project_id), ADMIN)
        .await;
    assert_eq!(body["data"]["progress"], 70);
}

#[tokio::test]
async fn test_toggle_requires_project_manager() {
    let fixture = TestFixture::new().await;
    let leader = fixture.find_employee("TEAM_LEADER", "arch").await;

    let (status, _) = fixture
        .post("/api/tasks/task-1/toggle", &leader, json!({}))
        .await;
    assert_eq!(status, 403);
}

#[tokio::test]
async fn test_search_respects_visibility() {
    let fixture = TestFixture::new().await;

    let (status, _) = fixture
        .post(
            "/api/tasks",
            ADMIN,
            json!({
                "title": "Facade lighting study",
                "description": "Evening renders for the tower",
                "assignedTo": ADMIN
            }),
        )
        .await;
    assert_eq!(status, 200);

    let (status, body) = fixture.get("/api/search?q=facade", ADMIN).await;
    assert_eq!(status, 200);
    let results = body["data"]["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["task"]["title"], "Facade lighting study");

    let (status, body) = fixture.get("/api/search?q=facade", INTERIOR_MANAGER).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["total"], 0);

    let (_, body) = fixture.get("/api/search?q=", ADMIN).await;
    assert_eq!(body["data"]["total"], 0);
}

#[tokio::test]
async fn test_revision_increments_on_writes() {
    let fixture = TestFixture::new().await;

    let (_, body) = fixture.get("/api/datastore/revision", ADMIN).await;
    let initial = body["data"]["revisionId"].as_i64().unwrap();

    let (_, body) = fixture
        .post(
            "/api/tasks",
            ADMIN,
            json!({ "title": "Revision check", "assignedTo": ADMIN }),
        )
        .await;
    let after_create = body["revisionId"].as_i64().unwrap();
    assert!(after_create > initial);

    let task_id = body["data"]["id"].as_str().unwrap().to_string();
    let resp = fixture
        .client
        .delete(fixture.url(&format!("/api/tasks/{}", task_id)))
        .header("x-actor-id", ADMIN)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert!(body["revisionId"].as_i64().unwrap() > after_create);
}

#[tokio::test]
async fn test_validation_errors() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture
        .post("/api/tasks", ADMIN, json!({ "title": "  ", "assignedTo": ADMIN }))
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, _) = fixture
        .post(
            "/api/tasks",
            ADMIN,
            json!({ "title": "Orphan", "assignedTo": "emp-missing" }),
        )
        .await;
    assert_eq!(status, 400);

    let (status, _) = fixture
        .post(
            "/api/sprints",
            ADMIN,
            json!({
                "name": "Backwards",
                "projectId": "proj-1",
                "startDate": "2030-02-01",
                "endDate": "2030-01-01"
            }),
        )
        .await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn test_employee_cannot_edit_tasks() {
    let fixture = TestFixture::new().await;
    let employee = fixture.find_employee("EMPLOYEE", "arch").await;

    let (status, _) = fixture
        .post(
            "/api/tasks",
            &employee,
            json!({ "title": "Self-assigned", "assignedTo": employee }),
        )
        .await;
    assert_eq!(status, 403);

    // Any viewer may still move a visible task
    let (status, _) = fixture
        .put("/api/tasks/task-1/status", &employee, json!({ "status": "PENDING" }))
        .await;
    assert_eq!(status, 200);
}

#[tokio::test]
async fn test_register_and_approve() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture
        .post(
            "/api/employees/register",
            ADMIN,
            json!({ "name": "Omar Fathy", "email": "omar@takween.com" }),
        )
        .await;
    assert_eq!(status, 200);
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = fixture
        .post(
            "/api/employees/register",
            ADMIN,
            json!({ "name": "Omar Again", "email": "OMAR@takween.com" }),
        )
        .await;
    assert_eq!(status, 400);

    let (_, body) = fixture.get("/api/employees/pending", INTERIOR_MANAGER).await;
    assert!(ids(&body["data"]).contains(&id));

    // A department manager cannot staff another department
    let (status, _) = fixture
        .post(
            &format!("/api/employees/{}/approve", id),
            INTERIOR_MANAGER,
            json!({ "role": "EMPLOYEE", "departmentId": "struct" }),
        )
        .await;
    assert_eq!(status, 403);

    let (status, body) = fixture
        .post(
            &format!("/api/employees/{}/approve", id),
            ADMIN,
            json!({ "role": "EMPLOYEE", "departmentId": "struct" }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["status"], "ACTIVE");
    assert_eq!(body["data"]["departmentId"], "struct");

    let (status, _) = fixture
        .post(
            &format!("/api/employees/{}/approve", id),
            ADMIN,
            json!({ "role": "EMPLOYEE", "departmentId": "struct" }),
        )
        .await;
    assert_eq!(status, 409);

    let (status, _) = fixture.get("/api/tasks", &id).await;
    assert_eq!(status, 200);
}

#[tokio::test]
async fn test_attendance_check_in_and_out() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture
        .post("/api/attendance/check-in", ADMIN, json!({}))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["employeeId"], ADMIN);
    assert!(body["data"]["checkOut"].is_null());

    let (status, body) = fixture
        .post("/api/attendance/check-in", ADMIN, json!({}))
        .await;
    assert_eq!(status, 409);
    assert_eq!(body["error"]["code"], "INVALID_TRANSITION");

    let (status, body) = fixture
        .post("/api/attendance/check-out", ADMIN, json!({}))
        .await;
    assert_eq!(status, 200);
    assert!(body["data"]["checkOut"].is_string());

    let (status, _) = fixture
        .post("/api/attendance/check-out", ADMIN, json!({}))
        .await;
    assert_eq!(status, 409);

    let (_, body) = fixture.get("/api/attendance", INTERIOR_MANAGER).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_leave_request_decision() {
    let fixture = TestFixture::new().await;
    let employee = fixture.find_employee("EMPLOYEE", "arch").await;

    let (status, _) = fixture
        .post(
            "/api/leave-requests",
            &employee,
            json!({ "type": "ANNUAL", "startDate": "2030-03-10", "endDate": "2030-03-01" }),
        )
        .await;
    assert_eq!(status, 400);

    let (status, body) = fixture
        .post(
            "/api/leave-requests",
            &employee,
            json!({
                "type": "ANNUAL",
                "startDate": "2030-03-01",
                "endDate": "2030-03-05",
                "reason": "Family trip"
            }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["status"], "PENDING");
    let leave_id = body["data"]["id"].as_str().unwrap().to_string();
    let decision = format!("/api/leave-requests/{}/decision", leave_id);

    let (status, _) = fixture
        .put(&decision, &employee, json!({ "status": "APPROVED" }))
        .await;
    assert_eq!(status, 403);

    let (status, _) = fixture
        .put(&decision, INTERIOR_MANAGER, json!({ "status": "APPROVED" }))
        .await;
    assert_eq!(status, 404);

    let (status, body) = fixture
        .put(&decision, ADMIN, json!({ "status": "APPROVED" }))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["status"], "APPROVED");
    assert_eq!(body["data"]["decidedBy"], ADMIN);

    let (status, _) = fixture
        .put(&decision, ADMIN, json!({ "status": "REJECTED" }))
        .await;
    assert_eq!(status, 409);
}

#[tokio::test]
async fn test_kpi_rule_management() {
    let fixture = TestFixture::new().await;

    let (status, _) = fixture
        .post("/api/kpi-rules", INTERIOR_MANAGER, json!({ "title": "Mood board" }))
        .await;
    assert_eq!(status, 403);

    let (status, body) = fixture
        .post(
            "/api/kpi-rules",
            ADMIN,
            json!({ "title": "Mood board", "defaultPoints": 15, "defaultHours": 3.5 }),
        )
        .await;
    assert_eq!(status, 200);
    let rule_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = fixture
        .call(
            Method::DELETE,
            &format!("/api/kpi-rules/{}", rule_id),
            ADMIN,
            None,
        )
        .await;
    assert_eq!(status, 200);

    let (_, body) = fixture.get("/api/kpi-rules", ADMIN).await;
    assert!(!ids(&body["data"]).contains(&rule_id));
}

#[tokio::test]
async fn test_not_found_errors() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture.get("/api/tasks/task-missing", ADMIN).await;
    assert_eq!(status, 404);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (status, _) = fixture.get("/api/projects/proj-missing", ADMIN).await;
    assert_eq!(status, 404);

    let (status, _) = fixture.get("/api/employees/emp-missing", ADMIN).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_move_task_broadcasts_status_event() {
    let fixture = TestFixture::new().await;
    let mut events = fixture.hub.subscribe();

    for _ in 0..2 {
        let (status, _) = fixture
            .put("/api/tasks/task-1/status", ADMIN, json!({ "status": "REVIEW" }))
            .await;
        assert_eq!(status, 200);

        let event = tokio::time::timeout(tokio::time::Duration::from_secs(1), events.recv())
            .await
            .expect("no status event published")
            .unwrap();
        assert_eq!(event.task_id, "task-1");
        assert_eq!(event.status, TaskStatus::Review);
        assert_eq!(event.actor_id, ADMIN);
        assert_eq!(event.actor_name, "Eng. Ahmed Mahmoud");
    }
}

#[tokio::test]
async fn test_project_detail_hides_other_departments_tasks() {
    let fixture = TestFixture::new().await;
    let structural = fixture.find_employee("TEAM_LEADER", "struct").await;

    let (status, body) = fixture
        .post(
            "/api/tasks",
            ADMIN,
            json!({ "title": "Load calculations", "assignedTo": structural, "projectId": "proj-2" }),
        )
        .await;
    assert_eq!(status, 200);
    let task_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = fixture.get("/api/projects/proj-2", INTERIOR_MANAGER).await;
    assert_eq!(status, 200);
    let tasks = body["data"]["tasks"].as_array().unwrap();
    assert!(tasks.iter().all(|t| t["departmentId"] == "interior"));
    assert!(!ids(&body["data"]["tasks"]).contains(&task_id));
    assert_eq!(body["data"]["taskCount"], 1);

    let (_, body) = fixture.get("/api/projects/proj-2", ADMIN).await;
    assert!(ids(&body["data"]["tasks"]).contains(&task_id));
}

#[tokio::test]
async fn test_manager_cannot_change_admin_role() {
    let fixture = TestFixture::new().await;
    let leader = fixture.find_employee("TEAM_LEADER", "arch").await;

    let (status, body) = fixture
        .put(
            &format!("/api/employees/{}/role", leader),
            ADMIN,
            json!({ "role": "DEPT_MANAGER" }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["role"], "DEPT_MANAGER");

    let (status, body) = fixture
        .put("/api/employees/emp-1/role", &leader, json!({ "role": "EMPLOYEE" }))
        .await;
    assert_eq!(status, 403);
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    let (_, body) = fixture.get("/api/employees/emp-1", ADMIN).await;
    assert_eq!(body["data"]["role"], "ADMIN");
}

#[tokio::test]
async fn test_weights_outside_percentage_rejected() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture
        .post(
            "/api/tasks",
            ADMIN,
            json!({ "title": "Oversized", "assignedTo": ADMIN, "weight": 150 }),
        )
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, _) = fixture
        .put(
            "/api/tasks/task-1",
            ADMIN,
            json!({ "weight": 9223372036854775807i64 }),
        )
        .await;
    assert_eq!(status, 400);

    let (status, _) = fixture
        .post(
            "/api/projects",
            ADMIN,
            json!({
                "name": "Negative weights",
                "deadline": "2030-01-01",
                "managerId": ADMIN,
                "steps": [{ "title": "Concept", "weight": -5 }]
            }),
        )
        .await;
    assert_eq!(status, 400);

    let (status, _) = fixture
        .post(
            "/api/projects/proj-1/steps",
            ADMIN,
            json!({ "title": "Handover", "weight": 1000 }),
        )
        .await;
    assert_eq!(status, 400);

    let (_, body) = fixture.get("/api/tasks/task-1", ADMIN).await;
    assert_eq!(body["data"]["weight"], 20);
}

#[tokio::test]
async fn test_reassigned_task_follows_assignee_department() {
    let fixture = TestFixture::new().await;
    let structural = fixture.find_employee("TEAM_LEADER", "struct").await;

    let (status, body) = fixture
        .put("/api/tasks/task-1", ADMIN, json!({ "assignedTo": structural }))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["departmentId"], "struct");

    let (_, body) = fixture.get("/api/tasks?scope=personal", &structural).await;
    assert!(ids(&body["data"]).contains(&"task-1".to_string()));
}
