use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use academic_calendar::api::router;
use academic_calendar::crypto::hash_password;
use academic_calendar::db::{connect_in_memory, repository};
use academic_calendar::mail::{MailError, Mailer, OutgoingMail};
use academic_calendar::session::SessionStore;
use academic_calendar::state::AppState;
use academic_calendar::uploads::UploadStore;
use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::extract::connect_info::MockConnectInfo;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "calendar-test-boundary";

#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<OutgoingMail>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        self.sent.lock().unwrap().push(mail.clone());
        Ok(())
    }
}

impl RecordingMailer {
    fn subjects(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|m| m.subject.clone()).collect()
    }
}

struct TestApp {
    state: AppState,
    mailer: Arc<RecordingMailer>,
    dir: TempDir,
}

impl TestApp {
    async fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let uploads = UploadStore::new(dir.path(), 1024 * 1024);
        uploads.ensure_dir().await.unwrap();
        let mailer = Arc::new(RecordingMailer::default());

        let state = AppState {
            db: connect_in_memory().await.expect("Failed to create database"),
            sessions: SessionStore::new("test-secret", Duration::from_secs(3600)),
            uploads,
            mailer: mailer.clone(),
            admin_signup_ip: "127.0.0.1".parse().unwrap(),
        };
        Self { state, mailer, dir }
    }

    fn app(&self) -> Router {
        self.app_from(SocketAddr::from(([127, 0, 0, 1], 40000)))
    }

    fn app_from(&self, peer: SocketAddr) -> Router {
        router(self.state.clone()).layer(MockConnectInfo(peer))
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Value) {
        send_to(self.app(), request).await
    }

    /// Creates the user directly and returns a `Cookie` header value.
    async fn login_as(&self, username: &str, is_admin: bool) -> String {
        let hash = hash_password("secret123").await.unwrap();
        repository::insert_user(&self.state.db, username, &hash, is_admin)
            .await
            .unwrap();

        let (status, headers, _) = self
            .send(json_request(
                "POST",
                "/api/auth/login",
                None,
                json!({"username": username, "password": "secret123"}),
            ))
            .await;
        assert_eq!(status, StatusCode::OK);
        let set_cookie = headers
            .get(header::SET_COOKIE)
            .expect("login sets a cookie")
            .to_str()
            .unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    async fn admin(&self) -> String {
        self.login_as("admin@example.com", true).await
    }

    async fn create_event(&self, cookie: &str, body: Value) -> Value {
        let (status, _, event) = self
            .send(json_request("POST", "/api/events", Some(cookie), body))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", event);
        event
    }

    fn stored_files(&self) -> usize {
        count_files(&self.dir.path().join("uploads"))
    }
}

fn count_files(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
}

async fn send_to(app: Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, headers, body)
}

fn json_request(method: &str, uri: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn empty_request(method: &str, uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn upload_request(uri: &str, cookie: &str, filename: &str, mime: &str, content: &str) -> Request<Body> {
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\nContent-Type: {m}\r\n\r\n{c}\r\n--{b}--\r\n",
        b = BOUNDARY,
        f = filename,
        m = mime,
        c = content
    );
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::COOKIE, cookie)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

fn quiz_one() -> Value {
    json!({"title": "Quiz 1", "category": "quiz", "date": "2024-05-01", "time": "09:00"})
}

#[tokio::test]
async fn health_pings_database() {
    let app = TestApp::new().await;
    let response = app.app().oneshot(empty_request("GET", "/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn wrong_password_is_401_without_cookie() {
    let app = TestApp::new().await;
    app.admin().await;

    let (status, headers, body) = app
        .send(json_request(
            "POST",
            "/api/auth/login",
            None,
            json!({"username": "admin@example.com", "password": "wrong-password"}),
        ))
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(headers.get(header::SET_COOKIE).is_none());
    assert_eq!(body["message"], "Invalid credentials");
}

#[tokio::test]
async fn login_missing_fields_is_400() {
    let app = TestApp::new().await;
    let (status, headers, _) = app
        .send(json_request("POST", "/api/auth/login", None, json!({"username": "admin"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(headers.get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn session_lifecycle() {
    let app = TestApp::new().await;
    let cookie = app.admin().await;

    let (status, _, body) = app.send(empty_request("GET", "/api/auth/user", Some(&cookie))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["username"], "admin@example.com");
    assert_eq!(body["user"]["isAdmin"], true);
    assert!(body["user"].get("passwordHash").is_none());

    let (status, headers, _) = app.send(empty_request("POST", "/api/auth/logout", Some(&cookie))).await;
    assert_eq!(status, StatusCode::OK);
    let cleared = headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
    assert!(cleared.contains("Max-Age=0"));

    let (status, _, _) = app.send(empty_request("GET", "/api/auth/user", Some(&cookie))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn tampered_cookie_is_rejected() {
    let app = TestApp::new().await;
    let cookie = app.admin().await;
    let tampered = format!("{}0", cookie);

    let (status, _, _) = app.send(empty_request("GET", "/api/auth/user", Some(&tampered))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn signup_is_gated_by_peer_address() {
    let app = TestApp::new().await;
    let body = json!({"username": "teacher", "password": "secret123", "isAdmin": true});

    let (status, _, created) = app
        .send(json_request("POST", "/api/auth/signup", None, body.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["user"]["username"], "teacher");
    assert_eq!(created["user"]["isAdmin"], true);

    let (status, _, _) = app
        .send(json_request("POST", "/api/auth/signup", None, body.clone()))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let outsider = app.app_from(SocketAddr::from(([10, 0, 0, 7], 5555)));
    let request = json_request(
        "POST",
        "/api/auth/signup",
        None,
        json!({"username": "someone", "password": "secret123"}),
    );
    let (status, _, _) = send_to(outsider, request).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn signup_rejects_short_password() {
    let app = TestApp::new().await;
    let (status, _, body) = app
        .send(json_request(
            "POST",
            "/api/auth/signup",
            None,
            json!({"username": "teacher", "password": "123"}),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().starts_with("Validation error"));
}

#[tokio::test]
async fn quiz_event_round_trips() {
    let app = TestApp::new().await;
    let cookie = app.admin().await;

    let created = app.create_event(&cookie, quiz_one()).await;
    assert_eq!(created["category"], "quiz");
    let id = created["id"].as_str().unwrap();
    assert!(!id.is_empty());
    assert!(created.get("notification").is_none());

    let (status, _, fetched) = app
        .send(empty_request("GET", &format!("/api/events/{}", id), None))
        .await;
    assert_eq!(status, StatusCode::OK);
    for field in ["id", "title", "category", "date", "time"] {
        assert_eq!(fetched[field], created[field], "field {}", field);
    }
    assert_eq!(fetched["title"], "Quiz 1");
}

#[tokio::test]
async fn event_writes_need_an_admin() {
    let app = TestApp::new().await;

    let (status, _, _) = app
        .send(json_request("POST", "/api/events", None, quiz_one()))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let student = app.login_as("student", false).await;
    let (status, _, body) = app
        .send(json_request("POST", "/api/events", Some(&student), quiz_one()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Admin privileges required");

    let (_, _, events) = app.send(empty_request("GET", "/api/events", None)).await;
    assert_eq!(events.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn invalid_event_payload_lists_problems() {
    let app = TestApp::new().await;
    let cookie = app.admin().await;

    let (status, _, body) = app
        .send(json_request(
            "POST",
            "/api/events",
            Some(&cookie),
            json!({"title": "", "category": "party", "date": "01/05/2024", "time": "9am"}),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["message"].as_str().unwrap();
    assert!(message.starts_with("Validation error: "));
    assert!(message.contains("title is required"));
    assert!(message.contains("YYYY-MM-DD"));
}

#[tokio::test]
async fn malformed_ids_are_400_unknown_ids_404() {
    let app = TestApp::new().await;

    let (status, _, body) = app.send(empty_request("GET", "/api/events/not-a-uuid", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid event ID format");

    let missing = uuid::Uuid::new_v4();
    let (status, _, _) = app
        .send(empty_request("GET", &format!("/api/events/{}", missing), None))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = app
        .send(empty_request("PUT", "/api/notifications/42/mark-sent", None))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_event_applies_patch() {
    let app = TestApp::new().await;
    let cookie = app.admin().await;
    let created = app.create_event(&cookie, quiz_one()).await;
    let uri = format!("/api/events/{}", created["id"].as_str().unwrap());

    let (status, _, updated) = app
        .send(json_request(
            "PUT",
            &uri,
            Some(&cookie),
            json!({"title": "Quiz 1 (moved)", "time": "10:30", "location": "Room 101"}),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "Quiz 1 (moved)");
    assert_eq!(updated["time"], "10:30");
    assert_eq!(updated["location"], "Room 101");
    assert_eq!(updated["date"], "2024-05-01");

    let missing = format!("/api/events/{}", uuid::Uuid::new_v4());
    let (status, _, _) = app
        .send(json_request("PUT", &missing, Some(&cookie), json!({"title": "x"})))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn event_reminder_is_scheduled_before_start() {
    let app = TestApp::new().await;
    let cookie = app.admin().await;

    let mut body = quiz_one();
    body["notify"] = json!({"minutesBefore": 60});
    let created = app.create_event(&cookie, body).await;

    let reminder = &created["notification"];
    assert_eq!(reminder["eventId"], created["id"]);
    assert_eq!(reminder["notifyAt"], "2024-05-01T08:00:00Z");
    assert_eq!(reminder["message"], "New Event (quiz): Quiz 1");
    assert_eq!(reminder["sent"], false);
}

#[tokio::test]
async fn upload_and_download_resource() {
    let app = TestApp::new().await;
    let cookie = app.admin().await;
    let event = app.create_event(&cookie, quiz_one()).await;
    let resources_uri = format!("/api/events/{}/resources", event["id"].as_str().unwrap());

    let (status, _, resource) = app
        .send(upload_request(&resources_uri, &cookie, "notes.txt", "text/plain", "chapter 1-5"))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", resource);
    assert_eq!(resource["originalName"], "notes.txt");
    assert_eq!(resource["fileType"], "text/plain");
    assert_eq!(resource["fileSize"], 11);
    assert_eq!(app.stored_files(), 1);

    let (_, _, listed) = app.send(empty_request("GET", &resources_uri, None)).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let download = format!("/api/resources/{}/download", resource["id"].as_str().unwrap());
    let (status, headers, body) = app.send(empty_request("GET", &download, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("chapter 1-5".to_string()));
    assert_eq!(headers[header::CONTENT_TYPE], "text/plain");
    let disposition = headers[header::CONTENT_DISPOSITION].to_str().unwrap();
    assert!(disposition.starts_with("attachment; filename=\"notes.txt\""));

    let static_uri = format!("/uploads/{}", resource["filename"].as_str().unwrap());
    let (status, _, _) = app.send(empty_request("GET", &static_uri, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _, _) = app.send(empty_request("GET", &static_uri, Some(&cookie))).await;
    assert_eq!(status, StatusCode::OK);

    let delete = format!("/api/resources/{}", resource["id"].as_str().unwrap());
    let (status, _, _) = app.send(empty_request("DELETE", &delete, Some(&cookie))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.stored_files(), 0);

    let (status, _, _) = app.send(empty_request("GET", &download, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn download_with_file_missing_on_disk_is_404() {
    let app = TestApp::new().await;
    let cookie = app.admin().await;
    let event = app.create_event(&cookie, quiz_one()).await;
    let resources_uri = format!("/api/events/{}/resources", event["id"].as_str().unwrap());

    let (status, _, resource) = app
        .send(upload_request(&resources_uri, &cookie, "notes.txt", "text/plain", "chapter 1-5"))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    std::fs::remove_file(app.dir.path().join(resource["filePath"].as_str().unwrap())).unwrap();

    let download = format!("/api/resources/{}/download", resource["id"].as_str().unwrap());
    let (status, _, body) = app.send(empty_request("GET", &download, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "File not found on server storage.");

    // the record itself is still listed
    let (_, _, listed) = app.send(empty_request("GET", &resources_uri, None)).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn download_serves_byte_ranges() {
    let app = TestApp::new().await;
    let cookie = app.admin().await;
    let event = app.create_event(&cookie, quiz_one()).await;
    let resources_uri = format!("/api/events/{}/resources", event["id"].as_str().unwrap());

    let (_, _, resource) = app
        .send(upload_request(&resources_uri, &cookie, "notes.txt", "text/plain", "chapter 1-5"))
        .await;
    let download = format!("/api/resources/{}/download", resource["id"].as_str().unwrap());
    let request = Request::builder()
        .method("GET")
        .uri(&download)
        .header(header::RANGE, "bytes=0-6")
        .body(Body::empty())
        .unwrap();

    let (status, headers, body) = app.send(request).await;
    assert_eq!(status, StatusCode::PARTIAL_CONTENT);
    assert_eq!(body, Value::String("chapter".to_string()));
    assert_eq!(headers[header::CONTENT_TYPE], "text/plain");
    assert!(headers.contains_key(header::CONTENT_DISPOSITION));
}

#[tokio::test]
async fn disallowed_mime_type_leaves_no_file() {
    let app = TestApp::new().await;
    let cookie = app.admin().await;
    let event = app.create_event(&cookie, quiz_one()).await;
    let resources_uri = format!("/api/events/{}/resources", event["id"].as_str().unwrap());

    let (status, _, _) = app
        .send(upload_request(
            &resources_uri,
            &cookie,
            "setup.exe",
            "application/x-msdownload",
            "MZ",
        ))
        .await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(app.stored_files(), 0);

    let (_, _, listed) = app.send(empty_request("GET", &resources_uri, None)).await;
    assert_eq!(listed.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn oversized_upload_leaves_no_file() {
    let app = TestApp::new().await;
    let cookie = app.admin().await;
    let event = app.create_event(&cookie, quiz_one()).await;
    let resources_uri = format!("/api/events/{}/resources", event["id"].as_str().unwrap());

    // just past the store limit but under the body limit
    let content = "x".repeat(1024 * 1024 + 1);
    let (status, _, _) = app
        .send(upload_request(&resources_uri, &cookie, "big.txt", "text/plain", &content))
        .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(app.stored_files(), 0);
}

#[tokio::test]
async fn upload_without_file_is_400() {
    let app = TestApp::new().await;
    let cookie = app.admin().await;
    let event = app.create_event(&cookie, quiz_one()).await;
    let uri = format!("/api/events/{}/resources", event["id"].as_str().unwrap());

    let body = format!("--{b}\r\nContent-Disposition: form-data; name=\"note\"\r\n\r\nhello\r\n--{b}--\r\n", b = BOUNDARY);
    let request = Request::builder()
        .method("POST")
        .uri(&uri)
        .header(header::COOKIE, &cookie)
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", BOUNDARY))
        .body(Body::from(body))
        .unwrap();

    let (status, _, body) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "No file uploaded");
}

#[tokio::test]
async fn deleting_event_cascades() {
    let app = TestApp::new().await;
    let cookie = app.admin().await;

    let mut body = quiz_one();
    body["notify"] = json!({"minutesBefore": 15});
    let event = app.create_event(&cookie, body).await;
    let event_id = event["id"].as_str().unwrap();
    let reminder_id = event["notification"]["id"].as_str().unwrap();
    let resources_uri = format!("/api/events/{}/resources", event_id);

    let (status, _, resource) = app
        .send(upload_request(&resources_uri, &cookie, "slides.pdf", "application/pdf", "%PDF-1.4"))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(app.stored_files(), 1);

    let (status, _, deleted) = app
        .send(empty_request("DELETE", &format!("/api/events/{}", event_id), Some(&cookie)))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["resourcesRemoved"], 1);
    assert_eq!(deleted["notificationsRemoved"], 1);

    let (status, _, _) = app
        .send(empty_request("GET", &format!("/api/events/{}", event_id), None))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _, _) = app.send(empty_request("GET", &resources_uri, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let download = format!("/api/resources/{}/download", resource["id"].as_str().unwrap());
    let (status, _, _) = app.send(empty_request("GET", &download, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _, _) = app
        .send(empty_request("GET", &format!("/api/notifications/{}", reminder_id), None))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(app.stored_files(), 0);
}

#[tokio::test]
async fn mark_sent_is_idempotent() {
    let app = TestApp::new().await;
    let cookie = app.admin().await;

    let (status, _, notification) = app
        .send(json_request(
            "POST",
            "/api/notifications",
            Some(&cookie),
            json!({"message": "Lab report due", "notifyAt": "2024-05-02T09:00:00Z"}),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = notification["id"].as_str().unwrap();
    let uri = format!("/api/notifications/{}/mark-sent", id);

    for _ in 0..2 {
        let (status, _, _) = app.send(empty_request("PUT", &uri, None)).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, _, fetched) = app
        .send(empty_request("GET", &format!("/api/notifications/{}", id), None))
        .await;
    assert_eq!(fetched["sent"], true);
    assert!(fetched["sentAt"].is_string());
}

#[tokio::test]
async fn notification_for_missing_event_is_404() {
    let app = TestApp::new().await;
    let cookie = app.admin().await;

    let (status, _, _) = app
        .send(json_request(
            "POST",
            "/api/notifications",
            Some(&cookie),
            json!({
                "eventId": uuid::Uuid::new_v4().to_string(),
                "message": "orphan",
                "notifyAt": "2024-05-02T09:00:00Z"
            }),
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn notifications_list_newest_first_unless_asked() {
    let app = TestApp::new().await;
    let cookie = app.admin().await;
    for (message, at) in [("early", "2024-05-01T09:00:00Z"), ("late", "2024-05-09T09:00:00Z")] {
        app.send(json_request(
            "POST",
            "/api/notifications",
            Some(&cookie),
            json!({"message": message, "notifyAt": at}),
        ))
        .await;
    }

    let (_, _, desc) = app.send(empty_request("GET", "/api/notifications", None)).await;
    assert_eq!(desc[0]["message"], "late");
    let (_, _, asc) = app
        .send(empty_request("GET", "/api/notifications?order=asc", None))
        .await;
    assert_eq!(asc[0]["message"], "early");
}

#[tokio::test]
async fn send_now_requires_message_and_reports_email() {
    let app = TestApp::new().await;
    let cookie = app.admin().await;

    let (status, _, _) = app
        .send(json_request(
            "POST",
            "/api/notifications/send-now",
            Some(&cookie),
            json!({"message": "   "}),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, body) = app
        .send(json_request(
            "POST",
            "/api/notifications/send-now",
            Some(&cookie),
            json!({"message": "Class cancelled today", "sendEmail": true}),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Announcement processed.");
    assert_eq!(body["emailAttempted"], true);

    // delivery happens on a spawned task
    for _ in 0..50 {
        if !app.mailer.subjects().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(app.mailer.subjects(), vec!["Announcement".to_string()]);
}

#[tokio::test]
async fn calendar_month_grid() {
    let app = TestApp::new().await;
    let cookie = app.admin().await;
    app.create_event(&cookie, quiz_one()).await;

    let (status, _, view) = app.send(empty_request("GET", "/api/calendar/2024/5", None)).await;
    assert_eq!(status, StatusCode::OK);
    let days = view["days"].as_array().unwrap();
    assert_eq!(days.len(), 35);
    assert_eq!(days[3]["date"], "2024-05-01");
    assert_eq!(days[3]["events"][0]["title"], "Quiz 1");

    let (status, _, _) = app.send(empty_request("GET", "/api/calendar/2024/13", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
