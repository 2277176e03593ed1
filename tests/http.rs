use axum::{
    extract::{Query, State},
    routing::get,
    Form, Json, Router,
};
use once_cell::sync::Lazy;
use reqwest::{redirect::Policy, Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::TcpListener;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

#[derive(Debug, Deserialize)]
struct SlotView {
    key: String,
    booked: usize,
    remaining: usize,
    state: String,
}

#[derive(Debug, Deserialize)]
struct SlotsResponse {
    event: String,
    slots: Vec<SlotView>,
}

#[derive(Debug, Deserialize)]
struct SyncResponse {
    remote_enabled: bool,
    appended: usize,
}

struct TestServer {
    base_url: String,
    child: Child,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

static TEST_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));
static SERVER: Lazy<Mutex<Option<Arc<TestServer>>>> = Lazy::new(|| Mutex::new(None));

#[cfg(unix)]
mod cleanup {
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Once;

    static REGISTER: Once = Once::new();
    static PID: AtomicI32 = AtomicI32::new(0);

    pub fn register(pid: u32) {
        REGISTER.call_once(|| {
            PID.store(pid as i32, Ordering::SeqCst);
            unsafe {
                libc::atexit(on_exit);
            }
        });
    }

    extern "C" fn on_exit() {
        let pid = PID.load(Ordering::SeqCst);
        if pid > 0 {
            unsafe {
                libc::kill(pid, libc::SIGTERM);
            }
        }
    }
}

fn pick_free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn unique_data_dir() -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!("swim_booking_http_{}_{}", std::process::id(), nanos));
    std::fs::create_dir_all(&path).unwrap();
    path
}

/// A far-future event to book against and one whose only slot is long gone.
fn write_events_file(dir: &std::path::Path) -> PathBuf {
    let events = json!([
        {
            "id": "lake",
            "label": "Lakeside Splash",
            "location": "Lakeside Pool",
            "storageKey": "lakeReservations",
            "remoteAction": "getReservations",
            "dates": ["2099-06-05"],
            "slots": ["fri-9am", "fri-930am", "fri-10am", "fri-1030am"]
        },
        {
            "id": "past",
            "label": "Millennium Splash",
            "location": "Old Pool",
            "storageKey": "pastReservations",
            "remoteAction": "getReservationsCA",
            "dates": ["2000-01-07"],
            "slots": ["fri-9am"]
        }
    ]);
    let path = dir.join("events.json");
    std::fs::write(&path, serde_json::to_vec_pretty(&events).unwrap()).unwrap();
    path
}

async fn wait_until_ready(base_url: &str) {
    let client = Client::new();
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        if let Ok(resp) = client.get(format!("{base_url}/api/events")).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        if Instant::now() > deadline {
            panic!("server did not become ready");
        }
        sleep(Duration::from_millis(100)).await;
    }
}

async fn spawn_server(remote_url: Option<&str>) -> TestServer {
    let port = pick_free_port();
    let data_dir = unique_data_dir();
    let events_path = write_events_file(&data_dir);

    let mut command = Command::new(env!("CARGO_BIN_EXE_swim_booking"));
    command
        .env("PORT", port.to_string())
        .env("APP_DATA_DIR", &data_dir)
        .env("SWIM_EVENTS_PATH", &events_path)
        .env("SWIM_ADMIN_TOKEN", "lifeguard")
        .env("RUST_LOG", "info")
        .env_remove("SWIM_REMOTE_URL")
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());
    if let Some(url) = remote_url {
        command.env("SWIM_REMOTE_URL", url);
    }
    let child = command.spawn().expect("failed to spawn server");

    let base_url = format!("http://127.0.0.1:{port}");
    let server = TestServer { base_url, child };
    wait_until_ready(&server.base_url).await;
    server
}

async fn shared_server() -> Arc<TestServer> {
    let mut guard = SERVER.lock().await;
    if let Some(server) = guard.as_ref() {
        return Arc::clone(server);
    }
    let server = Arc::new(spawn_server(None).await);
    #[cfg(unix)]
    cleanup::register(server.child.id());
    *guard = Some(Arc::clone(&server));
    server
}

fn registration(slot: &str, child: &str) -> Value {
    json!({
        "slot": slot,
        "childName": child,
        "age": "7",
        "swimmingLevel": "beginner",
        "goals": "swim a width",
        "phone": "555-0100",
        "email": "parent@example.com"
    })
}

async fn slots(client: &Client, base_url: &str, event: &str) -> SlotsResponse {
    client
        .get(format!("{base_url}/api/events/{event}/slots"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

fn no_redirects() -> Client {
    Client::builder().redirect(Policy::none()).build().unwrap()
}

#[tokio::test]
async fn http_third_booking_in_a_slot_is_refused() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    let url = format!("{}/api/events/lake/reservations", server.base_url);

    for child in ["Ava", "Ben"] {
        let response = client.post(&url).json(&registration("fri-9am", child)).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = client.post(&url).json(&registration("fri-9am", "Cal")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let view = slots(&client, &server.base_url, "lake").await;
    assert_eq!(view.event, "lake");
    let slot = view.slots.iter().find(|slot| slot.key == "fri-9am").unwrap();
    assert_eq!(slot.booked, 2);
    assert_eq!(slot.remaining, 0);
    assert_eq!(slot.state, "full");

    let ledger: Value = client.get(&url).send().await.unwrap().json().await.unwrap();
    let names: Vec<&str> = ledger["fri-9am"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["childName"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Ava", "Ben"]);
    assert_eq!(ledger["fri-9am"][0]["timeSlot"], "Friday 9:00 AM");
}

#[tokio::test]
async fn http_passed_and_unknown_slots_are_refused() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let response = client
        .post(format!("{}/api/events/past/reservations", server.base_url))
        .json(&registration("fri-9am", "Ava"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let view = slots(&client, &server.base_url, "past").await;
    assert_eq!(view.slots[0].state, "passed");

    let response = client
        .post(format!("{}/api/events/lake/reservations", server.base_url))
        .json(&registration("sun-9am", "Ava"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = client
        .get(format!("{}/api/events/nowhere/slots", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn http_form_booking_and_cancellation_redirect_with_notices() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = no_redirects();

    let response = client
        .post(format!("{}/events/lake/register", server.base_url))
        .form(&[
            ("slot", "fri-930am"),
            ("childName", "Dara"),
            ("age", "5"),
            ("swimmingLevel", "beginner"),
            ("goals", ""),
            ("phone", "555-0199"),
            ("email", "dara.parent@example.com"),
            ("additionalInfo", ""),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers()["location"],
        "/events/lake?notice=registered"
    );

    let cancel_url = format!("{}/events/lake/cancel", server.base_url);
    let response = client
        .post(&cancel_url)
        .form(&[("slot", "fri-930am"), ("childName", "Dara"), ("email", "wrong@example.com")])
        .send()
        .await
        .unwrap();
    assert_eq!(
        response.headers()["location"],
        "/events/lake?notice=email-mismatch"
    );

    let response = client
        .post(&cancel_url)
        .form(&[("slot", "fri-930am"), ("childName", "dara"), ("email", "Dara.Parent@example.com")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.headers()["location"], "/events/lake?notice=cancelled");

    let view = slots(&Client::new(), &server.base_url, "lake").await;
    let slot = view.slots.iter().find(|slot| slot.key == "fri-930am").unwrap();
    assert_eq!(slot.booked, 0);
    assert_eq!(slot.state, "available");
}

#[tokio::test]
async fn http_admin_actions_need_the_token() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    let reservations = format!("{}/api/events/lake/reservations", server.base_url);

    let response = client.post(&reservations).json(&registration("fri-10am", "Eli")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let cancel_url = format!("{}/api/events/lake/cancel", server.base_url);
    let response = client
        .post(&cancel_url)
        .json(&json!({ "slot": "fri-10am", "index": 0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = client
        .post(&cancel_url)
        .json(&json!({ "slot": "fri-10am", "index": 0, "adminToken": "lifeguard" }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let response = client.delete(&reservations).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let response = client
        .delete(&reservations)
        .header("x-admin-token", "lifeguard")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let ledger: Value = client.get(&reservations).send().await.unwrap().json().await.unwrap();
    assert_eq!(ledger, json!({}));
}

#[tokio::test]
async fn http_pages_switch_sections() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let main = client.get(&server.base_url).send().await.unwrap().text().await.unwrap();
    assert!(main.contains(r#"id="mainPage">"#));
    assert!(main.contains(r#"id="lake" data-event="lake" style="display:none""#));

    let event = client
        .get(format!("{}/events/lake?notice=full", server.base_url))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(event.contains(r#"id="mainPage" style="display:none""#));
    assert!(event.contains(r#"id="lake" data-event="lake">"#));
    assert!(event.contains(r#"id="toast" data-type="error""#));

    let unknown = client
        .get(format!("{}/events/atlantis", server.base_url))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(unknown.contains(r#"id="mainPage">"#));

    let members = client
        .get(format!("{}/members", server.base_url))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(members.contains(r#"id="members-detail">"#));
}

#[derive(Clone, Default)]
struct StubRemote {
    posts: Arc<Mutex<Vec<HashMap<String, String>>>>,
}

async fn stub_get(Query(query): Query<HashMap<String, String>>) -> Json<Value> {
    if query.get("action").map(String::as_str) != Some("getReservations") {
        return Json(json!({ "error": "unknown action" }));
    }
    Json(json!({
        "success": true,
        "reservations": {
            "fri-1030am": [
                { "childName": "Remote Rae", "age": 8, "phone": "555-0142", "timeSlot": "Friday 10:30 AM" }
            ]
        }
    }))
}

async fn stub_post(
    State(stub): State<StubRemote>,
    Form(fields): Form<HashMap<String, String>>,
) -> Json<Value> {
    let cancelling = fields.get("action").map(String::as_str) == Some("cancel");
    stub.posts.lock().await.push(fields);
    if cancelling {
        Json(json!({ "result": "cancelled" }))
    } else {
        Json(json!({ "result": "success" }))
    }
}

async fn spawn_stub_remote() -> (String, StubRemote) {
    let stub = StubRemote::default();
    let app = Router::new()
        .route("/exec", get(stub_get).post(stub_post))
        .with_state(stub.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}/exec"), stub)
}

#[tokio::test]
async fn http_sync_merges_remote_and_forwards_bookings_and_cancellations() {
    let (remote_url, stub) = spawn_stub_remote().await;
    let server = spawn_server(Some(&remote_url)).await;
    let client = Client::new();
    let reservations = format!("{}/api/events/lake/reservations", server.base_url);

    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        let ledger: Value = client.get(&reservations).send().await.unwrap().json().await.unwrap();
        if ledger["fri-1030am"][0]["childName"] == "Remote Rae" {
            assert_eq!(ledger["fri-1030am"][0]["age"], "8");
            break;
        }
        if Instant::now() > deadline {
            panic!("remote reservations were never merged");
        }
        sleep(Duration::from_millis(100)).await;
    }

    let sync: SyncResponse = client
        .post(format!("{}/api/events/lake/sync", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(sync.remote_enabled);
    assert_eq!(sync.appended, 0);

    let response = client
        .post(format!("{}/api/events/past/sync", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let response = client
        .post(&reservations)
        .json(&registration("fri-1030am", "Local Lou"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = client
        .post(&reservations)
        .json(&registration("fri-1030am", "One Too Many"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        let posts = stub.posts.lock().await.clone();
        if let Some(form) = posts.iter().find(|form| form.get("childName").map(String::as_str) == Some("Local Lou")) {
            assert_eq!(form["timeSlot"], "Friday 10:30 AM");
            assert_eq!(form["event"], "Lakeside Splash");
            assert_eq!(form["email"], "parent@example.com");
            break;
        }
        if Instant::now() > deadline {
            panic!("registration was never forwarded");
        }
        sleep(Duration::from_millis(100)).await;
    }
    let response = client
        .post(format!("{}/api/events/lake/cancel", server.base_url))
        .json(&json!({
            "slot": "fri-10:30am",
            "childName": "Local Lou",
            "email": "parent@example.com"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let ledger: Value = client.get(&reservations).send().await.unwrap().json().await.unwrap();
    let names: Vec<&str> = ledger["fri-1030am"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|record| record["childName"].as_str())
        .collect();
    assert_eq!(names, vec!["Remote Rae"]);

    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        let posts = stub.posts.lock().await.clone();
        if let Some(form) = posts.iter().find(|form| form.get("action").map(String::as_str) == Some("cancel")) {
            assert_eq!(form["event"], "Lakeside Splash");
            assert_eq!(form["childName"], "Local Lou");
            assert_eq!(form["email"], "parent@example.com");
            assert_eq!(form["timeSlot"], "Friday 10:30 AM");
            break;
        }
        if Instant::now() > deadline {
            panic!("cancellation was never forwarded");
        }
        sleep(Duration::from_millis(100)).await;
    }
}
