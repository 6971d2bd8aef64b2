use rocket::http::{ContentType, Status};
use rocket::local::blocking::Client;

use chat_core::identity::{issue_token, Permission};

/// Wrapper around `Client` that auto-deletes the temp DB on drop. Grounded on
/// the teacher's `tests/integration/common.rs::TestClient`.
pub struct TestClient {
    client: Option<Client>,
    db_path: String,
}

impl Drop for TestClient {
    fn drop(&mut self) {
        drop(self.client.take());
        let _ = std::fs::remove_file(&self.db_path);
        let _ = std::fs::remove_file(format!("{}-wal", self.db_path));
        let _ = std::fs::remove_file(format!("{}-shm", self.db_path));
    }
}

impl std::ops::Deref for TestClient {
    type Target = Client;
    fn deref(&self) -> &Client {
        self.client.as_ref().unwrap()
    }
}

pub const TEST_JWT_SECRET: &str = "dev-secret-do-not-use-in-production";

fn unique_db_path() -> String {
    format!("/tmp/chat_core_test_{}.db", uuid::Uuid::new_v4().to_string().split('-').next().unwrap())
}

pub fn test_client() -> TestClient {
    let db_path = unique_db_path();
    let rocket = chat_core::rocket_with_db(&db_path);
    let client = Client::tracked(rocket).expect("valid rocket instance");
    TestClient { client: Some(client), db_path }
}

pub fn test_client_with_config(config: chat_core::config::ServiceConfig) -> TestClient {
    let db_path = unique_db_path();
    let rocket = chat_core::rocket_with_db_and_config(&db_path, config);
    let client = Client::tracked(rocket).expect("valid rocket instance");
    TestClient { client: Some(client), db_path }
}

/// Issues a bearer token for `user_id` signed with the same default secret
/// `ServiceConfig::default()` uses, so it verifies against any client built
/// with `test_client()`/`test_client_with_config` (unless the config
/// overrides `jwt_secret`).
pub fn token_for(user_id: &str) -> String {
    issue_token(
        user_id,
        user_id,
        user_id,
        "user",
        &[Permission::Read, Permission::Create, Permission::Update, Permission::Delete],
        &format!("https://dir.example/u/{user_id}"),
        9_999_999_999,
        TEST_JWT_SECRET,
    )
}

pub fn token_for_with_secret(user_id: &str, secret: &str) -> String {
    issue_token(
        user_id,
        user_id,
        user_id,
        "user",
        &[Permission::Read, Permission::Create, Permission::Update, Permission::Delete],
        &format!("https://dir.example/u/{user_id}"),
        9_999_999_999,
        secret,
    )
}

/// Posts `{action, jwt, data}` to `/do` and returns `(status, envelope)`.
pub fn do_action(client: &Client, action: &str, token: &str, data: serde_json::Value) -> (Status, serde_json::Value) {
    let body = serde_json::json!({ "action": action, "jwt": token, "data": data }).to_string();
    let res = client.post("/do").header(ContentType::JSON).body(body).dispatch();
    let status = res.status();
    let body: serde_json::Value = res.into_json().expect("envelope body");
    (status, body)
}

/// Asserts the envelope signals success and returns its `data`.
pub fn ok_data(resp: &(Status, serde_json::Value)) -> serde_json::Value {
    assert_eq!(resp.0, Status::Ok);
    assert_eq!(resp.1["errorCode"], -1, "expected success, got {:?}", resp.1);
    resp.1["data"].clone()
}

pub fn err_code(resp: &(Status, serde_json::Value)) -> i64 {
    resp.1["errorCode"].as_i64().unwrap()
}

/// Convenience: create a room as `creator` and return its id.
pub fn create_room(client: &Client, creator: &str, name: &str) -> String {
    let resp = do_action(client, "chatRoom.create", &token_for(creator), serde_json::json!({ "name": name }));
    ok_data(&resp)["id"].as_str().unwrap().to_string()
}

/// Convenience: send a message and return its id.
pub fn send_message(client: &Client, sender: &str, room_id: &str, content: &str) -> String {
    let resp = do_action(
        client,
        "message.send",
        &token_for(sender),
        serde_json::json!({ "room_id": room_id, "content": content }),
    );
    ok_data(&resp)["id"].as_str().unwrap().to_string()
}

pub fn add_participant(client: &Client, actor: &str, room_id: &str, user_id: &str, role: &str) {
    let resp = do_action(
        client,
        "participant.add",
        &token_for(actor),
        serde_json::json!({ "room_id": room_id, "user_id": user_id, "role": role }),
    );
    ok_data(&resp);
}
