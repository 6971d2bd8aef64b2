use rocket::http::Status;

use crate::common::test_client;

#[test]
fn health_reports_ok_with_a_reachable_database() {
    let client = test_client();
    let res = client.get("/health").dispatch();
    assert_eq!(res.status(), Status::Ok);
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "ok");
}

#[test]
fn version_reports_the_crate_version() {
    let client = test_client();
    let res = client.get("/version").dispatch();
    assert_eq!(res.status(), Status::Ok);
    let body: serde_json::Value = res.into_json().unwrap();
    assert!(body["version"].as_str().unwrap().len() > 0);
}

#[test]
fn unknown_route_is_a_404() {
    let client = test_client();
    let res = client.get("/no-such-route").dispatch();
    assert_eq!(res.status(), Status::NotFound);
}

#[test]
fn unknown_action_surfaces_as_1001() {
    let client = test_client();
    let resp = crate::common::do_action(
        &client,
        "chatRoom.teleport",
        &crate::common::token_for("alice"),
        serde_json::json!({}),
    );
    assert_eq!(crate::common::err_code(&resp), 1001);
}

#[test]
fn missing_credential_surfaces_as_1003() {
    let client = test_client();
    let body = serde_json::json!({ "action": "chatRoom.list", "data": {} }).to_string();
    let res = client.post("/do").header(rocket::http::ContentType::JSON).body(body).dispatch();
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["errorCode"], 1003);
}

#[test]
fn malformed_json_body_is_a_400_with_envelope() {
    let client = test_client();
    let res = client
        .post("/do")
        .header(rocket::http::ContentType::JSON)
        .body("{not json")
        .dispatch();
    assert_eq!(res.status(), Status::BadRequest);
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["errorCode"], 1000);
}
