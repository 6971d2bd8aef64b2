use chat_core::config::ServiceConfig;

use crate::common::{do_action, err_code, ok_data, test_client_with_config, token_for};

#[test]
fn a_burst_beyond_the_configured_limit_is_rate_limited() {
    let config = ServiceConfig {
        rate_sustained_rps: 5.0,
        rate_burst: 5.0,
        ..Default::default()
    };
    let client = test_client_with_config(config);

    for _ in 0..5 {
        let resp = do_action(&client, "chatRoom.list", &token_for("alice"), serde_json::json!({}));
        ok_data(&resp);
    }

    let resp = do_action(&client, "chatRoom.list", &token_for("alice"), serde_json::json!({}));
    assert_eq!(err_code(&resp), 4000);
}

#[test]
fn rate_limiting_is_scoped_per_caller() {
    let config = ServiceConfig {
        rate_sustained_rps: 2.0,
        rate_burst: 2.0,
        ..Default::default()
    };
    let client = test_client_with_config(config);

    for _ in 0..2 {
        ok_data(&do_action(&client, "chatRoom.list", &token_for("alice"), serde_json::json!({})));
    }
    assert_eq!(err_code(&do_action(&client, "chatRoom.list", &token_for("alice"), serde_json::json!({}))), 4000);

    // A different caller has its own bucket and is unaffected by alice's burst.
    ok_data(&do_action(&client, "chatRoom.list", &token_for("bob"), serde_json::json!({})));
}
