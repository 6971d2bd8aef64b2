use crate::common::{add_participant, create_room, do_action, err_code, ok_data, send_message, test_client, token_for};

#[test]
fn typing_start_and_stop_require_participation() {
    let client = test_client();
    let room_id = create_room(&client, "alice", "room");

    let resp = do_action(&client, "typing.start", &token_for("eve"), serde_json::json!({ "room_id": room_id }));
    assert_eq!(err_code(&resp), 3002);

    let resp = do_action(&client, "typing.start", &token_for("alice"), serde_json::json!({ "room_id": room_id }));
    let indicator = ok_data(&resp);
    assert_eq!(indicator["room_id"], room_id);
    assert_eq!(indicator["user_id"], "alice");

    let resp = do_action(&client, "typing.stop", &token_for("alice"), serde_json::json!({ "room_id": room_id }));
    ok_data(&resp);
}

#[test]
fn presence_update_and_get_bypass_the_participation_check() {
    let client = test_client();

    let resp = do_action(&client, "presence.update", &token_for("alice"), serde_json::json!({ "status": "busy" }));
    let presence = ok_data(&resp);
    assert_eq!(presence["status"], "busy");

    let resp = do_action(&client, "presence.get", &token_for("bob"), serde_json::json!({ "user_id": "alice" }));
    let presence = ok_data(&resp);
    assert_eq!(presence["status"], "busy");
}

#[test]
fn presence_get_for_a_user_with_no_presence_defaults_to_offline() {
    let client = test_client();
    let resp = do_action(&client, "presence.get", &token_for("alice"), serde_json::json!({ "user_id": "nobody" }));
    let presence = ok_data(&resp);
    assert_eq!(presence["status"], "offline");
}

#[test]
fn invalid_presence_status_is_rejected() {
    let client = test_client();
    let resp = do_action(&client, "presence.update", &token_for("alice"), serde_json::json!({ "status": "sleepy" }));
    assert_eq!(err_code(&resp), 1002);
}

#[test]
fn read_receipt_mark_and_get_require_participation() {
    let client = test_client();
    let room_id = create_room(&client, "alice", "room");
    add_participant(&client, "alice", &room_id, "bob", "member");
    let message_id = send_message(&client, "alice", &room_id, "hi");

    let resp = do_action(
        &client,
        "readReceipt.mark",
        &token_for("eve"),
        serde_json::json!({ "message_id": message_id }),
    );
    assert_eq!(err_code(&resp), 3002);

    let resp = do_action(
        &client,
        "readReceipt.mark",
        &token_for("bob"),
        serde_json::json!({ "message_id": message_id }),
    );
    ok_data(&resp);

    let resp = do_action(
        &client,
        "readReceipt.get",
        &token_for("alice"),
        serde_json::json!({ "message_id": message_id }),
    );
    let receipts = ok_data(&resp)["receipts"].as_array().unwrap().clone();
    assert_eq!(receipts.len(), 1);
    assert_eq!(receipts[0]["user_id"], "bob");
}

#[test]
fn reaction_add_remove_and_list_aggregate_per_emoji() {
    let client = test_client();
    let room_id = create_room(&client, "alice", "room");
    add_participant(&client, "alice", &room_id, "bob", "member");
    let message_id = send_message(&client, "alice", &room_id, "hi");

    do_action(
        &client,
        "reaction.add",
        &token_for("alice"),
        serde_json::json!({ "message_id": message_id, "emoji": "\u{1F44D}" }),
    );
    do_action(
        &client,
        "reaction.add",
        &token_for("bob"),
        serde_json::json!({ "message_id": message_id, "emoji": "\u{1F44D}" }),
    );

    let resp = do_action(
        &client,
        "reaction.list",
        &token_for("alice"),
        serde_json::json!({ "message_id": message_id }),
    );
    let reactions = ok_data(&resp)["reactions"].as_array().unwrap().clone();
    assert_eq!(reactions.len(), 1);
    assert_eq!(reactions[0]["count"], 2);

    do_action(
        &client,
        "reaction.remove",
        &token_for("bob"),
        serde_json::json!({ "message_id": message_id, "emoji": "\u{1F44D}" }),
    );

    let resp = do_action(
        &client,
        "reaction.list",
        &token_for("alice"),
        serde_json::json!({ "message_id": message_id }),
    );
    let reactions = ok_data(&resp)["reactions"].as_array().unwrap().clone();
    assert_eq!(reactions[0]["count"], 1);
}

#[test]
fn reaction_add_rejects_a_non_emoji_payload() {
    let client = test_client();
    let room_id = create_room(&client, "alice", "room");
    let message_id = send_message(&client, "alice", &room_id, "hi");

    let resp = do_action(
        &client,
        "reaction.add",
        &token_for("alice"),
        serde_json::json!({ "message_id": message_id, "emoji": "not-an-emoji" }),
    );
    assert_eq!(err_code(&resp), 1002);
}
