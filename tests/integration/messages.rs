use crate::common::{add_participant, create_room, do_action, err_code, ok_data, send_message, test_client, token_for};

#[test]
fn send_requires_participation_and_returns_a_seq() {
    let client = test_client();
    let room_id = create_room(&client, "alice", "room");

    let resp = do_action(
        &client,
        "message.send",
        &token_for("eve"),
        serde_json::json!({ "room_id": room_id, "content": "hi" }),
    );
    assert_eq!(err_code(&resp), 3002);

    let resp = do_action(
        &client,
        "message.send",
        &token_for("alice"),
        serde_json::json!({ "room_id": room_id, "content": "hello" }),
    );
    let message = ok_data(&resp);
    assert_eq!(message["content"], "hello");
    assert_eq!(message["sender_id"], "alice");
    assert_eq!(message["content_format"], "plain");
    assert_eq!(message["type"], "text");
    assert!(message["seq"].as_i64().unwrap() >= 1);
}

#[test]
fn muted_participants_cannot_send() {
    let client = test_client();
    let room_id = create_room(&client, "alice", "room");
    add_participant(&client, "alice", &room_id, "bob", "member");

    do_action(
        &client,
        "participant.mute",
        &token_for("alice"),
        serde_json::json!({ "room_id": room_id, "user_id": "bob" }),
    );

    let resp = do_action(
        &client,
        "message.send",
        &token_for("bob"),
        serde_json::json!({ "room_id": room_id, "content": "hi" }),
    );
    assert_eq!(err_code(&resp), 3002);
}

#[test]
fn reply_and_quote_must_reference_a_message_in_the_same_room() {
    let client = test_client();
    let room_a = create_room(&client, "alice", "room-a");
    let room_b = create_room(&client, "alice", "room-b");
    let msg_in_b = send_message(&client, "alice", &room_b, "over here");

    let resp = do_action(
        &client,
        "message.reply",
        &token_for("alice"),
        serde_json::json!({ "room_id": room_a, "parent_id": msg_in_b, "content": "reply" }),
    );
    assert_eq!(err_code(&resp), 1002);

    let msg_in_a = send_message(&client, "alice", &room_a, "origin");
    let resp = do_action(
        &client,
        "message.reply",
        &token_for("alice"),
        serde_json::json!({ "room_id": room_a, "parent_id": msg_in_a, "content": "reply" }),
    );
    let reply = ok_data(&resp);
    assert_eq!(reply["parent_id"], msg_in_a);
}

#[test]
fn list_defaults_to_fifty_newest_first() {
    let client = test_client();
    let room_id = create_room(&client, "alice", "room");
    let first = send_message(&client, "alice", &room_id, "first");
    let second = send_message(&client, "alice", &room_id, "second");

    let resp = do_action(&client, "message.list", &token_for("alice"), serde_json::json!({ "room_id": room_id }));
    let messages = ok_data(&resp)["messages"].as_array().unwrap().clone();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["id"], second);
    assert_eq!(messages[1]["id"], first);
}

#[test]
fn update_is_sender_only_and_preserves_edit_history() {
    let client = test_client();
    let room_id = create_room(&client, "alice", "room");
    let message_id = send_message(&client, "alice", &room_id, "v1");

    let resp = do_action(
        &client,
        "message.update",
        &token_for("bob"),
        serde_json::json!({ "message_id": message_id, "content": "v2" }),
    );
    assert_eq!(err_code(&resp), 3002);

    let resp = do_action(
        &client,
        "message.update",
        &token_for("alice"),
        serde_json::json!({ "message_id": message_id, "content": "v2" }),
    );
    let message = ok_data(&resp);
    assert_eq!(message["content"], "v2");
    assert_eq!(message["is_edited"], true);

    do_action(
        &client,
        "message.update",
        &token_for("alice"),
        serde_json::json!({ "message_id": message_id, "content": "v3" }),
    );

    let resp = do_action(
        &client,
        "message.getEditHistory",
        &token_for("alice"),
        serde_json::json!({ "message_id": message_id }),
    );
    let history = ok_data(&resp)["history"].as_array().unwrap().clone();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["edit_number"], 1);
    assert_eq!(history[0]["previous_content"], "v1");
    assert_eq!(history[1]["edit_number"], 2);
    assert_eq!(history[1]["previous_content"], "v2");
}

#[test]
fn delete_allows_sender_or_admin_but_not_bystanders() {
    let client = test_client();
    let room_id = create_room(&client, "alice", "room");
    add_participant(&client, "alice", &room_id, "bob", "member");
    add_participant(&client, "alice", &room_id, "carol", "member");

    let bob_msg = send_message(&client, "bob", &room_id, "bobs message");

    let resp = do_action(
        &client,
        "message.delete",
        &token_for("carol"),
        serde_json::json!({ "message_id": bob_msg }),
    );
    assert_eq!(err_code(&resp), 3002);

    let resp = do_action(
        &client,
        "message.delete",
        &token_for("alice"),
        serde_json::json!({ "message_id": bob_msg }),
    );
    ok_data(&resp);
}

#[test]
fn pin_and_unpin_require_moderator_or_above() {
    let client = test_client();
    let room_id = create_room(&client, "alice", "room");
    add_participant(&client, "alice", &room_id, "bob", "member");
    let message_id = send_message(&client, "alice", &room_id, "pin me");

    let resp = do_action(&client, "message.pin", &token_for("bob"), serde_json::json!({ "message_id": message_id }));
    assert_eq!(err_code(&resp), 3002);

    let resp = do_action(&client, "message.pin", &token_for("alice"), serde_json::json!({ "message_id": message_id }));
    let message = ok_data(&resp);
    assert_eq!(message["is_pinned"], true);
    assert_eq!(message["pinned_by"], "alice");

    let resp = do_action(&client, "message.unpin", &token_for("alice"), serde_json::json!({ "message_id": message_id }));
    let message = ok_data(&resp);
    assert_eq!(message["is_pinned"], false);
}

#[test]
fn search_finds_messages_by_content() {
    let client = test_client();
    let room_id = create_room(&client, "alice", "room");
    send_message(&client, "alice", &room_id, "the quick brown fox");
    send_message(&client, "alice", &room_id, "completely unrelated");

    let resp = do_action(
        &client,
        "message.search",
        &token_for("alice"),
        serde_json::json!({ "room_id": room_id, "query": "fox" }),
    );
    let messages = ok_data(&resp)["messages"].as_array().unwrap().clone();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["content"], "the quick brown fox");
}

#[test]
fn content_over_the_configured_byte_limit_is_rejected() {
    let client = test_client();
    let room_id = create_room(&client, "alice", "room");
    let huge = "x".repeat(600 * 1024);

    let resp = do_action(
        &client,
        "message.send",
        &token_for("alice"),
        serde_json::json!({ "room_id": room_id, "content": huge }),
    );
    assert_eq!(err_code(&resp), 1002);
}
