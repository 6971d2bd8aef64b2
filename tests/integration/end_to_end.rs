//! Black-box runs of the six end-to-end scenarios (spec §8) against the
//! full `/do` dispatcher, plus one repository-level check for typing-
//! indicator expiry (no action surfaces "list active typists", so that
//! one piece is verified directly against `Repository` instead of
//! through the dispatcher).

use std::sync::Arc;

use chat_core::db::Db;
use chat_core::repo::Repository;

use crate::common::{add_participant, create_room, do_action, err_code, ok_data, test_client, token_for};

#[test]
fn scenario_owner_transfer_then_removal() {
    let client = test_client();
    let room_id = create_room(&client, "alice", "room");
    add_participant(&client, "alice", &room_id, "bob", "member");

    // Direct removal and sole-owner demotion are both forbidden up front.
    assert_eq!(
        err_code(&do_action(
            &client,
            "participant.remove",
            &token_for("alice"),
            serde_json::json!({ "room_id": room_id, "user_id": "alice" })
        )),
        3002
    );
    assert_eq!(
        err_code(&do_action(
            &client,
            "participant.updateRole",
            &token_for("alice"),
            serde_json::json!({ "room_id": room_id, "user_id": "alice", "role": "admin" })
        )),
        3001
    );

    // Transfer ownership to bob, then demote alice, then remove alice clean.
    ok_data(&do_action(
        &client,
        "participant.updateRole",
        &token_for("alice"),
        serde_json::json!({ "room_id": room_id, "user_id": "bob", "role": "owner" }),
    ));
    ok_data(&do_action(
        &client,
        "participant.updateRole",
        &token_for("bob"),
        serde_json::json!({ "room_id": room_id, "user_id": "alice", "role": "admin" }),
    ));
    ok_data(&do_action(
        &client,
        "participant.remove",
        &token_for("bob"),
        serde_json::json!({ "room_id": room_id, "user_id": "alice" }),
    ));
}

#[test]
fn scenario_edit_history_orders_ascending_by_edit_number() {
    let client = test_client();
    let room_id = create_room(&client, "alice", "room");
    let message_id = crate::common::send_message(&client, "alice", &room_id, "v1");

    for content in ["v2", "v3", "v4"] {
        ok_data(&do_action(
            &client,
            "message.update",
            &token_for("alice"),
            serde_json::json!({ "message_id": message_id, "content": content }),
        ));
    }

    let history = ok_data(&do_action(
        &client,
        "message.getEditHistory",
        &token_for("alice"),
        serde_json::json!({ "message_id": message_id }),
    ))["history"]
        .as_array()
        .unwrap()
        .clone();

    assert_eq!(history.len(), 3);
    let expected_previous = ["v1", "v2", "v3"];
    for (i, entry) in history.iter().enumerate() {
        assert_eq!(entry["edit_number"], (i as i64) + 1);
        assert_eq!(entry["previous_content"], expected_previous[i]);
    }
}

#[test]
fn scenario_non_participant_is_forbidden_everywhere_participation_is_required() {
    let client = test_client();
    let room_id = create_room(&client, "alice", "room");

    assert_eq!(err_code(&do_action(&client, "chatRoom.read", &token_for("mallory"), serde_json::json!({ "room_id": room_id }))), 3002);
    assert_eq!(
        err_code(&do_action(
            &client,
            "message.send",
            &token_for("mallory"),
            serde_json::json!({ "room_id": room_id, "content": "hi" })
        )),
        3002
    );
    assert_eq!(err_code(&do_action(&client, "typing.start", &token_for("mallory"), serde_json::json!({ "room_id": room_id }))), 3002);
    assert_eq!(err_code(&do_action(&client, "participant.list", &token_for("mallory"), serde_json::json!({ "room_id": room_id }))), 3002);
}

#[test]
fn scenario_typing_indicators_expire_after_their_ttl() {
    let db_path = format!("/tmp/chat_core_e2e_{}.db", uuid::Uuid::new_v4());
    let repo = Repository::new(Arc::new(Db::new(&db_path)));
    repo.room_create("alice", "room", "", chat_core::models::RoomType::Group, false, None, None, &serde_json::json!({}))
        .expect("room create");
    repo.typing_start("room-x", "alice").expect("typing start");

    // Not yet expired under a generous TTL.
    let active = repo.typing_list_active("room-x", 3600).expect("list active");
    assert_eq!(active.len(), 1);

    // A negative TTL simulates the clock having moved past the 5s window
    // (spec §3, §8 scenario 4) without an actual sleep.
    let expired = repo.typing_list_active("room-x", -1).expect("list active");
    assert!(expired.is_empty());

    let evicted = repo.typing_evict_stale(-1).expect("evict stale");
    assert_eq!(evicted, 1);

    let _ = std::fs::remove_file(&db_path);
    let _ = std::fs::remove_file(format!("{db_path}-wal"));
    let _ = std::fs::remove_file(format!("{db_path}-shm"));
}

#[test]
fn scenario_rate_limiting_rejects_bursts_past_the_configured_bucket() {
    let config = chat_core::config::ServiceConfig {
        rate_sustained_rps: 5.0,
        rate_burst: 5.0,
        ..Default::default()
    };
    let client = crate::common::test_client_with_config(config);

    for _ in 0..5 {
        ok_data(&do_action(&client, "chatRoom.list", &token_for("alice"), serde_json::json!({})));
    }
    assert_eq!(err_code(&do_action(&client, "chatRoom.list", &token_for("alice"), serde_json::json!({}))), 4000);
}

#[test]
fn scenario_entity_binding_uniqueness_frees_up_after_soft_delete() {
    let client = test_client();
    let room = ok_data(&do_action(
        &client,
        "chatRoom.create",
        &token_for("alice"),
        serde_json::json!({ "name": "incident-room", "entity_type": "incident", "entity_id": "INC-1" }),
    ));

    assert_eq!(
        err_code(&do_action(
            &client,
            "chatRoom.create",
            &token_for("bob"),
            serde_json::json!({ "name": "incident-room-2", "entity_type": "incident", "entity_id": "INC-1" })
        )),
        3001
    );

    ok_data(&do_action(&client, "chatRoom.delete", &token_for("alice"), serde_json::json!({ "room_id": room["id"] })));

    ok_data(&do_action(
        &client,
        "chatRoom.create",
        &token_for("bob"),
        serde_json::json!({ "name": "incident-room-3", "entity_type": "incident", "entity_id": "INC-1" }),
    ));
}
