use crate::common::{add_participant, create_room, do_action, err_code, ok_data, test_client, token_for};

#[test]
fn add_requires_moderator_or_above_and_defaults_to_member() {
    let client = test_client();
    let room_id = create_room(&client, "alice", "room");
    add_participant(&client, "alice", &room_id, "bob", "member");

    let resp = do_action(
        &client,
        "participant.add",
        &token_for("bob"),
        serde_json::json!({ "room_id": room_id, "user_id": "carol" }),
    );
    assert_eq!(err_code(&resp), 3002);

    let resp = do_action(
        &client,
        "participant.add",
        &token_for("alice"),
        serde_json::json!({ "room_id": room_id, "user_id": "carol" }),
    );
    let participant = ok_data(&resp);
    assert_eq!(participant["role"], "member");
}

#[test]
fn add_rejects_granting_owner_directly() {
    let client = test_client();
    let room_id = create_room(&client, "alice", "room");

    let resp = do_action(
        &client,
        "participant.add",
        &token_for("alice"),
        serde_json::json!({ "room_id": room_id, "user_id": "bob", "role": "owner" }),
    );
    assert_eq!(err_code(&resp), 1002);
}

#[test]
fn adding_the_same_user_twice_is_a_conflict() {
    let client = test_client();
    let room_id = create_room(&client, "alice", "room");
    add_participant(&client, "alice", &room_id, "bob", "member");

    let resp = do_action(
        &client,
        "participant.add",
        &token_for("alice"),
        serde_json::json!({ "room_id": room_id, "user_id": "bob" }),
    );
    assert_eq!(err_code(&resp), 3001);
}

#[test]
fn the_owner_can_never_be_removed_directly() {
    let client = test_client();
    let room_id = create_room(&client, "alice", "room");

    let resp = do_action(
        &client,
        "participant.remove",
        &token_for("alice"),
        serde_json::json!({ "room_id": room_id, "user_id": "alice" }),
    );
    assert_eq!(err_code(&resp), 3002);
}

#[test]
fn a_member_may_remove_themselves_but_not_others() {
    let client = test_client();
    let room_id = create_room(&client, "alice", "room");
    add_participant(&client, "alice", &room_id, "bob", "member");
    add_participant(&client, "alice", &room_id, "carol", "member");

    let resp = do_action(
        &client,
        "participant.remove",
        &token_for("bob"),
        serde_json::json!({ "room_id": room_id, "user_id": "carol" }),
    );
    assert_eq!(err_code(&resp), 3002);

    let resp = do_action(
        &client,
        "participant.remove",
        &token_for("bob"),
        serde_json::json!({ "room_id": room_id, "user_id": "bob" }),
    );
    ok_data(&resp);
}

#[test]
fn update_role_preserves_the_exactly_one_owner_invariant() {
    let client = test_client();
    let room_id = create_room(&client, "alice", "room");

    let resp = do_action(
        &client,
        "participant.updateRole",
        &token_for("alice"),
        serde_json::json!({ "room_id": room_id, "user_id": "alice", "role": "admin" }),
    );
    assert_eq!(err_code(&resp), 3001);

    add_participant(&client, "alice", &room_id, "bob", "member");
    do_action(
        &client,
        "participant.updateRole",
        &token_for("alice"),
        serde_json::json!({ "room_id": room_id, "user_id": "bob", "role": "owner" }),
    );

    let resp = do_action(
        &client,
        "participant.updateRole",
        &token_for("bob"),
        serde_json::json!({ "room_id": room_id, "user_id": "alice", "role": "admin" }),
    );
    let participant = ok_data(&resp);
    assert_eq!(participant["role"], "admin");

    let resp = do_action(
        &client,
        "participant.remove",
        &token_for("bob"),
        serde_json::json!({ "room_id": room_id, "user_id": "alice" }),
    );
    ok_data(&resp);
}

#[test]
fn mute_and_unmute_require_moderator_or_above() {
    let client = test_client();
    let room_id = create_room(&client, "alice", "room");
    add_participant(&client, "alice", &room_id, "bob", "member");
    add_participant(&client, "alice", &room_id, "carol", "member");

    let resp = do_action(
        &client,
        "participant.mute",
        &token_for("carol"),
        serde_json::json!({ "room_id": room_id, "user_id": "bob" }),
    );
    assert_eq!(err_code(&resp), 3002);

    let resp = do_action(
        &client,
        "participant.mute",
        &token_for("alice"),
        serde_json::json!({ "room_id": room_id, "user_id": "bob" }),
    );
    let participant = ok_data(&resp);
    assert_eq!(participant["is_muted"], true);

    let resp = do_action(
        &client,
        "participant.unmute",
        &token_for("alice"),
        serde_json::json!({ "room_id": room_id, "user_id": "bob" }),
    );
    let participant = ok_data(&resp);
    assert_eq!(participant["is_muted"], false);
}

#[test]
fn list_requires_participation() {
    let client = test_client();
    let room_id = create_room(&client, "alice", "room");

    let resp = do_action(&client, "participant.list", &token_for("eve"), serde_json::json!({ "room_id": room_id }));
    assert_eq!(err_code(&resp), 3002);
}
