use crate::common::{add_participant, create_room, do_action, ok_data, test_client, token_for};

#[test]
fn create_makes_the_creator_an_owner() {
    let client = test_client();
    let resp = do_action(&client, "chatRoom.create", &token_for("alice"), serde_json::json!({ "name": "general" }));
    let room = ok_data(&resp);
    assert_eq!(room["name"], "general");
    assert_eq!(room["created_by"], "alice");

    let resp = do_action(
        &client,
        "participant.list",
        &token_for("alice"),
        serde_json::json!({ "room_id": room["id"] }),
    );
    let participants = ok_data(&resp)["participants"].as_array().unwrap().clone();
    assert_eq!(participants.len(), 1);
    assert_eq!(participants[0]["user_id"], "alice");
    assert_eq!(participants[0]["role"], "owner");
}

#[test]
fn create_rejects_an_empty_name() {
    let client = test_client();
    let resp = do_action(&client, "chatRoom.create", &token_for("alice"), serde_json::json!({ "name": "" }));
    assert_eq!(crate::common::err_code(&resp), 1002);
}

#[test]
fn read_requires_participation() {
    let client = test_client();
    let room_id = create_room(&client, "alice", "private-room");

    let resp = do_action(&client, "chatRoom.read", &token_for("eve"), serde_json::json!({ "room_id": room_id }));
    assert_eq!(crate::common::err_code(&resp), 3002);

    let resp = do_action(&client, "chatRoom.read", &token_for("alice"), serde_json::json!({ "room_id": room_id }));
    let room = ok_data(&resp);
    assert_eq!(room["id"], room_id);
}

#[test]
fn list_is_scoped_to_the_callers_own_rooms() {
    let client = test_client();
    create_room(&client, "alice", "alice-room");
    create_room(&client, "bob", "bob-room");

    let resp = do_action(&client, "chatRoom.list", &token_for("alice"), serde_json::json!({}));
    let rooms = ok_data(&resp)["rooms"].as_array().unwrap().clone();
    assert_eq!(rooms.len(), 1);
    assert_eq!(rooms[0]["name"], "alice-room");
}

#[test]
fn update_requires_admin_role() {
    let client = test_client();
    let room_id = create_room(&client, "alice", "room");
    add_participant(&client, "alice", &room_id, "bob", "member");

    let resp = do_action(
        &client,
        "chatRoom.update",
        &token_for("bob"),
        serde_json::json!({ "room_id": room_id, "name": "renamed" }),
    );
    assert_eq!(crate::common::err_code(&resp), 3002);

    let resp = do_action(
        &client,
        "chatRoom.update",
        &token_for("alice"),
        serde_json::json!({ "room_id": room_id, "name": "renamed" }),
    );
    let room = ok_data(&resp);
    assert_eq!(room["name"], "renamed");
}

#[test]
fn delete_requires_owner_and_is_a_soft_delete() {
    let client = test_client();
    let room_id = create_room(&client, "alice", "to-delete");

    let resp = do_action(&client, "chatRoom.delete", &token_for("alice"), serde_json::json!({ "room_id": room_id }));
    ok_data(&resp);

    let resp = do_action(&client, "chatRoom.read", &token_for("alice"), serde_json::json!({ "room_id": room_id }));
    assert_eq!(crate::common::err_code(&resp), 3000);
}

#[test]
fn entity_binding_is_unique_while_active_and_free_again_after_delete() {
    let client = test_client();
    let resp = do_action(
        &client,
        "chatRoom.create",
        &token_for("alice"),
        serde_json::json!({ "name": "ticket-room", "entity_type": "ticket", "entity_id": "T-1" }),
    );
    let room = ok_data(&resp);

    let resp = do_action(
        &client,
        "chatRoom.create",
        &token_for("bob"),
        serde_json::json!({ "name": "ticket-room-2", "entity_type": "ticket", "entity_id": "T-1" }),
    );
    assert_eq!(crate::common::err_code(&resp), 3001);

    do_action(&client, "chatRoom.delete", &token_for("alice"), serde_json::json!({ "room_id": room["id"] }));

    let resp = do_action(
        &client,
        "chatRoom.create",
        &token_for("bob"),
        serde_json::json!({ "name": "ticket-room-3", "entity_type": "ticket", "entity_id": "T-1" }),
    );
    ok_data(&resp);
}

#[test]
fn get_by_entity_finds_the_active_room() {
    let client = test_client();
    do_action(
        &client,
        "chatRoom.create",
        &token_for("alice"),
        serde_json::json!({ "name": "epic-room", "entity_type": "epic", "entity_id": "E-9" }),
    );

    let resp = do_action(
        &client,
        "chatRoom.getByEntity",
        &token_for("alice"),
        serde_json::json!({ "entity_type": "epic", "entity_id": "E-9" }),
    );
    let room = ok_data(&resp);
    assert_eq!(room["name"], "epic-room");
}
