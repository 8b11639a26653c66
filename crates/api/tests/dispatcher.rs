//! End-to-end scenarios through the dispatcher against the in-memory store.

mod common;

use chrono::Duration;
use serde_json::json;

use common::Harness;
use estate_core::{GroupStore, UserStore};

const PING: u64 = 0;
const LOG_OUT: u64 = 3;
const USER_INFO: u64 = 4;
const USER_EDIT: u64 = 5;
const SET_MANAGES_GROUPS: u64 = 6;
const USER_LIST_GROUPS: u64 = 7;
const GROUP_CREATE: u64 = 8;
const GROUP_REMOVE: u64 = 9;
const GROUP_MEMBERSHIP: u64 = 10;
const GROUP_INFO: u64 = 11;
const STRUCT_CREATE: u64 = 12;
const STRUCT_INFO: u64 = 13;
const STRUCT_REMOVE: u64 = 15;
const STRUCT_FIND: u64 = 16;
const TASK_CREATE: u64 = 17;
const TASK_INFO: u64 = 18;
const TASK_EDIT: u64 = 19;
const TASK_FIND: u64 = 21;

#[tokio::test]
async fn ping_needs_nothing() {
    let h = Harness::new();
    let res = h.dispatcher.dispatch_frame(br#"{"function":0}"#).await;
    assert_eq!(res.code, 0);
    assert!(res.data.is_none());
    assert_eq!(h.call(PING, json!({})).await.code, 0);
    assert_eq!(h.call(PING, json!({"x": 1})).await.code, 253);
}

#[tokio::test]
async fn alice_session_lifecycle() {
    let h = Harness::new();
    h.register("alice", "pw1").await;
    let token = h.login("alice", "pw1").await;

    let info = h.call(USER_INFO, json!({ "token": token, "login": "alice" })).await;
    assert_eq!(info.code, 0);
    let data = info.data.unwrap();
    assert_eq!(data["login"], "alice");
    assert_eq!(data["manages_groups"], false);
    assert!(data.get("pass_hash").is_none());

    assert_eq!(h.call(LOG_OUT, json!({ "token": token })).await.code, 0);
    assert_eq!(h.call(LOG_OUT, json!({ "token": token })).await.code, 4);
    assert_eq!(
        h.call(USER_INFO, json!({ "token": token, "login": "alice" })).await.code,
        4
    );
}

#[tokio::test]
async fn login_failures_map_to_their_codes() {
    let h = Harness::new();
    h.register("alice", "pw1").await;

    let wrong = h.call(2, json!({ "login": "alice", "password": "nope" })).await;
    assert_eq!(wrong.code, 3);
    assert!(wrong.data.is_none());

    let missing = h.call(2, json!({ "login": "ghost", "password": "pw1" })).await;
    assert_eq!(missing.code, 2);
}

#[tokio::test]
async fn expired_token_is_not_logged_in() {
    let h = Harness::new();
    h.register("alice", "pw1").await;
    let token = h.login("alice", "pw1").await;

    h.clock.advance(Duration::days(2));
    let res = h.call(USER_INFO, json!({ "token": token, "login": "alice" })).await;
    assert_eq!(res.code, 4);
}

#[tokio::test]
async fn duplicate_registration_is_already_exists() {
    let h = Harness::new();
    h.register("alice", "pw1").await;

    let dup = h
        .call(
            1,
            json!({ "login": "alice", "password": "x", "first_name": "Eve", "last_name": "E" }),
        )
        .await;
    assert_eq!(dup.code, 1);

    let stored = h.store.user_by_login("alice").await.unwrap();
    assert_eq!(stored.first_name, "Test");
    h.login("alice", "pw1").await;
}

#[tokio::test]
async fn bob_needs_the_capability_to_create_groups() {
    let h = Harness::new();
    h.register("bob", "pw2").await;
    let token = h.login("bob", "pw2").await;

    let denied = h.call(GROUP_CREATE, json!({ "token": token, "name": "ops" })).await;
    assert_eq!(denied.code, 5);
    assert!(h.store.group_by_name("ops").await.is_err());

    estate_api::server::bootstrap_admin(&*h.store, "bob").await.unwrap();
    // Unknown logins are skipped, not errors.
    estate_api::server::bootstrap_admin(&*h.store, "nobody").await.unwrap();

    let created = h.call(GROUP_CREATE, json!({ "token": token, "name": "ops" })).await;
    assert_eq!(created.code, 0);
    let id = created.data.unwrap()["id"].as_i64().unwrap();

    let info = h.call(GROUP_INFO, json!({ "token": token, "name": "ops" })).await;
    let data = info.data.unwrap();
    assert_eq!(data["id"], id);
    assert_eq!(data["count"], 0);
    assert_eq!(data["members"], json!([]));
}

#[tokio::test]
async fn undeclared_field_is_rejected_before_any_mutation() {
    let h = Harness::new();
    let res = h
        .call(
            1,
            json!({
                "login": "mallory",
                "password": "pw",
                "first_name": "M",
                "last_name": "M",
                "manages_groups": true,
            }),
        )
        .await;
    assert_eq!(res.code, 253);
    assert!(res.data.is_none());
    assert!(h.store.user_by_login("mallory").await.is_err());
}

#[tokio::test]
async fn malformed_frames_and_unknown_functions() {
    let h = Harness::new();
    assert_eq!(h.dispatcher.dispatch_frame(b"not json").await.code, 253);
    assert_eq!(h.dispatcher.dispatch_frame(br#"{"args":{}}"#).await.code, 253);
    assert_eq!(
        h.dispatcher.dispatch_frame(br#"{"function":1,"args":{},"extra":0}"#).await.code,
        253
    );
    assert_eq!(h.call(99, json!({})).await.code, 254);
    // Unknown selector wins over bad args.
    assert_eq!(h.call(99, json!("garbage")).await.code, 254);
    // Missing args for a function that needs them.
    assert_eq!(h.dispatcher.dispatch_frame(br#"{"function":2}"#).await.code, 253);
}

#[tokio::test]
async fn argument_decoding_precedes_authentication() {
    let h = Harness::new();
    let res = h
        .call(GROUP_CREATE, json!({ "token": "bogus", "name": "ops", "extra": 1 }))
        .await;
    assert_eq!(res.code, 253);

    let res = h.call(GROUP_CREATE, json!({ "token": "bogus", "name": "ops" })).await;
    assert_eq!(res.code, 4);
}

#[tokio::test]
async fn user_edit_targets_only_the_session_owner() {
    let h = Harness::new();
    h.register("alice", "pw1").await;
    h.register("carol", "pw3").await;
    let token = h.login("alice", "pw1").await;

    let res = h
        .call(USER_EDIT, json!({ "token": token, "first_name": "Alicia", "password": "pw9" }))
        .await;
    assert_eq!(res.code, 0);

    let alice = h.store.user_by_login("alice").await.unwrap();
    assert_eq!(alice.first_name, "Alicia");
    assert_eq!(h.store.user_by_login("carol").await.unwrap().first_name, "Test");
    h.login("alice", "pw9").await;

    let clash = h.call(USER_EDIT, json!({ "token": token, "login": "carol" })).await;
    assert_eq!(clash.code, 1);
    assert_eq!(h.store.user_by_login("alice").await.unwrap().id, alice.id);

    let forged = h.call(USER_EDIT, json!({ "token": token, "id": 2 })).await;
    assert_eq!(forged.code, 253);
}

#[tokio::test]
async fn membership_and_group_removal() {
    let h = Harness::new();
    h.register("admin", "root").await;
    h.register("dave", "pw4").await;
    let admin = h.store.user_by_login("admin").await.unwrap();
    h.store.set_manages_groups(admin.id, true).await.unwrap();
    let token = h.login("admin", "root").await;

    assert_eq!(h.call(GROUP_CREATE, json!({ "token": token, "name": "crew" })).await.code, 0);
    assert_eq!(h.call(GROUP_CREATE, json!({ "token": token, "name": "crew" })).await.code, 1);
    assert_eq!(h.call(GROUP_CREATE, json!({ "token": token, "name": "" })).await.code, 253);

    let add = json!({ "token": token, "group": "crew", "login": "dave", "action": true });
    assert_eq!(h.call(GROUP_MEMBERSHIP, add.clone()).await.code, 0);
    assert_eq!(h.call(GROUP_MEMBERSHIP, add).await.code, 1);

    let groups = h.call(USER_LIST_GROUPS, json!({ "token": token, "login": "dave" })).await;
    assert_eq!(groups.data.unwrap(), json!({ "groups": ["crew"], "count": 1 }));

    let missing_user = json!({ "token": token, "group": "crew", "login": "ghost", "action": true });
    assert_eq!(h.call(GROUP_MEMBERSHIP, missing_user).await.code, 2);

    assert_eq!(h.call(GROUP_REMOVE, json!({ "token": token, "name": "crew" })).await.code, 0);
    assert_eq!(h.store.membership_count(), 0);
    assert_eq!(h.call(GROUP_REMOVE, json!({ "token": token, "name": "crew" })).await.code, 2);
}

#[tokio::test]
async fn capability_grant_is_gated() {
    let h = Harness::new();
    h.register("admin", "root").await;
    h.register("erin", "pw5").await;
    let admin = h.store.user_by_login("admin").await.unwrap();
    h.store.set_manages_groups(admin.id, true).await.unwrap();

    let erin_token = h.login("erin", "pw5").await;
    let self_grant = json!({ "token": erin_token, "login": "erin", "value": true });
    assert_eq!(h.call(SET_MANAGES_GROUPS, self_grant).await.code, 5);

    let admin_token = h.login("admin", "root").await;
    let grant = json!({ "token": admin_token, "login": "erin", "value": true });
    assert_eq!(h.call(SET_MANAGES_GROUPS, grant).await.code, 0);
    assert!(h.store.user_by_login("erin").await.unwrap().manages_groups);
}

#[tokio::test]
async fn structures_and_tasks_round_trip_through_the_protocol() {
    let h = Harness::new();
    h.register("admin", "root").await;
    let admin = h.store.user_by_login("admin").await.unwrap();
    h.store.set_manages_groups(admin.id, true).await.unwrap();
    let token = h.login("admin", "root").await;

    let gid = h.call(GROUP_CREATE, json!({ "token": token, "name": "estates" })).await.data.unwrap()["id"]
        .as_i64()
        .unwrap();

    let structure = |name: &str, area: i32| {
        json!({
            "token": token, "name": name, "district": "North", "region": "R1",
            "address": "1 Main St", "type": "warehouse", "state": "ok", "area": area,
            "owner": "city", "actual_user": "logistics", "gid": gid, "permissions": 7,
        })
    };
    let sid = h.call(STRUCT_CREATE, structure("Depot", 120)).await.data.unwrap()["id"]
        .as_i64()
        .unwrap();
    assert_eq!(h.call(STRUCT_CREATE, structure("Depot", 1)).await.code, 1);
    h.call(STRUCT_CREATE, structure("Shed", 20)).await;

    let mut bad_mask = structure("Annex", 5);
    bad_mask["permissions"] = json!(64);
    assert_eq!(h.call(STRUCT_CREATE, bad_mask).await.code, 253);

    let info = h.call(STRUCT_INFO, json!({ "token": token, "id": sid })).await.data.unwrap();
    assert_eq!(info["type"], "warehouse");
    assert_eq!(info["permissions"], 7);

    let found = h
        .call(STRUCT_FIND, json!({ "token": token, "area_from": 50 }))
        .await
        .data
        .unwrap();
    assert_eq!(found["count"], 1);
    assert_eq!(found["structures"][0]["name"], "Depot");

    let task = json!({
        "token": token, "name": "Fix roof", "deadline": 1_720_000_000_i64, "status": "open",
        "object": sid, "maintainer": admin.id.get(), "gid": gid, "permissions": 1,
    });
    let tid = h.call(TASK_CREATE, task.clone()).await.data.unwrap()["id"].as_i64().unwrap();
    assert_eq!(h.call(TASK_CREATE, task).await.code, 1);

    let edit = json!({ "token": token, "id": tid, "status": "done" });
    assert_eq!(h.call(TASK_EDIT, edit).await.code, 0);
    let info = h.call(TASK_INFO, json!({ "token": token, "id": tid })).await.data.unwrap();
    assert_eq!(info["status"], "done");

    let open = h
        .call(TASK_FIND, json!({ "token": token, "status": "open" }))
        .await
        .data
        .unwrap();
    assert_eq!(open["count"], 0);

    assert_eq!(h.call(STRUCT_REMOVE, json!({ "token": token, "id": sid })).await.code, 0);
    assert_eq!(h.call(TASK_INFO, json!({ "token": token, "id": tid })).await.code, 2);
    assert_eq!(h.call(STRUCT_REMOVE, json!({ "token": token, "id": sid })).await.code, 2);
}
