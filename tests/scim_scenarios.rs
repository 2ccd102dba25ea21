//! HTTP-level scenarios from spec §8 ("End-to-end scenarios"), driven
//! through the production router the way `examples/gpgkd906-auth9`'s own
//! handler tests exercise its axum app: build a real router over a real
//! (file-backed) pool, `oneshot` requests through it, assert on status,
//! headers, and body.

mod common;

use common::*;
use serde_json::{json, Value};

const PATCH_OP_SCHEMA: &str = "urn:ietf:params:scim:api:messages:2.0:PatchOp";

#[tokio::test]
async fn create_unique_preserving() {
    let (_db, app) = test_app().await;
    let endpoint = create_endpoint(&app, "acme").await;
    let users_path = format!("/scim/endpoints/{endpoint}/Users");

    let (status, _, body) = authed_post(
        &app,
        &users_path,
        &json!({
            "schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"],
            "userName": "Alice@X",
        }),
    )
    .await;
    assert_eq!(status, 201);
    assert!(body["meta"]["version"].is_string());

    let (status, _, body) = authed_post(
        &app,
        &users_path,
        &json!({
            "schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"],
            "userName": "alice@x",
        }),
    )
    .await;
    assert_eq!(status, 409);
    assert_eq!(body["scimType"], "uniqueness");
}

#[tokio::test]
async fn etag_concurrency() {
    let (_db, app) = test_app().await;
    let endpoint = create_endpoint(&app, "acme").await;
    let users_path = format!("/scim/endpoints/{endpoint}/Users");

    let (status, headers, body) = authed_post(
        &app,
        &users_path,
        &json!({
            "schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"],
            "userName": "bob",
        }),
    )
    .await;
    assert_eq!(status, 201);
    let scim_id = body["id"].as_str().unwrap();
    let user_path = format!("{users_path}/{scim_id}");
    let t0 = headers.etag.clone().expect("created response carries an ETag");

    let (status, _, body) = authed_get(&app, &user_path).await;
    assert_eq!(status, 200);
    assert_eq!(body["meta"]["version"].as_str().unwrap(), t0);

    let (status, headers, _) = authed_put_if_match(
        &app,
        &user_path,
        &json!({
            "schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"],
            "userName": "bob",
            "displayName": "Bob Updated",
        }),
        &t0,
    )
    .await;
    assert_eq!(status, 200);
    let t1 = headers.etag.expect("replace response carries an ETag");
    assert_ne!(t0, t1);

    let (status, _, body) = authed_put_if_match(
        &app,
        &user_path,
        &json!({
            "schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"],
            "userName": "bob",
            "displayName": "Stale Write",
        }),
        &t0,
    )
    .await;
    assert_eq!(status, 412);
    assert_eq!(body["scimType"], "versionMismatch");
}

#[tokio::test]
async fn value_filter_patch_add_on_empty() {
    let (_db, app) = test_app().await;
    let endpoint = create_endpoint(&app, "acme").await;
    let users_path = format!("/scim/endpoints/{endpoint}/Users");

    let (status, _, body) = authed_post(
        &app,
        &users_path,
        &json!({
            "schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"],
            "userName": "carol",
        }),
    )
    .await;
    assert_eq!(status, 201);
    let scim_id = body["id"].as_str().unwrap().to_string();
    let user_path = format!("{users_path}/{scim_id}");

    let (status, _, body) = authed_patch(
        &app,
        &user_path,
        &json!({
            "schemas": [PATCH_OP_SCHEMA],
            "Operations": [{
                "op": "add",
                "path": "emails[type eq \"work\"].value",
                "value": "a@w",
            }],
        }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(
        body["emails"],
        json!([{ "type": "work", "value": "a@w" }])
    );
}

#[tokio::test]
async fn extension_urn_patch_with_manager_string() {
    let (_db, app) = test_app().await;
    let endpoint = create_endpoint(&app, "acme").await;
    let users_path = format!("/scim/endpoints/{endpoint}/Users");

    let (status, _, body) = authed_post(
        &app,
        &users_path,
        &json!({
            "schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"],
            "userName": "dana",
        }),
    )
    .await;
    assert_eq!(status, 201);
    let scim_id = body["id"].as_str().unwrap().to_string();
    let user_path = format!("{users_path}/{scim_id}");

    let urn = "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User:manager";
    let (status, _, body) = authed_patch(
        &app,
        &user_path,
        &json!({
            "schemas": [PATCH_OP_SCHEMA],
            "Operations": [{
                "op": "replace",
                "path": urn,
                "value": "MGR-1",
            }],
        }),
    )
    .await;
    assert_eq!(status, 200);
    let extension = "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User";
    assert_eq!(body[extension]["manager"]["value"], "MGR-1");
}

#[tokio::test]
async fn group_members_replace_is_atomic() {
    let (_db, app) = test_app().await;
    let endpoint = create_endpoint(&app, "acme").await;
    let users_path = format!("/scim/endpoints/{endpoint}/Users");
    let groups_path = format!("/scim/endpoints/{endpoint}/Groups");

    let mut member_ids = Vec::new();
    for n in 0..5 {
        let (status, _, body) = authed_post(
            &app,
            &users_path,
            &json!({
                "schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"],
                "userName": format!("member{n}"),
            }),
        )
        .await;
        assert_eq!(status, 201);
        member_ids.push(body["id"].as_str().unwrap().to_string());
    }

    let (status, _, body) = authed_post(
        &app,
        &groups_path,
        &json!({
            "schemas": ["urn:ietf:params:scim:schemas:core:2.0:Group"],
            "displayName": "Engineers",
            "members": [
                { "value": member_ids[0] },
                { "value": member_ids[1] },
                { "value": member_ids[2] },
            ],
        }),
    )
    .await;
    assert_eq!(status, 201);
    let group_id = body["id"].as_str().unwrap().to_string();
    let group_path = format!("{groups_path}/{group_id}");

    let (status, _, body) = authed_patch(
        &app,
        &group_path,
        &json!({
            "schemas": [PATCH_OP_SCHEMA],
            "Operations": [{
                "op": "replace",
                "path": "members",
                "value": [
                    { "value": member_ids[3] },
                    { "value": member_ids[4] },
                ],
            }],
        }),
    )
    .await;
    assert_eq!(status, 200);
    let members: Vec<String> = body["members"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["value"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(members.len(), 2);
    assert!(members.contains(&member_ids[3]));
    assert!(members.contains(&member_ids[4]));

    let (status, _, body) = authed_get(&app, &group_path).await;
    assert_eq!(status, 200);
    let members_after: Vec<String> = body["members"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["value"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(members_after.len(), 2);
}

#[tokio::test]
async fn inactive_endpoint_rejects_all_scim_ops_but_not_admin() {
    let (_db, app) = test_app().await;
    let endpoint = create_endpoint(&app, "acme").await;
    let users_path = format!("/scim/endpoints/{endpoint}/Users");

    let (status, _, body) = authed_post(
        &app,
        &users_path,
        &json!({
            "schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"],
            "userName": "erin",
        }),
    )
    .await;
    assert_eq!(status, 201);
    let scim_id = body["id"].as_str().unwrap().to_string();
    let user_path = format!("{users_path}/{scim_id}");

    let (status, _, _) = authed_patch(
        &app,
        &format!("/scim/admin/endpoints/{endpoint}"),
        &json!({ "active": false }),
    )
    .await;
    assert_eq!(status, 200);

    let (status, _, body) = authed_get(&app, &user_path).await;
    assert_eq!(status, 403);
    assert_eq!(body["scimType"], Value::Null);

    let (status, _, _) = authed_post(
        &app,
        &users_path,
        &json!({
            "schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"],
            "userName": "frank",
        }),
    )
    .await;
    assert_eq!(status, 403);

    let (status, _, _) = authed_patch(
        &app,
        &user_path,
        &json!({
            "schemas": [PATCH_OP_SCHEMA],
            "Operations": [{ "op": "replace", "path": "displayName", "value": "x" }],
        }),
    )
    .await;
    assert_eq!(status, 403);

    let (status, _, _) = authed_delete(&app, &user_path).await;
    assert_eq!(status, 403);

    let (status, _, _) = authed_get(&app, &format!("/scim/endpoints/{endpoint}/ServiceProviderConfig")).await;
    assert_eq!(status, 403);

    let (status, _, body) = authed_get(&app, &format!("/scim/admin/endpoints/{endpoint}")).await;
    assert_eq!(status, 200);
    assert_eq!(body["active"], false);
}
