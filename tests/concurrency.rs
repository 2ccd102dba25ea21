//! Concurrent-write behavior (§5 "Concurrency control"): fans out several
//! requests against the same router/pool at once with `futures::future::join_all`,
//! the way the pack's own PATCH property tests race concurrent operations
//! against a shared provider rather than asserting on single-threaded order.

mod common;

use common::*;
use serde_json::json;

/// Two creates racing on the same `userName` (case-insensitively): exactly
/// one wins with `201`, the other loses the unique-constraint race and gets
/// `409 uniqueness` (§5: "a concurrent insert that wins the race makes the
/// loser return 409 uniqueness").
#[tokio::test]
async fn concurrent_create_same_username_one_wins_one_conflicts() {
    let (_db, app) = test_app().await;
    let endpoint = create_endpoint(&app, "acme").await;
    let users_path = format!("/scim/endpoints/{endpoint}/Users");

    let attempts = futures::future::join_all((0..8).map(|n| {
        let app = app.clone();
        let users_path = users_path.clone();
        let user_name = if n % 2 == 0 { "racer" } else { "RACER" };
        async move {
            authed_post(
                &app,
                &users_path,
                &json!({
                    "schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"],
                    "userName": user_name,
                }),
            )
            .await
        }
    }))
    .await;

    let created = attempts.iter().filter(|(status, _, _)| *status == 201).count();
    let conflicted = attempts.iter().filter(|(status, _, _)| *status == 409).count();
    assert_eq!(created, 1, "exactly one concurrent create should win the uniqueness race");
    assert_eq!(conflicted, attempts.len() - 1);
    for (status, _, body) in &attempts {
        if *status == 409 {
            assert_eq!(body["scimType"], "uniqueness");
        }
    }

    let (status, _, listed) = authed_get(&app, &users_path).await;
    assert_eq!(status, 200);
    assert_eq!(listed["totalResults"], 1);
}

/// Concurrent reads of a group mid-membership-replace never observe a
/// partially-written member set (§5 scenario 5: atomicity of the group
/// members PATCH). Every read returns either the pre- or post-replace count,
/// never something in between.
#[tokio::test]
async fn concurrent_reads_never_observe_partial_member_replace() {
    let (_db, app) = test_app().await;
    let endpoint = create_endpoint(&app, "acme").await;
    let users_path = format!("/scim/endpoints/{endpoint}/Users");
    let groups_path = format!("/scim/endpoints/{endpoint}/Groups");

    let mut member_ids = Vec::new();
    for n in 0..4 {
        let (_, _, body) = authed_post(
            &app,
            &users_path,
            &json!({
                "schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"],
                "userName": format!("racer-member{n}"),
            }),
        )
        .await;
        member_ids.push(body["id"].as_str().unwrap().to_string());
    }

    let (_, _, group) = authed_post(
        &app,
        &groups_path,
        &json!({
            "schemas": ["urn:ietf:params:scim:schemas:core:2.0:Group"],
            "displayName": "Racers",
            "members": [{ "value": member_ids[0] }, { "value": member_ids[1] }],
        }),
    )
    .await;
    let group_path = format!("{groups_path}/{}", group["id"].as_str().unwrap());

    let patch = authed_patch(
        &app,
        &group_path,
        &json!({
            "schemas": ["urn:ietf:params:scim:api:messages:2.0:PatchOp"],
            "Operations": [{
                "op": "replace",
                "path": "members",
                "value": [{ "value": member_ids[2] }, { "value": member_ids[3] }],
            }],
        }),
    );
    let reads = futures::future::join_all((0..6).map(|_| authed_get(&app, &group_path)));

    let (patch_result, read_results) = futures::join!(patch, reads);
    assert_eq!(patch_result.0, 200);

    for (status, _, body) in &read_results {
        assert_eq!(*status, 200);
        let count = body["members"].as_array().unwrap().len();
        assert!(count == 2, "expected exactly 2 members at every observation point, saw {count}");
    }
}
