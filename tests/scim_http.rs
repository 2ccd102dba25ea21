//! Auth gate, filtering, admin CRUD, discovery, and `/healthz` coverage that
//! doesn't fit the literal §8 scenarios in `scim_scenarios.rs`.

mod common;

use axum::body::Body;
use axum::http::{Method, Request};
use common::*;
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn healthz_is_unauthenticated_and_outside_every_prefix() {
    let (_db, app) = test_app().await;
    let request = Request::builder()
        .method(Method::GET)
        .uri("/healthz")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn missing_bearer_token_is_rejected() {
    let (_db, app) = test_app().await;
    let endpoint = create_endpoint(&app, "acme").await;
    let request = Request::builder()
        .method(Method::GET)
        .uri(format!("/scim/endpoints/{endpoint}/Users"))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), 401);
    assert!(response.headers().contains_key("WWW-Authenticate"));
}

#[tokio::test]
async fn wrong_bearer_token_is_rejected() {
    let (_db, app) = test_app().await;
    let endpoint = create_endpoint(&app, "acme").await;
    let request = Request::builder()
        .method(Method::GET)
        .uri(format!("/scim/endpoints/{endpoint}/Users"))
        .header("Authorization", "Bearer nope-not-it")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn v2_prefix_is_also_accepted_and_advertises_the_same_location() {
    let (_db, app) = test_app().await;
    let endpoint = create_endpoint(&app, "acme").await;

    let (status, _, via_plain) = authed_post(
        &app,
        &format!("/scim/endpoints/{endpoint}/Users"),
        &json!({
            "schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"],
            "userName": "gwen",
        }),
    )
    .await;
    assert_eq!(status, 201);

    let (status, _, via_v2) = authed_post(
        &app,
        &format!("/scim/v2/endpoints/{endpoint}/Users"),
        &json!({
            "schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"],
            "userName": "holly",
        }),
    )
    .await;
    assert_eq!(status, 201);

    let plain_location = via_plain["meta"]["location"].as_str().unwrap();
    let v2_location = via_v2["meta"]["location"].as_str().unwrap();
    assert!(plain_location.contains("/scim/v2/endpoints/"));
    assert!(v2_location.contains("/scim/v2/endpoints/"));
}

#[tokio::test]
async fn active_eq_true_filter_matches_boolean_column() {
    let (_db, app) = test_app().await;
    let endpoint = create_endpoint(&app, "acme").await;
    let users_path = format!("/scim/endpoints/{endpoint}/Users");

    authed_post(
        &app,
        &users_path,
        &json!({
            "schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"],
            "userName": "ian",
            "active": true,
        }),
    )
    .await;
    authed_post(
        &app,
        &users_path,
        &json!({
            "schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"],
            "userName": "june",
            "active": false,
        }),
    )
    .await;

    let (status, _, body) =
        authed_get(&app, &format!("{users_path}?filter=active%20eq%20%22true%22")).await;
    assert_eq!(status, 200);
    let resources = body["Resources"].as_array().unwrap();
    assert_eq!(resources.len(), 1);
    assert_eq!(resources[0]["userName"], "ian");
}

#[tokio::test]
async fn admin_endpoint_crud_round_trip() {
    let (_db, app) = test_app().await;

    let (status, _, created) = authed_post(
        &app,
        "/scim/admin/endpoints",
        &json!({ "name": "tenant-a", "displayName": "Tenant A" }),
    )
    .await;
    assert_eq!(status, 201);
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["active"], true);

    let (status, _, fetched) = authed_get(&app, &format!("/scim/admin/endpoints/{id}")).await;
    assert_eq!(status, 200);
    assert_eq!(fetched["name"], "tenant-a");

    let (status, _, listed) = authed_get(&app, "/scim/admin/endpoints").await;
    assert_eq!(status, 200);
    assert!(listed.as_array().unwrap().iter().any(|e| e["id"] == id));

    let (status, _, updated) = authed_patch(
        &app,
        &format!("/scim/admin/endpoints/{id}"),
        &json!({ "displayName": "Tenant A Renamed" }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(updated["displayName"], "Tenant A Renamed");
    assert_eq!(updated["name"], "tenant-a");

    let (status, _, _) = authed_delete(&app, &format!("/scim/admin/endpoints/{id}")).await;
    assert_eq!(status, 204);

    let (status, _, _) = authed_get(&app, &format!("/scim/admin/endpoints/{id}")).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn duplicate_endpoint_name_is_rejected() {
    let (_db, app) = test_app().await;
    let (status, _, _) = authed_post(&app, "/scim/admin/endpoints", &json!({ "name": "dup" })).await;
    assert_eq!(status, 201);

    let (status, _, body) = authed_post(&app, "/scim/admin/endpoints", &json!({ "name": "DUP" })).await;
    assert_eq!(status, 409);
    assert_eq!(body["scimType"], "uniqueness");
}

#[tokio::test]
async fn discovery_documents_are_served_per_tenant() {
    let (_db, app) = test_app().await;
    let endpoint = create_endpoint(&app, "acme").await;

    let (status, _, config) =
        authed_get(&app, &format!("/scim/endpoints/{endpoint}/ServiceProviderConfig")).await;
    assert_eq!(status, 200);
    assert_eq!(config["patch"], true);
    assert_eq!(config["bulk"], false);

    let (status, _, types) = authed_get(&app, &format!("/scim/endpoints/{endpoint}/ResourceTypes")).await;
    assert_eq!(status, 200);
    assert_eq!(types["totalResults"], 2);

    let (status, _, schemas) = authed_get(&app, &format!("/scim/endpoints/{endpoint}/Schemas")).await;
    assert_eq!(status, 200);
    assert_eq!(schemas["totalResults"], 2);
}

#[tokio::test]
async fn get_nonexistent_resource_is_no_target() {
    let (_db, app) = test_app().await;
    let endpoint = create_endpoint(&app, "acme").await;

    let (status, _, body) = authed_get(&app, &format!("/scim/endpoints/{endpoint}/Users/does-not-exist")).await;
    assert_eq!(status, 404);
    assert_eq!(body["scimType"], "noTarget");
}

#[tokio::test]
async fn unknown_endpoint_is_no_target() {
    let (_db, app) = test_app().await;
    let (status, _, body) = authed_get(&app, "/scim/endpoints/does-not-exist/Users").await;
    assert_eq!(status, 404);
    assert_eq!(body["scimType"], "noTarget");
}
