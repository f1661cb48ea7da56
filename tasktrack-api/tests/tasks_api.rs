/// Integration tests for the task endpoints
///
/// These tests drive the full router against the in-memory store:
/// - Task lifecycle (create, toggle, filter, delete)
/// - Owner isolation
/// - Filtering, ordering and pagination

mod common;

use axum::http::StatusCode;
use chrono::{TimeZone, Utc};
use common::{test_config, TestContext, HOST};
use serde_json::json;
use tasktrack_shared::audit::AuditAction;
use uuid::Uuid;

#[tokio::test]
async fn test_task_lifecycle() {
    let ctx = TestContext::new();
    let (_, token) = ctx.user_with_token("alice").await;

    let blank = ctx
        .post("/api/tasks/create/", Some(&token), json!({ "description": "   " }))
        .await;
    assert_eq!(blank.status, StatusCode::BAD_REQUEST);
    assert_eq!(blank.body, json!({ "description": ["This field may not be blank."] }));

    let created = ctx
        .post(
            "/api/tasks/create/",
            Some(&token),
            json!({ "description": "Buy milk", "completed": true }),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.body["description"], "Buy milk");
    assert_eq!(created.body["completed"], false);
    let id = created.body["id"].as_str().unwrap().to_string();

    let toggled = ctx
        .patch(&format!("/api/tasks/{id}/toggle-complete/"), &token, json!({}))
        .await;
    assert_eq!(toggled.status, StatusCode::OK);
    assert_eq!(toggled.body["completed"], true);

    let completed = ctx.get("/api/tasks/?completed=true", &token).await;
    assert_eq!(completed.status, StatusCode::OK);
    assert_eq!(completed.body["count"], 1);
    assert_eq!(completed.body["results"][0]["id"], id.as_str());

    let pending = ctx.get("/api/tasks/?completed=false", &token).await;
    assert_eq!(pending.body["count"], 0);

    let deleted = ctx.delete(&format!("/api/tasks/{id}/delete/"), &token).await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);

    let gone = ctx.get(&format!("/api/tasks/{id}/"), &token).await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);

    assert_eq!(
        ctx.audit.actions(),
        vec![
            AuditAction::UserRegistered,
            AuditAction::TaskCreated,
            AuditAction::TaskToggled,
            AuditAction::TaskDeleted,
        ]
    );
}

#[tokio::test]
async fn test_task_endpoints_require_authentication() {
    let ctx = TestContext::new();

    let response = ctx
        .send(axum::http::Method::GET, "/api/tasks/", None, None)
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let response = ctx.get("/api/tasks/", "not-a-token").await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_foreign_task_looks_missing() {
    let ctx = TestContext::new();
    let (_, alice) = ctx.user_with_token("alice").await;
    let (_, mallory) = ctx.user_with_token("mallory").await;
    let id = ctx.create_task(&alice, "Alice's secret").await;

    let missing = ctx.get(&format!("/api/tasks/{}/", Uuid::new_v4()), &mallory).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let foreign = ctx.get(&format!("/api/tasks/{id}/"), &mallory).await;
    assert_eq!(foreign.status, StatusCode::NOT_FOUND);
    assert_eq!(foreign.body, missing.body);

    let update = ctx
        .patch(
            &format!("/api/tasks/{id}/update-description/"),
            &mallory,
            json!({ "description": "hijacked" }),
        )
        .await;
    assert_eq!(update.status, StatusCode::NOT_FOUND);
    assert_eq!(update.body, missing.body);

    let toggle = ctx
        .patch(&format!("/api/tasks/{id}/toggle-complete/"), &mallory, json!({}))
        .await;
    assert_eq!(toggle.status, StatusCode::NOT_FOUND);

    let delete = ctx.delete(&format!("/api/tasks/{id}/delete/"), &mallory).await;
    assert_eq!(delete.status, StatusCode::NOT_FOUND);
    assert_eq!(delete.body, missing.body);

    let listing = ctx.get("/api/tasks/", &mallory).await;
    assert_eq!(listing.body["count"], 0);

    let intact = ctx.get(&format!("/api/tasks/{id}/"), &alice).await;
    assert_eq!(intact.status, StatusCode::OK);
    assert_eq!(intact.body["description"], "Alice's secret");
    assert_eq!(intact.body["completed"], false);
}

#[tokio::test]
async fn test_staff_cannot_reach_other_users_tasks() {
    let ctx = TestContext::new();
    let (_, alice) = ctx.user_with_token("alice").await;
    ctx.create_staff("boss").await;
    let boss = ctx.login("boss").await;
    let id = ctx.create_task(&alice, "Private").await;

    let response = ctx.get(&format!("/api/tasks/{id}/"), &boss).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_task_id_is_not_found() {
    let ctx = TestContext::new();
    let (_, token) = ctx.user_with_token("alice").await;

    let response = ctx.get("/api/tasks/not-a-uuid/", &token).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["message"], "Not found.");
}

#[tokio::test]
async fn test_double_toggle_restores_status() {
    let ctx = TestContext::new();
    let (_, token) = ctx.user_with_token("alice").await;
    let id = ctx.create_task(&token, "Flip me").await;
    let uri = format!("/api/tasks/{id}/toggle-complete/");

    let first = ctx.patch(&uri, &token, json!({})).await;
    let second = ctx.patch(&uri, &token, json!({})).await;

    assert_eq!(first.body["completed"], true);
    assert_eq!(second.body["completed"], false);
}

#[tokio::test]
async fn test_update_description() {
    let ctx = TestContext::new();
    let (_, token) = ctx.user_with_token("alice").await;
    let id = ctx.create_task(&token, "Old text").await;
    let uri = format!("/api/tasks/{id}/update-description/");

    let blank = ctx.patch(&uri, &token, json!({ "description": "" })).await;
    assert_eq!(blank.status, StatusCode::BAD_REQUEST);
    assert!(blank.body["description"].is_array());

    let updated = ctx
        .patch(&uri, &token, json!({ "description": "  New text  ", "completed": true }))
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["description"], "New text");
    assert_eq!(updated.body["completed"], false);

    let untouched = ctx.patch(&uri, &token, json!({})).await;
    assert_eq!(untouched.status, StatusCode::OK);
    assert_eq!(untouched.body["description"], "New text");
}

#[tokio::test]
async fn test_null_description_is_rejected() {
    let ctx = TestContext::new();
    let (_, token) = ctx.user_with_token("alice").await;
    let id = ctx.create_task(&token, "Buy milk").await;

    let update = ctx
        .patch(
            &format!("/api/tasks/{id}/update-description/"),
            &token,
            json!({ "description": null }),
        )
        .await;
    assert_eq!(update.status, StatusCode::BAD_REQUEST);
    assert_eq!(update.body, json!({ "description": ["This field may not be null."] }));

    let create = ctx
        .post("/api/tasks/create/", Some(&token), json!({ "description": null }))
        .await;
    assert_eq!(create.status, StatusCode::BAD_REQUEST);
    assert_eq!(create.body, json!({ "description": ["This field may not be null."] }));

    let detail = ctx.get(&format!("/api/tasks/{id}/"), &token).await;
    assert_eq!(detail.body["description"], "Buy milk");
}

#[tokio::test]
async fn test_description_type_errors_are_field_errors() {
    let ctx = TestContext::new();
    let (_, token) = ctx.user_with_token("alice").await;

    let boolean = ctx
        .post("/api/tasks/create/", Some(&token), json!({ "description": true }))
        .await;
    assert_eq!(boolean.status, StatusCode::BAD_REQUEST);
    assert_eq!(boolean.body, json!({ "description": ["Not a valid string."] }));

    let id = ctx.create_task(&token, "Buy milk").await;
    let list = ctx
        .patch(
            &format!("/api/tasks/{id}/update-description/"),
            &token,
            json!({ "description": ["Buy", "milk"] }),
        )
        .await;
    assert_eq!(list.status, StatusCode::BAD_REQUEST);
    assert_eq!(list.body, json!({ "description": ["Not a valid string."] }));

    let number = ctx
        .post("/api/tasks/create/", Some(&token), json!({ "description": 5 }))
        .await;
    assert_eq!(number.status, StatusCode::CREATED);
    assert_eq!(number.body["description"], "5");
}

#[tokio::test]
async fn test_description_filters_intersect() {
    let ctx = TestContext::new();
    let (_, token) = ctx.user_with_token("alice").await;
    ctx.create_task(&token, "Buy milk").await;
    ctx.create_task(&token, "Buy bread").await;
    ctx.create_task(&token, "Sell the bike").await;

    let contains = ctx.get("/api/tasks/?description__contains=BUY", &token).await;
    assert_eq!(contains.body["count"], 2);

    let both = ctx
        .get(
            "/api/tasks/?description__startswith=buy&description__contains=bread",
            &token,
        )
        .await;
    assert_eq!(both.body["count"], 1);
    assert_eq!(both.body["results"][0]["description"], "Buy bread");

    let exact = ctx.get("/api/tasks/?description=buy%20MILK", &token).await;
    assert_eq!(exact.body["count"], 1);

    let regex = ctx.get("/api/tasks/?description__regex=b(ike%7Cread)", &token).await;
    assert_eq!(regex.body["count"], 2);
}

#[tokio::test]
async fn test_invalid_filters_are_rejected() {
    let ctx = TestContext::new();
    let (_, token) = ctx.user_with_token("alice").await;

    let response = ctx
        .get("/api/tasks/?created_after=yesterday&completed=maybe", &token)
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body["created_after"].is_array());
    assert!(response.body["completed"].is_array());
}

#[tokio::test]
async fn test_created_on_uses_local_day_inclusively() {
    let mut config = test_config();
    config.listing.time_zone = chrono_tz::America::New_York;
    let ctx = TestContext::with_config(config);
    let (_, token) = ctx.user_with_token("alice").await;

    // New York is UTC-4 on 2025-03-10
    let times = [
        ("late evening", Utc.with_ymd_and_hms(2025, 3, 10, 3, 30, 0).unwrap()),
        ("last second", Utc.with_ymd_and_hms(2025, 3, 10, 3, 59, 59).unwrap()),
        ("next day", Utc.with_ymd_and_hms(2025, 3, 10, 4, 0, 0).unwrap()),
    ];
    for (description, at) in times {
        let id: Uuid = ctx.create_task(&token, description).await.parse().unwrap();
        assert!(ctx.store.set_task_creation_time(id, at).await);
    }

    let day = ctx.get("/api/tasks/?created_on=2025-03-09", &token).await;
    assert_eq!(day.status, StatusCode::OK);
    assert_eq!(day.body["count"], 2);

    let after = ctx.get("/api/tasks/?created_after=2025-03-10", &token).await;
    assert_eq!(after.body["count"], 1);
    assert_eq!(after.body["results"][0]["description"], "next day");

    let before = ctx.get("/api/tasks/?created_before=2025-03-09", &token).await;
    assert_eq!(before.body["count"], 2);
}

#[tokio::test]
async fn test_ordering_by_creation_time() {
    let ctx = TestContext::new();
    let (_, token) = ctx.user_with_token("alice").await;
    for description in ["first", "second", "third"] {
        ctx.create_task(&token, description).await;
    }

    let ascending = ctx.get("/api/tasks/?ordering=creation_time", &token).await;
    assert_eq!(ascending.body["results"][0]["description"], "first");

    let descending = ctx.get("/api/tasks/?ordering=-creation_time", &token).await;
    assert_eq!(descending.body["results"][0]["description"], "third");
    assert_eq!(descending.body["results"][2]["description"], "first");
}

#[tokio::test]
async fn test_listing_is_paginated() {
    let ctx = TestContext::new();
    let (_, token) = ctx.user_with_token("alice").await;
    for n in 0..12 {
        ctx.create_task(&token, &format!("Task {n}")).await;
    }

    let first = ctx.get("/api/tasks/?completed=false", &token).await;
    assert_eq!(first.body["count"], 12);
    assert_eq!(first.body["results"].as_array().unwrap().len(), 10);
    assert_eq!(
        first.body["next"],
        format!("http://{HOST}/api/tasks/?completed=false&page=2")
    );
    assert!(first.body["previous"].is_null());

    let second = ctx.get("/api/tasks/?completed=false&page=2", &token).await;
    assert_eq!(second.body["results"].as_array().unwrap().len(), 2);
    assert!(second.body["next"].is_null());
    assert_eq!(
        second.body["previous"],
        format!("http://{HOST}/api/tasks/?completed=false")
    );

    let beyond = ctx.get("/api/tasks/?page=3", &token).await;
    assert_eq!(beyond.status, StatusCode::NOT_FOUND);
    assert_eq!(beyond.body["message"], "Invalid page.");
}

#[tokio::test]
async fn test_list_truncates_long_descriptions() {
    let ctx = TestContext::new();
    let (_, token) = ctx.user_with_token("alice").await;
    let long = "x".repeat(80);
    let id = ctx.create_task(&token, &long).await;

    let listing = ctx.get("/api/tasks/", &token).await;
    let summary = listing.body["results"][0]["description"].as_str().unwrap();
    assert_eq!(summary, format!("{}...", "x".repeat(50)));

    let detail = ctx.get(&format!("/api/tasks/{id}/"), &token).await;
    assert_eq!(detail.body["description"], long.as_str());
}
