use common::VideoStatus;
use sea_orm::EntityTrait;
use serde_json::json;

use server::catalog::CatalogService;
use server::entity::video;

use crate::common::{ProviderMode, TestApp, routes};

async fn find(app: &TestApp, id: i32) -> video::Model {
    video::Entity::find_by_id(id)
        .one(&app.db)
        .await
        .unwrap()
        .expect("video should exist")
}

#[tokio::test]
async fn missing_public_id_rejected() {
    let app = TestApp::spawn().await;

    for body in [json!({}), json!({"publicId": ""}), json!({"publicId": null})] {
        let res = app.post(routes::PROCESS, &body).await;
        assert_eq!(res.status, 400, "body {body}");
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }
    assert!(app.provider.jobs().is_empty());
}

#[tokio::test]
async fn trigger_registers_callback_with_provider() {
    let app = TestApp::spawn().await;
    app.create_video("abc123", "Ep1").await;

    let res = app
        .post(routes::PROCESS, &json!({"publicId": "abc123"}))
        .await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["success"], true);
    assert_eq!(res.body["result"]["public_id"], "abc123");

    let jobs = app.provider.jobs();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].public_id, "abc123");
    assert_eq!(jobs[0].profile, "sp_full_hd/f_m3u8");
    assert_eq!(
        jobs[0].notification_url,
        format!("{}{}", app.url(""), routes::WEBHOOK)
    );
}

#[tokio::test]
async fn trigger_records_attempt_but_not_status() {
    let app = TestApp::spawn().await;
    let created = app.create_video("abc123", "Ep1").await;
    let id = created["id"].as_i64().unwrap() as i32;

    for _ in 0..2 {
        let res = app
            .post(routes::PROCESS, &json!({"publicId": "abc123"}))
            .await;
        assert_eq!(res.status, 200);
    }

    let model = find(&app, id).await;
    assert_eq!(model.trigger_attempts, 2);
    assert!(model.last_triggered_at.is_some());
    assert_eq!(model.status, VideoStatus::Processing);
}

#[tokio::test]
async fn concurrent_triggers_are_all_counted() {
    let app = TestApp::spawn().await;
    let created = app.create_video("abc123", "Ep1").await;
    let id = created["id"].as_i64().unwrap() as i32;

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..8 {
        let db = app.db.clone();
        tasks.spawn(async move { CatalogService::new(&db).record_trigger("abc123").await });
    }
    while let Some(res) = tasks.join_next().await {
        assert!(res.unwrap().unwrap());
    }

    let model = find(&app, id).await;
    assert_eq!(model.trigger_attempts, 8);
    assert!(model.last_triggered_at.is_some());

    let matched = CatalogService::new(&app.db)
        .record_trigger("missing")
        .await
        .unwrap();
    assert!(!matched);
}

#[tokio::test]
async fn concurrent_process_requests_are_all_counted() {
    let app = TestApp::spawn().await;
    let created = app.create_video("abc123", "Ep1").await;
    let id = created["id"].as_i64().unwrap() as i32;

    let body = json!({"publicId": "abc123"});
    let (a, b, c, d) = tokio::join!(
        app.post(routes::PROCESS, &body),
        app.post(routes::PROCESS, &body),
        app.post(routes::PROCESS, &body),
        app.post(routes::PROCESS, &body),
    );
    for res in [a, b, c, d] {
        assert_eq!(res.status, 200, "{}", res.text);
    }

    assert_eq!(app.provider.jobs().len(), 4);
    assert_eq!(find(&app, id).await.trigger_attempts, 4);
}

#[tokio::test]
async fn trigger_without_record_still_calls_provider() {
    let app = TestApp::spawn().await;

    let res = app
        .post(routes::PROCESS, &json!({"publicId": "orphan"}))
        .await;
    assert_eq!(res.status, 200);
    assert_eq!(app.provider.jobs().len(), 1);
    assert_eq!(app.video_count().await, 0);
}

#[tokio::test]
async fn provider_failure_is_bad_gateway() {
    let app = TestApp::spawn_with(ProviderMode::Reject, |_| {}).await;
    let created = app.create_video("abc123", "Ep1").await;
    let id = created["id"].as_i64().unwrap() as i32;

    let res = app
        .post(routes::PROCESS, &json!({"publicId": "abc123"}))
        .await;
    assert_eq!(res.status, 502);
    assert_eq!(res.body["code"], "PROVIDER_ERROR");

    let model = find(&app, id).await;
    assert_eq!(model.trigger_attempts, 0);
    assert_eq!(model.status, VideoStatus::Processing);
}
