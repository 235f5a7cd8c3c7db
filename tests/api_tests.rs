// HTTP tests for the notification retrieval API

use actix_web::{http::StatusCode, test, web, App};
use chrono::{Duration, Utc};
use job_alerts::models::{MatchedJobPost, Notification, NotificationActionResponse, UnreadNotificationsResponse};
use job_alerts::routes::{self, notifications::AppState};
use job_alerts::services::{
    CachedSubscriptionGateway, InMemoryNotificationStore, NotificationStore, StaticSubscriptionGateway,
    SubscriptionGateway,
};
use std::sync::Arc;
use uuid::Uuid;

fn notification_for(user_id: &str, title: &str, minutes_ago: i64) -> Notification {
    let matched = MatchedJobPost {
        id: Uuid::new_v4(),
        profile_id: "p1".to_string(),
        job_id: format!("job-{}", title),
        user_id: user_id.to_string(),
        job_title: title.to_string(),
        match_score: 75.0,
        matched_at: Utc::now(),
    };
    let mut notification = Notification::for_match(&matched);
    notification.timestamp = Utc::now() - Duration::minutes(minutes_ago);
    notification
}

async fn seeded_store() -> (Arc<InMemoryNotificationStore>, Vec<Notification>) {
    let store = Arc::new(InMemoryNotificationStore::new());
    let seeded = vec![
        notification_for("alice", "Old", 30),
        notification_for("alice", "New", 1),
        notification_for("bob", "Other", 5),
    ];
    for n in &seeded {
        store.insert(n).await.unwrap();
    }
    (store, seeded)
}

macro_rules! app {
    ($store:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new(AppState {
                    notifications: $store.clone(),
                    subscription_cache: None,
                }))
                .configure(routes::configure_routes),
        )
        .await
    };
}

#[actix_web::test]
async fn test_health() {
    let (store, _) = seeded_store().await;
    let app = app!(store);

    let req = test::TestRequest::get().uri("/api/v1/health").to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["status"], "healthy");
    assert!(body.get("subscription_cache").is_none());
}

#[actix_web::test]
async fn test_health_reports_subscription_cache() {
    let (store, _) = seeded_store().await;
    let cache = Arc::new(CachedSubscriptionGateway::new(
        Arc::new(StaticSubscriptionGateway::new(["alice"])),
        100,
        60,
    ));
    cache.is_premium("alice").await.unwrap();
    cache.is_premium("alice").await.unwrap();

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(AppState {
                notifications: store.clone(),
                subscription_cache: Some(cache.clone()),
            }))
            .configure(routes::configure_routes),
    )
    .await;

    let req = test::TestRequest::get().uri("/api/v1/health").to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["subscription_cache"]["hit_count"], 1);
    assert_eq!(body["subscription_cache"]["miss_count"], 1);
}

#[actix_web::test]
async fn test_list_unread_newest_first() {
    let (store, _) = seeded_store().await;
    let app = app!(store);

    let req = test::TestRequest::get()
        .uri("/api/v1/users/alice/notifications/unread")
        .to_request();
    let body: UnreadNotificationsResponse = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body.total_results, 2);
    assert_eq!(body.notifications[0].title, "New job match: New");
    assert_eq!(body.notifications[1].title, "New job match: Old");
}

#[actix_web::test]
async fn test_list_unread_limit() {
    let (store, _) = seeded_store().await;
    let app = app!(store);

    let req = test::TestRequest::get()
        .uri("/api/v1/users/alice/notifications/unread?limit=1")
        .to_request();
    let body: UnreadNotificationsResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.total_results, 1);

    let req = test::TestRequest::get()
        .uri("/api/v1/users/alice/notifications/unread?limit=0")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_mark_read_hides_from_unread() {
    let (store, seeded) = seeded_store().await;
    let app = app!(store);
    let target = seeded[1].id;

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/users/alice/notifications/{}/read", target))
        .to_request();
    let body: NotificationActionResponse = test::call_and_read_body_json(&app, req).await;
    assert!(body.success);
    assert_eq!(body.notification_id, target);

    let unread = store.list_unread("alice", 50).await.unwrap();
    assert_eq!(unread.len(), 1);
    assert_ne!(unread[0].id, target);
}

#[actix_web::test]
async fn test_cannot_touch_another_users_notification() {
    let (store, seeded) = seeded_store().await;
    let app = app!(store);
    let bobs = seeded[2].id;

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/users/alice/notifications/{}/read", bobs))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/users/alice/notifications/{}", bobs))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    assert_eq!(store.count_for("bob"), 1);
}

#[actix_web::test]
async fn test_delete() {
    let (store, seeded) = seeded_store().await;
    let app = app!(store);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/users/alice/notifications/{}", seeded[0].id))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    assert_eq!(store.count_for("alice"), 1);
}

#[actix_web::test]
async fn test_store_outage_returns_503() {
    let (store, _) = seeded_store().await;
    store.set_unavailable(true);
    let app = app!(store);

    let req = test::TestRequest::get()
        .uri("/api/v1/users/alice/notifications/unread")
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::SERVICE_UNAVAILABLE
    );
}
