use actix_web::{web, HttpResponse, Responder};
use validator::Validate;
use crate::models::{ErrorResponse, HealthResponse, ListUnreadQuery, NotificationActionResponse, UnreadNotificationsResponse};
use crate::services::{CachedSubscriptionGateway, NotificationStore, StoreError};
use std::sync::Arc;
use uuid::Uuid;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub notifications: Arc<dyn NotificationStore>,
    pub subscription_cache: Option<Arc<CachedSubscriptionGateway>>,
}

/// Configure notification retrieval routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/users/{user_id}/notifications/unread", web::get().to(list_unread))
        .route("/users/{user_id}/notifications/{id}/read", web::post().to(mark_read))
        .route("/users/{user_id}/notifications/{id}", web::delete().to(delete_notification));
}

fn store_unavailable(e: StoreError) -> HttpResponse {
    HttpResponse::ServiceUnavailable().json(ErrorResponse {
        error: "Notification store unavailable".to_string(),
        message: e.to_string(),
        status_code: 503,
    })
}

fn not_found(notification_id: Uuid) -> HttpResponse {
    HttpResponse::NotFound().json(ErrorResponse {
        error: "Not found".to_string(),
        message: format!("Notification {} not found", notification_id),
        status_code: 404,
    })
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let store_healthy = state.notifications.health_check().await.unwrap_or(false);

    let status = if store_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
        subscription_cache: state.subscription_cache.as_ref().map(|cache| cache.stats()),
    })
}

/// Unread notifications, newest first
///
/// GET /api/v1/users/{user_id}/notifications/unread?limit=50
async fn list_unread(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<ListUnreadQuery>,
) -> impl Responder {
    if let Err(errors) = query.validate() {
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Validation failed".to_string(),
            message: errors.to_string(),
            status_code: 400,
        });
    }

    let user_id = path.into_inner();

    match state.notifications.list_unread(&user_id, query.limit).await {
        Ok(notifications) => {
            tracing::debug!("Returning {} unread notifications for {}", notifications.len(), user_id);
            HttpResponse::Ok().json(UnreadNotificationsResponse {
                total_results: notifications.len(),
                notifications,
            })
        }
        Err(e) => {
            tracing::error!("Failed to list notifications for {}: {}", user_id, e);
            store_unavailable(e)
        }
    }
}

/// Mark a notification read
///
/// POST /api/v1/users/{user_id}/notifications/{id}/read
async fn mark_read(
    state: web::Data<AppState>,
    path: web::Path<(String, Uuid)>,
) -> impl Responder {
    let (user_id, notification_id) = path.into_inner();

    match state.notifications.mark_read(&user_id, notification_id).await {
        Ok(true) => HttpResponse::Ok().json(NotificationActionResponse {
            success: true,
            notification_id,
        }),
        Ok(false) => not_found(notification_id),
        Err(e) => {
            tracing::error!("Failed to mark notification {} read: {}", notification_id, e);
            store_unavailable(e)
        }
    }
}

/// Delete a notification
///
/// DELETE /api/v1/users/{user_id}/notifications/{id}
async fn delete_notification(
    state: web::Data<AppState>,
    path: web::Path<(String, Uuid)>,
) -> impl Responder {
    let (user_id, notification_id) = path.into_inner();

    match state.notifications.delete(&user_id, notification_id).await {
        Ok(true) => {
            tracing::info!("Deleted notification {} for {}", notification_id, user_id);
            HttpResponse::Ok().json(NotificationActionResponse {
                success: true,
                notification_id,
            })
        }
        Ok(false) => not_found(notification_id),
        Err(e) => {
            tracing::error!("Failed to delete notification {}: {}", notification_id, e);
            store_unavailable(e)
        }
    }
}
