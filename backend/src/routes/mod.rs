//! Route definitions for the Pharmacy Stock Management Platform

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Protected routes - medicine catalog
        .nest("/medicines", medicine_routes())
        // Protected routes - batch lifecycle
        .nest("/batches", batch_routes())
        // Protected routes - discard workflow
        .nest("/discards", discard_routes())
        // Protected routes - activity log
        .nest("/activity", activity_routes())
        // Protected routes - stock reports
        .nest("/reports", report_routes())
}

/// Medicine catalog routes (protected)
fn medicine_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_medicines).post(handlers::create_medicine),
        )
        .route(
            "/:medicine_id",
            get(handlers::get_medicine).put(handlers::update_medicine),
        )
        .route(
            "/:medicine_id/deactivate",
            post(handlers::deactivate_medicine),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Batch lifecycle routes (protected)
fn batch_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_batches).post(handlers::create_batch),
        )
        .route(
            "/:batch_id",
            get(handlers::get_batch)
                .put(handlers::update_batch)
                .delete(handlers::delete_batch),
        )
        .route("/:batch_id/finalize", post(handlers::finalize_batch))
        .route("/number/:batch_number", get(handlers::get_batch_by_number))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Discard workflow routes (protected)
fn discard_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_discards).post(handlers::create_discard),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Activity log routes (protected)
fn activity_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_activity))
        .route("/batch/:batch_id", get(handlers::get_batch_activity))
        .route(
            "/number/:batch_number",
            get(handlers::get_batch_activity_by_number),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Stock report routes (protected)
fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(handlers::get_dashboard))
        .route("/low-stock", get(handlers::get_low_stock_report))
        .route("/expiry", get(handlers::get_expiry_report))
        .route("/trends", get(handlers::get_trend_series))
        .route_layer(middleware::from_fn(auth_middleware))
}
