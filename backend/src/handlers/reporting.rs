//! Reporting handlers for stock aggregation and data export

use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::models::TrendGranularity;
use crate::services::reporting::ReportingService;
use crate::AppState;

#[derive(Deserialize)]
pub struct ReportQuery {
    pub format: Option<String>, // "json" or "csv"
}

#[derive(Deserialize)]
pub struct TrendQuery {
    pub granularity: Option<String>, // "week" or "month"
}

/// Get dashboard stats
pub async fn get_dashboard(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<crate::models::DashboardStats>> {
    let service = ReportingService::new(state.db);
    let stats = service.dashboard_stats().await?;
    Ok(Json(stats))
}

/// Get the low stock report
pub async fn get_low_stock_report(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<ReportQuery>,
) -> AppResult<impl IntoResponse> {
    let service = ReportingService::new(state.db);
    let data = service.low_stock_report().await?;

    if query.format.as_deref() == Some("csv") {
        let csv = ReportingService::export_to_csv(&data)?;
        Ok((
            [
                (header::CONTENT_TYPE, "text/csv"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"low_stock.csv\"",
                ),
            ],
            csv,
        )
            .into_response())
    } else {
        Ok(Json(data).into_response())
    }
}

/// Get the expiry report
pub async fn get_expiry_report(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<ReportQuery>,
) -> AppResult<impl IntoResponse> {
    let service = ReportingService::new(state.db);
    let report = service.expiry_report().await?;

    if query.format.as_deref() == Some("csv") {
        let rows = ReportingService::flatten_expiry_report(&report);
        let csv = ReportingService::export_to_csv(&rows)?;
        Ok((
            [
                (header::CONTENT_TYPE, "text/csv"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"expiry.csv\"",
                ),
            ],
            csv,
        )
            .into_response())
    } else {
        Ok(Json(report).into_response())
    }
}

/// Get the intake trend series
pub async fn get_trend_series(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<TrendQuery>,
) -> AppResult<Json<Vec<crate::models::TrendPoint>>> {
    let granularity = match query.granularity.as_deref() {
        Some(value) => TrendGranularity::from_str(value).ok_or_else(|| AppError::Validation {
            field: "granularity".to_string(),
            message: "Granularity must be \"week\" or \"month\"".to_string(),
        })?,
        None => TrendGranularity::Month,
    };

    let service = ReportingService::new(state.db);
    let series = service.trend_series(granularity).await?;
    Ok(Json(series))
}
