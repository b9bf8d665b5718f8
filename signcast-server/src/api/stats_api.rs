use crate::models::{ServiceType, Ticket, User};
use crate::services::metrics_service::{
    compute_queue_metrics, MetricsFilter, QueueMetrics, Viewer,
};
use crate::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::NaiveDate;
use diesel::prelude::*;
use serde::Deserialize;

#[derive(Deserialize)]
pub struct StatsQuery {
    pub date_start: Option<NaiveDate>,
    pub date_end: Option<NaiveDate>,
    pub service_type_id: Option<i32>,
    pub attendant_id: Option<i32>,
}

pub async fn get_queue_stats(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Query(params): Query<StatsQuery>,
) -> Result<Json<QueueMetrics>, StatusCode> {
    use crate::schema::global_settings::dsl::{global_settings, key, value};
    use crate::schema::service_types::dsl::service_types;
    use crate::schema::tickets::dsl::tickets;
    use crate::schema::users::dsl::users;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    // Station timezone drives day boundaries and hour buckets
    let timezone_setting: Option<String> = global_settings
        .filter(key.eq("timezone"))
        .select(value)
        .first(&mut conn)
        .optional()
        .unwrap_or(None);

    let tz: chrono_tz::Tz = timezone_setting
        .as_deref()
        .and_then(|s| s.parse().ok())
        .unwrap_or(chrono_tz::UTC);

    let today = chrono::Utc::now().with_timezone(&tz).date_naive();
    let date_start = params.date_start.unwrap_or(today);
    let date_end = params.date_end.unwrap_or(today);

    if date_start > date_end {
        return Err(StatusCode::BAD_REQUEST);
    }

    let ticket_rows = tickets
        .select(Ticket::as_select())
        .load::<Ticket>(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let service_rows = service_types
        .select(ServiceType::as_select())
        .load::<ServiceType>(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let user_rows = users
        .select(User::as_select())
        .load::<User>(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let filter = MetricsFilter {
        date_start,
        date_end,
        service_type_id: params.service_type_id,
        attendant_id: params.attendant_id,
    };
    let viewer = Viewer {
        user_id: user.id,
        is_admin: user.is_admin(),
    };

    let metrics = compute_queue_metrics(
        &ticket_rows,
        &service_rows,
        &user_rows,
        &filter,
        &viewer,
        tz,
    );

    Ok(Json(metrics))
}
