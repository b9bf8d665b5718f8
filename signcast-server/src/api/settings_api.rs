use crate::models::{GlobalSetting, User};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use diesel::prelude::*;
use serde::Deserialize;

#[derive(Deserialize)]
pub struct UpdateSettingRequest {
    pub value: String,
}

pub async fn list_settings(
    State(state): State<AppState>,
) -> Result<Json<Vec<GlobalSetting>>, StatusCode> {
    use crate::schema::global_settings::dsl::*;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let results = global_settings
        .select(GlobalSetting::as_select())
        .load(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(results))
}

pub async fn update_setting(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(setting_key): Path<String>,
    Json(req): Json<UpdateSettingRequest>,
) -> Result<Json<GlobalSetting>, StatusCode> {
    if !user.is_admin() {
        return Err(StatusCode::FORBIDDEN);
    }
    use crate::schema::global_settings::dsl::*;

    // Timezone must parse as a IANA name before it is persisted
    if setting_key == "timezone" && req.value.parse::<chrono_tz::Tz>().is_err() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let setting = diesel::update(global_settings.filter(key.eq(&setting_key)))
        .set((value.eq(req.value), updated_at.eq(Utc::now().naive_utc())))
        .returning(GlobalSetting::as_select())
        .get_result(&mut conn)
        .map_err(|_| StatusCode::NOT_FOUND)?;

    Ok(Json(setting))
}
