use crate::models::{Display, NewDisplay, Playlist, Slide, UpdateDisplay, User};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Extension, Json,
};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const ORIENTATIONS: &[&str] = &["landscape", "portrait"];

#[derive(Deserialize)]
pub struct CreateDisplayRequest {
    pub name: String,
    pub location: Option<String>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub orientation: Option<String>,
}

#[derive(Serialize)]
pub struct CreateDisplayResponse {
    pub display: Display,
    pub secret_key: String,
}

#[derive(Deserialize)]
pub struct AssignPlaylistRequest {
    pub playlist_id: Option<i32>,
}

#[derive(Serialize)]
pub struct PlaylistContent {
    pub id: i32,
    pub name: String,
    pub slides: Vec<Slide>,
}

#[derive(Serialize)]
pub struct DisplayContentResponse {
    pub display: Display,
    pub playlist: Option<PlaylistContent>,
}

pub async fn list_displays(
    State(state): State<AppState>,
) -> Result<Json<Vec<Display>>, StatusCode> {
    use crate::schema::displays::dsl::*;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let results = displays
        .select(Display::as_select())
        .load(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(results))
}

pub async fn create_display(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(req): Json<CreateDisplayRequest>,
) -> Result<Json<CreateDisplayResponse>, StatusCode> {
    if !user.is_admin() {
        return Err(StatusCode::FORBIDDEN);
    }
    use crate::schema::displays;

    let width = req.width.unwrap_or(1920);
    let height = req.height.unwrap_or(1080);
    let orientation = req.orientation.unwrap_or_else(|| "landscape".to_string());

    if width <= 0 || height <= 0 {
        return Err(StatusCode::BAD_REQUEST);
    }
    if !ORIENTATIONS.contains(&orientation.as_str()) {
        return Err(StatusCode::BAD_REQUEST);
    }

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    // Generate a secret key for the player client
    let secret_key = Uuid::new_v4().to_string();

    let new_display = NewDisplay {
        name: req.name,
        location: req.location.unwrap_or_default(),
        width,
        height,
        orientation,
        secret_key: secret_key.clone(),
        status: "offline".to_string(),
    };

    let display = diesel::insert_into(displays::table)
        .values(&new_display)
        .returning(Display::as_select())
        .get_result(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(CreateDisplayResponse {
        display,
        secret_key,
    }))
}

pub async fn update_display(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(display_id): Path<i32>,
    Json(updates): Json<UpdateDisplay>,
) -> Result<Json<Display>, StatusCode> {
    if !user.is_admin() {
        return Err(StatusCode::FORBIDDEN);
    }
    use crate::schema::displays::dsl::*;

    if let Some(w) = updates.width {
        if w <= 0 {
            return Err(StatusCode::BAD_REQUEST);
        }
    }
    if let Some(h) = updates.height {
        if h <= 0 {
            return Err(StatusCode::BAD_REQUEST);
        }
    }
    if let Some(o) = &updates.orientation {
        if !ORIENTATIONS.contains(&o.as_str()) {
            return Err(StatusCode::BAD_REQUEST);
        }
    }

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let display = diesel::update(displays.filter(id.eq(display_id)))
        .set(&updates)
        .returning(Display::as_select())
        .get_result(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    crate::websocket::broadcast_content_update(&state).await;

    Ok(Json(display))
}

pub async fn delete_display(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(display_id): Path<i32>,
) -> Result<StatusCode, StatusCode> {
    if !user.is_admin() {
        return Err(StatusCode::FORBIDDEN);
    }
    use crate::schema::displays::dsl::*;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    diesel::delete(displays.filter(id.eq(display_id)))
        .execute(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    crate::websocket::broadcast_content_update(&state).await;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn assign_playlist(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(display_id): Path<i32>,
    Json(req): Json<AssignPlaylistRequest>,
) -> Result<Json<Display>, StatusCode> {
    if !user.is_admin() {
        return Err(StatusCode::FORBIDDEN);
    }
    use crate::schema::displays::dsl::*;
    use crate::schema::playlists;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    // Reject assignment of a playlist that doesn't exist; unassigning is always valid
    if let Some(pl_id) = req.playlist_id {
        let exists: i64 = playlists::table
            .filter(playlists::id.eq(pl_id))
            .count()
            .get_result(&mut conn)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        if exists == 0 {
            return Err(StatusCode::NOT_FOUND);
        }
    }

    let display = diesel::update(displays.filter(id.eq(display_id)))
        .set(assigned_playlist_id.eq(req.playlist_id))
        .returning(Display::as_select())
        .get_result(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    crate::websocket::broadcast_content_update(&state).await;

    Ok(Json(display))
}

/// Content endpoint used by player clients. Accepts either an admin JWT or
/// the display's own secret in the X-Display-Secret header.
pub async fn get_display_content(
    State(state): State<AppState>,
    Path(query_display_id): Path<i32>,
    headers: HeaderMap,
) -> Result<Json<DisplayContentResponse>, StatusCode> {
    use crate::schema::displays::dsl as d_dsl;
    use crate::schema::playlists::dsl as p_dsl;
    use crate::schema::slides::dsl as s_dsl;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let display: Display = d_dsl::displays
        .filter(d_dsl::id.eq(query_display_id))
        .select(Display::as_select())
        .first(&mut conn)
        .optional()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    // Auth check
    let mut is_authorized = false;

    // 1. Check JWT (admin UI preview access)
    if let Some(auth_header) = headers.get("authorization").and_then(|h| h.to_str().ok()) {
        if let Some(token) = auth_header.strip_prefix("Bearer ") {
            if crate::auth::jwt::verify_token(token, &state.config.jwt.secret).is_ok() {
                is_authorized = true;
            }
        }
    }

    // 2. Check display secret (player access)
    if !is_authorized {
        if let Some(secret_header) = headers
            .get("X-Display-Secret")
            .and_then(|h| h.to_str().ok())
        {
            if display.secret_key == secret_header {
                is_authorized = true;
            }
        }
    }

    if !is_authorized {
        return Err(StatusCode::UNAUTHORIZED);
    }

    // Resolve the assignment. A dangling playlist reference (deleted playlist)
    // is reported as no assignment.
    let playlist = match display.assigned_playlist_id {
        Some(pl_id) => {
            let playlist_row: Option<Playlist> = p_dsl::playlists
                .filter(p_dsl::id.eq(pl_id))
                .select(Playlist::as_select())
                .first(&mut conn)
                .optional()
                .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

            match playlist_row {
                Some(pl) => {
                    let slide_list = s_dsl::slides
                        .filter(s_dsl::playlist_id.eq(pl.id))
                        .order(s_dsl::position.asc())
                        .select(Slide::as_select())
                        .load(&mut conn)
                        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

                    Some(PlaylistContent {
                        id: pl.id,
                        name: pl.name,
                        slides: slide_list,
                    })
                }
                None => None,
            }
        }
        None => None,
    };

    Ok(Json(DisplayContentResponse { display, playlist }))
}
