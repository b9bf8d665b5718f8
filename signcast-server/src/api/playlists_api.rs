use crate::models::{NewPlaylist, NewSlide, Playlist, Slide, UpdateSlide, User};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Serialize)]
pub struct PlaylistWithSlides {
    #[serde(flatten)]
    pub playlist: Playlist,
    pub slides: Vec<Slide>,
}

#[derive(Deserialize)]
pub struct PlaylistRequest {
    pub name: String,
}

#[derive(Deserialize)]
pub struct CreateSlideRequest {
    pub kind: Option<String>,
    pub source_url: String,
    pub duration_secs: i32,
    pub position: Option<i32>,
}

fn validate_source_url(source_url: &str) -> Result<(), StatusCode> {
    url::Url::parse(source_url).map_err(|_| StatusCode::BAD_REQUEST)?;
    Ok(())
}

pub async fn list_playlists(
    State(state): State<AppState>,
) -> Result<Json<Vec<PlaylistWithSlides>>, StatusCode> {
    use crate::schema::playlists::dsl as p_dsl;
    use crate::schema::slides::dsl as s_dsl;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let playlist_rows = p_dsl::playlists
        .select(Playlist::as_select())
        .load::<Playlist>(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let slide_rows = s_dsl::slides
        .order(s_dsl::position.asc())
        .select(Slide::as_select())
        .load::<Slide>(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let mut grouped: HashMap<i32, Vec<Slide>> = HashMap::new();
    for slide in slide_rows {
        grouped.entry(slide.playlist_id).or_default().push(slide);
    }

    let results = playlist_rows
        .into_iter()
        .map(|pl| {
            let slides = grouped.remove(&pl.id).unwrap_or_default();
            PlaylistWithSlides {
                playlist: pl,
                slides,
            }
        })
        .collect();

    Ok(Json(results))
}

pub async fn create_playlist(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(req): Json<PlaylistRequest>,
) -> Result<Json<Playlist>, StatusCode> {
    if !user.is_admin() {
        return Err(StatusCode::FORBIDDEN);
    }
    use crate::schema::playlists;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let playlist = diesel::insert_into(playlists::table)
        .values(&NewPlaylist { name: req.name })
        .returning(Playlist::as_select())
        .get_result(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(playlist))
}

pub async fn update_playlist(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(playlist_id): Path<i32>,
    Json(req): Json<PlaylistRequest>,
) -> Result<Json<Playlist>, StatusCode> {
    if !user.is_admin() {
        return Err(StatusCode::FORBIDDEN);
    }
    use crate::schema::playlists::dsl::*;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let playlist = diesel::update(playlists.filter(id.eq(playlist_id)))
        .set(name.eq(req.name))
        .returning(Playlist::as_select())
        .get_result(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(playlist))
}

pub async fn delete_playlist(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(playlist_id): Path<i32>,
) -> Result<StatusCode, StatusCode> {
    if !user.is_admin() {
        return Err(StatusCode::FORBIDDEN);
    }
    use crate::schema::playlists::dsl::*;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    // Slides cascade with the playlist. Display assignments are left in place;
    // consumers resolve the dangling reference to "no content".
    diesel::delete(playlists.filter(id.eq(playlist_id)))
        .execute(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    crate::websocket::broadcast_content_update(&state).await;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_slides(
    State(state): State<AppState>,
    Path(playlist_id): Path<i32>,
) -> Result<Json<Vec<Slide>>, StatusCode> {
    use crate::schema::slides::dsl;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let slides = dsl::slides
        .filter(dsl::playlist_id.eq(playlist_id))
        .order(dsl::position.asc())
        .select(Slide::as_select())
        .load(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(slides))
}

pub async fn create_slide(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(path_playlist_id): Path<i32>,
    Json(req): Json<CreateSlideRequest>,
) -> Result<Json<Slide>, StatusCode> {
    if !user.is_admin() {
        return Err(StatusCode::FORBIDDEN);
    }
    use crate::schema::playlists;
    use crate::schema::slides;
    use crate::schema::slides::dsl;

    // Admin input policy: durations must be at least one second. The player
    // additionally clamps whatever it receives.
    if req.duration_secs < 1 {
        return Err(StatusCode::BAD_REQUEST);
    }
    let kind = req.kind.unwrap_or_else(|| "image".to_string());
    if kind != "image" {
        return Err(StatusCode::BAD_REQUEST);
    }
    validate_source_url(&req.source_url)?;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let playlist_exists: i64 = playlists::table
        .filter(playlists::id.eq(path_playlist_id))
        .count()
        .get_result(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    if playlist_exists == 0 {
        return Err(StatusCode::NOT_FOUND);
    }

    // Default to appending at the end of the playlist
    let position = match req.position {
        Some(p) => p,
        None => {
            let max_position: Option<i32> = dsl::slides
                .filter(dsl::playlist_id.eq(path_playlist_id))
                .select(diesel::dsl::max(dsl::position))
                .first(&mut conn)
                .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
            max_position.map(|p| p + 1).unwrap_or(0)
        }
    };

    let new_slide = NewSlide {
        playlist_id: path_playlist_id,
        kind,
        source_url: req.source_url,
        duration_secs: req.duration_secs,
        position,
    };

    let slide = diesel::insert_into(slides::table)
        .values(&new_slide)
        .returning(Slide::as_select())
        .get_result(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    crate::websocket::broadcast_content_update(&state).await;

    Ok(Json(slide))
}

pub async fn update_slide(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path((_playlist_id, slide_id)): Path<(i32, i32)>,
    Json(updates): Json<UpdateSlide>,
) -> Result<Json<Slide>, StatusCode> {
    if !user.is_admin() {
        return Err(StatusCode::FORBIDDEN);
    }
    use crate::schema::slides::dsl::*;

    if let Some(secs) = updates.duration_secs {
        if secs < 1 {
            return Err(StatusCode::BAD_REQUEST);
        }
    }
    if let Some(new_url) = &updates.source_url {
        validate_source_url(new_url)?;
    }

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let slide = diesel::update(slides.filter(id.eq(slide_id)))
        .set(&updates)
        .returning(Slide::as_select())
        .get_result(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    crate::websocket::broadcast_content_update(&state).await;

    Ok(Json(slide))
}

pub async fn delete_slide(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path((_playlist_id, slide_id)): Path<(i32, i32)>,
) -> Result<StatusCode, StatusCode> {
    if !user.is_admin() {
        return Err(StatusCode::FORBIDDEN);
    }
    use crate::schema::slides::dsl::*;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    diesel::delete(slides.filter(id.eq(slide_id)))
        .execute(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    crate::websocket::broadcast_content_update(&state).await;

    Ok(StatusCode::NO_CONTENT)
}
