use crate::models::{ServiceType, Ticket, User};
use crate::services::ticket_service::{self, TicketError};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use diesel::prelude::*;
use serde::Deserialize;

#[derive(Deserialize)]
pub struct CreateTicketRequest {
    pub service_type_id: i32,
}

fn ticket_error_status(err: TicketError) -> StatusCode {
    match err {
        TicketError::NotFound(_) => StatusCode::NOT_FOUND,
        TicketError::InvalidTransition { .. } => StatusCode::CONFLICT,
        TicketError::Database(e) => {
            tracing::error!("Ticket operation failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

pub async fn list_tickets(State(state): State<AppState>) -> Result<Json<Vec<Ticket>>, StatusCode> {
    use crate::schema::tickets::dsl::*;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let results = tickets
        .order(created_at.desc())
        .select(Ticket::as_select())
        .load(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(results))
}

pub async fn create_ticket(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(req): Json<CreateTicketRequest>,
) -> Result<Json<Ticket>, StatusCode> {
    if !user.is_staff() {
        return Err(StatusCode::FORBIDDEN);
    }
    use crate::schema::service_types::dsl;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let service: ServiceType = dsl::service_types
        .filter(dsl::id.eq(req.service_type_id))
        .select(ServiceType::as_select())
        .first(&mut conn)
        .optional()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    let ticket =
        ticket_service::create_ticket(&mut conn, &service).map_err(ticket_error_status)?;

    Ok(Json(ticket))
}

pub async fn call_ticket(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(ticket_id): Path<i32>,
) -> Result<Json<Ticket>, StatusCode> {
    if !user.is_staff() {
        return Err(StatusCode::FORBIDDEN);
    }

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let ticket = ticket_service::call_ticket(&mut conn, ticket_id, user.id)
        .map_err(ticket_error_status)?;

    Ok(Json(ticket))
}

pub async fn complete_ticket(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(ticket_id): Path<i32>,
) -> Result<Json<Ticket>, StatusCode> {
    if !user.is_staff() {
        return Err(StatusCode::FORBIDDEN);
    }

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let ticket =
        ticket_service::complete_ticket(&mut conn, ticket_id).map_err(ticket_error_status)?;

    Ok(Json(ticket))
}
