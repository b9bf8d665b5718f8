use crate::models::{NewServiceType, ServiceType, User};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use diesel::prelude::*;
use serde::Deserialize;

#[derive(Deserialize)]
pub struct CreateServiceTypeRequest {
    pub name: String,
    pub prefix: Option<String>,
}

pub async fn list_service_types(
    State(state): State<AppState>,
) -> Result<Json<Vec<ServiceType>>, StatusCode> {
    use crate::schema::service_types::dsl::*;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let results = service_types
        .select(ServiceType::as_select())
        .load(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(results))
}

pub async fn create_service_type(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(req): Json<CreateServiceTypeRequest>,
) -> Result<Json<ServiceType>, StatusCode> {
    if !user.is_admin() {
        return Err(StatusCode::FORBIDDEN);
    }
    use crate::schema::service_types;

    let name = req.name.trim().to_string();
    if name.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    // Default prefix: first letter of the service name
    let prefix = match req.prefix {
        Some(p) if !p.trim().is_empty() => p.trim().to_uppercase(),
        _ => name
            .chars()
            .next()
            .map(|c| c.to_uppercase().to_string())
            .unwrap_or_else(|| "T".to_string()),
    };

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let service = diesel::insert_into(service_types::table)
        .values(&NewServiceType { name, prefix })
        .returning(ServiceType::as_select())
        .get_result(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(service))
}

pub async fn delete_service_type(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(service_type_id): Path<i32>,
) -> Result<StatusCode, StatusCode> {
    if !user.is_admin() {
        return Err(StatusCode::FORBIDDEN);
    }
    use crate::schema::service_types::dsl::*;
    use crate::schema::tickets;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    // Tickets keep their service reference for history; block deletion while
    // tickets still point at it.
    let in_use: i64 = tickets::table
        .filter(tickets::service_type_id.eq(service_type_id))
        .count()
        .get_result(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    if in_use > 0 {
        return Err(StatusCode::CONFLICT);
    }

    diesel::delete(service_types.filter(id.eq(service_type_id)))
        .execute(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(StatusCode::NO_CONTENT)
}
