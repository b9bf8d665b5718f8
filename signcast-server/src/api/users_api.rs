use crate::auth::hash_password;
use crate::models::{NewUser, User, ROLE_ATTENDANT, ROLE_SUPER_ADMIN, ROLE_VIEWER};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use diesel::prelude::*;
use serde::Deserialize;

const ROLES: &[&str] = &[ROLE_ATTENDANT, ROLE_SUPER_ADMIN, ROLE_VIEWER];

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    pub name: Option<String>,
    pub role: String,
    pub desk_info: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub role: Option<String>,
    pub desk_info: Option<String>,
}

pub async fn list_users(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<User>>, StatusCode> {
    if !user.is_admin() {
        return Err(StatusCode::FORBIDDEN);
    }
    use crate::schema::users::dsl::*;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let results = users
        .select(User::as_select())
        .load(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(results))
}

pub async fn create_user(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(req): Json<CreateUserRequest>,
) -> Result<Json<User>, StatusCode> {
    if !user.is_admin() {
        return Err(StatusCode::FORBIDDEN);
    }
    use crate::schema::users;

    if !ROLES.contains(&req.role.as_str()) {
        return Err(StatusCode::BAD_REQUEST);
    }

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let password_hash =
        hash_password(&req.password).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let new_user = NewUser {
        username: req.username,
        password_hash,
        name: req.name,
        role: req.role,
        desk_info: req.desk_info,
    };

    let user = diesel::insert_into(users::table)
        .values(&new_user)
        .returning(User::as_select())
        .get_result(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(user))
}

pub async fn update_user(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(user_id): Path<i32>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<User>, StatusCode> {
    if !user.is_admin() {
        return Err(StatusCode::FORBIDDEN);
    }
    use crate::schema::users::dsl::*;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    // Safeguard: if demoting an admin, ensure at least one other admin remains
    if let Some(new_role) = &req.role {
        if !ROLES.contains(&new_role.as_str()) {
            return Err(StatusCode::BAD_REQUEST);
        }

        if new_role != ROLE_SUPER_ADMIN {
            let target_user = users
                .filter(id.eq(user_id))
                .select(User::as_select())
                .first::<User>(&mut conn)
                .optional()
                .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

            if let Some(target) = target_user {
                if target.is_admin() {
                    let admin_count: i64 = users
                        .filter(role.eq(ROLE_SUPER_ADMIN))
                        .count()
                        .get_result(&mut conn)
                        .unwrap_or(0);

                    if admin_count <= 1 {
                        return Err(StatusCode::BAD_REQUEST);
                    }
                }
            }
        }
    }

    if let Some(new_username) = &req.username {
        diesel::update(users.filter(id.eq(user_id)))
            .set(username.eq(new_username))
            .execute(&mut conn)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    }

    if let Some(new_password) = &req.password {
        let new_hash =
            hash_password(new_password).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        diesel::update(users.filter(id.eq(user_id)))
            .set(password_hash.eq(new_hash))
            .execute(&mut conn)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    }

    if let Some(new_name) = &req.name {
        diesel::update(users.filter(id.eq(user_id)))
            .set(name.eq(new_name))
            .execute(&mut conn)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    }

    if let Some(new_role) = &req.role {
        diesel::update(users.filter(id.eq(user_id)))
            .set(role.eq(new_role))
            .execute(&mut conn)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    }

    if let Some(new_desk) = &req.desk_info {
        diesel::update(users.filter(id.eq(user_id)))
            .set(desk_info.eq(new_desk))
            .execute(&mut conn)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    }

    // Fetch and return the updated user
    let user = users
        .filter(id.eq(user_id))
        .select(User::as_select())
        .first(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(user))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(user_id): Path<i32>,
) -> Result<StatusCode, StatusCode> {
    if !user.is_admin() {
        return Err(StatusCode::FORBIDDEN);
    }
    use crate::schema::users::dsl::*;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    // Safeguard: if deleting an admin, ensure at least one other admin remains
    let target_user = users
        .filter(id.eq(user_id))
        .select(User::as_select())
        .first::<User>(&mut conn)
        .optional()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    if let Some(target) = target_user {
        if target.is_admin() {
            let admin_count: i64 = users
                .filter(role.eq(ROLE_SUPER_ADMIN))
                .count()
                .get_result(&mut conn)
                .unwrap_or(0);

            if admin_count <= 1 {
                // Cannot delete the last admin
                return Err(StatusCode::BAD_REQUEST);
            }
        }
    }

    diesel::delete(users.filter(id.eq(user_id)))
        .execute(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(StatusCode::NO_CONTENT)
}
