use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

// Ticket status progression is strictly forward: waiting -> called -> completed.
pub const TICKET_WAITING: &str = "waiting";
pub const TICKET_CALLED: &str = "called";
pub const TICKET_COMPLETED: &str = "completed";

pub const ROLE_ATTENDANT: &str = "attendant";
pub const ROLE_SUPER_ADMIN: &str = "super_admin";
pub const ROLE_VIEWER: &str = "viewer";

// User models
#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = crate::schema::users)]
pub struct User {
    pub id: i32,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: Option<String>,
    pub role: String,
    pub desk_info: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_SUPER_ADMIN
    }

    /// Staff can operate the queue (call/complete tickets).
    pub fn is_staff(&self) -> bool {
        self.role == ROLE_ATTENDANT || self.role == ROLE_SUPER_ADMIN
    }
}

#[derive(Debug, Insertable, Deserialize)]
#[diesel(table_name = crate::schema::users)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub name: Option<String>,
    pub role: String,
    pub desk_info: Option<String>,
}

// Display models
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::displays)]
pub struct Display {
    pub id: i32,
    pub name: String,
    pub location: String,
    pub width: i32,
    pub height: i32,
    pub orientation: String,
    pub assigned_playlist_id: Option<i32>,
    #[serde(skip_serializing)]
    pub secret_key: String,
    pub status: String,
    pub last_heartbeat: Option<NaiveDateTime>,
    pub current_slide_id: Option<i32>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable, Deserialize)]
#[diesel(table_name = crate::schema::displays)]
pub struct NewDisplay {
    pub name: String,
    pub location: String,
    pub width: i32,
    pub height: i32,
    pub orientation: String,
    pub secret_key: String,
    pub status: String,
}

#[derive(Debug, AsChangeset, Deserialize)]
#[diesel(table_name = crate::schema::displays)]
pub struct UpdateDisplay {
    pub name: Option<String>,
    pub location: Option<String>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub orientation: Option<String>,
}

// Playlist models
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::playlists)]
pub struct Playlist {
    pub id: i32,
    pub name: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable, Deserialize)]
#[diesel(table_name = crate::schema::playlists)]
pub struct NewPlaylist {
    pub name: String,
}

// Slide models
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::slides)]
pub struct Slide {
    pub id: i32,
    pub playlist_id: i32,
    pub kind: String,
    pub source_url: String,
    pub duration_secs: i32,
    pub position: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable, Deserialize)]
#[diesel(table_name = crate::schema::slides)]
pub struct NewSlide {
    pub playlist_id: i32,
    pub kind: String,
    pub source_url: String,
    pub duration_secs: i32,
    pub position: i32,
}

#[derive(Debug, AsChangeset, Deserialize)]
#[diesel(table_name = crate::schema::slides)]
pub struct UpdateSlide {
    pub source_url: Option<String>,
    pub duration_secs: Option<i32>,
    pub position: Option<i32>,
}

// Ticket models
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::tickets)]
pub struct Ticket {
    pub id: i32,
    pub number: String,
    pub status: String,
    pub service_type_id: i32,
    pub attendant_user_id: Option<i32>,
    pub created_at: NaiveDateTime,
    pub called_at: Option<NaiveDateTime>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::tickets)]
pub struct NewTicket {
    pub number: String,
    pub status: String,
    pub service_type_id: i32,
}

// Service type models
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::service_types)]
pub struct ServiceType {
    pub id: i32,
    pub name: String,
    pub prefix: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable, Deserialize)]
#[diesel(table_name = crate::schema::service_types)]
pub struct NewServiceType {
    pub name: String,
    pub prefix: String,
}

// Global settings models
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::global_settings)]
pub struct GlobalSetting {
    pub id: i32,
    pub key: String,
    pub value: String,
    pub description: Option<String>,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable, Deserialize)]
#[diesel(table_name = crate::schema::global_settings)]
pub struct NewGlobalSetting {
    pub key: String,
    pub value: String,
    pub description: Option<String>,
}
