use crate::db::DbPool;
use crate::models::{NewGlobalSetting, NewServiceType, ServiceType};
use anyhow::Result;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

// Define default settings
const DEFAULT_SETTINGS: &[(&str, &str, &str)] = &[
    ("station_name", "Signcast", "Display name of this installation."),
    (
        "timezone",
        "UTC",
        "IANA timezone used for queue statistics day boundaries.",
    ),
];

// Define default queue service types
const DEFAULT_SERVICE_TYPES: &[(&str, &str)] = &[("General", "A"), ("Priority", "P")];

pub fn seed_defaults(pool: &DbPool) -> Result<()> {
    let mut conn = pool.get()?;
    tracing::info!("Seeding default values...");

    seed_settings(&mut conn)?;
    seed_service_types(&mut conn)?;
    seed_users(&mut conn)?;

    Ok(())
}

fn seed_settings(conn: &mut SqliteConnection) -> Result<()> {
    use crate::schema::global_settings::dsl::*;

    for (key_val, val_val, desc) in DEFAULT_SETTINGS {
        // Check if exists
        let exists: i64 = global_settings
            .filter(key.eq(key_val))
            .count()
            .get_result(conn)?;

        if exists == 0 {
            tracing::info!("Seeding setting: {}", key_val);
            let new_setting = NewGlobalSetting {
                key: key_val.to_string(),
                value: val_val.to_string(),
                description: Some(desc.to_string()),
            };

            diesel::insert_into(global_settings)
                .values(&new_setting)
                .execute(conn)?;
        }
    }
    Ok(())
}

fn seed_service_types(conn: &mut SqliteConnection) -> Result<()> {
    use crate::schema::service_types::dsl::*;

    for (name_val, prefix_val) in DEFAULT_SERVICE_TYPES {
        let existing: Option<ServiceType> = service_types
            .filter(name.eq(name_val))
            .select(ServiceType::as_select())
            .first(conn)
            .optional()?;

        if existing.is_none() {
            tracing::info!("Seeding service type: {}", name_val);
            let new_service = NewServiceType {
                name: name_val.to_string(),
                prefix: prefix_val.to_string(),
            };

            diesel::insert_into(service_types)
                .values(&new_service)
                .execute(conn)?;
        }
    }
    Ok(())
}

fn seed_users(conn: &mut SqliteConnection) -> Result<()> {
    use crate::schema::users::dsl::*;

    // Check if admin user exists
    let exists: i64 = users.filter(username.eq("admin")).count().get_result(conn)?;

    if exists == 0 {
        tracing::info!("Seeding user: admin");
        let password_hash_str = crate::auth::hash_password("admin")?;

        let new_user = crate::models::NewUser {
            username: "admin".to_string(),
            password_hash: password_hash_str,
            name: Some("Administrator".to_string()),
            role: crate::models::ROLE_SUPER_ADMIN.to_string(),
            desk_info: None,
        };

        diesel::insert_into(users).values(&new_user).execute(conn)?;
    }

    Ok(())
}
