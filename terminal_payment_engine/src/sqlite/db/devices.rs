use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use crate::{
    db_types::{Device, DeviceStatus},
    traits::DeviceStoreError,
};

pub async fn fetch_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<Device>, sqlx::Error> {
    let device = sqlx::query_as(r#"SELECT * FROM devices WHERE id = ?"#).bind(id).fetch_optional(conn).await?;
    Ok(device)
}

pub async fn fetch_by_serial(serial: &str, conn: &mut SqliteConnection) -> Result<Option<Device>, sqlx::Error> {
    let device = sqlx::query_as(r#"SELECT * FROM devices WHERE serial = ?"#).bind(serial).fetch_optional(conn).await?;
    Ok(device)
}

pub async fn fetch_all(conn: &mut SqliteConnection) -> Result<Vec<Device>, sqlx::Error> {
    let devices = sqlx::query_as(r#"SELECT * FROM devices ORDER BY id"#).fetch_all(conn).await?;
    Ok(devices)
}

/// Insert-or-rotate on the globally unique serial. Re-registration keeps the original
/// merchant binding, replaces the credential hash, and reactivates the device; this is the
/// self-service recovery path for a blocked terminal.
pub async fn upsert(
    merchant_id: i64,
    serial: &str,
    api_key_hash: &str,
    conn: &mut SqliteConnection,
) -> Result<Device, sqlx::Error> {
    let device = sqlx::query_as(
        r#"
            INSERT INTO devices (merchant_id, serial, api_key_hash, status) VALUES ($1, $2, $3, 'Active')
            ON CONFLICT (serial) DO UPDATE SET api_key_hash = excluded.api_key_hash, status = 'Active'
            RETURNING *;
        "#,
    )
    .bind(merchant_id)
    .bind(serial)
    .bind(api_key_hash)
    .fetch_one(conn)
    .await?;
    Ok(device)
}

pub async fn update_liveness(
    device_id: i64,
    ip: Option<&str>,
    seen_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query(r#"UPDATE devices SET last_seen = $1, last_ip = COALESCE($2, last_ip) WHERE id = $3"#)
        .bind(seen_at)
        .bind(ip)
        .bind(device_id)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn set_status(
    device_id: i64,
    status: DeviceStatus,
    conn: &mut SqliteConnection,
) -> Result<Device, DeviceStoreError> {
    let device = sqlx::query_as(r#"UPDATE devices SET status = $1 WHERE id = $2 RETURNING *"#)
        .bind(status.to_string())
        .bind(device_id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| DeviceStoreError::NotFound(format!("Device {device_id} does not exist")))?;
    Ok(device)
}
