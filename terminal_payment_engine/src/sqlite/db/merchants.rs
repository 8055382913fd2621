use sqlx::SqliteConnection;

use crate::{
    db_types::{Merchant, NewMerchant},
    traits::DeviceStoreError,
};

pub async fn fetch_all(conn: &mut SqliteConnection) -> Result<Vec<Merchant>, sqlx::Error> {
    let merchants = sqlx::query_as(r#"SELECT * FROM merchants ORDER BY id"#).fetch_all(conn).await?;
    Ok(merchants)
}

pub async fn fetch_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<Merchant>, sqlx::Error> {
    let merchant = sqlx::query_as(r#"SELECT * FROM merchants WHERE id = ?"#).bind(id).fetch_optional(conn).await?;
    Ok(merchant)
}

pub async fn fetch_by_activation_code(
    code: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Merchant>, sqlx::Error> {
    let merchant = sqlx::query_as(r#"SELECT * FROM merchants WHERE activation_code = ?"#)
        .bind(code)
        .fetch_optional(conn)
        .await?;
    Ok(merchant)
}

pub async fn fetch_by_fingerprint(
    fingerprint: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Merchant>, sqlx::Error> {
    let merchant = sqlx::query_as(r#"SELECT * FROM merchants WHERE token_fingerprint = ?"#)
        .bind(fingerprint)
        .fetch_optional(conn)
        .await?;
    Ok(merchant)
}

pub async fn insert(merchant: NewMerchant, conn: &mut SqliteConnection) -> Result<Merchant, sqlx::Error> {
    let merchant = sqlx::query_as(
        r#"
            INSERT INTO merchants (name, access_token_enc, token_fingerprint, activation_code, plan)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(merchant.name)
    .bind(merchant.access_token_enc)
    .bind(merchant.token_fingerprint)
    .bind(merchant.activation_code)
    .bind(merchant.plan)
    .fetch_one(conn)
    .await?;
    Ok(merchant)
}

/// Token rotation. At most one active token per merchant, so this overwrites in place.
pub async fn update_token(
    merchant_id: i64,
    access_token_enc: &str,
    fingerprint: &str,
    conn: &mut SqliteConnection,
) -> Result<(), DeviceStoreError> {
    let result = sqlx::query(r#"UPDATE merchants SET access_token_enc = $1, token_fingerprint = $2 WHERE id = $3"#)
        .bind(access_token_enc)
        .bind(fingerprint)
        .bind(merchant_id)
        .execute(conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(DeviceStoreError::NotFound(format!("Merchant {merchant_id} does not exist")));
    }
    Ok(())
}
