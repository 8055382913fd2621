use sqlx::SqliteConnection;

use crate::db_types::{NewPayment, Payment};

/// Inserts one payment, or does nothing if `(merchant_id, external_id)` already exists.
///
/// Returns `None` for the duplicate case. The dedup scope is per merchant, not global, since
/// external ids are provider-assigned and could collide across merchant accounts.
pub async fn idempotent_insert(
    merchant_id: i64,
    payment: &NewPayment,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, sqlx::Error> {
    let payment = sqlx::query_as(
        r#"
            INSERT INTO payments (external_id, merchant_id, device_id, amount, payer_name, status, paid_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (merchant_id, external_id) DO NOTHING
            RETURNING *;
        "#,
    )
    .bind(&payment.external_id)
    .bind(merchant_id)
    .bind(payment.device_id)
    .bind(payment.amount)
    .bind(&payment.payer_name)
    .bind(&payment.status)
    .bind(payment.paid_at)
    .fetch_optional(conn)
    .await?;
    Ok(payment)
}

pub async fn fetch_recent_for_merchant(
    merchant_id: i64,
    limit: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Payment>, sqlx::Error> {
    let payments = sqlx::query_as(r#"SELECT * FROM payments WHERE merchant_id = ? ORDER BY paid_at DESC LIMIT ?"#)
        .bind(merchant_id)
        .bind(limit)
        .fetch_all(conn)
        .await?;
    Ok(payments)
}
