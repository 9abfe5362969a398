//! Postgres access for the `imports` and `exports` tables.
//!
//! Checklist and notes live in text columns and are always written whole:
//! the last writer wins, there is no version check.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool};
use tracing::info;

use crate::models::shipment::{ExportRow, ImportRow, ShipmentKind, ShipmentRecord};
use crate::shipments::form::ValidatedForm;

/// Row write operations; the column sets differ per table.
#[async_trait]
pub trait ShipmentTable: ShipmentRecord + for<'r> FromRow<'r, PgRow> + Sized {
    async fn insert(
        pool: &PgPool,
        number: &str,
        form: &ValidatedForm,
        checklist: &str,
        notes: &str,
    ) -> Result<Self, sqlx::Error>;

    /// Overwrites every descriptive column plus the checklist blob.
    async fn update(
        pool: &PgPool,
        number: &str,
        form: &ValidatedForm,
        checklist: &str,
    ) -> Result<Option<Self>, sqlx::Error>;
}

#[async_trait]
impl ShipmentTable for ImportRow {
    async fn insert(
        pool: &PgPool,
        number: &str,
        form: &ValidatedForm,
        checklist: &str,
        notes: &str,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, ImportRow>(
            r#"
            INSERT INTO imports
                (import_number, sending_lab, courier, arrival_date, lab_contact_name,
                 lab_contact_email, animal_type, quantity, protocol_number, status,
                 checklist, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(number)
        .bind(&form.sending_lab)
        .bind(&form.courier)
        .bind(form.arrival_date)
        .bind(&form.lab_contact_name)
        .bind(&form.lab_contact_email)
        .bind(&form.animal_type)
        .bind(form.quantity)
        .bind(&form.protocol_number)
        .bind(&form.status)
        .bind(checklist)
        .bind(notes)
        .fetch_one(pool)
        .await
    }

    async fn update(
        pool: &PgPool,
        number: &str,
        form: &ValidatedForm,
        checklist: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, ImportRow>(
            r#"
            UPDATE imports SET
                sending_lab = $2, courier = $3, arrival_date = $4, lab_contact_name = $5,
                lab_contact_email = $6, animal_type = $7, quantity = $8,
                protocol_number = $9, status = $10, checklist = $11, updated_at = NOW()
            WHERE import_number = $1
            RETURNING *
            "#,
        )
        .bind(number)
        .bind(&form.sending_lab)
        .bind(&form.courier)
        .bind(form.arrival_date)
        .bind(&form.lab_contact_name)
        .bind(&form.lab_contact_email)
        .bind(&form.animal_type)
        .bind(form.quantity)
        .bind(&form.protocol_number)
        .bind(&form.status)
        .bind(checklist)
        .fetch_optional(pool)
        .await
    }
}

#[async_trait]
impl ShipmentTable for ExportRow {
    async fn insert(
        pool: &PgPool,
        number: &str,
        form: &ValidatedForm,
        checklist: &str,
        notes: &str,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, ExportRow>(
            r#"
            INSERT INTO exports
                (export_number, sending_lab, destination_lab, courier, departure_date,
                 lab_contact_name, lab_contact_email, animal_type, quantity,
                 protocol_number, status, checklist, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            "#,
        )
        .bind(number)
        .bind(&form.sending_lab)
        .bind(&form.destination_lab)
        .bind(&form.courier)
        .bind(form.departure_date)
        .bind(&form.lab_contact_name)
        .bind(&form.lab_contact_email)
        .bind(&form.animal_type)
        .bind(form.quantity)
        .bind(&form.protocol_number)
        .bind(&form.status)
        .bind(checklist)
        .bind(notes)
        .fetch_one(pool)
        .await
    }

    async fn update(
        pool: &PgPool,
        number: &str,
        form: &ValidatedForm,
        checklist: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, ExportRow>(
            r#"
            UPDATE exports SET
                sending_lab = $2, destination_lab = $3, courier = $4, departure_date = $5,
                lab_contact_name = $6, lab_contact_email = $7, animal_type = $8,
                quantity = $9, protocol_number = $10, status = $11, checklist = $12,
                updated_at = NOW()
            WHERE export_number = $1
            RETURNING *
            "#,
        )
        .bind(number)
        .bind(&form.sending_lab)
        .bind(&form.destination_lab)
        .bind(&form.courier)
        .bind(form.departure_date)
        .bind(&form.lab_contact_name)
        .bind(&form.lab_contact_email)
        .bind(&form.animal_type)
        .bind(form.quantity)
        .bind(&form.protocol_number)
        .bind(&form.status)
        .bind(checklist)
        .fetch_optional(pool)
        .await
    }
}

/// All rows of one table, most recently updated first.
pub async fn fetch_all<R: ShipmentTable>(pool: &PgPool) -> Result<Vec<R>, sqlx::Error> {
    let sql = format!("SELECT * FROM {} ORDER BY updated_at DESC", R::KIND.table());
    sqlx::query_as::<_, R>(&sql).fetch_all(pool).await
}

pub async fn fetch_one<R: ShipmentTable>(
    pool: &PgPool,
    number: &str,
) -> Result<Option<R>, sqlx::Error> {
    let sql = format!(
        "SELECT * FROM {} WHERE {} = $1",
        R::KIND.table(),
        R::KIND.key_column()
    );
    sqlx::query_as::<_, R>(&sql)
        .bind(number)
        .fetch_optional(pool)
        .await
}

/// Deletes the shipment and its document rows. Returns false when no such
/// shipment exists.
pub async fn delete<R: ShipmentTable>(pool: &PgPool, number: &str) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM shipment_documents WHERE shipment_kind = $1 AND shipment_number = $2")
        .bind(R::KIND.as_str())
        .bind(number)
        .execute(&mut *tx)
        .await?;

    let sql = format!(
        "DELETE FROM {} WHERE {} = $1",
        R::KIND.table(),
        R::KIND.key_column()
    );
    let deleted = sqlx::query(&sql).bind(number).execute(&mut *tx).await?;

    tx.commit().await?;

    if deleted.rows_affected() > 0 {
        info!("Deleted {} {number}", R::KIND);
    }
    Ok(deleted.rows_affected() > 0)
}

/// Overwrites the checklist blob.
pub async fn save_checklist<R: ShipmentTable>(
    pool: &PgPool,
    number: &str,
    checklist: &str,
) -> Result<Option<R>, sqlx::Error> {
    overwrite_blob::<R>(pool, number, "checklist", checklist).await
}

/// Overwrites the full notes list.
pub async fn save_notes<R: ShipmentTable>(
    pool: &PgPool,
    number: &str,
    notes: &str,
) -> Result<Option<R>, sqlx::Error> {
    overwrite_blob::<R>(pool, number, "notes", notes).await
}

async fn overwrite_blob<R: ShipmentTable>(
    pool: &PgPool,
    number: &str,
    column: &'static str,
    value: &str,
) -> Result<Option<R>, sqlx::Error> {
    let sql = format!(
        "UPDATE {} SET {column} = $1, updated_at = NOW() WHERE {} = $2 RETURNING *",
        R::KIND.table(),
        R::KIND.key_column()
    );
    sqlx::query_as::<_, R>(&sql)
        .bind(value)
        .bind(number)
        .fetch_optional(pool)
        .await
}

/// Whether a shipment with this natural identifier exists.
pub async fn exists(pool: &PgPool, kind: ShipmentKind, number: &str) -> Result<bool, sqlx::Error> {
    let sql = format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = $1)",
        kind.table(),
        kind.key_column()
    );
    sqlx::query_scalar::<_, bool>(&sql)
        .bind(number)
        .fetch_one(pool)
        .await
}

/// Object keys of every document attached to a shipment.
pub async fn document_keys(
    pool: &PgPool,
    kind: ShipmentKind,
    number: &str,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT s3_key FROM shipment_documents WHERE shipment_kind = $1 AND shipment_number = $2",
    )
    .bind(kind.as_str())
    .bind(number)
    .fetch_all(pool)
    .await
}
