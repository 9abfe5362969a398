use std::future::Future;

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use bytes::Bytes;
use tracing::{info, warn};
use uuid::Uuid;

use crate::documents::storage::{document_key, DocumentStore};
use crate::errors::AppError;
use crate::models::shipment::{DocumentRow, ShipmentKind, ShipmentRecord};
use crate::shipments::repository::exists;
use crate::state::AppState;

/// Upper bound on an uploaded document body.
pub const MAX_DOCUMENT_BYTES: usize = 25 * 1024 * 1024;

async fn require_shipment(
    state: &AppState,
    kind: ShipmentKind,
    number: &str,
) -> Result<(), AppError> {
    if exists(&state.db, kind, number).await? {
        Ok(())
    } else {
        Err(AppError::NotFound(format!("{kind} {number} not found")))
    }
}

/// Stores `body`, then runs `record`. A failed `record` removes the stored
/// body again so no object is left without a metadata row.
async fn store_then_record<T, F>(
    store: &dyn DocumentStore,
    key: &str,
    body: Bytes,
    content_type: &str,
    record: F,
) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    store.put(key, body, content_type).await?;
    match record.await {
        Ok(value) => Ok(value),
        Err(e) => {
            if let Err(cleanup) = store.delete(key).await {
                warn!("Orphaned document body {key} after failed insert: {cleanup}");
            }
            Err(e)
        }
    }
}

/// GET /api/v1/{imports,exports}/:number/documents
pub async fn handle_list_documents<R: ShipmentRecord>(
    State(state): State<AppState>,
    Path(number): Path<String>,
) -> Result<Json<Vec<DocumentRow>>, AppError> {
    let kind = R::KIND;
    require_shipment(&state, kind, &number).await?;

    let documents = sqlx::query_as::<_, DocumentRow>(
        "SELECT * FROM shipment_documents WHERE shipment_kind = $1 AND shipment_number = $2 ORDER BY uploaded_at ASC",
    )
    .bind(kind.as_str())
    .bind(&number)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(documents))
}

/// POST /api/v1/{imports,exports}/:number/documents
///
/// Multipart upload with a single `file` field. The body goes to the document
/// store first; the metadata row is only written once the upload succeeded.
pub async fn handle_upload_document<R: ShipmentRecord>(
    State(state): State<AppState>,
    Path(number): Path<String>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<DocumentRow>), AppError> {
    let kind = R::KIND;
    require_shipment(&state, kind, &number).await?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field
            .file_name()
            .map(String::from)
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| "document".to_string());
        let content_type = field
            .content_type()
            .map(String::from)
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let body = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read upload: {e}")))?;
        upload = Some((file_name, content_type, body));
        break;
    }

    let (file_name, content_type, body) =
        upload.ok_or_else(|| AppError::Validation("Missing 'file' field".to_string()))?;
    if body.is_empty() {
        return Err(AppError::Validation("Uploaded file is empty".to_string()));
    }

    let id = Uuid::new_v4();
    let s3_key = document_key(kind.as_str(), &number, &id, &file_name);
    let size_bytes = body.len() as i64;
    let insert = sqlx::query_as::<_, DocumentRow>(
        r#"
        INSERT INTO shipment_documents
            (id, shipment_kind, shipment_number, file_name, content_type, size_bytes, s3_key)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(kind.as_str())
    .bind(&number)
    .bind(&file_name)
    .bind(&content_type)
    .bind(size_bytes)
    .bind(&s3_key)
    .fetch_one(&state.db);

    let row = store_then_record(
        state.documents.as_ref(),
        &s3_key,
        body,
        &content_type,
        async { insert.await.map_err(AppError::from) },
    )
    .await?;

    info!("Attached document {id} ({file_name}) to {kind} {number}");
    Ok((StatusCode::CREATED, Json(row)))
}

/// GET /api/v1/{imports,exports}/:number/documents/:id
pub async fn handle_download_document<R: ShipmentRecord>(
    State(state): State<AppState>,
    Path((number, id)): Path<(String, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    let kind = R::KIND;
    let row = sqlx::query_as::<_, DocumentRow>(
        "SELECT * FROM shipment_documents WHERE id = $1 AND shipment_kind = $2 AND shipment_number = $3",
    )
    .bind(id)
    .bind(kind.as_str())
    .bind(&number)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Document {id} not found on {kind} {number}")))?;

    let body = state.documents.get(&row.s3_key).await?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        row.file_name.replace(['"', '\\'], "_")
    );

    Ok((
        [
            (header::CONTENT_TYPE, row.content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::storage::memory::MemoryDocumentStore;

    #[tokio::test]
    async fn test_failed_insert_removes_stored_body() {
        let store = MemoryDocumentStore::default();
        let result: Result<(), AppError> = store_then_record(
            &store,
            "shipments/import/IMP-1/doc.pdf",
            Bytes::from_static(b"permit"),
            "application/pdf",
            async { Err(AppError::Conflict("duplicate document".to_string())) },
        )
        .await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
        assert!(matches!(
            store.get("shipments/import/IMP-1/doc.pdf").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_successful_insert_keeps_stored_body() {
        let store = MemoryDocumentStore::default();
        let id = store_then_record(
            &store,
            "shipments/export/EXP-1/doc.pdf",
            Bytes::from_static(b"cert"),
            "application/pdf",
            async { Ok::<_, AppError>(7) },
        )
        .await
        .unwrap();

        assert_eq!(id, 7);
        assert_eq!(
            store.get("shipments/export/EXP-1/doc.pdf").await.unwrap(),
            Bytes::from_static(b"cert")
        );
    }
}
