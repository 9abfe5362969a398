//! Axum route handlers for the shipment API.
//!
//! Every handler is generic over the row type, so one set of handlers serves
//! both `/api/v1/imports` and `/api/v1/exports`.

use std::collections::BTreeMap;

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::models::shipment::{ExportRow, ImportRow, ShipmentRecord};
use crate::shipments::checklist::Checklist;
use crate::shipments::dashboard::{summarize, Dashboard};
use crate::shipments::filters::{filter_and_paginate, ListQuery, Page};
use crate::shipments::form::{FormFields, ValidatedForm};
use crate::shipments::notes::{
    append_note, encode_notes, parse_notes, parse_notes_column, NoteEntry, NotesInput,
};
use crate::shipments::repository::{self, ShipmentTable};
use crate::shipments::status::{classify, CanonicalStatus, STATUS_PRESETS};
use crate::shipments::view::ShipmentView;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateShipmentRequest {
    #[serde(flatten)]
    pub fields: FormFields,
    /// Checkbox state entered on the form before first save.
    #[serde(default)]
    pub checklist: Option<BTreeMap<String, bool>>,
    #[serde(default)]
    pub notes: Option<NotesInput>,
}

#[derive(Debug, Deserialize)]
pub struct ChecklistPreviewRequest {
    #[serde(flatten)]
    pub fields: FormFields,
    #[serde(default)]
    pub checklist: Option<BTreeMap<String, bool>>,
}

#[derive(Debug, Serialize)]
pub struct ChecklistResponse<C> {
    pub checklist: C,
    pub progress: u8,
}

impl<C: Checklist> ChecklistResponse<C> {
    fn new(checklist: C) -> Self {
        Self {
            progress: checklist.progress(),
            checklist,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddNoteRequest {
    pub content: String,
    #[serde(default)]
    pub user_name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusPreset {
    pub label: &'static str,
    pub canonical_status: CanonicalStatus,
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

async fn load<R: ShipmentTable>(state: &AppState, number: &str) -> Result<R, AppError> {
    repository::fetch_one::<R>(&state.db, number)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} {number} not found", R::KIND)))
}

fn view<R: ShipmentRecord>(state: &AppState, record: R) -> ShipmentView<R> {
    ShipmentView::from_record(record, &state.config.note_author_placeholder)
}

/// Explicit checkbox values layered over `base`.
fn checklist_with<C: Checklist>(
    base: C,
    explicit: Option<&BTreeMap<String, bool>>,
) -> Result<C, AppError> {
    match explicit {
        Some(changes) => base.apply(changes).map_err(AppError::Validation),
        None => Ok(base),
    }
}

/// Checklist for a new form: explicit checkboxes first, inference on top.
fn initial_checklist<R: ShipmentRecord>(
    fields: &FormFields,
    explicit: Option<&BTreeMap<String, bool>>,
) -> Result<R::Checklist, AppError> {
    let base = checklist_with(R::Checklist::default(), explicit)?;
    Ok(R::infer_checklist(fields, &base))
}

/// Merges `patch` over the stored record and re-runs inference with the
/// stored checklist as base, so items already done stay done.
fn reinfer<R: ShipmentRecord>(
    existing: &R,
    patch: &FormFields,
) -> Result<(ValidatedForm, R::Checklist), AppError> {
    let merged = patch.merged_over(&existing.to_form());
    let validated = merged.validate()?;
    let stored = R::Checklist::decode(existing.checklist_blob());
    Ok((validated, R::infer_checklist(&merged, &stored)))
}

/// The stored notes with one more entry at the end.
fn notes_with<R: ShipmentRecord>(
    existing: &R,
    content: &str,
    user_name: Option<&str>,
    placeholder_author: &str,
) -> Vec<NoteEntry> {
    append_note(
        parse_notes_column(existing.notes_blob(), placeholder_author),
        content,
        user_name,
        placeholder_author,
    )
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/status-presets
pub async fn handle_status_presets() -> Json<Vec<StatusPreset>> {
    Json(
        STATUS_PRESETS
            .iter()
            .map(|&label| StatusPreset {
                label,
                canonical_status: classify(Some(label)),
            })
            .collect(),
    )
}

/// GET /api/v1/dashboard
pub async fn handle_dashboard(State(state): State<AppState>) -> Result<Json<Dashboard>, AppError> {
    let imports: Vec<_> = repository::fetch_all::<ImportRow>(&state.db)
        .await?
        .into_iter()
        .map(|r| view(&state, r))
        .collect();
    let exports: Vec<_> = repository::fetch_all::<ExportRow>(&state.db)
        .await?
        .into_iter()
        .map(|r| view(&state, r))
        .collect();

    Ok(Json(Dashboard {
        imports: summarize(&imports),
        exports: summarize(&exports),
    }))
}

/// GET /api/v1/{imports,exports}
///
/// Canonical status exists only in memory, so filtering happens after the
/// rows are loaded and turned into views.
pub async fn handle_list<R: ShipmentTable>(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Page<ShipmentView<R>>>, AppError> {
    let Query(query) = query.map_err(|e| AppError::Validation(e.body_text()))?;
    query.check()?;
    let views = repository::fetch_all::<R>(&state.db)
        .await?
        .into_iter()
        .map(|r| view(&state, r))
        .collect();
    Ok(Json(filter_and_paginate(
        views,
        &query,
        state.config.default_page_size,
    )))
}

/// POST /api/v1/{imports,exports}
pub async fn handle_create<R: ShipmentTable>(
    State(state): State<AppState>,
    Json(request): Json<CreateShipmentRequest>,
) -> Result<(StatusCode, Json<ShipmentView<R>>), AppError> {
    let number = request.fields.require_number()?;
    let validated = request.fields.validate()?;

    let checklist = initial_checklist::<R>(&request.fields, request.checklist.as_ref())?;
    let notes = parse_notes(request.notes, &state.config.note_author_placeholder);

    let row = R::insert(
        &state.db,
        &number,
        &validated,
        &checklist.encode()?,
        &encode_notes(&notes)?,
    )
    .await
    .map_err(|e| AppError::from_insert(e, format!("{} {number}", R::KIND)))?;

    info!(
        "Created {} {number} (checklist {}%)",
        R::KIND,
        checklist.progress()
    );
    Ok((StatusCode::CREATED, Json(view(&state, row))))
}

/// GET /api/v1/{imports,exports}/:number
pub async fn handle_get<R: ShipmentTable>(
    State(state): State<AppState>,
    Path(number): Path<String>,
) -> Result<Json<ShipmentView<R>>, AppError> {
    let row = load::<R>(&state, &number).await?;
    Ok(Json(view(&state, row)))
}

/// PUT /api/v1/{imports,exports}/:number
///
/// Fields missing from the body keep their stored values; an empty string
/// clears a field. Inference runs over the merged form with the stored
/// checklist as base, so items already done stay done.
pub async fn handle_update<R: ShipmentTable>(
    State(state): State<AppState>,
    Path(number): Path<String>,
    Json(patch): Json<FormFields>,
) -> Result<Json<ShipmentView<R>>, AppError> {
    if let Some(requested) = patch.shipment_number.as_deref().map(str::trim) {
        if !requested.is_empty() && requested != number {
            return Err(AppError::Validation(format!(
                "shipment number cannot be changed from {number} to {requested}"
            )));
        }
    }

    let existing = load::<R>(&state, &number).await?;
    let (validated, checklist) = reinfer(&existing, &patch)?;

    let row = R::update(&state.db, &number, &validated, &checklist.encode()?)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} {number} not found", R::KIND)))?;

    info!("Updated {} {number}", R::KIND);
    Ok(Json(view(&state, row)))
}

/// DELETE /api/v1/{imports,exports}/:number
///
/// Removes the record, its document rows, then the stored document bodies.
/// A body that fails to delete is logged and left behind.
pub async fn handle_delete<R: ShipmentTable>(
    State(state): State<AppState>,
    Path(number): Path<String>,
) -> Result<StatusCode, AppError> {
    let keys = repository::document_keys(&state.db, R::KIND, &number).await?;

    if !repository::delete::<R>(&state.db, &number).await? {
        return Err(AppError::NotFound(format!("{} {number} not found", R::KIND)));
    }

    for key in keys {
        if let Err(e) = state.documents.delete(&key).await {
            warn!("Orphaned document body {key} after deleting {} {number}: {e}", R::KIND);
        }
    }

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/{imports,exports}/checklist/preview
///
/// Inference over an unsaved form, for live progress while editing.
pub async fn handle_preview_checklist<R: ShipmentTable>(
    Json(request): Json<ChecklistPreviewRequest>,
) -> Result<Json<ChecklistResponse<R::Checklist>>, AppError> {
    let checklist = initial_checklist::<R>(&request.fields, request.checklist.as_ref())?;
    Ok(Json(ChecklistResponse::new(checklist)))
}

/// PATCH /api/v1/{imports,exports}/:number/checklist
///
/// Explicit checkbox changes. These may clear an item; the whole checklist is
/// written back.
pub async fn handle_set_checklist<R: ShipmentTable>(
    State(state): State<AppState>,
    Path(number): Path<String>,
    Json(changes): Json<BTreeMap<String, bool>>,
) -> Result<Json<ChecklistResponse<R::Checklist>>, AppError> {
    let existing = load::<R>(&state, &number).await?;
    let stored = R::Checklist::decode(existing.checklist_blob());
    let updated = checklist_with(stored, Some(&changes))?;

    repository::save_checklist::<R>(&state.db, &number, &updated.encode()?)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} {number} not found", R::KIND)))?;

    Ok(Json(ChecklistResponse::new(updated)))
}

/// GET /api/v1/{imports,exports}/:number/notes
pub async fn handle_list_notes<R: ShipmentTable>(
    State(state): State<AppState>,
    Path(number): Path<String>,
) -> Result<Json<Vec<NoteEntry>>, AppError> {
    let row = load::<R>(&state, &number).await?;
    Ok(Json(view(&state, row).notes))
}

/// POST /api/v1/{imports,exports}/:number/notes
///
/// Appends to the stored list and writes the full list back.
pub async fn handle_add_note<R: ShipmentTable>(
    State(state): State<AppState>,
    Path(number): Path<String>,
    Json(request): Json<AddNoteRequest>,
) -> Result<(StatusCode, Json<Vec<NoteEntry>>), AppError> {
    let content = request.content.trim();
    if content.is_empty() {
        return Err(AppError::Validation("note content cannot be empty".to_string()));
    }

    let row = load::<R>(&state, &number).await?;
    let notes = notes_with(
        &row,
        content,
        request.user_name.as_deref(),
        &state.config.note_author_placeholder,
    );

    repository::save_notes::<R>(&state.db, &number, &encode_notes(&notes)?)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} {number} not found", R::KIND)))?;

    Ok((StatusCode::CREATED, Json(notes)))
}
