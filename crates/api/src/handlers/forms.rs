//! Handlers for form records: catalog, listing, auto-save, submit, delete.
//!
//! `{kind}` path segments are form-kind slugs such as `consent` or
//! `lab_prescription`.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chairside_core::autosave::{resolve_record_id, DraftStore, DraftWrite, SavedDraft};
use chairside_core::eastern_time::format_eastern;
use chairside_core::error::CoreError;
use chairside_core::feature_flags::FLAG_AUTOSAVE;
use chairside_core::form_status::FormStatus;
use chairside_core::forms::{FormKind, FormSchema, FormSnapshot};
use chairside_core::types::DbId;
use chairside_db::models::draft_form::DraftFormFilter;
use chairside_db::repositories::{DraftFormEventRepo, DraftFormRepo};
use chairside_db::RowMapper;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::{RequireDeleter, RequireEditor, RequireSubmitter};
use crate::response::DataResponse;
use crate::state::AppState;

/// Maximum number of audit events returned for one record.
const HISTORY_LIMIT: i64 = 100;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Body for auto-save and submit.
#[derive(Debug, Deserialize)]
pub struct SaveFormRequest {
    /// Record to update. Falls back to `data.id` when absent.
    pub id: Option<DbId>,
    /// Reject the write with 409 unless the row is still at this version.
    pub expected_version: Option<i32>,
    /// Full camelCase form snapshot.
    pub data: serde_json::Value,
}

/// Result of an auto-save call.
#[derive(Debug, Serialize)]
pub struct AutoSaveResponse {
    /// `true` when nothing was written (empty form or auto-save disabled).
    pub skipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<SavedDraft>,
    /// `record.updated_at` in US Eastern time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_saved_display: Option<String>,
}

/// Catalog entry for one form kind.
#[derive(Debug, Serialize)]
pub struct FormKindInfo {
    pub kind: FormKind,
    pub table: &'static str,
    pub display_name: &'static str,
    pub required_fields: &'static [&'static str],
    pub submit_status: FormStatus,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_kind(kind: &str) -> AppResult<&'static FormSchema> {
    kind.parse::<FormKind>()
        .map(FormKind::schema)
        .map_err(AppError::BadRequest)
}

fn validate_status_filter(status: Option<&str>) -> AppResult<()> {
    if let Some(s) = status {
        s.parse::<FormStatus>().map_err(AppError::BadRequest)?;
    }
    Ok(())
}

async fn save(
    state: &AppState,
    user: &AuthUser,
    schema: &'static FormSchema,
    snapshot: &FormSnapshot,
    id: Option<DbId>,
    expected_version: Option<i32>,
    status: FormStatus,
) -> AppResult<SavedDraft> {
    let existing_id = resolve_record_id(None, id, snapshot.record_id());
    let store = state.draft_store(Some(user.user_id));
    let saved = store
        .upsert(DraftWrite {
            schema,
            snapshot,
            existing_id,
            status,
            expected_version,
        })
        .await?;
    Ok(saved)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /forms
///
/// List every form kind with its table and submit rules.
pub async fn list_kinds(_auth: AuthUser) -> AppResult<impl IntoResponse> {
    let kinds: Vec<FormKindInfo> = FormKind::ALL
        .into_iter()
        .map(|kind| {
            let schema = kind.schema();
            FormKindInfo {
                kind,
                table: schema.table,
                display_name: schema.display_name,
                required_fields: schema.required_fields,
                submit_status: schema.submit_status,
            }
        })
        .collect();
    Ok(Json(DataResponse { data: kinds }))
}

/// GET /forms/{kind}/records?patient_id=&lead_id=&packet_id=&status=&limit=&offset=
///
/// Records are returned in snapshot shape, most recently updated first.
pub async fn list_records(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Query(filter): Query<DraftFormFilter>,
) -> AppResult<impl IntoResponse> {
    let schema = parse_kind(&kind)?;
    validate_status_filter(filter.status.as_deref())?;

    let rows = DraftFormRepo::list(&state.pool, schema, &filter).await?;
    let snapshots: Vec<FormSnapshot> = rows.iter().map(|row| schema.from_row(row)).collect();
    Ok(Json(DataResponse { data: snapshots }))
}

/// GET /forms/{kind}/records/{id}
pub async fn get_record(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, DbId)>,
) -> AppResult<impl IntoResponse> {
    let schema = parse_kind(&kind)?;
    let row = DraftFormRepo::find_by_id(&state.pool, schema, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: schema.display_name,
            id,
        }))?;
    Ok(Json(DataResponse {
        data: schema.from_row(&row),
    }))
}

/// GET /forms/{kind}/records/{id}/history
///
/// Change events recorded for one record, newest first.
pub async fn record_history(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, DbId)>,
) -> AppResult<impl IntoResponse> {
    let schema = parse_kind(&kind)?;
    let events =
        DraftFormEventRepo::list_for_record(&state.pool, schema.table, id, HISTORY_LIMIT).await?;
    Ok(Json(DataResponse { data: events }))
}

/// PUT /forms/{kind}/records/autosave
///
/// Background draft save. Empty snapshots, and every call while the
/// `autosave` flag is off, are acknowledged without writing.
pub async fn autosave(
    RequireEditor(user): RequireEditor,
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Json(input): Json<SaveFormRequest>,
) -> AppResult<impl IntoResponse> {
    let schema = parse_kind(&kind)?;
    let snapshot = FormSnapshot::from_value(input.data)?;

    if !state.feature_flags.is_enabled(FLAG_AUTOSAVE) || schema.is_empty_snapshot(&snapshot) {
        return Ok(Json(DataResponse {
            data: AutoSaveResponse {
                skipped: true,
                record: None,
                last_saved_display: None,
            },
        }));
    }

    let saved = save(
        &state,
        &user,
        schema,
        &snapshot,
        input.id,
        input.expected_version,
        FormStatus::Draft,
    )
    .await?;

    tracing::debug!(
        form_kind = %schema.kind,
        record_id = saved.id,
        user_id = %user.user_id,
        "Draft auto-saved"
    );

    Ok(Json(DataResponse {
        data: AutoSaveResponse {
            skipped: false,
            last_saved_display: Some(format_eastern(saved.updated_at)),
            record: Some(saved),
        },
    }))
}

/// POST /forms/{kind}/records/submit
///
/// Validate required fields and persist with the kind's terminal status.
pub async fn submit(
    RequireSubmitter(user): RequireSubmitter,
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Json(input): Json<SaveFormRequest>,
) -> AppResult<impl IntoResponse> {
    let schema = parse_kind(&kind)?;
    let snapshot = FormSnapshot::from_value(input.data)?;
    schema.validate_submission(&snapshot)?;

    let saved = save(
        &state,
        &user,
        schema,
        &snapshot,
        input.id,
        input.expected_version,
        schema.submit_status,
    )
    .await?;

    tracing::info!(
        form_kind = %schema.kind,
        record_id = saved.id,
        status = %saved.status,
        user_id = %user.user_id,
        "Form submitted"
    );

    let status = if saved.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(DataResponse { data: saved })))
}

/// DELETE /forms/{kind}/records/{id}
pub async fn delete_record(
    RequireDeleter(user): RequireDeleter,
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, DbId)>,
) -> AppResult<StatusCode> {
    let schema = parse_kind(&kind)?;
    let deleted = state.draft_store(Some(user.user_id)).delete(schema, id).await?;
    if !deleted {
        return Err(AppError::Core(CoreError::NotFound {
            entity: schema.display_name,
            id,
        }));
    }
    tracing::info!(form_kind = %schema.kind, record_id = id, user_id = %user.user_id, "Form record deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /forms/{kind}/stats
///
/// Record counts per status.
pub async fn status_counts(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> AppResult<impl IntoResponse> {
    let schema = parse_kind(&kind)?;
    let counts = DraftFormRepo::count_by_status(&state.pool, schema).await?;
    Ok(Json(DataResponse { data: counts }))
}
