//! Generic repository for the per-kind form tables.
//!
//! Table names come from a [`RowMapper`], never from user input, so they
//! are interpolated into the SQL directly.

use chairside_core::form_status::FormStatus;
use chairside_core::pagination::{clamp_limit, clamp_offset, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};
use chairside_core::types::DbId;
use sqlx::PgPool;

use crate::error::DraftWriteError;
use crate::mapper::RowMapper;
use crate::models::draft_form::{
    DraftForm, DraftFormFilter, StatusCount, UpsertDraftForm, UpsertedDraftForm,
};

/// Column list shared by every form table.
const COLUMNS: &str = "id, patient_id, lead_id, packet_id, form_data, status, version, \
                       created_by, updated_by, created_at, updated_at";

pub struct DraftFormRepo;

impl DraftFormRepo {
    /// Create or update a form record.
    ///
    /// With `existing_id` the row is updated in place and its version bumped;
    /// without it a new row is inserted at version 1. A `draft` write never
    /// replaces a terminal status already stored. On update, a foreign key
    /// that is null or absent in the snapshot keeps its stored value. When
    /// `expected_version` is set and the row has moved on, nothing is written.
    pub async fn upsert<M: RowMapper + ?Sized>(
        pool: &PgPool,
        mapper: &M,
        input: &UpsertDraftForm<'_>,
    ) -> Result<UpsertedDraftForm, DraftWriteError> {
        let table = mapper.table_name();
        let row = mapper.to_row(input.snapshot).map_err(DraftWriteError::Mapping)?;

        let Some(id) = input.existing_id else {
            let query = format!(
                "INSERT INTO {table} \
                    (patient_id, lead_id, packet_id, form_data, status, created_by, updated_by) \
                 VALUES ($1, $2, $3, $4, $5, $6, $6) \
                 RETURNING {COLUMNS}"
            );
            let inserted = sqlx::query_as::<_, DraftForm>(&query)
                .bind(row.patient_id)
                .bind(row.lead_id)
                .bind(row.packet_id)
                .bind(&row.form_data)
                .bind(input.status.as_str())
                .bind(input.actor)
                .fetch_one(pool)
                .await?;
            tracing::debug!(table, id = inserted.id, status = %inserted.status, "Draft form inserted");
            return Ok(UpsertedDraftForm {
                row: inserted,
                created: true,
            });
        };

        let query = format!(
            "UPDATE {table} SET \
                patient_id = COALESCE($2, patient_id), \
                lead_id = COALESCE($3, lead_id), \
                packet_id = COALESCE($4, packet_id), \
                form_data = $5, \
                status = CASE WHEN status <> '{draft}' AND $6::TEXT = '{draft}' \
                              THEN status ELSE $6::TEXT END, \
                version = version + 1, \
                updated_by = COALESCE($7, updated_by) \
             WHERE id = $1 AND ($8::INTEGER IS NULL OR version = $8) \
             RETURNING {COLUMNS}",
            draft = FormStatus::Draft.as_str(),
        );
        let updated = sqlx::query_as::<_, DraftForm>(&query)
            .bind(id)
            .bind(row.patient_id)
            .bind(row.lead_id)
            .bind(row.packet_id)
            .bind(&row.form_data)
            .bind(input.status.as_str())
            .bind(input.actor)
            .bind(input.expected_version)
            .fetch_optional(pool)
            .await?;

        match updated {
            Some(updated) => {
                tracing::debug!(
                    table,
                    id,
                    version = updated.version,
                    status = %updated.status,
                    "Draft form updated"
                );
                Ok(UpsertedDraftForm {
                    row: updated,
                    created: false,
                })
            }
            None => Err(Self::explain_missed_update(pool, table, id, input.expected_version).await),
        }
    }

    /// An update matched no row: either it does not exist or its version moved.
    async fn explain_missed_update(
        pool: &PgPool,
        table: &'static str,
        id: DbId,
        expected_version: Option<i32>,
    ) -> DraftWriteError {
        let query = format!("SELECT version FROM {table} WHERE id = $1");
        let current: Result<Option<i32>, sqlx::Error> = sqlx::query_scalar(&query)
            .bind(id)
            .fetch_optional(pool)
            .await;
        match (current, expected_version) {
            (Err(e), _) => DraftWriteError::Database(e),
            (Ok(Some(actual)), Some(expected)) => DraftWriteError::VersionConflict {
                table,
                id,
                expected,
                actual,
            },
            (Ok(_), _) => DraftWriteError::NotFound { table, id },
        }
    }

    /// Find a record by its internal ID.
    pub async fn find_by_id<M: RowMapper + ?Sized>(
        pool: &PgPool,
        mapper: &M,
        id: DbId,
    ) -> Result<Option<DraftForm>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM {} WHERE id = $1", mapper.table_name());
        sqlx::query_as::<_, DraftForm>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List records matching the filter, most recently updated first.
    pub async fn list<M: RowMapper + ?Sized>(
        pool: &PgPool,
        mapper: &M,
        filter: &DraftFormFilter,
    ) -> Result<Vec<DraftForm>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM {} \
             WHERE ($1::BIGINT IS NULL OR patient_id = $1) \
               AND ($2::BIGINT IS NULL OR lead_id = $2) \
               AND ($3::BIGINT IS NULL OR packet_id = $3) \
               AND ($4::TEXT IS NULL OR status = $4) \
             ORDER BY updated_at DESC, id DESC \
             LIMIT $5 OFFSET $6",
            mapper.table_name()
        );
        sqlx::query_as::<_, DraftForm>(&query)
            .bind(filter.patient_id)
            .bind(filter.lead_id)
            .bind(filter.packet_id)
            .bind(filter.status.as_deref())
            .bind(clamp_limit(filter.limit, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT))
            .bind(clamp_offset(filter.offset))
            .fetch_all(pool)
            .await
    }

    /// Delete a record. Returns `true` if a row was removed.
    pub async fn delete<M: RowMapper + ?Sized>(
        pool: &PgPool,
        mapper: &M,
        id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let query = format!("DELETE FROM {} WHERE id = $1", mapper.table_name());
        let result = sqlx::query(&query).bind(id).execute(pool).await?;
        Ok(result.rows_affected() > 0)
    }

    /// Row counts grouped by status.
    pub async fn count_by_status<M: RowMapper + ?Sized>(
        pool: &PgPool,
        mapper: &M,
    ) -> Result<Vec<StatusCount>, sqlx::Error> {
        let query = format!(
            "SELECT status, COUNT(*) AS count FROM {} GROUP BY status ORDER BY status",
            mapper.table_name()
        );
        sqlx::query_as::<_, StatusCount>(&query).fetch_all(pool).await
    }
}
