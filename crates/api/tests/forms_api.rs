//! Integration tests for the form record API.
//!
//! Covers auto-save (empty skip, id reuse, flag gating), submit (required
//! fields, terminal status, no regression), optimistic concurrency, listing,
//! deletion and capability checks.

mod common;

use axum::http::StatusCode;
use chairside_core::feature_flags::FeatureFlags;
use chairside_events::{ChangeOp, EventPersistence};
use common::{body_json, delete_auth, get_auth, post_json_auth, put_json_auth, token_for};
use serde_json::json;
use sqlx::PgPool;

const CONSENT_AUTOSAVE: &str = "/api/v1/forms/consent/records/autosave";
const CONSENT_SUBMIT: &str = "/api/v1/forms/consent/records/submit";

fn complete_consent(patient_id: i64) -> serde_json::Value {
    json!({
        "patientId": patient_id,
        "patientName": "Ana Ruiz",
        "procedureName": "Implant placement",
        "patientSignature": "data:image/png;base64,AAAA"
    })
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn catalog_lists_every_form_kind(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = get_auth(app, "/api/v1/forms", &token_for("front_desk")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let kinds = json["data"].as_array().unwrap();
    assert_eq!(kinds.len(), 12);
    assert!(kinds
        .iter()
        .any(|k| k["kind"] == "consent" && k["submit_status"] == "signed"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn requests_without_token_are_401(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = common::get(app, "/api/v1/forms").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["code"], "UNAUTHORIZED");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unknown_form_kind_is_400(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = get_auth(app, "/api/v1/forms/tax_return/records", &token_for("admin")).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Auto-save
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn autosave_empty_snapshot_is_skipped(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let body = json!({"data": {"patientName": "", "consentGiven": false}});
    let response = put_json_auth(app, CONSENT_AUTOSAVE, body, &token_for("dentist")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["skipped"], true);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM consent_forms")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn autosave_inserts_then_updates_same_record(pool: PgPool) {
    let token = token_for("dentist");

    let app = common::build_test_app(pool.clone());
    let body = json!({"data": {"patientId": 9, "patientName": "Ana"}});
    let response = put_json_auth(app, CONSENT_AUTOSAVE, body, &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["skipped"], false);
    assert_eq!(json["data"]["record"]["created"], true);
    assert!(json["data"]["last_saved_display"].as_str().unwrap().contains("E"));
    let id = json["data"]["record"]["id"].as_i64().unwrap();

    let app = common::build_test_app(pool.clone());
    let body = json!({"id": id, "data": {"patientId": 9, "patientName": "Ana Ruiz"}});
    let response = put_json_auth(app, CONSENT_AUTOSAVE, body, &token).await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["record"]["id"], id);
    assert_eq!(json["data"]["record"]["created"], false);
    assert_eq!(json["data"]["record"]["version"], 2);

    // The id embedded in the snapshot is honoured too.
    let app = common::build_test_app(pool.clone());
    let body = json!({"data": {"id": id, "patientName": "Ana R."}});
    let response = put_json_auth(app, CONSENT_AUTOSAVE, body, &token).await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["record"]["id"], id);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM consent_forms")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn autosave_flag_off_skips_writes(pool: PgPool) {
    let flags = FeatureFlags::from_json_str(r#"{"flags": {"autosave": false}}"#).unwrap();
    let app = common::build_test_app_with_flags(pool.clone(), flags);
    let body = json!({"data": {"patientName": "Ana"}});
    let response = put_json_auth(app, CONSENT_AUTOSAVE, body, &token_for("dentist")).await;

    let json = body_json(response).await;
    assert_eq!(json["data"]["skipped"], true);
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM consent_forms")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn autosave_non_object_data_is_400(pool: PgPool) {
    let app = common::build_test_app(pool);
    let body = json!({"data": ["not", "an", "object"]});
    let response = put_json_auth(app, CONSENT_AUTOSAVE, body, &token_for("dentist")).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn autosave_unknown_id_is_404(pool: PgPool) {
    let app = common::build_test_app(pool);
    let body = json!({"id": 424242, "data": {"patientName": "Ana"}});
    let response = put_json_auth(app, CONSENT_AUTOSAVE, body, &token_for("dentist")).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn stale_expected_version_is_409(pool: PgPool) {
    let token = token_for("dentist");
    let app = common::build_test_app(pool.clone());
    let response = put_json_auth(
        app,
        CONSENT_AUTOSAVE,
        json!({"data": {"patientName": "Ana"}}),
        &token,
    )
    .await;
    let id = body_json(response).await["data"]["record"]["id"].as_i64().unwrap();

    let app = common::build_test_app(pool.clone());
    let body = json!({"id": id, "expected_version": 1, "data": {"patientName": "Ana R."}});
    let response = put_json_auth(app, CONSENT_AUTOSAVE, body.clone(), &token).await;
    assert_eq!(response.status(), StatusCode::OK);

    let app = common::build_test_app(pool);
    let response = put_json_auth(app, CONSENT_AUTOSAVE, body, &token).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert_eq!(json["code"], "CONFLICT");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn lab_tech_can_autosave_but_not_submit(pool: PgPool) {
    let token = token_for("lab_tech");

    let app = common::build_test_app(pool.clone());
    let body = json!({"data": {"patientId": 4, "restorationType": "Crown"}});
    let response = put_json_auth(app, "/api/v1/forms/lab_prescription/records/autosave", body, &token).await;
    assert_eq!(response.status(), StatusCode::OK);

    let app = common::build_test_app(pool);
    let response = post_json_auth(app, CONSENT_SUBMIT, json!({"data": complete_consent(4)}), &token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn submit_missing_required_fields_is_400(pool: PgPool) {
    let app = common::build_test_app(pool);
    let body = json!({"data": {"patientName": "Ana"}});
    let response = post_json_auth(app, CONSENT_SUBMIT, body, &token_for("dentist")).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    let message = json["error"].as_str().unwrap();
    assert!(message.contains("procedureName"));
    assert!(message.contains("patientSignature"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn submit_writes_terminal_status_and_autosave_cannot_regress_it(pool: PgPool) {
    let token = token_for("dentist");

    let app = common::build_test_app(pool.clone());
    let response = post_json_auth(app, CONSENT_SUBMIT, json!({"data": complete_consent(9)}), &token).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "signed");
    let id = json["data"]["id"].as_i64().unwrap();

    // A late auto-save for the same record keeps the signed status.
    let app = common::build_test_app(pool.clone());
    let body = json!({"id": id, "data": {"patientName": "Late edit"}});
    let response = put_json_auth(app, CONSENT_AUTOSAVE, body, &token).await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["record"]["status"], "signed");

    let app = common::build_test_app(pool);
    let response = get_auth(app, &format!("/api/v1/forms/consent/records/{id}"), &token).await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "signed");
    assert_eq!(json["data"]["patientId"], 9);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn submit_updates_existing_draft(pool: PgPool) {
    let token = token_for("front_desk");

    let app = common::build_test_app(pool.clone());
    let response = put_json_auth(
        app,
        CONSENT_AUTOSAVE,
        json!({"data": {"patientName": "Ana"}}),
        &token,
    )
    .await;
    let id = body_json(response).await["data"]["record"]["id"].as_i64().unwrap();

    let app = common::build_test_app(pool);
    let mut data = complete_consent(2);
    data["id"] = json!(id);
    let response = post_json_auth(app, CONSENT_SUBMIT, json!({ "data": data }), &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["id"], id);
    assert_eq!(json["data"]["status"], "signed");
    assert_eq!(json["data"]["created"], false);
}

// ---------------------------------------------------------------------------
// Listing, history, deletion
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn list_filters_by_patient_and_status(pool: PgPool) {
    let token = token_for("dentist");
    for (patient, name) in [(1, "A"), (1, "B"), (2, "C")] {
        let app = common::build_test_app(pool.clone());
        put_json_auth(
            app,
            CONSENT_AUTOSAVE,
            json!({"data": {"patientId": patient, "patientName": name}}),
            &token,
        )
        .await;
    }

    let app = common::build_test_app(pool.clone());
    let response = get_auth(app, "/api/v1/forms/consent/records?patient_id=1&status=draft", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let records = json["data"].as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r["patientId"] == 1));

    let app = common::build_test_app(pool.clone());
    let response = get_auth(app, "/api/v1/forms/consent/records?status=archived", &token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let app = common::build_test_app(pool);
    let response = get_auth(app, "/api/v1/forms/consent/stats", &token).await;
    let json = body_json(response).await;
    assert_eq!(json["data"][0]["status"], "draft");
    assert_eq!(json["data"][0]["count"], 3);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn delete_requires_capability_and_publishes_event(pool: PgPool) {
    let state = common::build_test_state(pool.clone(), FeatureFlags::default());
    let mut events = state.event_bus.subscribe();

    let app = common::app_from_state(state.clone());
    let response = put_json_auth(
        app,
        CONSENT_AUTOSAVE,
        json!({"data": {"patientName": "Ana"}}),
        &token_for("dentist"),
    )
    .await;
    let id = body_json(response).await["data"]["record"]["id"].as_i64().unwrap();
    let inserted = events.recv().await.unwrap();
    assert_eq!(inserted.op, ChangeOp::Insert);
    assert_eq!(inserted.record_id, id);

    let uri = format!("/api/v1/forms/consent/records/{id}");
    let app = common::app_from_state(state.clone());
    let response = delete_auth(app, &uri, &token_for("dentist")).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let app = common::app_from_state(state.clone());
    let response = delete_auth(app, &uri, &token_for("admin")).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let deleted = events.recv().await.unwrap();
    assert_eq!(deleted.op, ChangeOp::Delete);

    let app = common::app_from_state(state);
    let response = delete_auth(app, &uri, &token_for("admin")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn history_lists_persisted_events(pool: PgPool) {
    let state = common::build_test_state(pool.clone(), FeatureFlags::default());
    let persistence = tokio::spawn(EventPersistence::run(
        pool.clone(),
        state.event_bus.subscribe(),
    ));
    let token = token_for("dentist");

    let app = common::app_from_state(state.clone());
    let response = put_json_auth(
        app,
        CONSENT_AUTOSAVE,
        json!({"data": {"patientName": "Ana"}}),
        &token,
    )
    .await;
    let id = body_json(response).await["data"]["record"]["id"].as_i64().unwrap();

    let app = common::app_from_state(state.clone());
    post_json_auth(
        app,
        CONSENT_SUBMIT,
        json!({"id": id, "data": complete_consent(3)}),
        &token,
    )
    .await;

    // Persistence runs in the background; wait for both rows.
    let uri = format!("/api/v1/forms/consent/records/{id}/history");
    for _ in 0..100 {
        let persisted: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM draft_form_events WHERE record_id = $1")
                .bind(id)
                .fetch_one(&pool)
                .await
                .unwrap();
        if persisted >= 2 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    persistence.abort();

    let app = common::build_test_app(pool);
    let response = get_auth(app, &uri, &token).await;
    let json = body_json(response).await;
    let ops: Vec<&str> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["operation"].as_str().unwrap())
        .collect();
    assert_eq!(ops, vec!["UPDATE", "INSERT"]);
}
