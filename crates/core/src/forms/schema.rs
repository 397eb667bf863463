//! Per-form schema: table, empty-snapshot heuristic, submit rules.

use serde::Serialize;

use super::snapshot::FormSnapshot;
use super::FormKind;
use crate::error::CoreError;
use crate::form_status::FormStatus;

/// Static description of one form kind.
///
/// Every form table shares the same column layout; the schema says which
/// snapshot keys feed the foreign-key columns and how to judge a snapshot.
#[derive(Debug, Serialize)]
pub struct FormSchema {
    pub kind: FormKind,
    pub table: &'static str,
    pub display_name: &'static str,
    /// A snapshot with none of these populated is "empty" and never saved.
    pub representative_fields: &'static [&'static str],
    /// Fields that must be populated before submit.
    pub required_fields: &'static [&'static str],
    /// Terminal status written on submit.
    pub submit_status: FormStatus,
    /// Snapshot key holding the patient id, when the form links a patient.
    pub patient_key: Option<&'static str>,
    /// Snapshot key holding the lead id.
    pub lead_key: Option<&'static str>,
    /// Snapshot key holding the intake packet id.
    pub packet_key: Option<&'static str>,
}

impl FormSchema {
    /// Whether the snapshot has nothing worth persisting yet.
    pub fn is_empty_snapshot(&self, snapshot: &FormSnapshot) -> bool {
        !self
            .representative_fields
            .iter()
            .any(|field| snapshot.is_populated(field))
    }

    /// Required fields that are not populated, in declaration order.
    pub fn missing_required(&self, snapshot: &FormSnapshot) -> Vec<&'static str> {
        self.required_fields
            .iter()
            .copied()
            .filter(|field| !snapshot.is_populated(field))
            .collect()
    }

    /// Client-side style required-field check performed before submit.
    pub fn validate_submission(&self, snapshot: &FormSnapshot) -> Result<(), CoreError> {
        let missing = self.missing_required(snapshot);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(CoreError::Validation(format!(
                "{} is missing required fields: {}",
                self.display_name,
                missing.join(", ")
            )))
        }
    }

    /// Snapshot keys that map to columns rather than `form_data`.
    pub fn foreign_key_fields(&self) -> impl Iterator<Item = &'static str> {
        [self.patient_key, self.lead_key, self.packet_key]
            .into_iter()
            .flatten()
    }
}
