//! Translation between form snapshots and table rows.

use chairside_core::error::CoreError;
use chairside_core::forms::{value_as_id, FormSchema, FormSnapshot, BOOKKEEPING_KEYS, ID_KEY};
use chairside_core::types::DbId;
use serde_json::{Map, Value};

use crate::models::draft_form::DraftForm;

/// Column values derived from a snapshot, ready to bind.
#[derive(Debug, Clone, PartialEq)]
pub struct NewFormRow {
    pub patient_id: Option<DbId>,
    pub lead_id: Option<DbId>,
    pub packet_id: Option<DbId>,
    pub form_data: Value,
}

/// Maps one form kind between its snapshot shape and its table.
pub trait RowMapper: Send + Sync {
    fn table_name(&self) -> &'static str;

    /// Split a snapshot into foreign-key columns and the `form_data` blob.
    ///
    /// Bookkeeping keys (`id`, `status`, `version`, timestamps) are dropped;
    /// the row owns those.
    fn to_row(&self, snapshot: &FormSnapshot) -> Result<NewFormRow, CoreError>;

    /// Rebuild the snapshot a dialog would be opened with.
    fn from_row(&self, row: &DraftForm) -> FormSnapshot;
}

impl RowMapper for FormSchema {
    fn table_name(&self) -> &'static str {
        self.table
    }

    fn to_row(&self, snapshot: &FormSnapshot) -> Result<NewFormRow, CoreError> {
        let fk = |key: Option<&'static str>| -> Result<Option<DbId>, CoreError> {
            let Some(key) = key else { return Ok(None) };
            match snapshot.get(key) {
                None | Some(Value::Null) => Ok(None),
                Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
                Some(value) => value_as_id(value).map(Some).ok_or_else(|| {
                    CoreError::Validation(format!("{key} must be a positive integer"))
                }),
            }
        };

        let patient_id = fk(self.patient_key)?;
        let lead_id = fk(self.lead_key)?;
        let packet_id = fk(self.packet_key)?;

        let fk_keys: Vec<&str> = self.foreign_key_fields().collect();
        let form_data: Map<String, Value> = snapshot
            .iter()
            .filter(|(key, _)| {
                !BOOKKEEPING_KEYS.contains(&key.as_str()) && !fk_keys.contains(&key.as_str())
            })
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Ok(NewFormRow {
            patient_id,
            lead_id,
            packet_id,
            form_data: Value::Object(form_data),
        })
    }

    fn from_row(&self, row: &DraftForm) -> FormSnapshot {
        let mut snapshot = match &row.form_data {
            Value::Object(map) => FormSnapshot::from(map.clone()),
            _ => FormSnapshot::new(),
        };

        let columns = [
            (self.patient_key, row.patient_id),
            (self.lead_key, row.lead_id),
            (self.packet_key, row.packet_id),
        ];
        for (key, value) in columns {
            if let (Some(key), Some(id)) = (key, value) {
                snapshot.insert(key, Value::from(id));
            }
        }

        snapshot.insert(ID_KEY, Value::from(row.id));
        snapshot.insert("status", Value::from(row.status.clone()));
        snapshot.insert("version", Value::from(row.version));
        snapshot.insert("createdAt", Value::from(row.created_at.to_rfc3339()));
        snapshot.insert("updatedAt", Value::from(row.updated_at.to_rfc3339()));
        snapshot
    }
}
