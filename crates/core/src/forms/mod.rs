//! Clinical and legal form catalog.
//!
//! Each [`FormKind`] has one static [`FormSchema`] describing its table,
//! which fields make a snapshot worth saving, which fields are required on
//! submit, and which terminal status submit writes.

mod schema;
mod snapshot;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::form_status::FormStatus;

pub use schema::FormSchema;
pub use snapshot::{is_value_populated, value_as_id, FormSnapshot, BOOKKEEPING_KEYS, ID_KEY};

/// Snapshot key for the patient foreign key.
pub const PATIENT_KEY: &str = "patientId";
/// Snapshot key for the lead foreign key.
pub const LEAD_KEY: &str = "leadId";
/// Snapshot key for the intake packet foreign key.
pub const PACKET_KEY: &str = "packetId";

/// Every form dialog that auto-saves drafts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormKind {
    Consent,
    Warranty,
    PaymentAgreement,
    FinancialAgreement,
    MedicalHistory,
    TreatmentPlan,
    HipaaAcknowledgment,
    ConsultationNote,
    LabPrescription,
    DeliveryConfirmation,
    PostOpAcknowledgment,
    RecordsRelease,
}

impl FormKind {
    pub const ALL: [FormKind; 12] = [
        FormKind::Consent,
        FormKind::Warranty,
        FormKind::PaymentAgreement,
        FormKind::FinancialAgreement,
        FormKind::MedicalHistory,
        FormKind::TreatmentPlan,
        FormKind::HipaaAcknowledgment,
        FormKind::ConsultationNote,
        FormKind::LabPrescription,
        FormKind::DeliveryConfirmation,
        FormKind::PostOpAcknowledgment,
        FormKind::RecordsRelease,
    ];

    /// URL / message slug.
    pub fn as_str(self) -> &'static str {
        self.schema().slug()
    }

    pub fn schema(self) -> &'static FormSchema {
        match self {
            FormKind::Consent => &CONSENT,
            FormKind::Warranty => &WARRANTY,
            FormKind::PaymentAgreement => &PAYMENT_AGREEMENT,
            FormKind::FinancialAgreement => &FINANCIAL_AGREEMENT,
            FormKind::MedicalHistory => &MEDICAL_HISTORY,
            FormKind::TreatmentPlan => &TREATMENT_PLAN,
            FormKind::HipaaAcknowledgment => &HIPAA_ACKNOWLEDGMENT,
            FormKind::ConsultationNote => &CONSULTATION_NOTE,
            FormKind::LabPrescription => &LAB_PRESCRIPTION,
            FormKind::DeliveryConfirmation => &DELIVERY_CONFIRMATION,
            FormKind::PostOpAcknowledgment => &POST_OP_ACKNOWLEDGMENT,
            FormKind::RecordsRelease => &RECORDS_RELEASE,
        }
    }

    /// Find the form kind whose table is `table`.
    pub fn from_table(table: &str) -> Option<FormKind> {
        Self::ALL.into_iter().find(|kind| kind.schema().table == table)
    }
}

impl fmt::Display for FormKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FormKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| {
                let valid: Vec<&str> = FormKind::ALL.iter().map(|k| k.as_str()).collect();
                format!("Invalid form kind '{s}'. Must be one of: {}", valid.join(", "))
            })
    }
}

impl FormSchema {
    fn slug(&self) -> &'static str {
        match self.kind {
            FormKind::Consent => "consent",
            FormKind::Warranty => "warranty",
            FormKind::PaymentAgreement => "payment_agreement",
            FormKind::FinancialAgreement => "financial_agreement",
            FormKind::MedicalHistory => "medical_history",
            FormKind::TreatmentPlan => "treatment_plan",
            FormKind::HipaaAcknowledgment => "hipaa_acknowledgment",
            FormKind::ConsultationNote => "consultation_note",
            FormKind::LabPrescription => "lab_prescription",
            FormKind::DeliveryConfirmation => "delivery_confirmation",
            FormKind::PostOpAcknowledgment => "post_op_acknowledgment",
            FormKind::RecordsRelease => "records_release",
        }
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

static CONSENT: FormSchema = FormSchema {
    kind: FormKind::Consent,
    table: "consent_forms",
    display_name: "Consent Form",
    representative_fields: &["patientName", "procedureName", "consentGiven"],
    required_fields: &["patientName", "procedureName", "patientSignature"],
    submit_status: FormStatus::Signed,
    patient_key: Some(PATIENT_KEY),
    lead_key: None,
    packet_key: Some(PACKET_KEY),
};

static WARRANTY: FormSchema = FormSchema {
    kind: FormKind::Warranty,
    table: "warranty_forms",
    display_name: "Warranty Form",
    representative_fields: &["patientName", "restorationType", "toothNumbers"],
    required_fields: &["patientName", "restorationType", "warrantyTerm"],
    submit_status: FormStatus::Completed,
    patient_key: Some(PATIENT_KEY),
    lead_key: None,
    packet_key: None,
};

static PAYMENT_AGREEMENT: FormSchema = FormSchema {
    kind: FormKind::PaymentAgreement,
    table: "payment_agreements",
    display_name: "Payment Agreement",
    representative_fields: &["patientName", "totalAmount", "paymentPlan"],
    required_fields: &["patientName", "totalAmount", "paymentPlan", "patientSignature"],
    submit_status: FormStatus::Signed,
    patient_key: Some(PATIENT_KEY),
    lead_key: Some(LEAD_KEY),
    packet_key: None,
};

static FINANCIAL_AGREEMENT: FormSchema = FormSchema {
    kind: FormKind::FinancialAgreement,
    table: "financial_agreements",
    display_name: "Financial Agreement",
    representative_fields: &["responsibleParty", "treatmentCost", "insuranceProvider"],
    required_fields: &["responsibleParty", "treatmentCost", "patientSignature"],
    submit_status: FormStatus::Signed,
    patient_key: Some(PATIENT_KEY),
    lead_key: None,
    packet_key: Some(PACKET_KEY),
};

static MEDICAL_HISTORY: FormSchema = FormSchema {
    kind: FormKind::MedicalHistory,
    table: "medical_history_forms",
    display_name: "Medical History",
    representative_fields: &["patientName", "allergies", "medications", "medicalConditions"],
    required_fields: &["patientName", "dateOfBirth"],
    submit_status: FormStatus::Completed,
    patient_key: Some(PATIENT_KEY),
    lead_key: None,
    packet_key: Some(PACKET_KEY),
};

static TREATMENT_PLAN: FormSchema = FormSchema {
    kind: FormKind::TreatmentPlan,
    table: "treatment_plan_forms",
    display_name: "Treatment Plan",
    representative_fields: &["diagnosis", "proposedTreatment", "phases"],
    required_fields: &["diagnosis", "proposedTreatment"],
    submit_status: FormStatus::Completed,
    patient_key: Some(PATIENT_KEY),
    lead_key: Some(LEAD_KEY),
    packet_key: None,
};

static HIPAA_ACKNOWLEDGMENT: FormSchema = FormSchema {
    kind: FormKind::HipaaAcknowledgment,
    table: "hipaa_acknowledgments",
    display_name: "HIPAA Acknowledgment",
    representative_fields: &["patientName", "acknowledged"],
    required_fields: &["patientName", "acknowledged", "patientSignature"],
    submit_status: FormStatus::Signed,
    patient_key: Some(PATIENT_KEY),
    lead_key: None,
    packet_key: Some(PACKET_KEY),
};

static CONSULTATION_NOTE: FormSchema = FormSchema {
    kind: FormKind::ConsultationNote,
    table: "consultation_notes",
    display_name: "Consultation Note",
    representative_fields: &["chiefComplaint", "findings", "recommendations"],
    required_fields: &["chiefComplaint"],
    submit_status: FormStatus::Completed,
    patient_key: Some(PATIENT_KEY),
    lead_key: Some(LEAD_KEY),
    packet_key: None,
};

static LAB_PRESCRIPTION: FormSchema = FormSchema {
    kind: FormKind::LabPrescription,
    table: "lab_prescriptions",
    display_name: "Lab Prescription",
    representative_fields: &["labName", "restorationType", "shade"],
    required_fields: &["labName", "restorationType", "toothNumbers", "dueDate"],
    submit_status: FormStatus::Submitted,
    patient_key: Some(PATIENT_KEY),
    lead_key: None,
    packet_key: None,
};

static DELIVERY_CONFIRMATION: FormSchema = FormSchema {
    kind: FormKind::DeliveryConfirmation,
    table: "delivery_confirmations",
    display_name: "Delivery Confirmation",
    representative_fields: &["deliveredItems", "deliveryDate", "fitNotes"],
    required_fields: &["deliveredItems", "deliveryDate", "patientSignature"],
    submit_status: FormStatus::Completed,
    patient_key: Some(PATIENT_KEY),
    lead_key: None,
    packet_key: None,
};

static POST_OP_ACKNOWLEDGMENT: FormSchema = FormSchema {
    kind: FormKind::PostOpAcknowledgment,
    table: "post_op_acknowledgments",
    display_name: "Post-Op Instructions Acknowledgment",
    representative_fields: &["procedureName", "instructionsReviewed"],
    required_fields: &["procedureName", "instructionsReviewed", "patientSignature"],
    submit_status: FormStatus::Signed,
    patient_key: Some(PATIENT_KEY),
    lead_key: None,
    packet_key: None,
};

static RECORDS_RELEASE: FormSchema = FormSchema {
    kind: FormKind::RecordsRelease,
    table: "records_release_forms",
    display_name: "Records Release Authorization",
    representative_fields: &["recipientName", "recordsRequested", "purpose"],
    required_fields: &["recipientName", "recordsRequested", "patientSignature"],
    submit_status: FormStatus::Signed,
    patient_key: Some(PATIENT_KEY),
    lead_key: None,
    packet_key: None,
};

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use serde_json::json;

    use super::*;

    fn snapshot(value: serde_json::Value) -> FormSnapshot {
        FormSnapshot::from_value(value).unwrap()
    }

    #[test]
    fn slugs_round_trip_through_from_str() {
        for kind in FormKind::ALL {
            assert_eq!(kind.as_str().parse::<FormKind>(), Ok(kind));
        }
    }

    #[test]
    fn slug_matches_serde_name() {
        for kind in FormKind::ALL {
            assert_eq!(serde_json::to_value(kind).unwrap(), kind.as_str());
        }
    }

    #[test]
    fn tables_are_unique_and_resolvable() {
        let tables: HashSet<&str> = FormKind::ALL.iter().map(|k| k.schema().table).collect();
        assert_eq!(tables.len(), FormKind::ALL.len());
        assert_eq!(
            FormKind::from_table("lab_prescriptions"),
            Some(FormKind::LabPrescription)
        );
        assert_eq!(FormKind::from_table("patients"), None);
    }

    #[test]
    fn every_submit_status_is_terminal() {
        for kind in FormKind::ALL {
            assert!(kind.schema().submit_status.is_terminal(), "{kind}");
        }
    }

    #[test]
    fn unknown_kind_lists_valid_values() {
        let err = "x_ray".parse::<FormKind>().unwrap_err();
        assert!(err.contains("consent"));
        assert!(err.contains("records_release"));
    }

    #[test]
    fn snapshot_without_representative_fields_is_empty() {
        let schema = FormKind::Consent.schema();
        assert!(schema.is_empty_snapshot(&FormSnapshot::new()));
        assert!(schema.is_empty_snapshot(&snapshot(json!({
            "patientName": "",
            "patientId": 12,
            "notes": "not representative",
        }))));
        assert!(!schema.is_empty_snapshot(&snapshot(json!({"patientName": "Jane Doe"}))));
    }

    #[test]
    fn validate_submission_names_missing_fields() {
        let schema = FormKind::Consent.schema();
        let snap = snapshot(json!({"patientName": "Jane Doe"}));

        assert_eq!(
            schema.missing_required(&snap),
            vec!["procedureName", "patientSignature"]
        );
        let err = schema.validate_submission(&snap).unwrap_err().to_string();
        assert!(err.contains("procedureName, patientSignature"));

        let complete = snapshot(json!({
            "patientName": "Jane Doe",
            "procedureName": "Crown prep #14",
            "patientSignature": "data:image/png;base64,AAAA",
        }));
        assert!(schema.validate_submission(&complete).is_ok());
    }

    #[test]
    fn foreign_key_fields_follow_schema() {
        let keys: Vec<&str> = FormKind::PaymentAgreement
            .schema()
            .foreign_key_fields()
            .collect();
        assert_eq!(keys, vec![PATIENT_KEY, LEAD_KEY]);
    }
}
