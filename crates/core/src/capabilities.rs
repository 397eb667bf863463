//! Role names and the capability checks that gate form actions.
//!
//! Role names must match the `role` claim issued by the hosted auth
//! provider. Row-level policies in the backend remain the real security
//! boundary; these checks decide what the API offers to whom.

use std::fmt;

use serde::Serialize;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_DENTIST: &str = "dentist";
pub const ROLE_FRONT_DESK: &str = "front_desk";
pub const ROLE_LAB_TECH: &str = "lab_tech";

/// All recognised role names.
pub const VALID_ROLES: &[&str] = &[ROLE_ADMIN, ROLE_DENTIST, ROLE_FRONT_DESK, ROLE_LAB_TECH];

/// An action a role may or may not perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Open form dialogs and auto-save drafts.
    EditForms,
    /// Finalize a form with its terminal status.
    SubmitForms,
    /// Delete persisted form records.
    DeleteRecords,
    /// Reload the feature-flag snapshot.
    ManageFeatureFlags,
}

impl Capability {
    pub fn as_str(self) -> &'static str {
        match self {
            Capability::EditForms => "edit_forms",
            Capability::SubmitForms => "submit_forms",
            Capability::DeleteRecords => "delete_records",
            Capability::ManageFeatureFlags => "manage_feature_flags",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether `role` grants `capability`. Unknown roles grant nothing.
pub fn role_has_capability(role: &str, capability: Capability) -> bool {
    match role {
        ROLE_ADMIN => true,
        ROLE_DENTIST => matches!(capability, Capability::EditForms | Capability::SubmitForms),
        ROLE_FRONT_DESK => matches!(capability, Capability::EditForms | Capability::SubmitForms),
        ROLE_LAB_TECH => matches!(capability, Capability::EditForms),
        _ => false,
    }
}

/// Validate that a role name is recognised.
pub fn validate_role(role: &str) -> Result<(), String> {
    if VALID_ROLES.contains(&role) {
        Ok(())
    } else {
        Err(format!(
            "Invalid role '{role}'. Must be one of: {}",
            VALID_ROLES.join(", ")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_has_every_capability() {
        for cap in [
            Capability::EditForms,
            Capability::SubmitForms,
            Capability::DeleteRecords,
            Capability::ManageFeatureFlags,
        ] {
            assert!(role_has_capability(ROLE_ADMIN, cap), "{cap}");
        }
    }

    #[test]
    fn only_admin_deletes_records() {
        assert!(!role_has_capability(ROLE_DENTIST, Capability::DeleteRecords));
        assert!(!role_has_capability(ROLE_FRONT_DESK, Capability::DeleteRecords));
        assert!(!role_has_capability(ROLE_LAB_TECH, Capability::DeleteRecords));
    }

    #[test]
    fn lab_tech_edits_but_cannot_submit() {
        assert!(role_has_capability(ROLE_LAB_TECH, Capability::EditForms));
        assert!(!role_has_capability(ROLE_LAB_TECH, Capability::SubmitForms));
    }

    #[test]
    fn unknown_role_has_nothing() {
        assert!(!role_has_capability("anon", Capability::EditForms));
        assert!(validate_role("anon").is_err());
        assert!(validate_role(ROLE_FRONT_DESK).is_ok());
    }
}
