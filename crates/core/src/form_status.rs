//! Draft form lifecycle status.
//!
//! Statuses are stored as lowercase text in every form table. Once a record
//! reaches a terminal status, auto-saves must never move it back to
//! `draft`; a terminal status may still move to another terminal status
//! (e.g. `completed` -> `signed`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle status of a draft form record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormStatus {
    Draft,
    Completed,
    Submitted,
    Signed,
    Void,
}

/// Status values that can never be regressed by an auto-save.
pub const TERMINAL_STATUSES: &[FormStatus] = &[
    FormStatus::Completed,
    FormStatus::Submitted,
    FormStatus::Signed,
    FormStatus::Void,
];

impl FormStatus {
    /// The text stored in the `status` column.
    pub fn as_str(self) -> &'static str {
        match self {
            FormStatus::Draft => "draft",
            FormStatus::Completed => "completed",
            FormStatus::Submitted => "submitted",
            FormStatus::Signed => "signed",
            FormStatus::Void => "void",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, FormStatus::Draft)
    }
}

impl fmt::Display for FormStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(FormStatus::Draft),
            "completed" => Ok(FormStatus::Completed),
            "submitted" => Ok(FormStatus::Submitted),
            "signed" => Ok(FormStatus::Signed),
            "void" => Ok(FormStatus::Void),
            other => Err(format!(
                "Invalid form status '{other}'. Must be one of: draft, completed, submitted, signed, void"
            )),
        }
    }
}
