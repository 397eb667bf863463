//! Row structs and DTOs.
//!
//! Each submodule contains a `FromRow` + `Serialize` entity struct matching
//! the database row, plus the input types its repository accepts.

pub mod draft_form;
pub mod draft_form_event;
