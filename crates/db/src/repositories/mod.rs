//! Repository layer: one zero-sized struct per concern, async methods over `&PgPool`.

pub mod draft_form_event_repo;
pub mod draft_form_repo;

pub use draft_form_event_repo::DraftFormEventRepo;
pub use draft_form_repo::DraftFormRepo;
