pub mod feature_flags;
pub mod forms;
