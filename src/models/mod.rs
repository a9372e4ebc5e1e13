pub mod event_types;
pub mod intake_types;
pub mod progress_types;
pub mod result_types;
pub mod session_types;
