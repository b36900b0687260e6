pub mod attendance;
pub mod core;
pub mod payments;
pub mod reports;
pub mod students;
