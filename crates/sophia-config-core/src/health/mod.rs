//! Health validation and automatic repair

mod validator;
pub mod repair;

pub use validator::HealthValidator;
pub use repair::AutoRepairEngine;
