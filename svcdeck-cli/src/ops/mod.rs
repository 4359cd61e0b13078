mod control;
mod output;
mod services;
pub mod ui;

pub use control::{control, ControlAction};
pub use output::OutputFormat;
pub use services::{list_services, refresh_services, run_action, status_service, ServiceAction};
