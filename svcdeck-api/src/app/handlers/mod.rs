mod control;
mod health;
mod services;

pub use control::{get_control, set_control, toggle_control};
pub use health::health;
pub use services::{
    disable_service, enable_service, get_status, list_services, refresh_services,
    restart_service, start_service, stop_service,
};
