pub mod display_monitor;
pub mod metrics_service;
pub mod ticket_service;
