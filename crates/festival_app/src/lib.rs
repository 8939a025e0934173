pub mod app;
pub mod timer_backend;
