pub mod backend;
pub mod curated;
pub mod favorites;
pub mod messages;
pub mod notifications;
pub mod performance;
pub mod permission;
pub mod scheduler;
pub mod service;
pub mod source;
pub mod storage;
pub mod timeparse;
pub mod timers;
pub mod watcher;

pub use crate::service::{FestivalService, FestivalServiceBuilder, RefreshReport};
