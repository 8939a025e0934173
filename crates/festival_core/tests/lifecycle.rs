mod common;

use std::sync::Arc;

use chrono::{Duration, Local, TimeZone};
use festival_core::backend::BridgeBackend;
use festival_core::favorites::FavoriteToggle;
use festival_core::messages::Language;
use festival_core::notifications::ManualClock;
use festival_core::performance::{PerformanceId, PerformanceStatus};
use festival_core::permission::PromptChoice;
use festival_core::storage::{JsonFileStore, KeyValueStore, FAVORITES_KEY, PERMISSION_DISMISSED_KEY};
use festival_core::FestivalService;
use tempfile::tempdir;

use common::{performance, today_at, FakeHost, RecordingBackend, RecordingSurface};

fn local_service(now: chrono::NaiveDateTime) -> (FestivalService, Arc<RecordingBackend>) {
    let backend = Arc::new(RecordingBackend::default());
    let service = FestivalService::builder()
        .with_backend(backend.clone())
        .with_clock(Arc::new(ManualClock::new(now)))
        .language(Language::English)
        .build()
        .expect("build festival service");
    (service, backend)
}

#[test]
fn reminder_fires_twenty_minutes_before_start() {
    let (mut service, backend) = local_service(today_at(17, 35));
    let a = performance("a", "18:00", PerformanceStatus::Normal);
    service.apply_refresh(vec![a.clone()]);

    service.toggle_favorite(&a);

    let requests = backend.requests.lock().clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].id.as_str(), "a");
    assert_eq!(requests[0].scheduled_for, today_at(17, 40));
    assert_eq!(requests[0].payload_url.as_deref(), Some("https://example.org/a"));
    assert!(requests[0].body.contains("Collectief - Show a"));
    assert!(requests[0].body.contains("Neude"));
    assert_eq!(service.active_timer_count(), 1);
}

#[test]
fn passed_reminder_for_normal_show_does_nothing() {
    let (mut service, backend) = local_service(today_at(17, 45));
    let b = performance("b", "18:00", PerformanceStatus::Normal);
    service.apply_refresh(vec![b.clone()]);

    service.toggle_favorite(&b);

    assert!(service.is_favorite(&b.id));
    assert!(backend.requests.lock().is_empty());
    assert_eq!(service.active_timer_count(), 0);
}

#[test]
fn favorite_turning_full_is_announced_once_and_evicted() {
    let (mut service, backend) = local_service(today_at(12, 0));
    let c = performance("c", "18:00", PerformanceStatus::Normal);
    service.apply_refresh(vec![c.clone()]);
    service.toggle_favorite(&c);
    assert!(service.has_pending_reminder(&c.id));

    let full = performance("c", "18:00", PerformanceStatus::Full);
    let report = service.apply_refresh(vec![full.clone()]);
    assert_eq!(report.evicted, vec![c.id.clone()]);

    // A second identical refresh must not announce again.
    service.apply_refresh(vec![full]);

    let status_notices: Vec<String> = backend
        .request_ids()
        .into_iter()
        .filter(|id| id.starts_with("full-c-"))
        .collect();
    assert_eq!(status_notices.len(), 1);
    assert!(!service.is_favorite(&c.id));
    assert!(!service.has_pending_reminder(&c.id));
    assert_eq!(*backend.timers_cancelled.lock(), vec!["c".to_string()]);
    assert!(backend.cancelled.lock().contains(&"c".to_string()));
}

#[test]
fn favorite_turning_cancelled_is_announced_once_and_evicted() {
    let (mut service, backend) = local_service(today_at(12, 0));
    let e = performance("e", "18:00", PerformanceStatus::Normal);
    service.apply_refresh(vec![e.clone()]);
    service.toggle_favorite(&e);
    assert!(service.has_pending_reminder(&e.id));

    let cancelled = performance("e", "18:00", PerformanceStatus::Cancelled);
    let report = service.apply_refresh(vec![cancelled.clone()]);
    assert_eq!(report.evicted, vec![e.id.clone()]);
    assert_eq!(report.status_changes.len(), 1);
    assert_eq!(report.status_changes[0].current, PerformanceStatus::Cancelled);

    let sent_before = backend.requests.lock().len();
    let report = service.apply_refresh(vec![cancelled]);
    assert!(report.status_changes.is_empty());
    assert_eq!(backend.requests.lock().len(), sent_before);

    let notices: Vec<_> = backend
        .requests
        .lock()
        .iter()
        .filter(|request| request.id.as_str().starts_with("cancelled-e-"))
        .cloned()
        .collect();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].title, "Performance Cancelled");
    assert_eq!(notices[0].scheduled_for, today_at(12, 0) + Duration::seconds(1));
    assert!(!service.is_favorite(&e.id));
    assert!(!service.has_pending_reminder(&e.id));
    assert_eq!(*backend.timers_cancelled.lock(), vec!["e".to_string()]);
}

#[test]
fn cancelled_after_reminder_window_sends_single_notice() {
    let (mut service, backend) = local_service(today_at(17, 50));
    let d = performance("d", "18:00", PerformanceStatus::Cancelled);
    service.apply_refresh(vec![d.clone()]);

    service.toggle_favorite(&d);
    service.apply_refresh(vec![d.clone()]);

    let ids = backend.request_ids();
    assert_eq!(ids, vec!["cancellation-d".to_string()]);
    let requests = backend.requests.lock();
    assert_eq!(requests[0].title, "Performance Cancelled");
    assert_eq!(requests[0].scheduled_for, today_at(17, 50));
}

#[test]
fn rapid_double_toggle_leaves_no_timer() {
    let (mut service, backend) = local_service(today_at(12, 0));
    let a = performance("a", "18:00", PerformanceStatus::Normal);

    assert_eq!(service.toggle_favorite(&a), FavoriteToggle::Added);
    assert_eq!(service.toggle_favorite(&a), FavoriteToggle::Removed);

    assert!(service.favorites().is_empty());
    assert_eq!(service.active_timer_count(), 0);
    assert_eq!(*backend.timers_cancelled.lock(), vec!["a".to_string()]);
}

#[test]
fn rescheduling_replaces_existing_timer() {
    let (mut service, backend) = local_service(today_at(12, 0));
    let a = performance("a", "18:00", PerformanceStatus::Normal);
    service.apply_refresh(vec![a.clone()]);
    service.toggle_favorite(&a);

    let moved = performance("a", "19:00", PerformanceStatus::Normal);
    service.apply_refresh(vec![moved]);

    assert_eq!(service.active_timer_count(), 1);
    assert_eq!(*backend.timers_cancelled.lock(), vec!["a".to_string()]);
    let last = backend.requests.lock().last().cloned().expect("request");
    assert_eq!(last.scheduled_for, today_at(18, 40));
}

#[test]
fn favorites_survive_restart_and_are_rearmed() {
    let dir = tempdir().expect("tempdir");
    let state = dir.path().join("state.json");
    let a = performance("a", "18:00", PerformanceStatus::Normal);

    {
        let store = Arc::new(JsonFileStore::open(&state).expect("open store"));
        let backend = Arc::new(RecordingBackend::default());
        let mut service = FestivalService::builder()
            .with_store(store.clone())
            .with_backend(backend)
            .with_clock(Arc::new(ManualClock::new(today_at(12, 0))))
            .build()
            .expect("build festival service");
        service.toggle_favorite(&a);
        assert_eq!(
            store.get(FAVORITES_KEY).expect("read").as_deref(),
            Some(r#"["a"]"#)
        );
        service.shutdown();
    }

    let store = Arc::new(JsonFileStore::open(&state).expect("reopen store"));
    let backend = Arc::new(RecordingBackend::default());
    let mut service = FestivalService::builder()
        .with_store(store)
        .with_backend(backend.clone())
        .with_clock(Arc::new(ManualClock::new(today_at(13, 0))))
        .build()
        .expect("build festival service");

    assert!(service.is_favorite(&PerformanceId::new("a")));
    assert_eq!(service.active_timer_count(), 0);

    let report = service.apply_refresh(vec![a.clone()]);
    assert_eq!(report.reminders_scheduled, 1);
    assert!(service.has_pending_reminder(&a.id));
    assert_eq!(backend.requests.lock()[0].scheduled_for, today_at(17, 40));
}

#[test]
fn corrupt_state_file_starts_clean() {
    let dir = tempdir().expect("tempdir");
    let state = dir.path().join("state.json");
    std::fs::write(&state, "{ not json").expect("write corrupt state");

    let store = Arc::new(JsonFileStore::open(&state).expect("open store"));
    let service = FestivalService::builder()
        .with_store(store)
        .build()
        .expect("build festival service");
    assert!(service.favorites().is_empty());
}

#[test]
fn native_bridge_waits_for_exact_alarm_permission() {
    let host = Arc::new(BridgeBackend::new(FakeHost::default()));
    let surface = Arc::new(RecordingSurface::default());
    let dir = tempdir().expect("tempdir");
    let store = Arc::new(JsonFileStore::open(dir.path().join("state.json")).expect("open store"));
    let mut service = FestivalService::builder()
        .with_store(store.clone())
        .with_backend(host.clone())
        .with_prompt_surface(surface.clone())
        .with_clock(Arc::new(ManualClock::new(today_at(12, 0))))
        .language(Language::Dutch)
        .build()
        .expect("build festival service");

    let a = performance("a", "18:00", PerformanceStatus::Normal);
    let report = service.apply_refresh(vec![a.clone()]);
    assert_eq!(report.reminders_deferred, 0);

    service.toggle_favorite(&a);
    assert!(host.bridge().scheduled.lock().is_empty());
    assert!(service.is_prompt_open());
    {
        let prompts = surface.prompts.lock();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].actions.len(), 3);
    }
    let saved = host.bridge().saved_favorites.lock().clone();
    assert!(saved.last().expect("favorites handed over").contains("\"a\""));

    service.handle_prompt_choice(PromptChoice::OpenSettings);
    assert_eq!(*host.bridge().settings_opened.lock(), 1);

    host.bridge().grant();
    let report = service.apply_refresh(vec![a.clone()]);
    assert_eq!(report.reminders_scheduled, 1);

    let scheduled = host.bridge().scheduled.lock().clone();
    assert_eq!(scheduled.len(), 1);
    let expected = Local
        .from_local_datetime(&(today_at(18, 0) - Duration::minutes(20)))
        .earliest()
        .expect("local instant")
        .timestamp_millis();
    assert_eq!(scheduled[0].at_epoch_millis, expected);
    assert_eq!(scheduled[0].title, "Herinnering: Voorstelling begint bijna!");
    assert_eq!(scheduled[0].url, "https://example.org/a");
    assert!(store.get(PERMISSION_DISMISSED_KEY).expect("read").is_none());
}

#[test]
fn dismissed_prompt_stays_dismissed_across_restart() {
    let dir = tempdir().expect("tempdir");
    let state = dir.path().join("state.json");
    let build = |surface: Arc<RecordingSurface>| {
        FestivalService::builder()
            .with_store(Arc::new(JsonFileStore::open(&state).expect("open store")))
            .with_backend(Arc::new(BridgeBackend::new(FakeHost::default())))
            .with_prompt_surface(surface)
            .build()
            .expect("build festival service")
    };

    let surface = Arc::new(RecordingSurface::default());
    let mut service = build(surface.clone());
    assert!(!service.preflight_permissions().allows_scheduling());
    service.handle_prompt_choice(PromptChoice::DismissPermanently);
    assert_eq!(surface.prompts.lock().len(), 1);
    drop(service);

    let surface = Arc::new(RecordingSurface::default());
    let mut service = build(surface.clone());
    service.preflight_permissions();
    assert!(surface.prompts.lock().is_empty());
}
