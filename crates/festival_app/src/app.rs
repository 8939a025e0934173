use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use festival_core::backend::NoopBackend;
use festival_core::curated::CuratedReport;
use festival_core::messages::Language;
use festival_core::notifications::{NotificationBackend, SystemClock};
use festival_core::permission::LogPromptSurface;
use festival_core::scheduler::DEFAULT_REMINDER_LEAD_MINUTES;
use festival_core::source::{CuratedFeedFile, CuratedSource, PerformanceSource, SnapshotFile};
use festival_core::storage::JsonFileStore;
use festival_core::{FestivalService, RefreshReport};
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::timer_backend::{LogDelivery, TimerBackend};

const DEFAULT_REFRESH_SECS: u64 = 120;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    Timer,
    Noop,
}

impl BackendKind {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "timer" => Some(Self::Timer),
            "noop" | "none" => Some(Self::Noop),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub(crate) snapshot_path: Option<PathBuf>,
    pub(crate) curated_path: Option<PathBuf>,
    pub(crate) state_path: PathBuf,
    pub(crate) refresh_interval: Duration,
    pub(crate) reminder_lead_minutes: i64,
    pub(crate) language: Language,
    pub(crate) backend: BackendKind,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(path) = lookup("FESTIVAL_SNAPSHOT") {
            config.snapshot_path = Some(PathBuf::from(path));
        }
        if let Some(path) = lookup("FESTIVAL_CURATED") {
            config.curated_path = Some(PathBuf::from(path));
        }
        if let Some(path) = lookup("FESTIVAL_STATE") {
            config.state_path = PathBuf::from(path);
        }
        if let Some(secs) = lookup("FESTIVAL_REFRESH_SECS") {
            if let Ok(value) = secs.trim().parse::<u64>() {
                if value > 0 {
                    config.refresh_interval = Duration::from_secs(value);
                }
            }
        }
        if let Some(minutes) = lookup("FESTIVAL_REMINDER_LEAD_MINUTES") {
            if let Ok(value) = minutes.trim().parse::<i64>() {
                if value > 0 {
                    config.reminder_lead_minutes = value;
                }
            }
        }
        if let Some(code) = lookup("FESTIVAL_LANGUAGE") {
            config.language = Language::from_code(&code)
                .ok_or_else(|| anyhow!("unsupported FESTIVAL_LANGUAGE {code:?}, expected nl or en"))?;
        }
        if let Some(kind) = lookup("FESTIVAL_BACKEND") {
            config.backend = BackendKind::parse(&kind)
                .ok_or_else(|| anyhow!("unsupported FESTIVAL_BACKEND {kind:?}, expected timer or noop"))?;
        }
        Ok(config)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            snapshot_path: None,
            curated_path: None,
            state_path: PathBuf::from("festival-state.json"),
            refresh_interval: Duration::from_secs(DEFAULT_REFRESH_SECS),
            reminder_lead_minutes: DEFAULT_REMINDER_LEAD_MINUTES,
            language: Language::default(),
            backend: BackendKind::Timer,
        }
    }
}

/// Drives one [`FestivalService`] from periodic source reads.
pub struct Agent {
    service: FestivalService,
    performances: Option<Box<dyn PerformanceSource>>,
    curated: Option<Box<dyn CuratedSource>>,
    preflighted: bool,
}

impl Agent {
    pub fn new(
        service: FestivalService,
        performances: Option<Box<dyn PerformanceSource>>,
        curated: Option<Box<dyn CuratedSource>>,
    ) -> Self {
        Self {
            service,
            performances,
            curated,
            preflighted: false,
        }
    }

    pub fn service(&self) -> &FestivalService {
        &self.service
    }

    pub fn service_mut(&mut self) -> &mut FestivalService {
        &mut self.service
    }

    /// One refresh cycle. A failed read leaves the previous snapshot in place.
    pub fn tick(&mut self) -> Option<RefreshReport> {
        let report = self.refresh_performances();
        if report.is_some() && !self.preflighted {
            self.service.preflight_permissions();
            self.preflighted = true;
        }
        self.refresh_curated();
        report
    }

    pub fn shutdown(&mut self) -> usize {
        self.service.shutdown()
    }

    fn refresh_performances(&mut self) -> Option<RefreshReport> {
        let source = self.performances.as_ref()?;
        match source.fetch_performances() {
            Ok(snapshot) => {
                let report = self.service.apply_refresh(snapshot);
                debug!(
                    performances = report.performances,
                    evicted = report.evicted.len(),
                    scheduled = report.reminders_scheduled,
                    "refresh applied"
                );
                Some(report)
            }
            Err(err) => {
                warn!("skipping refresh: {err:#}");
                None
            }
        }
    }

    fn refresh_curated(&mut self) -> Option<CuratedReport> {
        let source = self.curated.as_ref()?;
        match source.fetch_curated() {
            Ok(batch) => Some(self.service.process_curated(&batch)),
            Err(err) => {
                warn!("skipping curated feed: {err:#}");
                None
            }
        }
    }
}

pub fn build_agent(config: &AppConfig, runtime: Handle) -> Result<Agent> {
    let store = JsonFileStore::open(&config.state_path)
        .with_context(|| format!("failed to open state file {}", config.state_path.display()))?;
    let clock = Arc::new(SystemClock);
    let backend: Arc<dyn NotificationBackend> = match config.backend {
        BackendKind::Timer => Arc::new(TimerBackend::new(
            runtime,
            clock.clone(),
            Arc::new(LogDelivery),
        )),
        BackendKind::Noop => Arc::new(NoopBackend),
    };

    let service = FestivalService::builder()
        .with_store(Arc::new(store))
        .with_backend(backend)
        .with_prompt_surface(Arc::new(LogPromptSurface))
        .with_clock(clock)
        .language(config.language)
        .reminder_lead(chrono::Duration::minutes(config.reminder_lead_minutes))
        .build()?;

    let performances = config
        .snapshot_path
        .as_ref()
        .map(|path| Box::new(SnapshotFile::new(path)) as Box<dyn PerformanceSource>);
    if performances.is_none() {
        warn!("FESTIVAL_SNAPSHOT not set, no performance data will be loaded");
    }
    let curated = config
        .curated_path
        .as_ref()
        .map(|path| Box::new(CuratedFeedFile::new(path)) as Box<dyn CuratedSource>);

    Ok(Agent::new(service, performances, curated))
}

pub async fn run(config: AppConfig) -> Result<()> {
    info!(
        state = %config.state_path.display(),
        refresh_secs = config.refresh_interval.as_secs(),
        backend = ?config.backend,
        "starting festival agent"
    );
    let mut agent = build_agent(&config, Handle::current())?;

    let mut ticker = tokio::time::interval(config.refresh_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                agent.tick();
            }
            result = &mut shutdown => {
                if let Err(err) = result {
                    warn!(%err, "failed to listen for shutdown signal");
                }
                break;
            }
        }
    }

    agent.shutdown();
    Ok(())
}
