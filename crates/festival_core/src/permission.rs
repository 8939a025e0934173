use std::sync::Arc;

use crate::messages::Language;
use crate::notifications::NotificationBackend;
use crate::storage::{load_json, save_json, KeyValueStore, PERMISSION_DISMISSED_KEY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptChoice {
    OpenSettings,
    DismissPermanently,
    Later,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptAction {
    pub label: String,
    pub choice: PromptChoice,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub title: String,
    pub body: String,
    pub actions: Vec<PromptAction>,
}

/// A modal owned by the UI layer. The user's answer comes back through
/// [`PermissionGate::handle_choice`].
pub trait PromptSurface: Send + Sync {
    fn present(&self, prompt: Prompt);
}

/// Writes prompts to the log for hosts without a modal surface.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogPromptSurface;

impl PromptSurface for LogPromptSurface {
    fn present(&self, prompt: Prompt) {
        let choices: Vec<&str> = prompt
            .actions
            .iter()
            .map(|action| action.label.as_str())
            .collect();
        tracing::warn!(title = %prompt.title, ?choices, "{}", prompt.body);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    /// The backend has no exact-alarm gate.
    NotRequired,
    Granted,
    Denied,
}

impl PermissionState {
    pub fn allows_scheduling(self) -> bool {
        !matches!(self, Self::Denied)
    }
}

pub struct PermissionGate {
    backend: Arc<dyn NotificationBackend>,
    surface: Arc<dyn PromptSurface>,
    store: Arc<dyn KeyValueStore>,
    language: Language,
    dismissed: bool,
    prompt_open: bool,
}

impl PermissionGate {
    pub fn new(
        backend: Arc<dyn NotificationBackend>,
        surface: Arc<dyn PromptSurface>,
        store: Arc<dyn KeyValueStore>,
        language: Language,
    ) -> Self {
        let dismissed: bool = load_json(store.as_ref(), PERMISSION_DISMISSED_KEY);
        Self {
            backend,
            surface,
            store,
            language,
            dismissed,
            prompt_open: false,
        }
    }

    pub fn is_dismissed(&self) -> bool {
        self.dismissed
    }

    pub fn is_prompt_open(&self) -> bool {
        self.prompt_open
    }

    pub fn set_language(&mut self, language: Language) {
        self.language = language;
    }

    /// Queries the backend and, when denied, offers the prompt unless the
    /// user dismissed it for good or it is already on screen.
    pub fn check_exact_alarm(&mut self) -> PermissionState {
        if !self.backend.requires_exact_permission() {
            return PermissionState::NotRequired;
        }
        let granted = match self.backend.can_schedule_exact() {
            Ok(granted) => granted,
            Err(err) => {
                tracing::warn!(%err, backend = self.backend.name(), "exact alarm query failed");
                false
            }
        };
        if granted {
            return PermissionState::Granted;
        }
        self.offer_prompt();
        PermissionState::Denied
    }

    pub fn handle_choice(&mut self, choice: PromptChoice) {
        self.prompt_open = false;
        match choice {
            PromptChoice::OpenSettings => {
                if let Err(err) = self.backend.open_settings() {
                    tracing::error!(%err, "failed to open notification settings");
                }
            }
            PromptChoice::DismissPermanently => {
                self.dismissed = true;
                if let Err(err) = save_json(self.store.as_ref(), PERMISSION_DISMISSED_KEY, &true) {
                    tracing::error!(%err, "failed to persist prompt dismissal");
                }
            }
            PromptChoice::Later => {
                tracing::debug!("permission prompt deferred");
            }
        }
    }

    fn offer_prompt(&mut self) {
        if self.dismissed || self.prompt_open {
            return;
        }
        let messages = self.language.messages();
        let prompt = Prompt {
            title: messages.permission_title.to_string(),
            body: messages.permission_body.to_string(),
            actions: vec![
                PromptAction {
                    label: messages.open_settings.to_string(),
                    choice: PromptChoice::OpenSettings,
                },
                PromptAction {
                    label: messages.dont_ask_again.to_string(),
                    choice: PromptChoice::DismissPermanently,
                },
                PromptAction {
                    label: messages.later.to_string(),
                    choice: PromptChoice::Later,
                },
            ],
        };
        tracing::info!("requesting exact alarm permission");
        self.prompt_open = true;
        self.surface.present(prompt);
    }
}
