use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "nl")]
    Dutch,
    #[serde(rename = "en")]
    English,
}

impl Language {
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "nl" | "dutch" | "nederlands" => Some(Self::Dutch),
            "en" | "english" => Some(Self::English),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::Dutch => "nl",
            Self::English => "en",
        }
    }

    pub fn messages(self) -> &'static Messages {
        match self {
            Self::Dutch => &DUTCH,
            Self::English => &ENGLISH,
        }
    }
}

/// User-facing notification and prompt texts.
#[derive(Debug)]
pub struct Messages {
    pub reminder_title: &'static str,
    reminder_body: &'static str,
    pub cancellation_title: &'static str,
    cancellation_body: &'static str,
    pub full_title: &'static str,
    full_body: &'static str,
    pub generic_title: &'static str,
    pub permission_title: &'static str,
    pub permission_body: &'static str,
    pub open_settings: &'static str,
    pub dont_ask_again: &'static str,
    pub later: &'static str,
}

impl Messages {
    pub fn reminder_body(&self, show: &str, location: &str, lead_minutes: i64) -> String {
        let minutes = lead_minutes.to_string();
        fill(
            self.reminder_body,
            &[("show", show), ("location", location), ("minutes", &minutes)],
        )
    }

    pub fn cancellation_body(&self, show: &str) -> String {
        fill(self.cancellation_body, &[("show", show)])
    }

    pub fn full_body(&self, show: &str) -> String {
        fill(self.full_body, &[("show", show)])
    }
}

/// Substitutes `{name}` placeholders in one pass, so substituted values are
/// never scanned again.
fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let inner = &rest[open + 1..];
        let placeholder = values
            .iter()
            .find(|&&(name, _)| inner.starts_with(name) && inner[name.len()..].starts_with('}'));
        match placeholder {
            Some(&(name, value)) => {
                out.push_str(value);
                rest = &inner[name.len() + 1..];
            }
            None => {
                out.push('{');
                rest = inner;
            }
        }
    }
    out.push_str(rest);
    out
}

static DUTCH: Messages = Messages {
    reminder_title: "Herinnering: Voorstelling begint bijna!",
    reminder_body: "{show} in {location} begint over {minutes} minuten.",
    cancellation_title: "Voorstelling Geannuleerd",
    cancellation_body: "Let op: {show} is geannuleerd. Kijk in de app voor een alternatief!",
    full_title: "Voorstelling Vol",
    full_body: "Helaas, de voorstelling {show} is vol. Kijk in de app voor een andere voorstelling!",
    generic_title: "Café Theater Festival",
    permission_title: "Notificaties instellen",
    permission_body: "Voor betrouwbare herinneringen heeft de app de permissie \"Wekkers en herinneringen\" nodig. Schakel deze in voor de beste ervaring.",
    open_settings: "Open instellingen",
    dont_ask_again: "Niet meer vragen",
    later: "Later",
};

static ENGLISH: Messages = Messages {
    reminder_title: "Reminder: Performance starts soon!",
    reminder_body: "{show} at {location} starts in {minutes} minutes.",
    cancellation_title: "Performance Cancelled",
    cancellation_body: "Please note: {show} has been cancelled. Check the app for an alternative!",
    full_title: "Performance Full",
    full_body: "Unfortunately, the performance {show} is full. Check the app for another performance!",
    generic_title: "Café Theater Festival",
    permission_title: "Set up Notifications",
    permission_body: "For reliable reminders, the app needs the \"Alarms & reminders\" permission. Please enable it for the best experience.",
    open_settings: "Open settings",
    dont_ask_again: "Don't ask again",
    later: "Later",
};
