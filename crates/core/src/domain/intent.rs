use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Classified purpose of an inbound utterance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentType {
    Schedule,
    Faq,
    Contact,
    Cancel,
    Reschedule,
    Unknown,
}

impl IntentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Schedule => "schedule",
            Self::Faq => "faq",
            Self::Contact => "contact",
            Self::Cancel => "cancel",
            Self::Reschedule => "reschedule",
            Self::Unknown => "unknown",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "schedule" => Some(Self::Schedule),
            "faq" => Some(Self::Faq),
            "contact" => Some(Self::Contact),
            "cancel" => Some(Self::Cancel),
            "reschedule" => Some(Self::Reschedule),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }
}

impl std::fmt::Display for IntentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Contact details extracted from conversation. All fields optional; a value
/// with no populated field is treated as absent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl ContactInfo {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.phone.is_none()
    }
}

/// A requested appointment time. Only constructible from a well-formed
/// calendar date and 24-hour time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentSlot {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub timezone: String,
}

impl AppointmentSlot {
    /// Parse from `YYYY-MM-DD` and `HH:MM` strings. Returns `None` if either
    /// part is missing or malformed.
    pub fn parse(date: &str, time: &str, timezone: Option<&str>) -> Option<Self> {
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
        let time = NaiveTime::parse_from_str(time, "%H:%M").ok()?;
        Some(Self { date, time, timezone: timezone.unwrap_or("UTC").to_owned() })
    }

    pub fn start(&self) -> chrono::NaiveDateTime {
        self.date.and_time(self.time)
    }
}

/// Result of classifying one utterance. Flows into the interaction record;
/// never persisted directly.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IntentResult {
    pub intent: IntentType,
    pub confidence: f64,
    pub slots: serde_json::Map<String, serde_json::Value>,
    pub contact: Option<ContactInfo>,
    pub appointment: Option<AppointmentSlot>,
    pub raw_text: String,
}

impl IntentResult {
    pub fn new(intent: IntentType, confidence: f64, raw_text: impl Into<String>) -> Self {
        Self {
            intent,
            confidence: clamp_confidence(confidence),
            slots: serde_json::Map::new(),
            contact: None,
            appointment: None,
            raw_text: raw_text.into(),
        }
    }

    /// The guaranteed result when classification fails: unknown intent, zero
    /// confidence, nothing extracted.
    pub fn fallback(raw_text: impl Into<String>) -> Self {
        Self::new(IntentType::Unknown, 0.0, raw_text)
    }

    pub fn with_slots(mut self, slots: serde_json::Map<String, serde_json::Value>) -> Self {
        self.slots = slots;
        self
    }

    pub fn with_contact(mut self, contact: ContactInfo) -> Self {
        self.contact = if contact.is_empty() { None } else { Some(contact) };
        self
    }

    pub fn with_appointment(mut self, appointment: AppointmentSlot) -> Self {
        self.appointment = Some(appointment);
        self
    }
}

pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}
