use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use secrecy::{ExposeSecret, SecretString};
use tracing::info;

use sara_core::contracts::{SchedulerAdapter, SchedulerError};
use sara_core::domain::intent::{AppointmentSlot, ContactInfo};
use sara_core::scheduling::{
    has_conflict, scan_day_slots, BusyWindow, DEFAULT_APPOINTMENT_MINUTES,
};

/// Google Calendar v3 adapter. Conflict decisions are made locally with the
/// core overlap rules against the busy windows the API reports.
pub struct GoogleCalendarScheduler {
    http: reqwest::Client,
    base_url: String,
    calendar_id: String,
    access_token: SecretString,
}

impl GoogleCalendarScheduler {
    pub fn new(
        base_url: impl Into<String>,
        calendar_id: impl Into<String>,
        access_token: SecretString,
        timeout_secs: u64,
    ) -> Result<Self, SchedulerError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .build()
            .map_err(|error| SchedulerError::Transport(error.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            calendar_id: calendar_id.into(),
            access_token,
        })
    }

    fn events_url(&self) -> String {
        format!("{}/calendars/{}/events", self.base_url, self.calendar_id)
    }

    fn event_url(&self, event_id: &str) -> String {
        format!("{}/{}", self.events_url(), event_id)
    }

    async fn busy_windows(
        &self,
        time_min: NaiveDateTime,
        time_max: NaiveDateTime,
    ) -> Result<Vec<BusyWindow>, SchedulerError> {
        let response = self
            .http
            .get(self.events_url())
            .bearer_auth(self.access_token.expose_secret())
            .query(&[
                ("timeMin", format!("{}Z", time_min.format("%Y-%m-%dT%H:%M:%S"))),
                ("timeMax", format!("{}Z", time_max.format("%Y-%m-%dT%H:%M:%S"))),
                ("singleEvents", "true".to_owned()),
                ("orderBy", "startTime".to_owned()),
            ])
            .send()
            .await
            .map_err(|error| SchedulerError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SchedulerError::Rejected(format!("events list returned {status}: {body}")));
        }

        let payload: serde_json::Value =
            response.json().await.map_err(|error| SchedulerError::Transport(error.to_string()))?;

        let items = payload.get("items").and_then(|value| value.as_array()).cloned();
        Ok(items.unwrap_or_default().iter().filter_map(parse_busy_window).collect())
    }
}

#[async_trait]
impl SchedulerAdapter for GoogleCalendarScheduler {
    async fn check_availability(
        &self,
        slot: &AppointmentSlot,
        duration_minutes: u32,
    ) -> Result<bool, SchedulerError> {
        let start = slot.start();
        let end = start + chrono::Duration::minutes(i64::from(duration_minutes));
        let windows = self.busy_windows(start, end).await?;

        Ok(!has_conflict(start, duration_minutes, &windows))
    }

    async fn create_appointment(
        &self,
        slot: &AppointmentSlot,
        contact: Option<&ContactInfo>,
        description: &str,
    ) -> Result<String, SchedulerError> {
        let start = slot.start();
        let end = start + chrono::Duration::minutes(i64::from(DEFAULT_APPOINTMENT_MINUTES));

        let body = serde_json::json!({
            "summary": event_summary(contact),
            "description": event_description(contact, description),
            "start": {
                "dateTime": start.format("%Y-%m-%dT%H:%M:%S").to_string(),
                "timeZone": &slot.timezone,
            },
            "end": {
                "dateTime": end.format("%Y-%m-%dT%H:%M:%S").to_string(),
                "timeZone": &slot.timezone,
            },
            "attendees": attendees_json(contact),
        });

        let response = self
            .http
            .post(self.events_url())
            .bearer_auth(self.access_token.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|error| SchedulerError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SchedulerError::Rejected(format!(
                "event insert returned {status}: {body}"
            )));
        }

        let created: serde_json::Value =
            response.json().await.map_err(|error| SchedulerError::Transport(error.to_string()))?;
        let event_id = created
            .get("id")
            .and_then(|value| value.as_str())
            .ok_or_else(|| SchedulerError::Rejected("event insert returned no id".to_owned()))?
            .to_owned();

        info!(
            event_name = "calendar.event_created",
            calendar_event_id = %event_id,
            start = %start,
            "calendar event created"
        );
        Ok(event_id)
    }

    async fn cancel_appointment(&self, event_id: &str) -> Result<bool, SchedulerError> {
        let response = self
            .http
            .delete(self.event_url(event_id))
            .bearer_auth(self.access_token.expose_secret())
            .send()
            .await
            .map_err(|error| SchedulerError::Transport(error.to_string()))?;

        let status = response.status();
        // An already-deleted event is a successful cancellation.
        if status.is_success() || status.as_u16() == 404 || status.as_u16() == 410 {
            info!(
                event_name = "calendar.event_cancelled",
                calendar_event_id = %event_id,
                already_gone = status.as_u16() == 404 || status.as_u16() == 410,
                "calendar event cancelled"
            );
            return Ok(true);
        }

        let body = response.text().await.unwrap_or_default();
        Err(SchedulerError::Rejected(format!("event delete returned {status}: {body}")))
    }

    async fn update_appointment(
        &self,
        event_id: &str,
        new_slot: &AppointmentSlot,
        contact: Option<&ContactInfo>,
    ) -> Result<bool, SchedulerError> {
        let start = new_slot.start();
        let end = start + chrono::Duration::minutes(i64::from(DEFAULT_APPOINTMENT_MINUTES));

        let body = serde_json::json!({
            "summary": event_summary(contact),
            "start": {
                "dateTime": start.format("%Y-%m-%dT%H:%M:%S").to_string(),
                "timeZone": &new_slot.timezone,
            },
            "end": {
                "dateTime": end.format("%Y-%m-%dT%H:%M:%S").to_string(),
                "timeZone": &new_slot.timezone,
            },
            "attendees": attendees_json(contact),
        });

        let response = self
            .http
            .patch(self.event_url(event_id))
            .bearer_auth(self.access_token.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|error| SchedulerError::Transport(error.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(true);
        }
        if status.as_u16() == 404 || status.as_u16() == 410 {
            return Ok(false);
        }

        let body = response.text().await.unwrap_or_default();
        Err(SchedulerError::Rejected(format!("event patch returned {status}: {body}")))
    }

    async fn list_available_slots(
        &self,
        date: NaiveDate,
        duration_minutes: u32,
        day_start_hour: u32,
        day_end_hour: u32,
    ) -> Result<Vec<String>, SchedulerError> {
        let Some(day_start) = date.and_hms_opt(day_start_hour, 0, 0) else {
            return Err(SchedulerError::InvalidSlot(format!(
                "invalid day start hour {day_start_hour}"
            )));
        };
        let Some(day_end) = date.and_hms_opt(day_end_hour, 0, 0) else {
            return Err(SchedulerError::InvalidSlot(format!(
                "invalid day end hour {day_end_hour}"
            )));
        };

        let windows = self.busy_windows(day_start, day_end).await?;
        Ok(scan_day_slots(date, duration_minutes, day_start_hour, day_end_hour, &windows))
    }
}

fn event_summary(contact: Option<&ContactInfo>) -> String {
    let name = contact.and_then(|contact| contact.name.as_deref()).unwrap_or("Client");
    format!("Appointment with {name}")
}

fn event_description(contact: Option<&ContactInfo>, additional: &str) -> String {
    let mut parts = Vec::new();
    if let Some(contact) = contact {
        if let Some(name) = &contact.name {
            parts.push(format!("Client: {name}"));
        }
        if let Some(email) = &contact.email {
            parts.push(format!("Email: {email}"));
        }
        if let Some(phone) = &contact.phone {
            parts.push(format!("Phone: {phone}"));
        }
    }
    if !additional.is_empty() {
        parts.push(format!("Notes: {additional}"));
    }
    parts.push("Scheduled via Sara AI Receptionist".to_owned());
    parts.join("\n")
}

fn attendees_json(contact: Option<&ContactInfo>) -> serde_json::Value {
    let Some(email) = contact.and_then(|contact| contact.email.as_deref()) else {
        return serde_json::json!([]);
    };
    let display_name = contact.and_then(|contact| contact.name.as_deref()).unwrap_or("Client");

    serde_json::json!([{
        "email": email,
        "displayName": display_name,
        "responseStatus": "needsAction",
    }])
}

/// Reduce one API event to a busy window. All-day events (date without
/// dateTime) are skipped; the slot grid is time-of-day based.
fn parse_busy_window(item: &serde_json::Value) -> Option<BusyWindow> {
    let start = parse_event_time(item.get("start")?)?;
    let end = parse_event_time(item.get("end")?)?;

    let cancelled = item.get("status").and_then(|value| value.as_str()) == Some("cancelled");
    let declined = item
        .get("attendees")
        .and_then(|value| value.as_array())
        .is_some_and(|attendees| {
            attendees.iter().any(|attendee| {
                attendee.get("responseStatus").and_then(|value| value.as_str())
                    == Some("declined")
            })
        });

    Some(BusyWindow { start, end, cancelled, declined })
}

fn parse_event_time(value: &serde_json::Value) -> Option<NaiveDateTime> {
    let raw = value.get("dateTime")?.as_str()?;
    chrono::DateTime::parse_from_rfc3339(raw).ok().map(|parsed| parsed.naive_local())
}
