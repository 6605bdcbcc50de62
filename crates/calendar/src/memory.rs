//! Deterministic scheduler used by the test suites and selected at bootstrap
//! when no calendar credentials are configured.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::NaiveDate;

use sara_core::contracts::{SchedulerAdapter, SchedulerError};
use sara_core::domain::intent::{AppointmentSlot, ContactInfo};
use sara_core::scheduling::{
    has_conflict, scan_day_slots, BusyWindow, DEFAULT_APPOINTMENT_MINUTES,
};

#[derive(Clone, Debug)]
struct StoredEvent {
    id: String,
    window: BusyWindow,
}

#[derive(Default)]
pub struct InMemoryScheduler {
    events: Mutex<Vec<StoredEvent>>,
    next_id: AtomicU64,
}

impl InMemoryScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn events(&self) -> MutexGuard<'_, Vec<StoredEvent>> {
        match self.events.lock() {
            Ok(events) => events,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn event_count(&self) -> usize {
        self.events().len()
    }

    fn windows(&self) -> Vec<BusyWindow> {
        self.events().iter().map(|event| event.window.clone()).collect()
    }
}

#[async_trait]
impl SchedulerAdapter for InMemoryScheduler {
    async fn check_availability(
        &self,
        slot: &AppointmentSlot,
        duration_minutes: u32,
    ) -> Result<bool, SchedulerError> {
        Ok(!has_conflict(slot.start(), duration_minutes, &self.windows()))
    }

    async fn create_appointment(
        &self,
        slot: &AppointmentSlot,
        _contact: Option<&ContactInfo>,
        _description: &str,
    ) -> Result<String, SchedulerError> {
        let start = slot.start();
        let end = start + chrono::Duration::minutes(i64::from(DEFAULT_APPOINTMENT_MINUTES));
        let id = format!("mem-evt-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);

        self.events()
            .push(StoredEvent { id: id.clone(), window: BusyWindow::new(start, end) });
        Ok(id)
    }

    async fn cancel_appointment(&self, event_id: &str) -> Result<bool, SchedulerError> {
        let mut events = self.events();
        events.retain(|event| event.id != event_id);
        // Unknown ids count as already cancelled.
        Ok(true)
    }

    async fn update_appointment(
        &self,
        event_id: &str,
        new_slot: &AppointmentSlot,
        _contact: Option<&ContactInfo>,
    ) -> Result<bool, SchedulerError> {
        let mut events = self.events();
        let Some(event) = events.iter_mut().find(|event| event.id == event_id) else {
            return Ok(false);
        };

        let start = new_slot.start();
        let end = start + chrono::Duration::minutes(i64::from(DEFAULT_APPOINTMENT_MINUTES));
        event.window = BusyWindow::new(start, end);
        Ok(true)
    }

    async fn list_available_slots(
        &self,
        date: NaiveDate,
        duration_minutes: u32,
        day_start_hour: u32,
        day_end_hour: u32,
    ) -> Result<Vec<String>, SchedulerError> {
        Ok(scan_day_slots(date, duration_minutes, day_start_hour, day_end_hour, &self.windows()))
    }
}

#[cfg(test)]
mod tests {
    use sara_core::contracts::SchedulerAdapter;
    use sara_core::domain::intent::AppointmentSlot;

    use super::InMemoryScheduler;

    fn slot(time: &str) -> AppointmentSlot {
        AppointmentSlot::parse("2026-03-20", time, None).expect("valid slot")
    }

    #[tokio::test]
    async fn booked_slot_conflicts_and_boundary_slot_does_not() {
        let scheduler = InMemoryScheduler::new();
        scheduler.create_appointment(&slot("14:00"), None, "").await.expect("create");

        // [14:30, 15:30) overlaps the [14:00, 15:00) booking.
        assert!(!scheduler.check_availability(&slot("14:30"), 60).await.expect("check"));
        // [15:00, 16:00) touches the boundary only.
        assert!(scheduler.check_availability(&slot("15:00"), 60).await.expect("check"));
    }

    #[tokio::test]
    async fn cancel_is_idempotent() {
        let scheduler = InMemoryScheduler::new();
        let event_id =
            scheduler.create_appointment(&slot("10:00"), None, "").await.expect("create");

        assert!(scheduler.cancel_appointment(&event_id).await.expect("cancel"));
        // Cancelling again, or cancelling an id that never existed, succeeds.
        assert!(scheduler.cancel_appointment(&event_id).await.expect("second cancel"));
        assert!(scheduler.cancel_appointment("never-existed").await.expect("unknown cancel"));
        assert_eq!(scheduler.event_count(), 0);
    }

    #[tokio::test]
    async fn cancelled_booking_frees_its_slot() {
        let scheduler = InMemoryScheduler::new();
        let event_id =
            scheduler.create_appointment(&slot("14:00"), None, "").await.expect("create");
        scheduler.cancel_appointment(&event_id).await.expect("cancel");

        assert!(scheduler.check_availability(&slot("14:30"), 60).await.expect("check"));
    }

    #[tokio::test]
    async fn update_moves_the_busy_window() {
        let scheduler = InMemoryScheduler::new();
        let event_id =
            scheduler.create_appointment(&slot("09:00"), None, "").await.expect("create");

        assert!(scheduler
            .update_appointment(&event_id, &slot("13:00"), None)
            .await
            .expect("update"));
        assert!(scheduler.check_availability(&slot("09:00"), 60).await.expect("old slot free"));
        assert!(!scheduler.check_availability(&slot("13:00"), 60).await.expect("new slot busy"));

        assert!(!scheduler
            .update_appointment("never-existed", &slot("13:00"), None)
            .await
            .expect("unknown update"));
    }

    #[tokio::test]
    async fn slot_listing_reflects_bookings_and_day_bounds() {
        let scheduler = InMemoryScheduler::new();
        scheduler.create_appointment(&slot("10:00"), None, "").await.expect("create");

        let date = chrono::NaiveDate::from_ymd_opt(2026, 3, 20).expect("valid date");
        let slots =
            scheduler.list_available_slots(date, 60, 9, 17).await.expect("list slots");
        assert!(slots.contains(&"09:00".to_owned()));
        assert!(!slots.contains(&"09:30".to_owned()));
        assert!(!slots.contains(&"10:00".to_owned()));
        assert!(slots.contains(&"11:00".to_owned()));
        assert_eq!(slots.last().map(String::as_str), Some("16:00"));
    }
}
