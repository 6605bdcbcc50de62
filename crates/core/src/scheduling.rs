//! Conflict-check semantics every scheduler implementation must honor, plus
//! the work-day slot scan.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

/// Appointments default to one hour unless a caller overrides the duration.
pub const DEFAULT_APPOINTMENT_MINUTES: u32 = 60;

/// Candidate slots are generated on a fixed half-hour grid.
pub const SLOT_SCAN_INCREMENT_MINUTES: u32 = 30;

/// An existing calendar event reduced to what conflict checking needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BusyWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub cancelled: bool,
    /// The sole relevant attendee declined; the event no longer blocks.
    pub declined: bool,
}

impl BusyWindow {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end, cancelled: false, declined: false }
    }

    fn blocks(&self) -> bool {
        !self.cancelled && !self.declined
    }
}

/// Half-open interval overlap: `[start, start+duration)` conflicts with
/// `[window.start, window.end)` iff `start < window.end` and
/// `start + duration > window.start`. Back-to-back bookings do not conflict.
pub fn conflicts(start: NaiveDateTime, duration_minutes: u32, window: &BusyWindow) -> bool {
    if !window.blocks() {
        return false;
    }
    let end = start + Duration::minutes(i64::from(duration_minutes));
    start < window.end && end > window.start
}

pub fn has_conflict(start: NaiveDateTime, duration_minutes: u32, windows: &[BusyWindow]) -> bool {
    windows.iter().any(|window| conflicts(start, duration_minutes, window))
}

/// Offer every conflict-free slot in `[day_start_hour:00, day_end_hour:00)`
/// on a 30-minute grid. A slot is offered only when the full appointment
/// fits inside the day window.
pub fn scan_day_slots(
    date: NaiveDate,
    duration_minutes: u32,
    day_start_hour: u32,
    day_end_hour: u32,
    windows: &[BusyWindow],
) -> Vec<String> {
    let Some(day_start) = NaiveTime::from_hms_opt(day_start_hour, 0, 0) else {
        return Vec::new();
    };
    let Some(day_end) = NaiveTime::from_hms_opt(day_end_hour, 0, 0) else {
        return Vec::new();
    };

    let day_end = date.and_time(day_end);
    let duration = Duration::minutes(i64::from(duration_minutes));
    let mut slots = Vec::new();
    let mut cursor = date.and_time(day_start);

    while cursor + duration <= day_end {
        if !has_conflict(cursor, duration_minutes, windows) {
            slots.push(cursor.format("%H:%M").to_string());
        }
        cursor += Duration::minutes(i64::from(SLOT_SCAN_INCREMENT_MINUTES));
    }

    slots
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{conflicts, scan_day_slots, BusyWindow};

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 16).expect("valid date")
    }

    fn at(hour: u32, minute: u32) -> chrono::NaiveDateTime {
        day().and_hms_opt(hour, minute, 0).expect("valid time")
    }

    #[test]
    fn overlapping_candidate_conflicts() {
        // Existing [14:00,15:00), candidate [14:30,15:30).
        let window = BusyWindow::new(at(14, 0), at(15, 0));
        assert!(conflicts(at(14, 30), 60, &window));
    }

    #[test]
    fn boundary_candidate_does_not_conflict() {
        // [15:00,16:00) against existing [14:00,15:00): half-open, free.
        let window = BusyWindow::new(at(14, 0), at(15, 0));
        assert!(!conflicts(at(15, 0), 60, &window));
    }

    #[test]
    fn cancelled_and_declined_events_never_conflict() {
        let mut window = BusyWindow::new(at(14, 0), at(15, 0));
        window.cancelled = true;
        assert!(!conflicts(at(14, 30), 60, &window));

        let mut window = BusyWindow::new(at(14, 0), at(15, 0));
        window.declined = true;
        assert!(!conflicts(at(14, 30), 60, &window));
    }

    #[test]
    fn slot_scan_stops_where_the_appointment_no_longer_fits() {
        // 09:00-17:00 window, 60-minute duration, empty day.
        let slots = scan_day_slots(day(), 60, 9, 17, &[]);

        assert_eq!(slots.first().map(String::as_str), Some("09:00"));
        assert_eq!(slots.last().map(String::as_str), Some("16:00"));
        assert!(!slots.contains(&"16:30".to_owned()));
        // 09:00 through 16:00 inclusive on a half-hour grid.
        assert_eq!(slots.len(), 15);
    }

    #[test]
    fn slot_scan_skips_conflicting_increments() {
        let windows = vec![BusyWindow::new(at(10, 0), at(11, 0))];
        let slots = scan_day_slots(day(), 60, 9, 12, &windows);

        // 09:30 and 10:30 would overlap the 10:00 meeting; 11:00 fits.
        assert_eq!(slots, vec!["09:00".to_owned(), "11:00".to_owned()]);
    }

    #[test]
    fn invalid_day_window_yields_no_slots() {
        assert!(scan_day_slots(day(), 60, 25, 30, &[]).is_empty());
    }
}
