use crate::error::ApiError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Session states. `PunchedOut` is terminal: a closed sheet is history and a
/// new punch-in creates a new row.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    sqlx::Type,
    strum::Display,
    strum::EnumString,
    ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TimesheetStatus {
    PunchedIn,
    OnLunch,
    OnBreak,
    PunchedOut,
}

/// Transition labels, recorded verbatim in the activity log.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    sqlx::Type,
    strum::Display,
    strum::EnumString,
    ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Activity {
    PunchIn,
    LunchIn,
    LunchOut,
    BreakIn,
    BreakOut,
    PunchOut,
}

/// One work session. `start_time` tracks the start of the *current* segment
/// and is reset on every non-terminal transition, so the accumulators cover
/// disjoint intervals.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "employee_id": 7,
    "date": "2026-08-29",
    "start_time": "2026-08-29T09:00:00Z",
    "end_time": null,
    "work_time": 0,
    "lunch_time": 0,
    "break_time": 0,
    "total_work_time": 0,
    "status": "PUNCHED_IN"
}))]
pub struct Timesheet {
    pub id: u64,
    pub employee_id: u64,
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(value_type = String, format = "date-time")]
    pub start_time: DateTime<Utc>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub end_time: Option<DateTime<Utc>>,
    /// Accumulated seconds per state.
    pub work_time: i64,
    pub lunch_time: i64,
    pub break_time: i64,
    pub total_work_time: i64,
    pub status: TimesheetStatus,
}

/// A (state, activity) pair with no legal transition.
#[derive(Debug, PartialEq, Eq)]
pub struct TransitionError {
    pub from: TimesheetStatus,
    pub activity: Activity,
}

impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.activity {
            Activity::LunchOut => write!(f, "Not on lunch break"),
            Activity::BreakOut => write!(f, "Not on break"),
            _ => write!(f, "Cannot {} while {}", self.activity, self.from),
        }
    }
}

impl From<TransitionError> for ApiError {
    fn from(e: TransitionError) -> Self {
        ApiError::InvalidState(e.to_string())
    }
}

impl Timesheet {
    /// Fresh sheet for a punch-in at `now`. The row id is assigned by the
    /// store on insert.
    pub fn open(employee_id: u64, now: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            employee_id,
            date: now.date_naive(),
            start_time: now,
            end_time: None,
            work_time: 0,
            lunch_time: 0,
            break_time: 0,
            total_work_time: 0,
            status: TimesheetStatus::PunchedIn,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status != TimesheetStatus::PunchedOut
    }

    /// Seconds since the current segment began, floored. Clamped to zero so
    /// a backwards clock adjustment can never drain an accumulator.
    fn elapsed_since_segment(&self, now: DateTime<Utc>) -> i64 {
        (now - self.start_time).num_seconds().max(0)
    }

    /// Applies one transition at wall-clock time `now`. On success the
    /// elapsed segment has been credited to exactly one accumulator and the
    /// segment start reset; on error the sheet is untouched.
    pub fn apply(&mut self, activity: Activity, now: DateTime<Utc>) -> Result<(), TransitionError> {
        use Activity::*;
        use TimesheetStatus::*;

        let elapsed = self.elapsed_since_segment(now);

        match (self.status, activity) {
            (PunchedIn, LunchIn) => {
                self.work_time += elapsed;
                self.status = OnLunch;
            }
            (OnLunch, LunchOut) => {
                self.lunch_time += elapsed;
                self.status = PunchedIn;
            }
            (PunchedIn, BreakIn) => {
                self.work_time += elapsed;
                self.status = OnBreak;
            }
            (OnBreak, BreakOut) => {
                self.break_time += elapsed;
                self.status = PunchedIn;
            }
            (PunchedIn, PunchOut) => {
                self.work_time += elapsed;
                return Ok(self.close(now));
            }
            (OnLunch, PunchOut) => {
                self.lunch_time += elapsed;
                return Ok(self.close(now));
            }
            (OnBreak, PunchOut) => {
                self.break_time += elapsed;
                return Ok(self.close(now));
            }
            (from, activity) => return Err(TransitionError { from, activity }),
        }

        self.start_time = now;
        Ok(())
    }

    // `start_time` deliberately keeps the last segment start; `end_time`
    // carries the terminal instant.
    fn close(&mut self, now: DateTime<Utc>) {
        self.end_time = Some(now);
        self.total_work_time = self.work_time;
        self.status = TimesheetStatus::PunchedOut;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 29, 9, 0, 0).unwrap()
    }

    fn at(offset_secs: i64) -> DateTime<Utc> {
        t0() + chrono::Duration::seconds(offset_secs)
    }

    #[test]
    fn full_day_with_lunch() {
        // punch-in T0, lunch-in +3600, lunch-out +5400, punch-out +9000
        let mut sheet = Timesheet::open(7, t0());
        assert_eq!(sheet.status, TimesheetStatus::PunchedIn);

        sheet.apply(Activity::LunchIn, at(3600)).unwrap();
        assert_eq!(sheet.status, TimesheetStatus::OnLunch);
        assert_eq!(sheet.work_time, 3600);

        sheet.apply(Activity::LunchOut, at(5400)).unwrap();
        assert_eq!(sheet.status, TimesheetStatus::PunchedIn);
        assert_eq!(sheet.lunch_time, 1800);

        sheet.apply(Activity::PunchOut, at(9000)).unwrap();
        assert_eq!(sheet.status, TimesheetStatus::PunchedOut);
        assert_eq!(sheet.work_time, 7200);
        assert_eq!(sheet.lunch_time, 1800);
        assert_eq!(sheet.break_time, 0);
        assert_eq!(sheet.total_work_time, 7200);
        assert_eq!(sheet.end_time, Some(at(9000)));
    }

    #[test]
    fn accumulators_sum_to_wall_clock() {
        let mut sheet = Timesheet::open(1, t0());
        let steps = [
            (Activity::BreakIn, 600),
            (Activity::BreakOut, 900),
            (Activity::LunchIn, 4500),
            (Activity::LunchOut, 7200),
            (Activity::BreakIn, 10_000),
            (Activity::BreakOut, 10_300),
            (Activity::PunchOut, 14_400),
        ];
        for (activity, offset) in steps {
            sheet.apply(activity, at(offset)).unwrap();
        }
        assert_eq!(
            sheet.work_time + sheet.lunch_time + sheet.break_time,
            14_400
        );
        assert_eq!(sheet.lunch_time, 2700);
        assert_eq!(sheet.break_time, 600);
        assert_eq!(sheet.total_work_time, sheet.work_time);
    }

    #[test]
    fn punch_out_credits_current_state() {
        let mut on_lunch = Timesheet::open(1, t0());
        on_lunch.apply(Activity::LunchIn, at(100)).unwrap();
        on_lunch.apply(Activity::PunchOut, at(400)).unwrap();
        assert_eq!(on_lunch.lunch_time, 300);
        assert_eq!(on_lunch.work_time, 100);

        let mut on_break = Timesheet::open(2, t0());
        on_break.apply(Activity::BreakIn, at(50)).unwrap();
        on_break.apply(Activity::PunchOut, at(80)).unwrap();
        assert_eq!(on_break.break_time, 30);
        assert_eq!(on_break.total_work_time, 50);
    }

    #[test]
    fn rejects_invalid_transitions() {
        let mut sheet = Timesheet::open(1, t0());

        let err = sheet.apply(Activity::LunchOut, at(10)).unwrap_err();
        assert_eq!(err.from, TimesheetStatus::PunchedIn);
        assert_eq!(err.to_string(), "Not on lunch break");

        sheet.apply(Activity::LunchIn, at(60)).unwrap();
        let before = sheet.clone();
        // Can't start a break from the lunch table.
        assert!(sheet.apply(Activity::BreakIn, at(120)).is_err());
        assert!(sheet.apply(Activity::LunchIn, at(120)).is_err());

        // Failed transitions leave the sheet untouched.
        assert_eq!(sheet.status, before.status);
        assert_eq!(sheet.start_time, before.start_time);
        assert_eq!(sheet.work_time, before.work_time);
        assert_eq!(sheet.lunch_time, before.lunch_time);
    }

    #[test]
    fn closed_sheet_is_terminal() {
        let mut sheet = Timesheet::open(1, t0());
        sheet.apply(Activity::PunchOut, at(3600)).unwrap();
        assert!(!sheet.is_open());

        for activity in [
            Activity::LunchIn,
            Activity::LunchOut,
            Activity::BreakIn,
            Activity::BreakOut,
            Activity::PunchOut,
        ] {
            assert!(sheet.apply(activity, at(7200)).is_err());
        }
        assert_eq!(sheet.work_time, 3600);
    }

    #[test]
    fn negative_elapsed_is_clamped() {
        // Clock stepped backwards between punch-in and lunch-in.
        let mut sheet = Timesheet::open(1, t0());
        sheet.apply(Activity::LunchIn, at(-300)).unwrap();
        assert_eq!(sheet.work_time, 0);
        assert_eq!(sheet.status, TimesheetStatus::OnLunch);
        // Segment start still moves forward so later math is sane.
        assert_eq!(sheet.start_time, at(-300));
    }

    #[test]
    fn elapsed_is_floored_to_whole_seconds() {
        let mut sheet = Timesheet::open(1, t0());
        let now = t0() + chrono::Duration::milliseconds(1999);
        sheet.apply(Activity::PunchOut, now).unwrap();
        assert_eq!(sheet.work_time, 1);
    }

    #[test]
    fn status_labels_round_trip() {
        assert_eq!(TimesheetStatus::PunchedIn.to_string(), "PUNCHED_IN");
        assert_eq!(Activity::LunchOut.to_string(), "LUNCH_OUT");
        assert_eq!(
            "ON_BREAK".parse::<TimesheetStatus>().unwrap(),
            TimesheetStatus::OnBreak
        );
    }
}
