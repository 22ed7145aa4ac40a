use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use time::{Duration, OffsetDateTime, Time};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use crate::records::repo_types::{ReminderKind, ReminderRow};
use crate::texts;

/// Strict "HH:MM" with hours in 0..=23 and minutes in 0..=59.
pub fn parse_hhmm(s: &str) -> Option<Time> {
    let (h, m) = s.trim().split_once(':')?;
    let hours: u8 = h.parse().ok()?;
    let minutes: u8 = m.parse().ok()?;
    Time::from_hms(hours, minutes, 0).ok()
}

/// Whole seconds until the next occurrence of `at`, rounded up so the timer
/// always lands past the target minute.
fn seconds_until(now: OffsetDateTime, at: Time) -> u64 {
    let mut target = now.replace_time(at);
    if target <= now {
        target += Duration::days(1);
    }
    (target - now).whole_seconds().max(0) as u64 + 1
}

/// Outbound edge for reminder nudges. The delivery transport lives outside
/// this crate; the binary installs [`LogSink`].
#[async_trait]
pub trait ReminderSink: Send + Sync {
    async fn deliver(&self, user_id: Uuid, kind: ReminderKind, text: &str) -> anyhow::Result<()>;
}

pub struct LogSink;

#[async_trait]
impl ReminderSink for LogSink {
    async fn deliver(&self, user_id: Uuid, kind: ReminderKind, text: &str) -> anyhow::Result<()> {
        info!(user_id = %user_id, kind = kind.as_str(), %text, "reminder due");
        Ok(())
    }
}

/// One timed task per (user, kind); upserting a slot replaces its task.
pub struct ReminderScheduler {
    sink: Arc<dyn ReminderSink>,
    jobs: Mutex<HashMap<(Uuid, ReminderKind), JoinHandle<()>>>,
}

impl ReminderScheduler {
    pub fn new(sink: Arc<dyn ReminderSink>) -> Self {
        Self {
            sink,
            jobs: Mutex::new(HashMap::new()),
        }
    }

    /// Arm (or re-arm) the daily timer for one reminder slot.
    pub fn schedule(&self, user_id: Uuid, kind: ReminderKind, at: Time) {
        let handle = tokio::spawn(run_reminder(self.sink.clone(), user_id, kind, at));
        let old = self.jobs.lock().unwrap().insert((user_id, kind), handle);
        if let Some(old) = old {
            old.abort();
        }
    }

    pub fn active_jobs(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }

    /// Re-arm every persisted reminder; called once at boot.
    pub async fn rearm_from_store(&self, db: &PgPool) -> anyhow::Result<usize> {
        let rows = ReminderRow::list_all(db).await?;
        let mut count = 0;
        for row in rows {
            match parse_hhmm(&row.at_time) {
                Some(at) => {
                    self.schedule(row.user_id, row.kind, at);
                    count += 1;
                }
                None => warn!(
                    user_id = %row.user_id,
                    kind = row.kind.as_str(),
                    at_time = %row.at_time,
                    "stored reminder has unparseable time; skipped"
                ),
            }
        }
        Ok(count)
    }
}

async fn run_reminder(sink: Arc<dyn ReminderSink>, user_id: Uuid, kind: ReminderKind, at: Time) {
    loop {
        let wait = seconds_until(OffsetDateTime::now_utc(), at);
        tokio::time::sleep(std::time::Duration::from_secs(wait)).await;
        let text = match kind {
            ReminderKind::Meal => texts::REMINDER_MEAL,
            ReminderKind::Water => texts::REMINDER_WATER,
        };
        if let Err(e) = sink.deliver(user_id, kind, text).await {
            warn!(
                error = %e,
                user_id = %user_id,
                kind = kind.as_str(),
                "reminder delivery failed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{datetime, time};

    #[test]
    fn parse_hhmm_accepts_valid_times() {
        assert_eq!(parse_hhmm("07:30"), Some(time!(07:30)));
        assert_eq!(parse_hhmm("0:00"), Some(time!(00:00)));
        assert_eq!(parse_hhmm("23:59"), Some(time!(23:59)));
        assert_eq!(parse_hhmm(" 12:00 "), Some(time!(12:00)));
    }

    #[test]
    fn parse_hhmm_rejects_out_of_range_and_garbage() {
        assert_eq!(parse_hhmm("25:00"), None);
        assert_eq!(parse_hhmm("12:60"), None);
        assert_eq!(parse_hhmm("noon"), None);
        assert_eq!(parse_hhmm("1200"), None);
        assert_eq!(parse_hhmm("12:0x"), None);
        assert_eq!(parse_hhmm(""), None);
    }

    #[test]
    fn seconds_until_same_day_and_wraparound() {
        let now = datetime!(2024-05-10 08:00:00 UTC);
        assert_eq!(seconds_until(now, time!(08:30)), 30 * 60 + 1);
        // already past today -> tomorrow
        assert_eq!(seconds_until(now, time!(07:00)), 23 * 3600 + 1);
        // exactly now -> full day
        assert_eq!(seconds_until(now, time!(08:00)), 24 * 3600 + 1);
    }

    #[tokio::test]
    async fn schedule_replaces_existing_slot() {
        let scheduler = ReminderScheduler::new(Arc::new(LogSink));
        let user = Uuid::new_v4();
        scheduler.schedule(user, ReminderKind::Water, time!(08:00));
        scheduler.schedule(user, ReminderKind::Water, time!(09:00));
        assert_eq!(scheduler.active_jobs(), 1);
        scheduler.schedule(user, ReminderKind::Meal, time!(12:00));
        assert_eq!(scheduler.active_jobs(), 2);
    }
}
