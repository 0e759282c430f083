// src/scheduler.rs
use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, NaiveTime, Utc};
use metrics::gauge;
use tokio::task::JoinHandle;

use crate::config::parse_digest_time;
use crate::digest::{DigestMode, DigestOutcome, DigestService};
use crate::store::DigestStore;

/// Daily send time from the stored preferences (editable over the API).
pub fn scheduled_time(store: &DigestStore) -> anyhow::Result<NaiveTime> {
    parse_digest_time(&store.preferences().digest_time)
}

/// Next instant with time-of-day `at` (UTC) strictly after `now`.
pub fn next_run_after(now: DateTime<Utc>, at: NaiveTime) -> DateTime<Utc> {
    let today = now.date_naive().and_time(at).and_utc();
    if today > now {
        today
    } else {
        today + ChronoDuration::days(1)
    }
}

/// Daily digest loop. Failed runs are logged and the loop waits for the next day.
pub fn spawn_daily_digest(service: Arc<DigestService>, at: NaiveTime) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let now = Utc::now();
            let next = next_run_after(now, at);
            let wait = (next - now).to_std().unwrap_or_default();
            tracing::info!(target: "scheduler", next = %next, "next digest scheduled");
            tokio::time::sleep(wait).await;

            match service.send(DigestMode::Scheduled).await {
                Ok(DigestOutcome::NoPosts) => {
                    tracing::info!(target: "scheduler", "no posts to send");
                }
                Ok(DigestOutcome::Sent { recipient, post_count }) => {
                    tracing::info!(target: "scheduler", %recipient, count = post_count, "daily digest sent");
                }
                Err(e) => {
                    tracing::error!(target: "scheduler", error = ?e, "daily digest failed");
                }
            }
            gauge!("digest_last_run_ts").set(Utc::now().timestamp() as f64);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::store::PreferencesUpdate;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn later_today() {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 5, 30, 0).unwrap();
        assert_eq!(
            next_run_after(now, at(6, 0)),
            Utc.with_ymd_and_hms(2025, 3, 10, 6, 0, 0).unwrap()
        );
    }

    #[test]
    fn already_passed_rolls_to_tomorrow() {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 7, 0, 0).unwrap();
        assert_eq!(
            next_run_after(now, at(6, 0)),
            Utc.with_ymd_and_hms(2025, 3, 11, 6, 0, 0).unwrap()
        );
    }

    #[test]
    fn exact_time_is_not_strictly_after() {
        let now = Utc.with_ymd_and_hms(2025, 12, 31, 6, 0, 0).unwrap();
        assert_eq!(
            next_run_after(now, at(6, 0)),
            Utc.with_ymd_and_hms(2026, 1, 1, 6, 0, 0).unwrap()
        );
    }

    #[test]
    fn stored_preference_overrides_settings_default() {
        let settings = Settings::default();
        let store = DigestStore::in_memory(settings.default_preferences());
        assert_eq!(scheduled_time(&store).unwrap(), at(6, 0));

        store
            .update_preferences(PreferencesUpdate {
                digest_time: Some("08:45".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(scheduled_time(&store).unwrap(), at(8, 45));
    }
}
