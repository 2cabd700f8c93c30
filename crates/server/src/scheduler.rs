//! Daily prompt scheduler. Sleeps until the next cron fire time in the
//! configured timezone, posts the prompt, and repeats until shutdown.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use cron::Schedule;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::service::MoodService;

pub fn next_fire(schedule: &Schedule, timezone: Tz, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    schedule.after(&now.with_timezone(&timezone)).next().map(|fire| fire.with_timezone(&Utc))
}

pub fn spawn(
    schedule: Schedule,
    timezone: Tz,
    service: MoodService,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let Some(fire_at) = next_fire(&schedule, timezone, Utc::now()) else {
                warn!(event_name = "scheduler.exhausted", "cron schedule has no future fire time");
                return;
            };
            let wait = (fire_at - Utc::now()).to_std().unwrap_or_default();
            info!(
                event_name = "scheduler.next_fire",
                fire_at = %fire_at,
                timezone = %timezone,
                "daily prompt scheduled"
            );

            tokio::select! {
                _ = tokio::time::sleep(wait) => {
                    if let Err(error) = service.post_daily_prompt().await {
                        error!(
                            event_name = "scheduler.prompt.failed",
                            error = %error,
                            "could not post daily prompt"
                        );
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!(event_name = "scheduler.stopped", "scheduler shutting down");
                        return;
                    }
                }
            }
        }
    })
}
