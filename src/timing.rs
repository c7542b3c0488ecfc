//! Competition timing announcements.
//!
//! One poller runs per plugin load. It wakes every interval, re-reads the schedule and fires
//! each of the four milestones at most once. Milestones that were already past when the
//! poller started are still announced on its first tick.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use log::{debug, error, info, warn};
use tokio_util::sync::CancellationToken;

use crate::notify::{Dispatcher, Message};
use crate::utils::config::{ConfigStore, NotifyConfig, Schedule};
use crate::utils::template::render;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Milestone {
    WarnStart,
    Start,
    WarnEnd,
    End,
}

impl Milestone {
    pub fn title(&self) -> &'static str {
        match self {
            Self::WarnStart => "CTF Starting Soon",
            Self::Start => "CTF Started",
            Self::WarnEnd => "CTF Ending Soon",
            Self::End => "CTF Ended",
        }
    }

    pub fn message(&self, cfg: &NotifyConfig, warn_minutes: i64) -> Message {
        let template = match self {
            Self::WarnStart => &cfg.warn_start_text,
            Self::Start => &cfg.start_text,
            Self::WarnEnd => &cfg.warn_end_text,
            Self::End => &cfg.end_text,
        };
        let minutes = warn_minutes.to_string();
        Message::new(self.title(), render(template, &[("minutes", minutes.as_str())]))
    }
}

/// One-way latches, set once the matching milestone has been announced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MilestoneFlags {
    pub warn_start_sent: bool,
    pub start_sent: bool,
    pub warn_end_sent: bool,
    pub end_sent: bool,
}

impl MilestoneFlags {
    /// Latches and returns every milestone due at `now`, in announcement order.
    pub fn poll(&mut self, now: i64, schedule: &Schedule) -> Vec<Milestone> {
        let lead = schedule.warn_minutes.saturating_mul(60);
        let mut due = Vec::new();

        if schedule.start != 0 {
            let opens = schedule.start.saturating_sub(lead);
            if !self.warn_start_sent && opens <= now && now < schedule.start {
                self.warn_start_sent = true;
                due.push(Milestone::WarnStart);
            }
            if !self.start_sent && now >= schedule.start {
                self.start_sent = true;
                due.push(Milestone::Start);
            }
        }
        if schedule.end != 0 {
            let opens = schedule.end.saturating_sub(lead);
            if !self.warn_end_sent && opens <= now && now < schedule.end {
                self.warn_end_sent = true;
                due.push(Milestone::WarnEnd);
            }
            if !self.end_sent && now >= schedule.end {
                self.end_sent = true;
                due.push(Milestone::End);
            }
        }
        due
    }
}

pub struct MilestonePoller {
    flags: MilestoneFlags,
    interval: Duration,
    malformed_reported: bool,
}

impl MilestonePoller {
    pub fn new(interval: Duration) -> Self {
        Self {
            flags: MilestoneFlags::default(),
            interval,
            malformed_reported: false,
        }
    }

    /// Runs until `notify_timing` is found disabled or `stop` is cancelled.
    /// Returns the final latches.
    pub async fn run(
        mut self,
        config: ConfigStore,
        dispatcher: Arc<Dispatcher>,
        stop: CancellationToken,
    ) -> MilestoneFlags {
        info!("Timing poller started, checking every {}s", self.interval.as_secs());
        loop {
            match NotifyConfig::load(&config).await {
                Ok(cfg) => {
                    if !cfg.notify_timing {
                        info!("Timing notifications disabled, stopping poller");
                        break;
                    }
                    for milestone in self.tick(Utc::now().timestamp(), &cfg) {
                        let message = announcement(&cfg, milestone);
                        let report = dispatcher.dispatch(&cfg, &message).await;
                        debug!("Announced {milestone:?}: {report:?}");
                    }
                }
                Err(err) => error!("Error while reading timing settings: {err:?}"),
            }

            tokio::select! {
                _ = stop.cancelled() => {
                    info!("Timing poller stopped");
                    break;
                }
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
        self.flags
    }

    fn tick(&mut self, now: i64, cfg: &NotifyConfig) -> Vec<Milestone> {
        match &cfg.schedule {
            Ok(schedule) => {
                self.malformed_reported = false;
                let due = self.flags.poll(now, schedule);
                for milestone in &due {
                    info!("Milestone {milestone:?} reached at {now}");
                }
                due
            }
            Err(err) => {
                if !self.malformed_reported {
                    warn!("Skipping timing checks until the schedule is fixed: {err}");
                    self.malformed_reported = true;
                }
                Vec::new()
            }
        }
    }
}

fn announcement(cfg: &NotifyConfig, milestone: Milestone) -> Message {
    let warn_minutes = cfg.schedule.as_ref().map(|s| s.warn_minutes).unwrap_or_default();
    milestone.message(cfg, warn_minutes)
}
