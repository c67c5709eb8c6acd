// Publish scheduler - decides when a batch of readings goes out
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    Idle,
    Scheduled,
    Publishing,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TriggerError {
    #[error("manual publish is disabled while auto-send is active")]
    AutoModeActive,
    #[error("a publish batch is already in flight")]
    Busy,
    #[error("not connected to broker")]
    NotConnected,
    #[error("no target unit selected yet")]
    NoActiveUnit,
}

/// State machine reconciling auto-mode, connection state and the timer.
///
/// The scheduler never fires anything itself: the owner polls [`deadline`]
/// and calls [`begin_tick`] once it has passed. Cancelling means dropping the
/// deadline, so a stale timer has nothing left to trigger.
///
/// [`deadline`]: PublishScheduler::deadline
/// [`begin_tick`]: PublishScheduler::begin_tick
#[derive(Debug, Clone)]
pub struct PublishScheduler {
    interval: Duration,
    auto_send: bool,
    connected: bool,
    state: SchedulerState,
    deadline: Option<Instant>,
}

impl PublishScheduler {
    pub fn new(interval: Duration, auto_send: bool) -> Self {
        Self {
            interval,
            auto_send,
            connected: false,
            state: SchedulerState::Idle,
            deadline: None,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn auto_send(&self) -> bool {
        self.auto_send
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn set_auto_send(&mut self, enabled: bool, now: Instant) {
        self.auto_send = enabled;
        self.reconcile(now);
    }

    pub fn set_connected(&mut self, connected: bool, now: Instant) {
        self.connected = connected;
        self.reconcile(now);
    }

    fn should_run(&self) -> bool {
        self.auto_send && self.connected
    }

    fn reconcile(&mut self, now: Instant) {
        if !self.should_run() {
            self.deadline = None;
        } else if self.deadline.is_none() && self.state != SchedulerState::Publishing {
            self.deadline = Some(now + self.interval);
        }

        if self.state != SchedulerState::Publishing {
            self.state = if self.deadline.is_some() {
                SchedulerState::Scheduled
            } else {
                SchedulerState::Idle
            };
        }
    }

    /// Consume a due deadline. Returns false when nothing should fire.
    pub fn begin_tick(&mut self, now: Instant) -> bool {
        match (self.state, self.deadline) {
            (SchedulerState::Scheduled, Some(deadline)) if deadline <= now && self.should_run() => {
                self.deadline = None;
                self.state = SchedulerState::Publishing;
                true
            }
            _ => false,
        }
    }

    /// Operator "send once". Mutually exclusive with auto-mode.
    pub fn begin_manual(&mut self) -> Result<(), TriggerError> {
        if self.auto_send {
            return Err(TriggerError::AutoModeActive);
        }
        self.begin_out_of_band()
    }

    /// Immediate batch that bypasses the auto-mode check (reset broadcast).
    pub fn begin_out_of_band(&mut self) -> Result<(), TriggerError> {
        if self.state == SchedulerState::Publishing {
            return Err(TriggerError::Busy);
        }
        if !self.connected {
            return Err(TriggerError::NotConnected);
        }
        self.state = SchedulerState::Publishing;
        Ok(())
    }

    /// Leave `Publishing`, re-arming the timer if auto-mode still holds.
    pub fn finish(&mut self, now: Instant) {
        if self.state != SchedulerState::Publishing {
            return;
        }
        self.state = SchedulerState::Idle;
        self.reconcile(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: Duration = Duration::from_millis(5000);

    #[test]
    fn test_arms_only_when_auto_and_connected() {
        let now = Instant::now();
        let mut scheduler = PublishScheduler::new(INTERVAL, true);
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert_eq!(scheduler.deadline(), None);

        scheduler.set_connected(true, now);
        assert_eq!(scheduler.state(), SchedulerState::Scheduled);
        assert_eq!(scheduler.deadline(), Some(now + INTERVAL));

        let mut manual_only = PublishScheduler::new(INTERVAL, false);
        manual_only.set_connected(true, now);
        assert_eq!(manual_only.state(), SchedulerState::Idle);
        assert_eq!(manual_only.deadline(), None);
    }

    #[test]
    fn test_disabling_auto_cancels_deadline() {
        let now = Instant::now();
        let mut scheduler = PublishScheduler::new(INTERVAL, true);
        scheduler.set_connected(true, now);

        scheduler.set_auto_send(false, now);
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert_eq!(scheduler.deadline(), None);
        assert!(!scheduler.begin_tick(now + INTERVAL * 2));
    }

    #[test]
    fn test_connection_loss_cancels_deadline() {
        let now = Instant::now();
        let mut scheduler = PublishScheduler::new(INTERVAL, true);
        scheduler.set_connected(true, now);

        scheduler.set_connected(false, now + Duration::from_millis(10));
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert!(!scheduler.begin_tick(now + INTERVAL));

        // Reconnect re-arms from the reconnect instant
        let later = now + Duration::from_secs(60);
        scheduler.set_connected(true, later);
        assert_eq!(scheduler.deadline(), Some(later + INTERVAL));
    }

    #[test]
    fn test_tick_cycle_rearms() {
        let now = Instant::now();
        let mut scheduler = PublishScheduler::new(INTERVAL, true);
        scheduler.set_connected(true, now);

        assert!(!scheduler.begin_tick(now + Duration::from_millis(4999)));

        let fired_at = now + INTERVAL;
        assert!(scheduler.begin_tick(fired_at));
        assert_eq!(scheduler.state(), SchedulerState::Publishing);
        assert!(!scheduler.begin_tick(fired_at));

        scheduler.finish(fired_at);
        assert_eq!(scheduler.state(), SchedulerState::Scheduled);
        assert_eq!(scheduler.deadline(), Some(fired_at + INTERVAL));
    }

    #[test]
    fn test_loss_during_publishing_ends_idle() {
        let now = Instant::now();
        let mut scheduler = PublishScheduler::new(INTERVAL, true);
        scheduler.set_connected(true, now);
        assert!(scheduler.begin_tick(now + INTERVAL));

        scheduler.set_connected(false, now + INTERVAL);
        assert_eq!(scheduler.state(), SchedulerState::Publishing);

        scheduler.finish(now + INTERVAL);
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert_eq!(scheduler.deadline(), None);
    }

    #[test]
    fn test_manual_trigger_rules() {
        let now = Instant::now();
        let mut scheduler = PublishScheduler::new(INTERVAL, true);
        scheduler.set_connected(true, now);
        assert_eq!(scheduler.begin_manual(), Err(TriggerError::AutoModeActive));

        scheduler.set_auto_send(false, now);
        assert_eq!(scheduler.begin_manual(), Ok(()));
        assert_eq!(scheduler.begin_manual(), Err(TriggerError::Busy));
        scheduler.finish(now);
        assert_eq!(scheduler.state(), SchedulerState::Idle);

        scheduler.set_connected(false, now);
        assert_eq!(scheduler.begin_manual(), Err(TriggerError::NotConnected));
    }

    #[test]
    fn test_out_of_band_keeps_running_timer() {
        let now = Instant::now();
        let mut scheduler = PublishScheduler::new(INTERVAL, true);
        scheduler.set_connected(true, now);

        let later = now + Duration::from_millis(1200);
        assert_eq!(scheduler.begin_out_of_band(), Ok(()));
        scheduler.finish(later);
        assert_eq!(scheduler.state(), SchedulerState::Scheduled);
        assert_eq!(scheduler.deadline(), Some(now + INTERVAL));
    }
}
