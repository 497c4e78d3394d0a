use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::capture::domain::tick_scheduler::{TickHandle, TickScheduler};

#[derive(Clone, Copy, Debug)]
struct PendingTick {
    handle: TickHandle,
    due: Instant,
}

#[derive(Debug, Default)]
struct ClockState {
    next_id: u64,
    pending: Option<PendingTick>,
    last_due: Option<Instant>,
}

fn lock(state: &Mutex<ClockState>) -> MutexGuard<'_, ClockState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// [`TickScheduler`] paced like a display refresh.
///
/// Each scheduled tick is due one refresh interval after the previous one,
/// or immediately if the loop has fallen behind. The paired [`FrameClock`]
/// is held by the host loop, which waits for due ticks and delivers them.
pub struct FrameClockScheduler {
    interval: Duration,
    state: Arc<Mutex<ClockState>>,
}

/// Host side of a [`FrameClockScheduler`].
#[derive(Clone)]
pub struct FrameClock {
    state: Arc<Mutex<ClockState>>,
}

impl FrameClockScheduler {
    pub fn new(refresh_hz: u32) -> (Self, FrameClock) {
        let interval = Duration::from_secs_f64(1.0 / refresh_hz.max(1) as f64);
        let state = Arc::new(Mutex::new(ClockState::default()));
        (
            Self {
                interval,
                state: state.clone(),
            },
            FrameClock { state },
        )
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl TickScheduler for FrameClockScheduler {
    fn schedule_next(&mut self) -> TickHandle {
        let mut state = lock(&self.state);
        state.next_id += 1;
        let handle = TickHandle::new(state.next_id);

        let now = Instant::now();
        let due = state
            .last_due
            .map(|last| last + self.interval)
            .filter(|&due| due > now)
            .unwrap_or(now);
        state.last_due = Some(due);
        state.pending = Some(PendingTick { handle, due });
        handle
    }

    fn cancel(&mut self, handle: TickHandle) {
        let mut state = lock(&self.state);
        if state.pending.is_some_and(|p| p.handle == handle) {
            state.pending = None;
            state.last_due = None;
        }
    }
}

impl FrameClock {
    /// Sleeps until the pending tick is due and hands it out.
    ///
    /// Returns `None` when nothing is scheduled (the capture stopped) or
    /// the tick was cancelled while waiting.
    pub fn wait_for_tick(&self) -> Option<TickHandle> {
        let pending = lock(&self.state).pending?;
        let now = Instant::now();
        if pending.due > now {
            std::thread::sleep(pending.due - now);
        }

        let mut state = lock(&self.state);
        match state.pending {
            Some(p) if p.handle == pending.handle => {
                state.pending = None;
                Some(p.handle)
            }
            _ => None,
        }
    }

    pub fn has_pending(&self) -> bool {
        lock(&self.state).pending.is_some()
    }
}
