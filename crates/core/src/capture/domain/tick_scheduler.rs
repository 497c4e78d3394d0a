/// Identifies one scheduled tick of the capture loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TickHandle(u64);

impl TickHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Display-refresh scheduling capability.
///
/// `schedule_next` requests one callback at the next refresh; the host
/// delivers it by passing the returned handle to
/// [`CaptureController::on_tick`](crate::capture::capture_controller::CaptureController::on_tick).
/// A cancelled handle must never be delivered.
pub trait TickScheduler: Send {
    fn schedule_next(&mut self) -> TickHandle;
    fn cancel(&mut self, handle: TickHandle);
}
