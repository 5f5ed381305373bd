use std::ops::AddAssign;

use super::backend::{Backend, NativeHandle};
use super::command_buffer::CommandBuffer;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum QueueType {
    #[default]
    Graphics,
    Compute,
    Transfer,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub struct QueueInfo {
    pub queue_type: QueueType,
}

/// Draw counters accumulated since the last [`Queue::clear`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub struct QueueStats {
    pub draw_calls: u32,
    pub instances: u32,
    pub triangles: u32,
}

impl AddAssign for QueueStats {
    fn add_assign(&mut self, rhs: Self) {
        self.draw_calls += rhs.draw_calls;
        self.instances += rhs.instances;
        self.triangles += rhs.triangles;
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum QueueState {
    #[default]
    Uninitialized,
    Initialized,
    /// Terminal.
    Destroyed,
}

/// Submission front-end over a backend queue.
///
/// Lifecycle: `initialize`, then any number of `submit`/`clear` rounds, then
/// `destroy`. Calls outside that order are logged and ignored.
#[derive(Debug, Default)]
pub struct Queue {
    state: QueueState,
    queue_type: QueueType,
    native: Option<NativeHandle>,
    stats: QueueStats,
}

impl Queue {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn state(&self) -> QueueState {
        self.state
    }

    #[inline]
    pub fn queue_type(&self) -> QueueType {
        self.queue_type
    }

    #[inline]
    pub fn stats(&self) -> QueueStats {
        self.stats
    }

    pub fn native(&self) -> Option<NativeHandle> {
        self.native
    }

    pub fn initialize<B: Backend>(&mut self, backend: &mut B, info: QueueInfo) {
        if self.state != QueueState::Uninitialized {
            log::warn!("queue: initialize in state {:?} ignored", self.state);
            return;
        }
        self.queue_type = info.queue_type;
        self.native = Some(backend.create_queue(&info));
        self.state = QueueState::Initialized;
    }

    /// Adds each buffer's counters and forwards native payloads in order,
    /// streaming them to the backend without an intermediate list.
    pub fn submit<B, I>(&mut self, backend: &mut B, cmd_buffs: I)
    where
        B: Backend,
        I: IntoIterator<Item = CommandBuffer<B::CommandBuffer>>,
    {
        let Some(native) = self.native.filter(|_| self.state == QueueState::Initialized) else {
            log::warn!("queue: submit in state {:?} ignored", self.state);
            return;
        };

        let stats = &mut self.stats;
        let payloads = cmd_buffs.into_iter().filter_map(|cb| {
            *stats += cb.stats();
            cb.into_native()
        });
        backend.submit(native, payloads);
        log::trace!(
            "queue: {} draws, {} tris so far",
            self.stats.draw_calls,
            self.stats.triangles
        );
    }

    /// Resets counters. Call once per frame.
    pub fn clear(&mut self) {
        self.stats = QueueStats::default();
    }

    pub fn destroy<B: Backend>(&mut self, backend: &mut B) {
        if let Some(native) = self.native.take() {
            backend.destroy_queue(native);
        }
        self.stats = QueueStats::default();
        self.state = QueueState::Destroyed;
    }
}
