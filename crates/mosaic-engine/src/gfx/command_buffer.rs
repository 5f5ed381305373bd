use super::queue::QueueStats;

/// Recorded work plus the statistics the queue aggregates on submit.
///
/// `P` is the backend's native payload (`wgpu::CommandBuffer`, or a tag for
/// the headless backend). A buffer without a payload still contributes stats.
#[derive(Debug)]
pub struct CommandBuffer<P> {
    stats: QueueStats,
    native: Option<P>,
}

impl<P> Default for CommandBuffer<P> {
    fn default() -> Self {
        Self { stats: QueueStats::default(), native: None }
    }
}

impl<P> CommandBuffer<P> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_native(native: P) -> Self {
        Self { stats: QueueStats::default(), native: Some(native) }
    }

    /// Counts one indexed draw. An instance count of zero is a plain draw.
    pub fn record_draw(&mut self, index_count: u32, instance_count: u32) {
        self.stats.draw_calls += 1;
        self.stats.instances += instance_count;
        self.stats.triangles += (index_count / 3) * instance_count.max(1);
    }

    pub fn set_native(&mut self, native: P) {
        self.native = Some(native);
    }

    #[inline]
    pub fn stats(&self) -> QueueStats {
        self.stats
    }

    #[inline]
    pub fn draw_calls(&self) -> u32 {
        self.stats.draw_calls
    }

    #[inline]
    pub fn instances(&self) -> u32 {
        self.stats.instances
    }

    #[inline]
    pub fn triangles(&self) -> u32 {
        self.stats.triangles
    }

    pub fn into_native(self) -> Option<P> {
        self.native
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draw_statistics() {
        let mut cb: CommandBuffer<()> = CommandBuffer::new();
        cb.record_draw(6, 0);
        cb.record_draw(6, 10);
        assert_eq!(cb.draw_calls(), 2);
        assert_eq!(cb.instances(), 10);
        assert_eq!(cb.triangles(), 2 + 20);
    }
}
