use std::fmt;

/// Why a chunk request could not be served.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AllocFailure {
    /// The request alone exceeds what a single mesh buffer can address.
    ExceedsBufferLimit,
    /// Every mesh buffer is full and no new one may be created.
    OutOfBuffers,
}

/// Returned when the shared mesh storage cannot grow to fit a chunk.
///
/// Callers degrade by skipping the renderable for the frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocError {
    pub vertex_count: u32,
    pub index_count: u32,
    pub reason: AllocFailure,
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let why = match self.reason {
            AllocFailure::ExceedsBufferLimit => "request exceeds the per-buffer vertex limit",
            AllocFailure::OutOfBuffers => "all mesh buffers are full",
        };
        write!(
            f,
            "cannot allocate chunk of {} vertices / {} indices: {}",
            self.vertex_count, self.index_count, why
        )
    }
}

impl std::error::Error for AllocError {}
