use std::fmt;

use crate::batch::AllocError;
use crate::sprite::FillType;

/// Why an assembler could not produce geometry this frame.
#[derive(Debug, Clone, PartialEq)]
pub enum AssembleError {
    /// The fill axis has no bar-filled geometry.
    UnsupportedFillType(FillType),
    /// No mesh buffer could take the renderable's chunk.
    Alloc(AllocError),
}

impl AssembleError {
    /// Stable numeric code, as reported in logs.
    pub fn code(&self) -> u32 {
        match self {
            AssembleError::UnsupportedFillType(_) => 2626,
            AssembleError::Alloc(_) => 9100,
        }
    }
}

impl fmt::Display for AssembleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssembleError::UnsupportedFillType(kind) => {
                write!(f, "error {}: fill type {kind:?} is not supported by bar filling", self.code())
            }
            AssembleError::Alloc(e) => write!(f, "error {}: {e}", self.code()),
        }
    }
}

impl std::error::Error for AssembleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AssembleError::Alloc(e) => Some(e),
            AssembleError::UnsupportedFillType(_) => None,
        }
    }
}

impl From<AllocError> for AssembleError {
    fn from(e: AllocError) -> Self {
        AssembleError::Alloc(e)
    }
}
