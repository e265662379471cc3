use core::{
    error::Error,
    fmt::Display,
};

/// An error from a fallible registry operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockError {
    /// The request was for zero elements.
    ZeroLength,
    /// The requested size does not fit in a valid memory layout.
    CapacityOverflow,
    /// The block source could not satisfy the request.
    Exhausted {
        /// Number of bytes requested.
        bytes: usize,
    },
    /// The block is not live in this registry.
    UnknownBlock,
}

impl Display for BlockError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ZeroLength => write!(f, "requested a block of zero elements"),
            Self::CapacityOverflow => write!(f, "requested block size overflows"),
            Self::Exhausted { bytes } => write!(f, "block source exhausted: requested {bytes} bytes"),
            Self::UnknownBlock => write!(f, "block is not owned by this registry"),
        }
    }
}

impl Error for BlockError {}
