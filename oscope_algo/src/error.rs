use core::fmt;

/// Failures of the foreground side of a channel. The interrupt side cannot fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChannelError {
    /// No free snapshot block, the caller may retry later.
    OutOfMemory,
    /// No completed window is available right now.
    NotReady,
    /// The request queue is at capacity.
    QueueFull,
    /// A configuration field is not a short decimal number in range.
    MalformedArgument,
}

pub type Result<T> = core::result::Result<T, ChannelError>;

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelError::OutOfMemory => f.write_str("no snapshot block available"),
            ChannelError::NotReady => f.write_str("no completed window available"),
            ChannelError::QueueFull => f.write_str("request queue is full"),
            ChannelError::MalformedArgument => f.write_str("malformed configuration argument"),
        }
    }
}
