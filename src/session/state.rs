//! Session state machine.

use core::fmt;

/// What the session is doing with the axis.
///
/// ```text
/// Undefined --home--> Ready --start--> Pattern | SetupDepth | Streaming
///     ^                 ^                          |
///     |                 +---------- stop ----------+
///     +---------------- disable (from anywhere)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum SessionState {
    /// Not homed; the axis position means nothing.
    #[default]
    Undefined = 0,
    /// Homed and at rest, waiting for a command.
    Ready = 1,
    /// Running the selected pattern.
    Pattern = 2,
    /// Holding the depth (or a sensation-interpolated point) for adjustment.
    SetupDepth = 3,
    /// Following externally streamed positions.
    Streaming = 4,
}

impl SessionState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => SessionState::Ready,
            2 => SessionState::Pattern,
            3 => SessionState::SetupDepth,
            4 => SessionState::Streaming,
            _ => SessionState::Undefined,
        }
    }

    /// The axis is being commanded by the session.
    #[inline]
    pub fn is_moving(self) -> bool {
        matches!(
            self,
            SessionState::Pattern | SessionState::SetupDepth | SessionState::Streaming
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Undefined => "UNDEFINED",
            SessionState::Ready => "READY",
            SessionState::Pattern => "PATTERN",
            SessionState::SetupDepth => "SETUPDEPTH",
            SessionState::Streaming => "STREAMING",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u8_round_trip() {
        for state in [
            SessionState::Undefined,
            SessionState::Ready,
            SessionState::Pattern,
            SessionState::SetupDepth,
            SessionState::Streaming,
        ] {
            assert_eq!(SessionState::from_u8(state as u8), state);
        }
        assert_eq!(SessionState::from_u8(200), SessionState::Undefined);
    }

    #[test]
    fn test_moving_states() {
        assert!(!SessionState::Undefined.is_moving());
        assert!(!SessionState::Ready.is_moving());
        assert!(SessionState::Pattern.is_moving());
        assert!(SessionState::SetupDepth.is_moving());
        assert!(SessionState::Streaming.is_moving());
        assert_eq!(SessionState::SetupDepth.to_string(), "SETUPDEPTH");
    }
}
