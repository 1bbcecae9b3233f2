//! Connection lifecycle state machine

use std::sync::atomic::{AtomicU8, Ordering};

/// Connection state
///
/// ```text
/// Disconnected -> Connecting -> Connected -> Closing -> Closed
///                      \____________\____________________/^
/// ```
///
/// `Closed` is terminal and reachable from every state after `Disconnected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
    Closing = 3,
    Closed = 4,
}

impl ConnectionState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Disconnected,
            1 => Self::Connecting,
            2 => Self::Connected,
            3 => Self::Closing,
            _ => Self::Closed,
        }
    }

    /// Whether application requests may be queued in this state
    pub fn accepts_requests(self) -> bool {
        self == Self::Connected
    }

    /// Whether the connection has finished for good
    pub fn is_terminal(self) -> bool {
        self == Self::Closed
    }

    /// Check whether `self -> to` is a legal move
    pub fn can_transition_to(self, to: Self) -> bool {
        use ConnectionState::*;

        matches!(
            (self, to),
            (Disconnected, Connecting)
                // setup failed before the loop thread started
                | (Connecting, Disconnected)
                | (Connecting, Connected)
                | (Connected, Closing)
                | (Connecting | Connected | Closing, Closed)
        )
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// Shared, lock-free holder of one connection's state
///
/// Readable from any thread. Every write is a checked compare-and-swap so a
/// move that lost a race with another thread is reported instead of applied.
#[derive(Debug)]
pub(crate) struct StateMachine {
    state: AtomicU8,
}

impl StateMachine {
    pub(crate) fn new() -> Self {
        Self {
            state: AtomicU8::new(ConnectionState::Disconnected as u8),
        }
    }

    pub(crate) fn current(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Move from `from` to `to`
    ///
    /// Fails with the actual current state if the machine is not in `from`,
    /// or if the move is not a legal transition.
    pub(crate) fn transition(
        &self,
        from: ConnectionState,
        to: ConnectionState,
    ) -> Result<(), ConnectionState> {
        if !from.can_transition_to(to) {
            return Err(self.current());
        }

        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| {
                tracing::debug!(%from, %to, "Connection state changed");
            })
            .map_err(ConnectionState::from_u8)
    }

    /// Force the terminal state, returning the state it replaced
    pub(crate) fn close(&self) -> ConnectionState {
        let previous = ConnectionState::from_u8(
            self.state
                .swap(ConnectionState::Closed as u8, Ordering::AcqRel),
        );
        if previous != ConnectionState::Closed {
            tracing::debug!(from = %previous, to = %ConnectionState::Closed, "Connection state changed");
        }
        previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ConnectionState::*;

    const ALL: [ConnectionState; 5] = [Disconnected, Connecting, Connected, Closing, Closed];

    #[test]
    fn test_initial_state() {
        let machine = StateMachine::new();
        assert_eq!(machine.current(), Disconnected);
    }

    #[test]
    fn test_happy_path() {
        let machine = StateMachine::new();
        machine.transition(Disconnected, Connecting).unwrap();
        machine.transition(Connecting, Connected).unwrap();
        machine.transition(Connected, Closing).unwrap();
        machine.transition(Closing, Closed).unwrap();
        assert_eq!(machine.current(), Closed);
    }

    #[test]
    fn test_transition_from_wrong_state_reports_actual() {
        let machine = StateMachine::new();
        assert_eq!(machine.transition(Connected, Closing), Err(Disconnected));
        assert_eq!(machine.current(), Disconnected);
    }

    #[test]
    fn test_illegal_transition_rejected() {
        let machine = StateMachine::new();
        assert_eq!(machine.transition(Disconnected, Connected), Err(Disconnected));
        assert_eq!(machine.current(), Disconnected);
    }

    #[test]
    fn test_closed_is_terminal() {
        for to in ALL {
            assert!(!Closed.can_transition_to(to), "Closed -> {:?} must be illegal", to);
        }
    }

    #[test]
    fn test_closed_reachable_from_active_states() {
        assert!(Connecting.can_transition_to(Closed));
        assert!(Connected.can_transition_to(Closed));
        assert!(Closing.can_transition_to(Closed));
        assert!(!Disconnected.can_transition_to(Closed));
    }

    #[test]
    fn test_close_returns_previous() {
        let machine = StateMachine::new();
        machine.transition(Disconnected, Connecting).unwrap();
        assert_eq!(machine.close(), Connecting);
        assert_eq!(machine.close(), Closed);
        assert_eq!(machine.current(), Closed);
    }

    #[test]
    fn test_only_connected_accepts_requests() {
        for state in ALL {
            assert_eq!(state.accepts_requests(), state == Connected);
        }
    }

    #[test]
    fn test_from_u8_roundtrip() {
        for state in ALL {
            assert_eq!(ConnectionState::from_u8(state as u8), state);
        }
    }

    #[test]
    fn test_state_display() {
        assert_eq!(Closing.to_string(), "Closing");
    }
}
