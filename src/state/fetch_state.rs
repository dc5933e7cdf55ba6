/// Fetch state definitions for tracking a single page request
///
/// This module defines every state a page request passes through between
/// submission and the moment its result is handed to extraction.
use std::fmt;

/// Represents the current state of one page request
///
/// Lifecycle: `Pending → (Attempting ⇄ Backoff)* → {Succeeded | Degraded | FatalAborted}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchState {
    // ===== Active States =====
    /// Request has been created but no attempt was made yet
    Pending,

    /// A request attempt is on the wire
    Attempting,

    /// Waiting before the next attempt after a transient failure
    Backoff,

    // ===== Terminal States =====
    /// Content was fetched
    Succeeded,

    /// Retries were exhausted or the failure was not retryable; content is absent
    Degraded,

    /// The egress proxy failed; the whole run must stop
    FatalAborted,
}

impl FetchState {
    /// Returns true if no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Degraded | Self::FatalAborted)
    }

    /// Returns true if the result flows forward to extraction
    pub fn flows_to_extraction(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Degraded)
    }

    /// Checks whether moving from `self` to `next` is a legal transition
    pub fn can_transition_to(&self, next: FetchState) -> bool {
        use FetchState::*;

        matches!(
            (self, next),
            (Pending, Attempting)
                | (Pending, FatalAborted)
                | (Attempting, Backoff)
                | (Attempting, Succeeded)
                | (Attempting, Degraded)
                | (Attempting, FatalAborted)
                | (Backoff, Attempting)
                | (Backoff, FatalAborted)
        )
    }

    /// Short lowercase name used in log lines
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Attempting => "attempting",
            Self::Backoff => "backoff",
            Self::Succeeded => "succeeded",
            Self::Degraded => "degraded",
            Self::FatalAborted => "fatal_aborted",
        }
    }

    /// Returns all possible fetch states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Pending,
            Self::Attempting,
            Self::Backoff,
            Self::Succeeded,
            Self::Degraded,
            Self::FatalAborted,
        ]
    }
}

impl fmt::Display for FetchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tracks the state of one request and rejects illegal transitions
#[derive(Debug, Clone)]
pub struct FetchTracker {
    state: FetchState,
    attempts: u32,
}

impl FetchTracker {
    pub fn new() -> Self {
        Self {
            state: FetchState::Pending,
            attempts: 0,
        }
    }

    pub fn state(&self) -> FetchState {
        self.state
    }

    /// Number of times the tracker entered `Attempting`
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Moves to `next`, returning false (and staying put) on an illegal transition
    pub fn advance(&mut self, next: FetchState) -> bool {
        if !self.state.can_transition_to(next) {
            tracing::error!("Illegal fetch state transition: {} -> {}", self.state, next);
            return false;
        }

        if next == FetchState::Attempting {
            self.attempts += 1;
        }
        self.state = next;
        true
    }
}

impl Default for FetchTracker {
    fn default() -> Self {
        Self::new()
    }
}
