use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum EnginePhase {
    Idle = 0,
    Running = 1,
    Stopping = 2,
}

impl EnginePhase {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Running,
            2 => Self::Stopping,
            _ => Self::Idle,
        }
    }
}

impl fmt::Display for EnginePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Stopping => "stopping",
        };
        f.write_str(name)
    }
}

/// Cancellation flag shared by the execution loop and the lifecycle controller.
#[derive(Debug)]
pub struct EngineState {
    phase: AtomicU8,
}

impl Default for EngineState {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineState {
    pub fn new() -> Self {
        Self {
            phase: AtomicU8::new(EnginePhase::Idle as u8),
        }
    }

    pub fn phase(&self) -> EnginePhase {
        EnginePhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    pub fn is_running(&self) -> bool {
        self.phase() == EnginePhase::Running
    }

    /// Moves to Running unless already there. Returns false if it was.
    pub fn try_begin(&self) -> bool {
        let mut current = self.phase.load(Ordering::Acquire);
        loop {
            if current == EnginePhase::Running as u8 {
                return false;
            }
            match self.phase.compare_exchange(
                current,
                EnginePhase::Running as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    /// Raises the cancellation flag and returns the phase it replaced.
    pub fn request_stop(&self) -> EnginePhase {
        EnginePhase::from_u8(
            self.phase
                .swap(EnginePhase::Stopping as u8, Ordering::AcqRel),
        )
    }

    /// Called by the worker once it has exited; only Stopping settles to Idle.
    pub fn settle(&self) -> bool {
        self.phase
            .compare_exchange(
                EnginePhase::Stopping as u8,
                EnginePhase::Idle as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Forces Idle after the worker died without a stop request.
    pub fn reset(&self) {
        self.phase.store(EnginePhase::Idle as u8, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_cycle() {
        let state = EngineState::new();
        assert_eq!(state.phase(), EnginePhase::Idle);

        assert!(state.try_begin());
        assert!(state.is_running());
        assert!(!state.try_begin(), "second begin must not succeed");

        assert_eq!(state.request_stop(), EnginePhase::Running);
        assert_eq!(state.phase(), EnginePhase::Stopping);

        assert!(state.settle());
        assert_eq!(state.phase(), EnginePhase::Idle);
        assert!(!state.settle());
    }

    #[test]
    fn test_begin_from_stopping() {
        let state = EngineState::new();
        assert_eq!(state.request_stop(), EnginePhase::Idle);
        assert!(state.try_begin());
        assert!(!state.settle(), "a running engine must not be settled");
    }

    #[test]
    fn test_concurrent_begin_has_one_winner() {
        let state = std::sync::Arc::new(EngineState::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let state = state.clone();
                std::thread::spawn(move || state.try_begin())
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }
}
