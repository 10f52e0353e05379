//! Cooldown rule shared by the server engine and client-side prediction.
//!
//! Both sides must use the same constant or they will disagree about
//! rejections near the boundary.

/// Time a painted cell stays locked, in milliseconds (5 minutes).
pub const COOLDOWN_MS: u64 = 300_000;

/// Whether a cell painted at some instant may be repainted now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownStatus {
    Ready,
    Locked { remaining_seconds: u64 },
}

impl CooldownStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, CooldownStatus::Ready)
    }
}

/// Evaluate the cooldown of a cell last painted at `painted_at`.
///
/// A `now` earlier than `painted_at` counts as zero elapsed time.
pub fn cooldown_status(painted_at: u64, now: u64) -> CooldownStatus {
    let elapsed = now.saturating_sub(painted_at);
    if elapsed >= COOLDOWN_MS {
        CooldownStatus::Ready
    } else {
        CooldownStatus::Locked {
            remaining_seconds: (COOLDOWN_MS - elapsed).div_ceil(1000),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundary() {
        assert_eq!(
            cooldown_status(0, COOLDOWN_MS - 1),
            CooldownStatus::Locked { remaining_seconds: 1 }
        );
        assert!(cooldown_status(0, COOLDOWN_MS).is_ready());
        assert!(cooldown_status(0, COOLDOWN_MS + 1).is_ready());
    }

    #[test]
    fn test_remaining_rounds_up() {
        assert_eq!(
            cooldown_status(0, 100_000),
            CooldownStatus::Locked { remaining_seconds: 200 }
        );
        assert_eq!(
            cooldown_status(0, 100_001),
            CooldownStatus::Locked { remaining_seconds: 200 }
        );
        assert_eq!(
            cooldown_status(0, 0),
            CooldownStatus::Locked { remaining_seconds: 300 }
        );
    }

    #[test]
    fn test_clock_behind_painted_at() {
        assert_eq!(
            cooldown_status(10_000, 5_000),
            CooldownStatus::Locked { remaining_seconds: 300 }
        );
    }
}
