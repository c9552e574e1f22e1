//! Remaining-time estimate shown while a Veo job is pending.
//!
//! The numbers are cosmetic: they never influence polling. The schedule counts
//! down linearly for the first twelve checks, then restarts just below the
//! ceiling and drops faster towards a floor. That jump back up after "final
//! checks" is expected; the text is a reassurance, not an ETA.

use crate::config::{
    COUNTDOWN_CEILING_SECS, COUNTDOWN_FLOOR_SECS, COUNTDOWN_LINEAR_ATTEMPTS,
    COUNTDOWN_LINEAR_STEP_SECS, COUNTDOWN_STEEP_STEP_SECS,
};
use std::time::Duration;

/// Remaining time to display after `attempt` pending status checks.
#[must_use]
pub fn estimate_remaining(attempt: u32) -> Duration {
    let secs = if attempt <= COUNTDOWN_LINEAR_ATTEMPTS {
        COUNTDOWN_CEILING_SECS
            .saturating_sub(u64::from(attempt).saturating_mul(COUNTDOWN_LINEAR_STEP_SECS))
    } else {
        let steep_attempts = u64::from(attempt - COUNTDOWN_LINEAR_ATTEMPTS);
        COUNTDOWN_CEILING_SECS
            .saturating_sub(steep_attempts.saturating_mul(COUNTDOWN_STEEP_STEP_SECS))
            .max(COUNTDOWN_FLOOR_SECS)
            .min(COUNTDOWN_CEILING_SECS)
    };
    Duration::from_secs(secs)
}

/// Formats a remaining duration for the progress message.
#[must_use]
pub fn format_remaining(remaining: Duration) -> String {
    let total = remaining.as_secs();
    let minutes = total / 60;
    let seconds = total % 60;

    match (minutes, seconds) {
        (0, 0) => "Final checks in progress...".to_string(),
        (0, s) => format!("{s} seconds remaining"),
        (m, 0) => format!("{m} minutes remaining"),
        (m, s) => format!("{m} minutes {s} seconds remaining"),
    }
}
