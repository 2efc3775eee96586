use std::time::{Duration, Instant};

/// How long a session runs before the user is asked to confirm presence.
const SESSION_PROMPT_AFTER_SECS: u64 = 60 * 60;

/// How long the confirmation prompt waits before forcing a logout.
const PROMPT_WINDOW_SECS: u64 = 60;

/// What the app must do in response to a notifier transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryAction {
    /// User confirmed presence: issue a token refresh and re-arm on success.
    Refresh,
    /// Countdown ran out or the user declined: clear the session and return
    /// to the login screen.
    Terminate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Dormant,
    Armed { deadline: Instant },
    Prompting { seconds_left: u64, last_tick: Instant },
}

/// Session expiry notifier.
///
/// A tick-driven state machine: the main loop calls `tick` on every pass and
/// acts on the returned `ExpiryAction`. Nothing here sleeps or spawns, so
/// `disarm` is a complete cancellation - once the notifier is Dormant no
/// transition can fire, regardless of how much time passed beforehand.
pub struct ExpiryNotifier {
    phase: Phase,
    prompt_after: Duration,
    prompt_window_secs: u64,
}

impl ExpiryNotifier {
    pub fn new() -> Self {
        Self {
            phase: Phase::Dormant,
            prompt_after: Duration::from_secs(SESSION_PROMPT_AFTER_SECS),
            prompt_window_secs: PROMPT_WINDOW_SECS,
        }
    }

    #[cfg(test)]
    fn with_durations(prompt_after: Duration, prompt_window_secs: u64) -> Self {
        Self {
            phase: Phase::Dormant,
            prompt_after,
            prompt_window_secs,
        }
    }

    /// Arm the session timer. Called when a session is established or
    /// extended; re-arming while already armed restarts the clock.
    pub fn arm(&mut self, now: Instant) {
        self.phase = Phase::Armed {
            deadline: now + self.prompt_after,
        };
    }

    /// Cancel both the session timer and any active prompt countdown.
    pub fn disarm(&mut self) {
        self.phase = Phase::Dormant;
    }

    /// True while the confirmation prompt should be shown.
    pub fn is_prompting(&self) -> bool {
        matches!(self.phase, Phase::Prompting { .. })
    }

    /// Seconds remaining on the prompt countdown, for display.
    pub fn seconds_left(&self) -> Option<u64> {
        match self.phase {
            Phase::Prompting { seconds_left, .. } => Some(seconds_left),
            _ => None,
        }
    }

    /// Advance the state machine. Returns an action when a terminal
    /// transition occurs on this tick.
    pub fn tick(&mut self, now: Instant) -> Option<ExpiryAction> {
        match self.phase {
            Phase::Dormant => None,
            Phase::Armed { deadline } => {
                if now >= deadline {
                    self.phase = Phase::Prompting {
                        seconds_left: self.prompt_window_secs,
                        last_tick: now,
                    };
                }
                None
            }
            Phase::Prompting {
                mut seconds_left,
                mut last_tick,
            } => {
                // Decrement once per whole elapsed second; ticks arrive more
                // often than that from the event-poll loop.
                while now.duration_since(last_tick) >= Duration::from_secs(1) {
                    last_tick += Duration::from_secs(1);
                    seconds_left = seconds_left.saturating_sub(1);
                    if seconds_left == 0 {
                        self.phase = Phase::Dormant;
                        return Some(ExpiryAction::Terminate);
                    }
                }
                self.phase = Phase::Prompting {
                    seconds_left,
                    last_tick,
                };
                None
            }
        }
    }

    /// User confirmed presence before the countdown expired.
    pub fn confirm(&mut self) -> Option<ExpiryAction> {
        if self.is_prompting() {
            self.phase = Phase::Dormant;
            Some(ExpiryAction::Refresh)
        } else {
            None
        }
    }

    /// User explicitly declined the prompt.
    pub fn decline(&mut self) -> Option<ExpiryAction> {
        if self.is_prompting() {
            self.phase = Phase::Dormant;
            Some(ExpiryAction::Terminate)
        } else {
            None
        }
    }
}

impl Default for ExpiryNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dormant_never_fires() {
        let mut notifier = ExpiryNotifier::new();
        let start = Instant::now();
        assert_eq!(notifier.tick(start + Duration::from_secs(7200)), None);
        assert!(!notifier.is_prompting());
    }

    #[test]
    fn test_armed_reaches_prompting_after_exact_delay() {
        let mut notifier = ExpiryNotifier::with_durations(Duration::from_secs(10), 60);
        let start = Instant::now();
        notifier.arm(start);

        assert_eq!(notifier.tick(start + Duration::from_secs(9)), None);
        assert!(!notifier.is_prompting());

        assert_eq!(notifier.tick(start + Duration::from_secs(10)), None);
        assert!(notifier.is_prompting());
        assert_eq!(notifier.seconds_left(), Some(60));
    }

    #[test]
    fn test_prompt_counts_down_and_terminates() {
        let mut notifier = ExpiryNotifier::with_durations(Duration::from_secs(1), 3);
        let start = Instant::now();
        notifier.arm(start);

        let prompt_start = start + Duration::from_secs(1);
        assert_eq!(notifier.tick(prompt_start), None);
        assert!(notifier.is_prompting());

        assert_eq!(notifier.tick(prompt_start + Duration::from_secs(1)), None);
        assert_eq!(notifier.seconds_left(), Some(2));
        assert_eq!(notifier.tick(prompt_start + Duration::from_secs(2)), None);
        assert_eq!(notifier.seconds_left(), Some(1));
        assert_eq!(
            notifier.tick(prompt_start + Duration::from_secs(3)),
            Some(ExpiryAction::Terminate)
        );
        assert!(!notifier.is_prompting());
    }

    #[test]
    fn test_terminates_when_many_seconds_elapse_in_one_tick() {
        let mut notifier = ExpiryNotifier::with_durations(Duration::from_secs(1), 5);
        let start = Instant::now();
        notifier.arm(start);
        notifier.tick(start + Duration::from_secs(1));
        // Main loop stalled for the entire window.
        assert_eq!(
            notifier.tick(start + Duration::from_secs(30)),
            Some(ExpiryAction::Terminate)
        );
    }

    #[test]
    fn test_confirm_requests_refresh() {
        let mut notifier = ExpiryNotifier::with_durations(Duration::from_secs(1), 60);
        let start = Instant::now();
        notifier.arm(start);
        notifier.tick(start + Duration::from_secs(1));

        assert_eq!(notifier.confirm(), Some(ExpiryAction::Refresh));
        assert!(!notifier.is_prompting());
        // Confirming again does nothing - the prompt is gone.
        assert_eq!(notifier.confirm(), None);
    }

    #[test]
    fn test_decline_terminates() {
        let mut notifier = ExpiryNotifier::with_durations(Duration::from_secs(1), 60);
        let start = Instant::now();
        notifier.arm(start);
        notifier.tick(start + Duration::from_secs(1));

        assert_eq!(notifier.decline(), Some(ExpiryAction::Terminate));
    }

    #[test]
    fn test_disarm_cancels_armed_timer() {
        let mut notifier = ExpiryNotifier::with_durations(Duration::from_secs(5), 60);
        let start = Instant::now();
        notifier.arm(start);
        notifier.disarm();
        assert_eq!(notifier.tick(start + Duration::from_secs(3600)), None);
        assert!(!notifier.is_prompting());
    }

    #[test]
    fn test_disarm_cancels_prompt_countdown() {
        let mut notifier = ExpiryNotifier::with_durations(Duration::from_secs(1), 10);
        let start = Instant::now();
        notifier.arm(start);
        notifier.tick(start + Duration::from_secs(1));
        assert!(notifier.is_prompting());

        notifier.disarm();
        assert_eq!(notifier.tick(start + Duration::from_secs(3600)), None);
    }

    #[test]
    fn test_rearm_restarts_clock() {
        let mut notifier = ExpiryNotifier::with_durations(Duration::from_secs(10), 60);
        let start = Instant::now();
        notifier.arm(start);
        notifier.tick(start + Duration::from_secs(8));
        // Session extended (e.g. successful refresh): timer restarts.
        notifier.arm(start + Duration::from_secs(8));
        notifier.tick(start + Duration::from_secs(12));
        assert!(!notifier.is_prompting());
        notifier.tick(start + Duration::from_secs(18));
        assert!(notifier.is_prompting());
    }
}
