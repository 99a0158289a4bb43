//! Host session identity and time source
//!
//! A session spans one run of the host process. Its id, start time and the
//! machine name are fixed when the plugin loads and never change afterwards.

use chrono::{DateTime, Duration, Local};
use parking_lot::Mutex;
use tracing::debug;
use uuid::Uuid;

/// Source of wall-clock time for the plugin
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

/// Real local time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Clock that only moves when told to (replays and tests)
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Local>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Local>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, now: DateTime<Local>) {
        *self.now.lock() = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        *self.now.lock()
    }
}

/// Process-wide session identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    session_id: String,
    started_at: DateTime<Local>,
    computer_name: String,
}

impl SessionState {
    /// Start a new session with a random id at the clock's current time.
    pub fn start(clock: &dyn Clock) -> Self {
        let session = Self {
            session_id: Uuid::new_v4().to_string(),
            started_at: clock.now(),
            computer_name: resolve_computer_name(),
        };
        debug!(
            session_id = %session.session_id,
            computer = %session.computer_name,
            "Session started"
        );
        session
    }

    /// Build a session from known values.
    pub fn from_parts(
        session_id: impl Into<String>,
        started_at: DateTime<Local>,
        computer_name: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            started_at,
            computer_name: computer_name.into(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    pub fn computer_name(&self) -> &str {
        &self.computer_name
    }
}

/// Machine name, or empty string when it cannot be determined.
fn resolve_computer_name() -> String {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .filter(|name| !name.is_empty())
        .or_else(|| std::env::var("COMPUTERNAME").ok())
        .or_else(|| std::env::var("HOSTNAME").ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_manual_clock_advances() {
        let t0 = Local.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap();
        let clock = ManualClock::new(t0);

        clock.advance(Duration::seconds(630));
        assert_eq!(clock.now(), t0 + Duration::seconds(630));

        clock.set(t0);
        assert_eq!(clock.now(), t0);
    }

    #[test]
    fn test_session_start_uses_clock_and_random_id() {
        let t0 = Local.with_ymd_and_hms(2026, 3, 10, 8, 0, 0).unwrap();
        let clock = ManualClock::new(t0);

        let a = SessionState::start(&clock);
        let b = SessionState::start(&clock);

        assert_eq!(a.started_at(), t0);
        assert_eq!(a.session_id().len(), 36);
        assert_ne!(a.session_id(), b.session_id());
    }
}
