use crate::robots::CachedRobots;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio::time::Instant;

/// Tracks the politeness state of one domain
///
/// The robots slot is filled at most once: concurrent callers of
/// [`DomainState::robots_or_fetch`] wait on the single in-flight fetch.
/// The cooldown clock is the earliest instant the next request may start;
/// it only moves forward and is guarded per domain, so unrelated domains
/// never contend.
#[derive(Debug)]
pub struct DomainState {
    robots: OnceCell<CachedRobots>,
    next_allowed: Mutex<Instant>,
}

impl DomainState {
    /// Creates state whose cooldown clock starts now
    pub fn new() -> Self {
        Self {
            robots: OnceCell::new(),
            next_allowed: Mutex::new(Instant::now()),
        }
    }

    /// Returns the cached robots rules, if loaded
    pub fn robots(&self) -> Option<&CachedRobots> {
        self.robots.get()
    }

    /// Returns the cached robots rules, running `fetch` if none are cached
    ///
    /// Only one `fetch` runs per domain; other callers await its result.
    pub async fn robots_or_fetch<F, Fut>(&self, fetch: F) -> &CachedRobots
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = CachedRobots>,
    {
        self.robots.get_or_init(fetch).await
    }

    /// Installs rules restored from a snapshot; ignored if rules are already cached
    pub fn restore_robots(&self, robots: CachedRobots) -> bool {
        self.robots.set(robots).is_ok()
    }

    /// Reserves the next request slot and returns how long to wait for it
    pub fn advance_cooldown(&self, delay: Duration) -> Duration {
        self.advance_cooldown_at(Instant::now(), delay)
    }

    /// Same as [`advance_cooldown`](Self::advance_cooldown) with an explicit clock reading
    ///
    /// A clock in the past is reset to `now`. The clock advances by `delay`,
    /// so each caller receives a slot strictly after the previous one. A delay
    /// that would move the clock past the representable range leaves it parked
    /// at its current slot instead of panicking.
    pub fn advance_cooldown_at(&self, now: Instant, delay: Duration) -> Duration {
        // Poisoning cannot leave the Instant half-written; keep going
        let mut next = self
            .next_allowed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if *next < now {
            *next = now;
        }
        let wait = *next - now;
        if let Some(advanced) = next.checked_add(delay) {
            *next = advanced;
        }
        wait
    }

    /// Earliest instant at which the next slot starts
    pub fn next_allowed(&self) -> Instant {
        *self
            .next_allowed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for DomainState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::robots::ParsedRobots;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_first_slot_has_no_wait() {
        let state = DomainState::new();
        let now = Instant::now() + Duration::from_millis(5);
        assert_eq!(state.advance_cooldown_at(now, Duration::from_secs(2)), Duration::ZERO);
        assert_eq!(state.next_allowed(), now + Duration::from_secs(2));
    }

    #[test]
    fn test_successive_slots_are_delay_separated() {
        let state = DomainState::new();
        let now = Instant::now() + Duration::from_millis(1);
        let delay = Duration::from_millis(500);

        let waits: Vec<Duration> = (0..4).map(|_| state.advance_cooldown_at(now, delay)).collect();

        assert_eq!(
            waits,
            vec![
                Duration::ZERO,
                Duration::from_millis(500),
                Duration::from_millis(1000),
                Duration::from_millis(1500),
            ]
        );
        assert_eq!(state.next_allowed(), now + Duration::from_millis(2000));
    }

    #[test]
    fn test_past_clock_resets_to_now() {
        let state = DomainState::new();
        let start = Instant::now() + Duration::from_millis(1);
        state.advance_cooldown_at(start, Duration::from_secs(1));

        let later = start + Duration::from_secs(10);
        assert_eq!(state.advance_cooldown_at(later, Duration::from_secs(1)), Duration::ZERO);
        assert_eq!(state.next_allowed(), later + Duration::from_secs(1));
    }

    #[test]
    fn test_clock_never_moves_backwards() {
        let state = DomainState::new();
        let start = Instant::now() + Duration::from_millis(1);
        state.advance_cooldown_at(start, Duration::from_secs(5));
        let before = state.next_allowed();

        // A reading earlier than the reserved slot still advances the clock
        state.advance_cooldown_at(start, Duration::ZERO);
        assert!(state.next_allowed() >= before);
    }

    #[test]
    fn test_unrepresentable_delay_does_not_panic() {
        let state = DomainState::new();
        let now = Instant::now() + Duration::from_millis(1);
        assert_eq!(state.advance_cooldown_at(now, Duration::MAX), Duration::ZERO);
        assert_eq!(state.next_allowed(), now);
    }

    #[tokio::test]
    async fn test_robots_single_flight() {
        let state = Arc::new(DomainState::new());
        let fetches = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let state = Arc::clone(&state);
            let fetches = Arc::clone(&fetches);
            handles.push(tokio::spawn(async move {
                state
                    .robots_or_fetch(|| async {
                        fetches.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        CachedRobots::new(ParsedRobots::from_content("User-agent: *\nDisallow: /x"))
                    })
                    .await
                    .is_allowed("https://a.com/x", "TestBot")
            }));
        }

        for handle in handles {
            assert!(!handle.await.unwrap());
        }
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_restore_does_not_override_cached() {
        let state = DomainState::new();
        assert!(state.restore_robots(CachedRobots::new(ParsedRobots::allow_all())));
        assert!(!state.restore_robots(CachedRobots::new(ParsedRobots::from_content(
            "User-agent: *\nDisallow: /"
        ))));
        assert!(state.robots().unwrap().content.is_permissive());
    }
}
