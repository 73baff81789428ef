use std::time::Instant;

/// Named one-shot deadlines on a caller-supplied clock.
///
/// Scheduling a key that is already pending replaces its deadline, so
/// every delayed action is cancel-then-schedule and at most one of each
/// kind is ever outstanding. Nothing fires by itself: the event loop calls
/// [`Scheduler::pop_due`] with the current instant.
#[derive(Debug, Clone)]
pub struct Scheduler<K> {
    pending: Vec<(K, Instant)>,
}

impl<K> Default for Scheduler<K> {
    fn default() -> Self {
        Scheduler {
            pending: Vec::new(),
        }
    }
}

impl<K: PartialEq + Clone> Scheduler<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, key: K, at: Instant) {
        self.cancel(&key);
        self.pending.push((key, at));
    }

    /// Returns whether `key` was pending
    pub fn cancel(&mut self, key: &K) -> bool {
        let before = self.pending.len();
        self.pending.retain(|(k, _)| k != key);
        self.pending.len() != before
    }

    pub fn cancel_all(&mut self) {
        self.pending.clear();
    }

    pub fn is_scheduled(&self, key: &K) -> bool {
        self.pending.iter().any(|(k, _)| k == key)
    }

    pub fn deadline(&self, key: &K) -> Option<Instant> {
        self.pending.iter().find(|(k, _)| k == key).map(|(_, at)| *at)
    }

    /// Remove and return the earliest entry due at `now`
    pub fn pop_due(&mut self, now: Instant) -> Option<(K, Instant)> {
        let (idx, _) = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, (_, at))| *at <= now)
            .min_by_key(|(_, (_, at))| *at)?;
        Some(self.pending.remove(idx))
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.iter().map(|(_, at)| *at).min()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq)]
    enum Job {
        Save,
        Scroll,
    }

    #[test]
    fn test_reschedule_replaces() {
        let t0 = Instant::now();
        let mut s = Scheduler::new();
        s.schedule(Job::Save, t0 + Duration::from_millis(100));
        s.schedule(Job::Save, t0 + Duration::from_millis(500));
        assert_eq!(s.pop_due(t0 + Duration::from_millis(200)), None);
        assert_eq!(s.deadline(&Job::Save), Some(t0 + Duration::from_millis(500)));
    }

    #[test]
    fn test_pop_due_in_deadline_order() {
        let t0 = Instant::now();
        let mut s = Scheduler::new();
        s.schedule(Job::Save, t0 + Duration::from_millis(30));
        s.schedule(Job::Scroll, t0 + Duration::from_millis(10));
        let now = t0 + Duration::from_millis(50);
        assert_eq!(s.pop_due(now).map(|(k, _)| k), Some(Job::Scroll));
        assert_eq!(s.pop_due(now).map(|(k, _)| k), Some(Job::Save));
        assert!(s.is_empty());
    }

    #[test]
    fn test_cancel() {
        let t0 = Instant::now();
        let mut s = Scheduler::new();
        s.schedule(Job::Scroll, t0);
        assert!(s.cancel(&Job::Scroll));
        assert!(!s.cancel(&Job::Scroll));
        assert_eq!(s.next_deadline(), None);
    }
}
