use parking_lot::RwLock;
use std::time::Duration;

/// The three background refresh loops.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Cycle {
    Clan,
    War,
    Player,
}

/// Last full-pass duration of each refresh loop. `None` until the loop has
/// completed at least once since startup.
#[derive(Default, Clone, Copy, Debug)]
pub struct CycleSnapshot {
    pub clans: Option<Duration>,
    pub wars: Option<Duration>,
    pub players: Option<Duration>,
}

impl CycleSnapshot {
    /// Whether every loop has completed a pass.
    pub fn complete(&self) -> bool {
        self.clans.is_some() && self.wars.is_some() && self.players.is_some()
    }
}

#[derive(Default)]
pub struct CycleCache {
    inner: RwLock<CycleSnapshot>,
}

impl CycleCache {
    pub fn record(&self, cycle: Cycle, elapsed: Duration) {
        let mut snapshot = self.inner.write();
        match cycle {
            Cycle::Clan => snapshot.clans = Some(elapsed),
            Cycle::War => snapshot.wars = Some(elapsed),
            Cycle::Player => snapshot.players = Some(elapsed),
        }
    }

    pub fn snapshot(&self) -> CycleSnapshot {
        *self.inner.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_empty() {
        let cache = CycleCache::default();
        let snapshot = cache.snapshot();
        assert!(snapshot.clans.is_none());
        assert!(!snapshot.complete());
    }

    #[test]
    fn test_record_and_complete() {
        let cache = CycleCache::default();
        cache.record(Cycle::Clan, Duration::from_secs(120));
        cache.record(Cycle::War, Duration::from_secs(45));
        assert!(!cache.snapshot().complete());

        cache.record(Cycle::Player, Duration::from_secs(300));
        let snapshot = cache.snapshot();
        assert!(snapshot.complete());
        assert_eq!(snapshot.clans, Some(Duration::from_secs(120)));
        assert_eq!(snapshot.wars, Some(Duration::from_secs(45)));
        assert_eq!(snapshot.players, Some(Duration::from_secs(300)));
    }

    #[test]
    fn test_record_overwrites() {
        let cache = CycleCache::default();
        cache.record(Cycle::Clan, Duration::from_secs(120));
        cache.record(Cycle::Clan, Duration::from_secs(90));
        assert_eq!(cache.snapshot().clans, Some(Duration::from_secs(90)));
    }
}
