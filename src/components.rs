use parking_lot::RwLock;
use poise::serenity_prelude::UserId;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// How long a registered component stays live.
pub const COMPONENT_TTL: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, PartialEq, Eq)]
pub enum Ownership {
    Allowed,
    Blocked,
    Expired,
}

struct Entry {
    user_ids: Vec<u64>,
    registered_at: Instant,
}

/// Maps live component custom IDs to the users allowed to press them.
///
/// An empty owner list marks a public component. Entries expire after
/// [`COMPONENT_TTL`]; an unknown or expired ID answers `Expired`, which the
/// event handler turns into component cleanup on the message.
pub struct ComponentRegistry {
    ttl: Duration,
    entries: RwLock<HashMap<String, Entry>>,
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::with_ttl(COMPONENT_TTL)
    }
}

impl ComponentRegistry {
    fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn register(&self, custom_id: impl Into<String>, users: &[UserId]) {
        self.entries.write().insert(
            custom_id.into(),
            Entry {
                user_ids: users.iter().map(|u| u.get()).collect(),
                registered_at: Instant::now(),
            },
        );
    }

    pub fn unregister(&self, custom_id: &str) {
        self.entries.write().remove(custom_id);
    }

    pub fn check(&self, custom_id: &str, user: UserId) -> Ownership {
        let now = Instant::now();
        let mut entries = self.entries.write();

        let verdict = match entries.get(custom_id) {
            None => return Ownership::Expired,
            Some(entry) if now.duration_since(entry.registered_at) > self.ttl => None,
            Some(entry) if entry.user_ids.is_empty() => Some(Ownership::Allowed),
            Some(entry) if entry.user_ids.contains(&user.get()) => Some(Ownership::Allowed),
            Some(_) => Some(Ownership::Blocked),
        };

        match verdict {
            Some(ownership) => ownership,
            None => {
                // Expired entries are dropped lazily on lookup
                entries.remove(custom_id);
                Ownership::Expired
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_id_is_expired() {
        let registry = ComponentRegistry::default();
        assert_eq!(
            registry.check("clans:abc:0:next", UserId::new(1)),
            Ownership::Expired
        );
    }

    #[test]
    fn test_owner_allowed_others_blocked() {
        let registry = ComponentRegistry::default();
        registry.register("clans:abc:0:next", &[UserId::new(1)]);

        assert_eq!(
            registry.check("clans:abc:0:next", UserId::new(1)),
            Ownership::Allowed
        );
        assert_eq!(
            registry.check("clans:abc:0:next", UserId::new(2)),
            Ownership::Blocked
        );
    }

    #[test]
    fn test_empty_owner_list_is_public() {
        let registry = ComponentRegistry::default();
        registry.register("clans:abc:0:next", &[]);
        assert_eq!(
            registry.check("clans:abc:0:next", UserId::new(42)),
            Ownership::Allowed
        );
    }

    #[test]
    fn test_unregister() {
        let registry = ComponentRegistry::default();
        registry.register("clans:abc:0:next", &[UserId::new(1)]);
        registry.unregister("clans:abc:0:next");
        assert_eq!(
            registry.check("clans:abc:0:next", UserId::new(1)),
            Ownership::Expired
        );
    }

    #[test]
    fn test_entries_expire_after_ttl() {
        let registry = ComponentRegistry::with_ttl(Duration::from_nanos(1));
        registry.register("clans:abc:0:next", &[UserId::new(1)]);
        std::thread::sleep(Duration::from_millis(2));
        assert_eq!(
            registry.check("clans:abc:0:next", UserId::new(1)),
            Ownership::Expired
        );
    }
}
