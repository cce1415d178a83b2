use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::coc::Clan;
use crate::Error;

const DEFAULT_STORAGE_FILE: &str = "/tmp/clantrack_clans.json";

/// Hard cap on tracked clans per guild.
const MAX_CLANS_PER_GUILD: usize = 25;

/// Consecutive refresh failures before an entry is paused.
const PAUSE_AFTER_FAILURES: u32 = 3;

#[derive(Serialize, Deserialize, Clone)]
pub struct TrackedClan {
    pub guild_id: u64,
    pub tag: String,
    pub name: String,
    pub active: bool,
    pub paused: bool,
    pub member_count: u32,
    pub failures: u32,
    pub last_ran: Option<DateTime<Utc>>,
    pub chat_language: Option<String>,
    pub tracked_by: u64,
    pub tracked_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Default)]
struct StorageData {
    clans: Vec<TrackedClan>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum InsertOutcome {
    Added,
    Duplicate,
    CapReached,
}

/// JSON-file-backed roster of tracked clans.
pub struct ClanStorage {
    path: PathBuf,
    data: RwLock<StorageData>,
}

impl ClanStorage {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let data = load_data(&path);
        Self {
            path,
            data: RwLock::new(data),
        }
    }

    pub fn from_env() -> Self {
        let path = env::var("STORAGE_FILE").unwrap_or_else(|_| DEFAULT_STORAGE_FILE.to_string());
        Self::open(path)
    }

    /// Tracked clans for a guild, in tracking order.
    pub fn find(&self, guild_id: u64) -> Vec<TrackedClan> {
        self.data
            .read()
            .clans
            .iter()
            .filter(|clan| clan.guild_id == guild_id)
            .cloned()
            .collect()
    }

    /// Unique clan tags across all guilds, in first-tracked order.
    pub fn tags(&self) -> Vec<String> {
        let data = self.data.read();
        let mut tags: Vec<String> = Vec::new();
        for clan in &data.clans {
            if !tags.contains(&clan.tag) {
                tags.push(clan.tag.clone());
            }
        }
        tags
    }

    pub fn insert(
        &self,
        guild_id: u64,
        clan: &Clan,
        tracked_by: u64,
    ) -> Result<InsertOutcome, Error> {
        let mut data = self.data.write();

        let in_guild = data.clans.iter().filter(|c| c.guild_id == guild_id);
        if in_guild.clone().any(|c| c.tag == clan.tag) {
            return Ok(InsertOutcome::Duplicate);
        }
        if in_guild.count() >= MAX_CLANS_PER_GUILD {
            return Ok(InsertOutcome::CapReached);
        }

        data.clans.push(TrackedClan {
            guild_id,
            tag: clan.tag.clone(),
            name: clan.name.clone(),
            active: true,
            paused: false,
            member_count: clan.members,
            failures: 0,
            last_ran: None,
            chat_language: clan.chat_language.as_ref().map(|l| l.code.clone()),
            tracked_by,
            tracked_at: Utc::now(),
        });
        save_data(&self.path, &data)?;
        Ok(InsertOutcome::Added)
    }

    /// Remove a clan from a guild's roster. Returns whether anything was removed.
    pub fn remove(&self, guild_id: u64, tag: &str) -> Result<bool, Error> {
        let mut data = self.data.write();
        let before = data.clans.len();
        data.clans
            .retain(|clan| !(clan.guild_id == guild_id && clan.tag == tag));
        let removed = data.clans.len() != before;
        if removed {
            save_data(&self.path, &data)?;
        }
        Ok(removed)
    }

    /// Record a successful refresh for every entry tracking `tag`: freshen the
    /// snapshot, stamp last_ran, clear the failure streak and any pause.
    pub fn record_success(&self, clan: &Clan) -> Result<(), Error> {
        let now = Utc::now();
        let mut data = self.data.write();
        let mut touched = false;
        for entry in data.clans.iter_mut().filter(|c| c.tag == clan.tag) {
            entry.name = clan.name.clone();
            entry.member_count = clan.members;
            entry.chat_language = clan.chat_language.as_ref().map(|l| l.code.clone());
            entry.last_ran = Some(now);
            entry.failures = 0;
            entry.paused = false;
            touched = true;
        }
        if touched {
            save_data(&self.path, &data)?;
        }
        Ok(())
    }

    /// Record a failed refresh; a streak of failures pauses the entry until
    /// the next success.
    pub fn record_failure(&self, tag: &str) -> Result<(), Error> {
        let mut data = self.data.write();
        let mut touched = false;
        for entry in data.clans.iter_mut().filter(|c| c.tag == tag) {
            entry.failures += 1;
            if entry.failures >= PAUSE_AFTER_FAILURES {
                entry.paused = true;
            }
            touched = true;
        }
        if touched {
            save_data(&self.path, &data)?;
        }
        Ok(())
    }
}

fn load_data(path: &Path) -> StorageData {
    match fs::read_to_string(path) {
        Ok(content) => {
            // Try the current format first
            match serde_json::from_str::<StorageData>(&content) {
                Ok(data) => data,
                Err(_) => migrate_old_format(&content).unwrap_or_default(),
            }
        }
        Err(_) => StorageData::default(),
    }
}

fn migrate_old_format(content: &str) -> Option<StorageData> {
    // Early rosters had no pause/failure bookkeeping and no member snapshot
    #[derive(Deserialize)]
    struct OldTrackedClan {
        guild_id: u64,
        tag: String,
        name: String,
        active: bool,
        last_ran: Option<DateTime<Utc>>,
        chat_language: Option<String>,
        tracked_by: u64,
        tracked_at: DateTime<Utc>,
    }

    #[derive(Deserialize)]
    struct OldStorageData {
        clans: Vec<OldTrackedClan>,
    }

    let old_data: OldStorageData = serde_json::from_str(content).ok()?;

    let clans = old_data
        .clans
        .into_iter()
        .map(|old| TrackedClan {
            guild_id: old.guild_id,
            tag: old.tag,
            name: old.name,
            active: old.active,
            paused: false,
            member_count: 0,
            failures: 0,
            last_ran: old.last_ran,
            chat_language: old.chat_language,
            tracked_by: old.tracked_by,
            tracked_at: old.tracked_at,
        })
        .collect();

    Some(StorageData { clans })
}

fn save_data(path: &Path, data: &StorageData) -> Result<(), Error> {
    let json = serde_json::to_string_pretty(data)?;
    fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coc::ChatLanguage;

    fn sample_clan(tag: &str) -> Clan {
        Clan {
            tag: tag.to_string(),
            name: "Lost Boys".to_string(),
            clan_level: 10,
            members: 42,
            is_war_log_public: true,
            chat_language: Some(ChatLanguage {
                id: 75000000,
                name: "English".to_string(),
                code: "EN".to_string(),
            }),
        }
    }

    fn scratch_storage() -> (tempfile::TempDir, ClanStorage) {
        let dir = tempfile::tempdir().unwrap();
        let storage = ClanStorage::open(dir.path().join("clans.json"));
        (dir, storage)
    }

    #[test]
    fn test_insert_and_find() {
        let (_dir, storage) = scratch_storage();
        let outcome = storage.insert(1, &sample_clan("#2PP"), 99).unwrap();
        assert_eq!(outcome, InsertOutcome::Added);

        let clans = storage.find(1);
        assert_eq!(clans.len(), 1);
        assert_eq!(clans[0].tag, "#2PP");
        assert_eq!(clans[0].member_count, 42);
        assert_eq!(clans[0].chat_language.as_deref(), Some("EN"));
        assert!(clans[0].active);
        assert!(storage.find(2).is_empty());
    }

    #[test]
    fn test_insert_duplicate() {
        let (_dir, storage) = scratch_storage();
        storage.insert(1, &sample_clan("#2PP"), 99).unwrap();
        let outcome = storage.insert(1, &sample_clan("#2PP"), 99).unwrap();
        assert_eq!(outcome, InsertOutcome::Duplicate);

        // The same clan in another guild is fine
        let outcome = storage.insert(2, &sample_clan("#2PP"), 99).unwrap();
        assert_eq!(outcome, InsertOutcome::Added);
    }

    #[test]
    fn test_insert_cap() {
        let (_dir, storage) = scratch_storage();
        for i in 0..MAX_CLANS_PER_GUILD {
            let tag = format!("#2PP{}", i);
            assert_eq!(
                storage.insert(1, &sample_clan(&tag), 99).unwrap(),
                InsertOutcome::Added
            );
        }
        let outcome = storage.insert(1, &sample_clan("#8QU8J9LP"), 99).unwrap();
        assert_eq!(outcome, InsertOutcome::CapReached);
    }

    #[test]
    fn test_remove() {
        let (_dir, storage) = scratch_storage();
        storage.insert(1, &sample_clan("#2PP"), 99).unwrap();
        assert!(storage.remove(1, "#2PP").unwrap());
        assert!(!storage.remove(1, "#2PP").unwrap());
        assert!(storage.find(1).is_empty());
    }

    #[test]
    fn test_failure_streak_pauses_until_success() {
        let (_dir, storage) = scratch_storage();
        storage.insert(1, &sample_clan("#2PP"), 99).unwrap();

        storage.record_failure("#2PP").unwrap();
        storage.record_failure("#2PP").unwrap();
        assert!(!storage.find(1)[0].paused);

        storage.record_failure("#2PP").unwrap();
        assert!(storage.find(1)[0].paused);
        assert_eq!(storage.find(1)[0].failures, 3);

        storage.record_success(&sample_clan("#2PP")).unwrap();
        let entry = &storage.find(1)[0];
        assert!(!entry.paused);
        assert_eq!(entry.failures, 0);
        assert!(entry.last_ran.is_some());
    }

    #[test]
    fn test_success_updates_every_guild_tracking_the_tag() {
        let (_dir, storage) = scratch_storage();
        storage.insert(1, &sample_clan("#2PP"), 99).unwrap();
        storage.insert(2, &sample_clan("#2PP"), 99).unwrap();

        let mut refreshed = sample_clan("#2PP");
        refreshed.name = "Found Boys".to_string();
        refreshed.members = 50;
        storage.record_success(&refreshed).unwrap();

        for guild in [1, 2] {
            let entry = &storage.find(guild)[0];
            assert_eq!(entry.name, "Found Boys");
            assert_eq!(entry.member_count, 50);
        }
    }

    #[test]
    fn test_tags_are_unique() {
        let (_dir, storage) = scratch_storage();
        storage.insert(1, &sample_clan("#2PP"), 99).unwrap();
        storage.insert(2, &sample_clan("#2PP"), 99).unwrap();
        storage.insert(1, &sample_clan("#8QU8J9LP"), 99).unwrap();
        assert_eq!(storage.tags(), vec!["#2PP", "#8QU8J9LP"]);
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clans.json");

        let storage = ClanStorage::open(&path);
        storage.insert(1, &sample_clan("#2PP"), 99).unwrap();
        drop(storage);

        let reopened = ClanStorage::open(&path);
        assert_eq!(reopened.find(1).len(), 1);
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clans.json");
        fs::write(&path, "not json at all").unwrap();

        let storage = ClanStorage::open(&path);
        assert!(storage.find(1).is_empty());
    }

    #[test]
    fn test_migrates_old_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clans.json");
        let old = r##"{
            "clans": [{
                "guild_id": 1,
                "tag": "#2PP",
                "name": "Lost Boys",
                "active": true,
                "last_ran": null,
                "chat_language": "EN",
                "tracked_by": 99,
                "tracked_at": "2026-01-01T00:00:00Z"
            }]
        }"##;
        fs::write(&path, old).unwrap();

        let storage = ClanStorage::open(&path);
        let clans = storage.find(1);
        assert_eq!(clans.len(), 1);
        assert!(!clans[0].paused);
        assert_eq!(clans[0].failures, 0);
        assert_eq!(clans[0].member_count, 0);
    }
}
