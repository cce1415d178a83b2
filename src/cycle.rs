use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::cache::{Cycle, CycleCache};
use crate::coc::{CocClient, WarStatus};
use crate::storage::ClanStorage;

// Keep the scheduler alive for the lifetime of the process
static SCHEDULER: tokio::sync::Mutex<Option<JobScheduler>> = tokio::sync::Mutex::const_new(None);

/// Start the three refresh loops. Each pass walks the tracked roster, then
/// records its wall-clock duration in the cycle cache for `/debug`.
pub async fn start(storage: Arc<ClanStorage>, coc: Arc<CocClient>, cycles: Arc<CycleCache>) {
    let mut scheduler_guard = SCHEDULER.lock().await;

    if scheduler_guard.is_some() {
        log::info!("Refresh cycles are already running");
        return;
    }

    let scheduler = match JobScheduler::new().await {
        Ok(scheduler) => scheduler,
        Err(e) => {
            log::error!("Failed to create the cycle scheduler: {}", e);
            return;
        }
    };

    // Clan roster refresh every 10 minutes
    let clan_job = {
        let (storage, coc, cycles) = (storage.clone(), coc.clone(), cycles.clone());
        Job::new_async("0 */10 * * * *", move |_uuid, _lock| {
            let (storage, coc, cycles) = (storage.clone(), coc.clone(), cycles.clone());
            Box::pin(async move {
                run_clan_pass(&storage, &coc, &cycles).await;
            })
        })
    };

    // War peek every 15 minutes
    let war_job = {
        let (storage, coc, cycles) = (storage.clone(), coc.clone(), cycles.clone());
        let war_states: Arc<Mutex<HashMap<String, WarStatus>>> =
            Arc::new(Mutex::new(HashMap::new()));
        Job::new_async("0 */15 * * * *", move |_uuid, _lock| {
            let (storage, coc, cycles) = (storage.clone(), coc.clone(), cycles.clone());
            let war_states = war_states.clone();
            Box::pin(async move {
                run_war_pass(&storage, &coc, &cycles, &war_states).await;
            })
        })
    };

    // Member snapshot refresh every 30 minutes
    let player_job = {
        let (storage, coc, cycles) = (storage.clone(), coc.clone(), cycles.clone());
        Job::new_async("0 */30 * * * *", move |_uuid, _lock| {
            let (storage, coc, cycles) = (storage.clone(), coc.clone(), cycles.clone());
            Box::pin(async move {
                run_player_pass(&storage, &coc, &cycles).await;
            })
        })
    };

    for (name, job) in [("clan", clan_job), ("war", war_job), ("player", player_job)] {
        match job {
            Ok(job) => {
                if let Err(e) = scheduler.add(job).await {
                    log::error!("Failed to add the {} cycle job: {}", name, e);
                    return;
                }
            }
            Err(e) => {
                log::error!("Failed to create the {} cycle job: {}", name, e);
                return;
            }
        }
    }

    if let Err(e) = scheduler.start().await {
        log::error!("Failed to start the cycle scheduler: {}", e);
        return;
    }

    *scheduler_guard = Some(scheduler);
    log::info!("Refresh cycles scheduled");
}

async fn run_clan_pass(storage: &ClanStorage, coc: &CocClient, cycles: &CycleCache) {
    let started = Instant::now();
    let tags = storage.tags();
    let mut ok = 0usize;
    let mut failed = 0usize;

    for tag in &tags {
        match coc.clan(tag).await {
            Ok(clan) => {
                if let Err(err) = storage.record_success(&clan) {
                    log::error!("Failed to persist refresh for {}: {}", tag, err);
                }
                ok += 1;
            }
            Err(err) => {
                log::warn!("Clan refresh failed for {}: {}", tag, err);
                if let Err(err) = storage.record_failure(tag) {
                    log::error!("Failed to persist failure for {}: {}", tag, err);
                }
                failed += 1;
            }
        }
    }

    let elapsed = started.elapsed();
    cycles.record(Cycle::Clan, elapsed);
    log::info!(
        "Clan cycle finished: {} refreshed, {} failed in {:?}",
        ok,
        failed,
        elapsed
    );
}

async fn run_war_pass(
    storage: &ClanStorage,
    coc: &CocClient,
    cycles: &CycleCache,
    war_states: &Mutex<HashMap<String, WarStatus>>,
) {
    let started = Instant::now();
    let tags = storage.tags();

    for tag in &tags {
        match coc.current_war(tag).await {
            Ok(status) => {
                let previous = war_states.lock().insert(tag.clone(), status.clone());
                if previous.as_ref() != Some(&status) {
                    log::debug!("War state for {} is now {:?}", tag, status);
                }
            }
            Err(err) => log::warn!("War peek failed for {}: {}", tag, err),
        }
    }

    let elapsed = started.elapsed();
    cycles.record(Cycle::War, elapsed);
    log::info!("War cycle finished: {} clans in {:?}", tags.len(), elapsed);
}

async fn run_player_pass(storage: &ClanStorage, coc: &CocClient, cycles: &CycleCache) {
    let started = Instant::now();
    let tags = storage.tags();
    let mut members = 0u32;

    for tag in &tags {
        match coc.clan(tag).await {
            Ok(clan) => {
                members += clan.members;
                if let Err(err) = storage.record_success(&clan) {
                    log::error!("Failed to persist member snapshot for {}: {}", tag, err);
                }
            }
            Err(err) => {
                log::warn!("Member snapshot failed for {}: {}", tag, err);
                if let Err(err) = storage.record_failure(tag) {
                    log::error!("Failed to persist failure for {}: {}", tag, err);
                }
            }
        }
    }

    let elapsed = started.elapsed();
    cycles.record(Cycle::Player, elapsed);
    log::info!(
        "Player cycle finished: {} members across {} clans in {:?}",
        members,
        tags.len(),
        elapsed
    );
}
