use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{Timelike, Utc};
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;

use posse_models::interactions::InteractionStore;
use posse_models::mappings::MappingStore;
use posse_services::notifications::PushoverNotifier;
use posse_services::social::SocialClient;
use posse_utils::datetime::age_in_days;

use crate::interactions::sync_post_interactions;

const WORKER_COUNT: usize = 2;
const WORKER_POLL_INTERVAL: Duration = Duration::from_secs(1);
const HEARTBEAT_INITIAL_DELAY: Duration = Duration::from_secs(60);
pub const WORKER_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);
pub const HEARTBEAT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// High priority used by `trigger_manual_sync` and the post-dispatch
/// immediate sync (spec §4.F step 11, §4.I).
pub const MANUAL_SYNC_PRIORITY: u8 = 1;
const HEARTBEAT_PRIORITY: u8 = 5;
const SHUTDOWN_PRIORITY: u8 = 0;

/// An event on the scheduler's priority queue (spec §4.I). Lower numeric
/// priority runs first.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    SyncPost {
        ghost_post_id: String,
        priority: u8,
        bypass_age_check: bool,
    },
    SyncAll {
        priority: u8,
    },
    Shutdown,
}

impl SyncEvent {
    fn priority(&self) -> u8 {
        match self {
            SyncEvent::SyncPost { priority, .. } => *priority,
            SyncEvent::SyncAll { priority } => *priority,
            SyncEvent::Shutdown => SHUTDOWN_PRIORITY,
        }
    }
}

struct QueuedEvent {
    event: SyncEvent,
    sequence: u64,
}

impl PartialEq for QueuedEvent {
    fn eq(&self, other: &Self) -> bool {
        self.event.priority() == other.event.priority() && self.sequence == other.sequence
    }
}
impl Eq for QueuedEvent {}

impl PartialOrd for QueuedEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedEvent {
    // `BinaryHeap` is a max-heap; lower numeric priority and earlier
    // sequence must sort greatest so they pop first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .event
            .priority()
            .cmp(&self.event.priority())
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

struct EventQueue {
    heap: Mutex<BinaryHeap<QueuedEvent>>,
    notify: Notify,
    sequence: AtomicU64,
}

impl EventQueue {
    fn new() -> Self {
        Self {
            heap: Mutex::new(BinaryHeap::new()),
            notify: Notify::new(),
            sequence: AtomicU64::new(0),
        }
    }

    async fn push(&self, event: SyncEvent) {
        let sequence = self.sequence.fetch_add(1, AtomicOrdering::SeqCst);
        self.heap.lock().await.push(QueuedEvent { event, sequence });
        self.notify.notify_one();
    }

    /// Blocking get with a 1 s poll, per spec §4.I "Worker thread".
    async fn pop(&self) -> SyncEvent {
        loop {
            if let Some(item) = self.heap.lock().await.pop() {
                return item.event;
            }
            tokio::select! {
                _ = tokio::time::sleep(WORKER_POLL_INTERVAL) => {}
                _ = self.notify.notified() => {}
            }
        }
    }
}

/// Configuration the scheduler needs beyond what's already captured by
/// the injected stores/clients.
pub struct SchedulerConfig {
    pub max_post_age_days: i64,
    pub heartbeat_interval_minutes: u64,
}

/// Drives `SYNC_POST`/`SYNC_ALL` events against the interaction sync
/// service on a fixed worker pool plus a heartbeat, per spec §4.I.
pub struct Scheduler {
    queue: EventQueue,
    clients: Vec<Arc<dyn SocialClient>>,
    mappings: Arc<MappingStore>,
    interactions: Arc<InteractionStore>,
    notifier: Option<Arc<PushoverNotifier>>,
    config: SchedulerConfig,
    shutting_down: AtomicBool,
}

pub struct SchedulerHandles {
    pub workers: Vec<JoinHandle<()>>,
    pub heartbeat: JoinHandle<()>,
}

impl Scheduler {
    pub fn new(
        clients: Vec<Arc<dyn SocialClient>>,
        mappings: Arc<MappingStore>,
        interactions: Arc<InteractionStore>,
        notifier: Option<Arc<PushoverNotifier>>,
        config: SchedulerConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            queue: EventQueue::new(),
            clients,
            mappings,
            interactions,
            notifier,
            config,
            shutting_down: AtomicBool::new(false),
        })
    }

    pub async fn enqueue(&self, event: SyncEvent) {
        self.queue.push(event).await;
    }

    /// Enqueues a high-priority, age-check-bypassing sync for `id` (spec
    /// §4.I "External API").
    pub async fn trigger_manual_sync(&self, ghost_post_id: impl Into<String>) {
        self.enqueue(SyncEvent::SyncPost {
            ghost_post_id: ghost_post_id.into(),
            priority: MANUAL_SYNC_PRIORITY,
            bypass_age_check: true,
        })
        .await;
    }

    /// Starts the two worker tasks and the heartbeat task.
    pub fn start(self: &Arc<Self>) -> SchedulerHandles {
        let workers = (0..WORKER_COUNT)
            .map(|index| {
                let scheduler = Arc::clone(self);
                tokio::spawn(async move { scheduler.run_worker(index).await })
            })
            .collect();
        let heartbeat = {
            let scheduler = Arc::clone(self);
            tokio::spawn(async move { scheduler.run_heartbeat().await })
        };
        SchedulerHandles { workers, heartbeat }
    }

    /// Requests shutdown: wakes the heartbeat and pushes one `Shutdown`
    /// event per worker so each exits after draining.
    pub async fn shutdown(&self) {
        self.shutting_down.store(true, AtomicOrdering::SeqCst);
        for _ in 0..WORKER_COUNT {
            self.enqueue(SyncEvent::Shutdown).await;
        }
    }

    async fn run_worker(self: Arc<Self>, index: usize) {
        loop {
            let event = self.queue.pop().await;
            match event {
                SyncEvent::Shutdown => {
                    log::info!("sync worker {index} received shutdown, exiting");
                    break;
                }
                SyncEvent::SyncPost {
                    ghost_post_id,
                    bypass_age_check,
                    ..
                } => self.handle_sync_post(&ghost_post_id, bypass_age_check).await,
                SyncEvent::SyncAll { .. } => self.handle_sync_all().await,
            }
        }
    }

    async fn run_heartbeat(self: Arc<Self>) {
        tokio::time::sleep(HEARTBEAT_INITIAL_DELAY).await;
        if self.config.heartbeat_interval_minutes == 0 {
            return;
        }
        let mut ticker = tokio::time::interval(Duration::from_secs(self.config.heartbeat_interval_minutes * 60));
        loop {
            ticker.tick().await;
            if self.shutting_down.load(AtomicOrdering::SeqCst) {
                break;
            }
            self.enqueue(SyncEvent::SyncAll { priority: HEARTBEAT_PRIORITY }).await;
        }
    }

    async fn handle_sync_post(&self, ghost_post_id: &str, bypass_age_check: bool) {
        if !bypass_age_check {
            match self.mappings.get_mapping(ghost_post_id) {
                Ok(Some(mapping)) if age_in_days(mapping.syndicated_at) > self.config.max_post_age_days => {
                    return;
                }
                Ok(None) => return,
                Err(err) => {
                    log::error!("scheduler: failed to load mapping for {ghost_post_id}: {err}");
                    return;
                }
                _ => {}
            }
        }
        self.sync_one(ghost_post_id).await;
    }

    async fn handle_sync_all(&self) {
        let ids = match self.mappings.list_ids() {
            Ok(ids) => ids,
            Err(err) => {
                log::error!("scheduler: failed to list mappings for SYNC_ALL: {err}");
                return;
            }
        };
        let current_hour = Utc::now().hour();
        for id in ids {
            let mapping = match self.mappings.get_mapping(&id) {
                Ok(Some(mapping)) => mapping,
                Ok(None) => continue,
                Err(err) => {
                    log::error!("scheduler: failed to load mapping for {id}: {err}");
                    continue;
                }
            };
            if !is_sync_all_eligible(age_in_days(mapping.syndicated_at), self.config.max_post_age_days, current_hour) {
                continue;
            }
            self.sync_one(&id).await;
        }
    }

    async fn sync_one(&self, ghost_post_id: &str) {
        let title = self
            .mappings
            .get_mapping(ghost_post_id)
            .ok()
            .flatten()
            .map(|m| m.ghost_post_url)
            .unwrap_or_default();
        let result = sync_post_interactions(
            &self.clients,
            &self.mappings,
            &self.interactions,
            self.notifier.as_deref(),
            ghost_post_id,
            &title,
        )
        .await;
        if let Err(err) = result {
            log::error!("interaction sync failed for {ghost_post_id}: {err}");
        }
    }
}

/// Age-tiered `SYNC_ALL` eligibility policy (spec §4.I). The heartbeat's
/// hour-modulo behavior is intentionally preserved: a scheduler with a
/// heartbeat interval that does not evenly divide 60 minutes can re-check
/// tier 3 posts more than once within the same hour.
fn is_sync_all_eligible(age_days: i64, max_post_age_days: i64, current_hour: u32) -> bool {
    if age_days > max_post_age_days {
        return false;
    }
    if age_days < 2 {
        return true;
    }
    if age_days < 7 {
        return current_hour % 2 == 0;
    }
    current_hour % 4 == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_under_two_days_always_eligible() {
        assert!(is_sync_all_eligible(0, 30, 13));
        assert!(is_sync_all_eligible(1, 30, 13));
    }

    #[test]
    fn test_tier_two_to_seven_days_requires_even_hour() {
        assert!(is_sync_all_eligible(3, 30, 14));
        assert!(!is_sync_all_eligible(3, 30, 13));
    }

    #[test]
    fn test_tier_seven_plus_requires_hour_multiple_of_four() {
        assert!(is_sync_all_eligible(10, 30, 8));
        assert!(!is_sync_all_eligible(10, 30, 10));
    }

    #[test]
    fn test_age_over_max_is_skipped() {
        assert!(!is_sync_all_eligible(31, 30, 0));
    }

    #[test]
    fn test_queue_pops_highest_priority_first() {
        let queue = EventQueue::new();
        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        rt.block_on(async {
            queue.push(SyncEvent::SyncAll { priority: 5 }).await;
            queue
                .push(SyncEvent::SyncPost {
                    ghost_post_id: "a".to_owned(),
                    priority: 1,
                    bypass_age_check: true,
                })
                .await;
            let first = queue.pop().await;
            match first {
                SyncEvent::SyncPost { priority, .. } => assert_eq!(priority, 1),
                _ => panic!("expected the higher-priority SyncPost first"),
            }
        });
    }

    #[test]
    fn test_queue_is_fifo_within_same_priority() {
        let queue = EventQueue::new();
        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        rt.block_on(async {
            queue
                .push(SyncEvent::SyncPost {
                    ghost_post_id: "first".to_owned(),
                    priority: 3,
                    bypass_age_check: false,
                })
                .await;
            queue
                .push(SyncEvent::SyncPost {
                    ghost_post_id: "second".to_owned(),
                    priority: 3,
                    bypass_age_check: false,
                })
                .await;
            let first = queue.pop().await;
            match first {
                SyncEvent::SyncPost { ghost_post_id, .. } => assert_eq!(ghost_post_id, "first"),
                _ => panic!("expected SyncPost"),
            }
        });
    }
}
