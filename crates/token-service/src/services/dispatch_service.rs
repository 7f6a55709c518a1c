//! Agent-dispatch deduplication.
//!
//! The platform may spawn duplicate agents (or reject the call outright) on
//! rapid repeated dispatches for the same room, so dispatches are served
//! through a small TTL cache keyed by `(room, agent_name)`. Each key has its
//! own slot mutex, held across the upstream call: two concurrent requests
//! for the same key cannot both miss, which gives the at-most-one-dispatch-
//! per-window guarantee, while a slow dispatch for one room never blocks
//! dispatches for another. The outer map lock is only held for lookups.

use crate::errors::ApiError;
use crate::models::{DispatchRequest, DispatchResponse};
use crate::services::validate_room;
use lk_client::AgentDispatcher;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{info, warn};

/// Agent names share the platform's identifier limit.
const MAX_AGENT_NAME_LENGTH: usize = 100;

/// Marker set on responses served from the cache.
pub const DUPLICATE_NOTE: &str = "duplicate-suppressed";

struct DispatchRecord {
    dispatch_id: String,
    created_at: Instant,
}

/// Per-key slot: `None` until a dispatch for the key has succeeded.
type Slot = Arc<Mutex<Option<DispatchRecord>>>;

/// Dispatch deduplicator in front of the platform's dispatch RPC.
pub struct DispatchService {
    dispatcher: Arc<dyn AgentDispatcher>,
    slots: Mutex<HashMap<(String, String), Slot>>,
    cache_ttl: Duration,
    default_agent: String,
    max_room_name_length: usize,
}

impl DispatchService {
    pub fn new(
        dispatcher: Arc<dyn AgentDispatcher>,
        cache_ttl: Duration,
        default_agent: &str,
        max_room_name_length: usize,
    ) -> Self {
        DispatchService {
            dispatcher,
            slots: Mutex::new(HashMap::new()),
            cache_ttl,
            default_agent: default_agent.to_string(),
            max_room_name_length,
        }
    }

    /// Dispatch an agent into a room, deduplicating within the TTL window.
    ///
    /// A live cache entry short-circuits with the original dispatch id and
    /// a `duplicate-suppressed` note. Failed upstream calls are never
    /// cached, so the next request retries.
    pub async fn create_dispatch(
        &self,
        request: DispatchRequest,
    ) -> Result<DispatchResponse, ApiError> {
        validate_room(&request.room, self.max_room_name_length)?;

        let agent_name = match request.agent_name {
            Some(name) => {
                if name.is_empty() || name.len() > MAX_AGENT_NAME_LENGTH {
                    return Err(ApiError::Validation {
                        field: "agent_name",
                        message: format!(
                            "agent name must be 1..={MAX_AGENT_NAME_LENGTH} characters"
                        ),
                    });
                }
                name
            }
            None => self.default_agent.clone(),
        };

        let key = (request.room.clone(), agent_name.clone());
        let slot = self.slot_for(key).await;

        // Per-key lock, held across the upstream round-trip so concurrent
        // same-key requests cannot both miss; other keys are unaffected.
        let mut record = slot.lock().await;

        if let Some(existing) = record.as_ref() {
            if existing.created_at.elapsed() < self.cache_ttl {
                info!(
                    target: "token_service.dispatch",
                    room = %request.room,
                    agent_name = %agent_name,
                    dispatch_id = %existing.dispatch_id,
                    "Suppressing duplicate dispatch"
                );
                return Ok(DispatchResponse {
                    dispatch_id: existing.dispatch_id.clone(),
                    room: request.room,
                    agent_name,
                    note: Some(DUPLICATE_NOTE.to_string()),
                });
            }
        }

        // Metadata is opaque here; it is forwarded to the platform verbatim.
        let dispatch_id = self
            .dispatcher
            .create_dispatch(&request.room, &agent_name, request.metadata.as_deref())
            .await
            .map_err(|e| {
                warn!(
                    target: "token_service.dispatch",
                    room = %request.room,
                    agent_name = %agent_name,
                    error = %e,
                    "Agent dispatch failed"
                );
                // Clear any stale record; the next request retries.
                *record = None;
                ApiError::from(e)
            })?;

        *record = Some(DispatchRecord {
            dispatch_id: dispatch_id.clone(),
            created_at: Instant::now(),
        });

        info!(
            target: "token_service.dispatch",
            room = %request.room,
            agent_name = %agent_name,
            dispatch_id = %dispatch_id,
            "Agent dispatch created"
        );

        Ok(DispatchResponse {
            dispatch_id,
            room: request.room,
            agent_name,
            note: None,
        })
    }

    /// Fetch or create the slot for a key, sweeping dead slots while the
    /// map lock is held. A slot is dead once no request holds it and its
    /// record has expired; `strong_count > 1` means a request is using it,
    /// and a slot in use is never removed.
    async fn slot_for(&self, key: (String, String)) -> Slot {
        let mut slots = self.slots.lock().await;

        let cache_ttl = self.cache_ttl;
        slots.retain(|_, slot| {
            if Arc::strong_count(slot) > 1 {
                return true;
            }
            match slot.try_lock() {
                Ok(record) => record
                    .as_ref()
                    .is_some_and(|r| r.created_at.elapsed() < cache_ttl),
                Err(_) => true,
            }
        });

        slots
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .clone()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
pub(crate) mod tests {
    use super::*;
    use lk_client::DispatchError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counting dispatcher that hands out sequential ids, optionally
    /// failing the first N calls. Remembers the last metadata it saw.
    pub(crate) struct MockDispatcher {
        calls: AtomicUsize,
        fail_first: usize,
        last_metadata: std::sync::Mutex<Option<String>>,
    }

    impl MockDispatcher {
        pub(crate) fn new() -> Self {
            MockDispatcher {
                calls: AtomicUsize::new(0),
                fail_first: 0,
                last_metadata: std::sync::Mutex::new(None),
            }
        }

        pub(crate) fn failing_first(n: usize) -> Self {
            MockDispatcher {
                calls: AtomicUsize::new(0),
                fail_first: n,
                last_metadata: std::sync::Mutex::new(None),
            }
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn last_metadata(&self) -> Option<String> {
            self.last_metadata.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl AgentDispatcher for MockDispatcher {
        async fn create_dispatch(
            &self,
            _room: &str,
            _agent_name: &str,
            metadata: Option<&str>,
        ) -> Result<String, DispatchError> {
            *self.last_metadata.lock().unwrap() = metadata.map(str::to_string);
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_first {
                return Err(DispatchError::Upstream("status 503".to_string()));
            }
            Ok(format!("AD_{call}"))
        }
    }

    fn service(dispatcher: Arc<MockDispatcher>, ttl: Duration) -> DispatchService {
        DispatchService::new(dispatcher, ttl, "helper-agent", 100)
    }

    fn request(room: &str) -> DispatchRequest {
        DispatchRequest {
            room: room.to_string(),
            agent_name: None,
            metadata: None,
        }
    }

    #[tokio::test]
    async fn test_duplicate_within_window_returns_cached_id() {
        let dispatcher = Arc::new(MockDispatcher::new());
        let service = service(dispatcher.clone(), Duration::from_secs(3));

        let first = service.create_dispatch(request("studio-1")).await.unwrap();
        let second = service.create_dispatch(request("studio-1")).await.unwrap();

        assert_eq!(first.dispatch_id, second.dispatch_id);
        assert_eq!(first.note, None);
        assert_eq!(second.note.as_deref(), Some(DUPLICATE_NOTE));
        assert_eq!(dispatcher.call_count(), 1, "only one upstream call");
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_dispatch_after_ttl_elapses() {
        let dispatcher = Arc::new(MockDispatcher::new());
        let service = service(dispatcher.clone(), Duration::from_secs(3));

        let first = service.create_dispatch(request("studio-1")).await.unwrap();

        tokio::time::advance(Duration::from_secs(4)).await;

        let second = service.create_dispatch(request("studio-1")).await.unwrap();
        assert_ne!(first.dispatch_id, second.dispatch_id);
        assert_eq!(second.note, None);
        assert_eq!(dispatcher.call_count(), 2);
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_collide() {
        let dispatcher = Arc::new(MockDispatcher::new());
        let service = service(dispatcher.clone(), Duration::from_secs(3));

        let a = service.create_dispatch(request("studio-1")).await.unwrap();
        let b = service.create_dispatch(request("studio-2")).await.unwrap();
        let mut custom = request("studio-1");
        custom.agent_name = Some("other-agent".to_string());
        let c = service.create_dispatch(custom).await.unwrap();

        assert_ne!(a.dispatch_id, b.dispatch_id);
        assert_ne!(a.dispatch_id, c.dispatch_id);
        assert_eq!(dispatcher.call_count(), 3);
    }

    #[tokio::test]
    async fn test_failed_dispatch_is_not_cached() {
        let dispatcher = Arc::new(MockDispatcher::failing_first(1));
        let service = service(dispatcher.clone(), Duration::from_secs(3));

        let err = service.create_dispatch(request("studio-1")).await.unwrap_err();
        assert!(matches!(err, ApiError::Upstream(_)));

        // The failure must not satisfy a later request from cache.
        let ok = service.create_dispatch(request("studio-1")).await.unwrap();
        assert_eq!(ok.note, None);
        assert_eq!(dispatcher.call_count(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_same_key_dispatches_once() {
        let dispatcher = Arc::new(MockDispatcher::new());
        let service = Arc::new(service(dispatcher.clone(), Duration::from_secs(3)));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move { service.create_dispatch(request("studio-1")).await })
            })
            .collect();

        let mut ids = Vec::new();
        for task in tasks {
            ids.push(task.await.unwrap().unwrap().dispatch_id);
        }

        assert!(ids.windows(2).all(|w| w[0] == w[1]), "all ids identical");
        assert_eq!(dispatcher.call_count(), 1);
    }

    #[tokio::test]
    async fn test_validation_failures() {
        let dispatcher = Arc::new(MockDispatcher::new());
        let service = service(dispatcher.clone(), Duration::from_secs(3));

        let err = service.create_dispatch(request("")).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation { field: "room", .. }));

        let mut bad_agent = request("studio-1");
        bad_agent.agent_name = Some(String::new());
        let err = service.create_dispatch(bad_agent).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation { field: "agent_name", .. }));

        assert_eq!(dispatcher.call_count(), 0, "validation failures never reach upstream");
    }

    #[tokio::test]
    async fn test_metadata_forwarded_verbatim() {
        let dispatcher = Arc::new(MockDispatcher::new());
        let service = service(dispatcher.clone(), Duration::from_secs(3));

        // Metadata is an opaque string to this service; a value that is not
        // JSON still goes through untouched.
        let mut with_metadata = request("studio-1");
        with_metadata.metadata = Some("opaque agent hint".to_string());
        service.create_dispatch(with_metadata).await.unwrap();

        assert_eq!(dispatcher.last_metadata().as_deref(), Some("opaque agent hint"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_dispatch_does_not_block_other_keys() {
        use tokio::sync::Semaphore;

        /// Parks calls for `slow-room` until a permit is released.
        struct GatedDispatcher {
            gate: Semaphore,
            calls: AtomicUsize,
        }

        #[async_trait::async_trait]
        impl AgentDispatcher for GatedDispatcher {
            async fn create_dispatch(
                &self,
                room: &str,
                _agent_name: &str,
                _metadata: Option<&str>,
            ) -> Result<String, DispatchError> {
                if room == "slow-room" {
                    let permit = self.gate.acquire().await;
                    drop(permit);
                }
                let call = self.calls.fetch_add(1, Ordering::SeqCst);
                Ok(format!("AD_{call}"))
            }
        }

        let dispatcher = Arc::new(GatedDispatcher {
            gate: Semaphore::new(0),
            calls: AtomicUsize::new(0),
        });
        let service = Arc::new(DispatchService::new(
            dispatcher.clone(),
            Duration::from_secs(3),
            "helper-agent",
            100,
        ));

        let slow_service = service.clone();
        let slow =
            tokio::spawn(async move { slow_service.create_dispatch(request("slow-room")).await });
        tokio::task::yield_now().await;

        // The other key must complete while the slow one is still parked.
        // Under the paused clock the timeout fires if it is blocked.
        let fast = tokio::time::timeout(
            Duration::from_secs(1),
            service.create_dispatch(request("fast-room")),
        )
        .await
        .expect("dispatch for another room must not wait on the slow one")
        .unwrap();
        assert_eq!(fast.note, None);

        dispatcher.gate.add_permits(1);
        let slow = slow.await.unwrap().unwrap();
        assert_ne!(slow.dispatch_id, fast.dispatch_id);
        assert_eq!(dispatcher.calls.load(Ordering::SeqCst), 2);
    }
}
