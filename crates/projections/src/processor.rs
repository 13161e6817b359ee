//! Projection processor for feeding events to the read models.

use event_store::{EventEnvelope, EventStore};
use futures_util::StreamExt;
use tokio::sync::Mutex;

use crate::Result;
use crate::projection::Projection;

/// Processes events from an event store and delivers them to projections.
///
/// The processor supports:
/// - Catch-up: replays all events from the store to bring projections up to date
/// - Single event delivery: delivers a new event to all projections
/// - Rebuild: resets all projections and replays from scratch
///
/// Catch-up runs both at startup and on read paths, so concurrent calls
/// are expected; a gate serializes them, otherwise two replays could
/// each pass a projection's position check for the same event and
/// deliver it twice.
pub struct ProjectionProcessor<S: EventStore> {
    store: S,
    projections: Vec<Box<dyn Projection>>,
    catch_up_gate: Mutex<()>,
}

impl<S: EventStore> ProjectionProcessor<S> {
    /// Creates a new processor with the given event store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            projections: Vec::new(),
            catch_up_gate: Mutex::new(()),
        }
    }

    /// Registers a projection with this processor.
    pub fn register(&mut self, projection: Box<dyn Projection>) {
        self.projections.push(projection);
    }

    /// Returns the number of registered projections.
    pub fn projection_count(&self) -> usize {
        self.projections.len()
    }

    /// Runs catch-up processing: streams all events from the store and delivers
    /// them to each projection that hasn't already seen them. Concurrent
    /// calls are serialized; the second caller replays whatever the first
    /// left unprocessed.
    #[tracing::instrument(skip(self))]
    pub async fn run_catch_up(&self) -> Result<()> {
        let _gate = self.catch_up_gate.lock().await;
        self.replay().await
    }

    async fn replay(&self) -> Result<()> {
        let mut stream = self.store.stream_all_events().await?;
        let mut event_index: u64 = 0;

        while let Some(result) = stream.next().await {
            let event = result?;
            event_index += 1;

            for projection in &self.projections {
                let pos = projection.position().await;
                if pos.events_processed < event_index {
                    projection.handle(&event).await?;
                    metrics::counter!("projections_events_processed").increment(1);
                }
            }
        }

        tracing::info!(events_processed = event_index, "catch-up complete");

        Ok(())
    }

    /// Delivers a single event to all registered projections.
    #[tracing::instrument(skip(self, event), fields(event_type = %event.event_type))]
    pub async fn process_event(&self, event: &EventEnvelope) -> Result<()> {
        for projection in &self.projections {
            projection.handle(event).await?;
        }
        Ok(())
    }

    /// Resets all projections and replays all events from the store.
    /// Holds the catch-up gate across the reset and the replay so no
    /// concurrent catch-up observes a half-reset view.
    #[tracing::instrument(skip(self))]
    pub async fn rebuild_all(&self) -> Result<()> {
        let _gate = self.catch_up_gate.lock().await;
        for projection in &self.projections {
            projection.reset().await?;
        }
        self.replay().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::ProjectionPosition;
    use async_trait::async_trait;
    use common::AggregateId;
    use event_store::{InMemoryEventStore, Version};
    use std::sync::Arc;
    use tokio::sync::RwLock;

    /// A simple counting projection for testing.
    struct CountingProjection {
        count: Arc<RwLock<u64>>,
        position: Arc<RwLock<ProjectionPosition>>,
    }

    impl CountingProjection {
        fn new() -> Self {
            Self {
                count: Arc::new(RwLock::new(0)),
                position: Arc::new(RwLock::new(ProjectionPosition::zero())),
            }
        }
    }

    #[async_trait]
    impl Projection for CountingProjection {
        fn name(&self) -> &'static str {
            "CountingProjection"
        }

        async fn handle(&self, _event: &EventEnvelope) -> Result<()> {
            let mut count = self.count.write().await;
            *count += 1;
            let mut pos = self.position.write().await;
            *pos = pos.advance();
            Ok(())
        }

        async fn position(&self) -> ProjectionPosition {
            *self.position.read().await
        }

        async fn reset(&self) -> Result<()> {
            *self.count.write().await = 0;
            *self.position.write().await = ProjectionPosition::zero();
            Ok(())
        }
    }

    fn ledger_event(aggregate_id: AggregateId, version: Version) -> EventEnvelope {
        EventEnvelope::builder()
            .aggregate_id(aggregate_id)
            .aggregate_type("StockRecord")
            .event_type("ProductionLogged")
            .version(version)
            .payload_raw(serde_json::json!({"test": true}))
            .build()
    }

    #[tokio::test]
    async fn catch_up_processes_all_events() {
        let store = InMemoryEventStore::new();
        let agg_id = AggregateId::new();

        let events = vec![
            ledger_event(agg_id, Version::new(1)),
            ledger_event(agg_id, Version::new(2)),
            ledger_event(agg_id, Version::new(3)),
        ];
        store
            .append(events, event_store::AppendOptions::new())
            .await
            .unwrap();

        let projection = CountingProjection::new();
        let count_ref = Arc::clone(&projection.count);
        let mut processor = ProjectionProcessor::new(store);
        processor.register(Box::new(projection));

        processor.run_catch_up().await.unwrap();

        assert_eq!(*count_ref.read().await, 3);
    }

    #[tokio::test]
    async fn process_single_event() {
        let store = InMemoryEventStore::new();
        let projection = CountingProjection::new();
        let count_ref = Arc::clone(&projection.count);

        let mut processor = ProjectionProcessor::new(store);
        processor.register(Box::new(projection));

        let event = ledger_event(AggregateId::new(), Version::new(1));
        processor.process_event(&event).await.unwrap();

        assert_eq!(*count_ref.read().await, 1);
    }

    #[tokio::test]
    async fn rebuild_resets_and_replays() {
        let store = InMemoryEventStore::new();
        let agg_id = AggregateId::new();

        let events = vec![
            ledger_event(agg_id, Version::new(1)),
            ledger_event(agg_id, Version::new(2)),
        ];
        store
            .append(events, event_store::AppendOptions::new())
            .await
            .unwrap();

        let projection = CountingProjection::new();
        let count_ref = Arc::clone(&projection.count);
        let pos_ref = Arc::clone(&projection.position);

        let mut processor = ProjectionProcessor::new(store);
        processor.register(Box::new(projection));

        processor.run_catch_up().await.unwrap();
        assert_eq!(*count_ref.read().await, 2);

        processor.rebuild_all().await.unwrap();
        assert_eq!(*count_ref.read().await, 2);
        assert_eq!(pos_ref.read().await.events_processed, 2);
    }

    #[tokio::test]
    async fn catch_up_skips_already_processed() {
        let store = InMemoryEventStore::new();
        let agg_id = AggregateId::new();

        let events = vec![
            ledger_event(agg_id, Version::new(1)),
            ledger_event(agg_id, Version::new(2)),
            ledger_event(agg_id, Version::new(3)),
        ];
        store
            .append(events, event_store::AppendOptions::new())
            .await
            .unwrap();

        let projection = CountingProjection::new();
        let count_ref = Arc::clone(&projection.count);

        let mut processor = ProjectionProcessor::new(store);
        processor.register(Box::new(projection));

        processor.run_catch_up().await.unwrap();
        assert_eq!(*count_ref.read().await, 3);

        // Second catch-up should not re-process
        processor.run_catch_up().await.unwrap();
        assert_eq!(*count_ref.read().await, 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_catch_ups_deliver_each_event_once() {
        let store = InMemoryEventStore::new();
        let agg_id = AggregateId::new();

        let events: Vec<_> = (1..=100)
            .map(|v| ledger_event(agg_id, Version::new(v)))
            .collect();
        store
            .append(events, event_store::AppendOptions::new())
            .await
            .unwrap();

        let projection = CountingProjection::new();
        let count_ref = Arc::clone(&projection.count);
        let mut processor = ProjectionProcessor::new(store);
        processor.register(Box::new(projection));
        let processor = Arc::new(processor);

        // Unserialized replays would both pass the position check for
        // the same event and deliver it twice.
        let first = tokio::spawn({
            let processor = Arc::clone(&processor);
            async move { processor.run_catch_up().await }
        });
        let second = tokio::spawn({
            let processor = Arc::clone(&processor);
            async move { processor.run_catch_up().await }
        });
        first.await.unwrap().unwrap();
        second.await.unwrap().unwrap();

        assert_eq!(*count_ref.read().await, 100);
    }

    #[tokio::test]
    async fn empty_store_catch_up() {
        let store = InMemoryEventStore::new();
        let projection = CountingProjection::new();
        let count_ref = Arc::clone(&projection.count);

        let mut processor = ProjectionProcessor::new(store);
        processor.register(Box::new(projection));

        processor.run_catch_up().await.unwrap();
        assert_eq!(*count_ref.read().await, 0);
    }

    #[tokio::test]
    async fn multiple_projections_each_see_every_event() {
        let store = InMemoryEventStore::new();
        let agg_id = AggregateId::new();

        let events = vec![
            ledger_event(agg_id, Version::new(1)),
            ledger_event(agg_id, Version::new(2)),
        ];
        store
            .append(events, event_store::AppendOptions::new())
            .await
            .unwrap();

        let proj1 = CountingProjection::new();
        let proj2 = CountingProjection::new();
        let count1 = Arc::clone(&proj1.count);
        let count2 = Arc::clone(&proj2.count);

        let mut processor = ProjectionProcessor::new(store);
        processor.register(Box::new(proj1));
        processor.register(Box::new(proj2));

        processor.run_catch_up().await.unwrap();

        assert_eq!(*count1.read().await, 2);
        assert_eq!(*count2.read().await, 2);
    }
}
