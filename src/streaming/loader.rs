//! Background chunk building with priority-based concurrent workers

use crate::core::error::Error;
use crate::core::types::Result;
use crate::streaming::chunk::{ChunkBuilder, ChunkData};
use crate::streaming::coord::ChunkCoord;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Runtime;
use tokio::sync::mpsc;

/// Request to build a chunk with priority
#[derive(Debug, Clone)]
pub struct LoadRequest {
    pub coord: ChunkCoord,
    pub priority: f32,
}

/// Result of a background chunk build
#[derive(Debug)]
pub enum LoadResult {
    /// CPU data ready for upload
    Built(ChunkData),
    /// The build task died
    Failed(ChunkCoord, String),
}

impl LoadResult {
    pub fn coord(&self) -> ChunkCoord {
        match self {
            LoadResult::Built(data) => data.coord,
            LoadResult::Failed(coord, _) => *coord,
        }
    }
}

/// What the worker reports back for each request it took
#[derive(Debug)]
enum WorkerEvent {
    /// The build ran to completion
    Finished(LoadResult),
    /// The request was cancelled before its build started
    Dropped(ChunkCoord),
}

type CancelSet = Arc<Mutex<HashSet<ChunkCoord>>>;

fn lock(set: &CancelSet) -> MutexGuard<'_, HashSet<ChunkCoord>> {
    set.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Concurrent chunk builder running on a dedicated tokio runtime.
///
/// Builds are CPU bound and run on the runtime's blocking pool; the async
/// side only schedules them and hands results back over a channel.
///
/// A coordinate is sent to the worker at most once until the worker answers
/// for it. Cancelling a queued request removes it from the worker's queue
/// before it starts; a build that already started runs to completion and
/// its result is still returned.
pub struct ChunkLoader {
    /// Channel for sending build requests to the worker task
    request_tx: mpsc::UnboundedSender<LoadRequest>,
    /// Channel for receiving worker events
    event_rx: mpsc::UnboundedReceiver<WorkerEvent>,
    /// Wanted coordinates and the priority they were requested with
    pending: HashMap<ChunkCoord, f32>,
    /// Coordinates the worker holds and has not answered for yet
    in_flight: HashSet<ChunkCoord>,
    /// Cancelled coordinates, shared with the worker
    cancelled: CancelSet,
    runtime: Option<Runtime>,
}

impl ChunkLoader {
    /// Create a loader with its own runtime
    ///
    /// # Arguments
    /// * `builder` - Chunk builder shared by every task
    /// * `max_concurrent` - Maximum number of builds in flight
    pub fn new(builder: ChunkBuilder, max_concurrent: usize) -> Result<Self> {
        let (request_tx, mut request_rx) = mpsc::unbounded_channel::<LoadRequest>();
        let (event_tx, event_rx) = mpsc::unbounded_channel::<WorkerEvent>();
        let cancelled: CancelSet = Arc::new(Mutex::new(HashSet::new()));

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(max_concurrent.max(1))
            .thread_name("skyscape-chunk-loader")
            .build()
            .map_err(|e| Error::Streaming(format!("failed to start chunk loader runtime: {e}")))?;

        let max_concurrent = max_concurrent.max(1);
        let worker_cancelled = cancelled.clone();
        runtime.spawn(async move {
            Self::worker_loop(builder, max_concurrent, &mut request_rx, event_tx, worker_cancelled).await;
        });

        log::info!("Chunk loader started ({} concurrent builds)", max_concurrent);

        Ok(Self {
            request_tx,
            event_rx,
            pending: HashMap::new(),
            in_flight: HashSet::new(),
            cancelled,
            runtime: Some(runtime),
        })
    }

    /// Worker loop that schedules build requests with concurrency control
    async fn worker_loop(
        builder: ChunkBuilder,
        max_concurrent: usize,
        request_rx: &mut mpsc::UnboundedReceiver<LoadRequest>,
        event_tx: mpsc::UnboundedSender<WorkerEvent>,
        cancelled: CancelSet,
    ) {
        use tokio::task::JoinSet;

        let mut active_tasks: JoinSet<LoadResult> = JoinSet::new();
        let mut queued: Vec<LoadRequest> = Vec::new();
        let mut open = true;

        loop {
            if !open && queued.is_empty() && active_tasks.is_empty() {
                break;
            }

            tokio::select! {
                request = request_rx.recv(), if open => {
                    match request {
                        Some(request) => queued.push(request),
                        None => open = false,
                    }
                }

                Some(joined) = active_tasks.join_next(), if !active_tasks.is_empty() => {
                    match joined {
                        Ok(result) => {
                            lock(&cancelled).remove(&result.coord());
                            if event_tx.send(WorkerEvent::Finished(result)).is_err() {
                                // Receiver gone: the loader was dropped
                                break;
                            }
                        }
                        Err(e) => log::error!("Chunk loader task failed: {}", e),
                    }
                }
            }

            // Drop cancelled requests before they take a slot
            if !queued.is_empty() {
                let mut dropped = Vec::new();
                {
                    let mut cancelled = lock(&cancelled);
                    queued.retain(|r| {
                        let cancel = cancelled.remove(&r.coord);
                        if cancel {
                            dropped.push(r.coord);
                        }
                        !cancel
                    });
                }
                for coord in dropped {
                    log::trace!("Dropped cancelled build of chunk {}", coord);
                    if event_tx.send(WorkerEvent::Dropped(coord)).is_err() {
                        return;
                    }
                }
            }

            // Start new tasks if we have capacity, highest priority first
            if active_tasks.len() < max_concurrent && !queued.is_empty() {
                queued.sort_by(|a, b| b.priority.total_cmp(&a.priority));
                while active_tasks.len() < max_concurrent && !queued.is_empty() {
                    let request = queued.remove(0);
                    let builder = builder.clone();
                    active_tasks.spawn(async move { Self::build_task(builder, request.coord).await });
                }
            }
        }
    }

    /// Task that builds a single chunk on the blocking pool
    async fn build_task(builder: ChunkBuilder, coord: ChunkCoord) -> LoadResult {
        match tokio::task::spawn_blocking(move || builder.build(coord)).await {
            Ok(data) => LoadResult::Built(data),
            Err(e) => LoadResult::Failed(coord, e.to_string()),
        }
    }

    /// Request a chunk to be built
    ///
    /// Returns `false` if the chunk is already pending, `true` if it is now.
    /// A coordinate the worker still holds from an earlier, cancelled request
    /// is revived instead of being sent again.
    pub fn request(&mut self, coord: ChunkCoord, priority: f32) -> bool {
        if self.pending.contains_key(&coord) {
            return false;
        }

        if self.in_flight.contains(&coord) {
            lock(&self.cancelled).remove(&coord);
        } else if !self.send(coord, priority) {
            return false;
        }
        self.pending.insert(coord, priority);
        true
    }

    fn send(&mut self, coord: ChunkCoord, priority: f32) -> bool {
        if self.request_tx.send(LoadRequest { coord, priority }).is_err() {
            log::error!("Chunk loader worker stopped; dropping request for {}", coord);
            return false;
        }
        self.in_flight.insert(coord);
        true
    }

    /// Poll for completed builds (non-blocking)
    ///
    /// Results of builds that were cancelled after they started are returned
    /// as well; the caller decides whether they are still wanted.
    pub fn poll_results(&mut self) -> Vec<LoadResult> {
        let mut results = Vec::new();

        while let Ok(event) = self.event_rx.try_recv() {
            match event {
                WorkerEvent::Finished(result) => {
                    let coord = result.coord();
                    self.in_flight.remove(&coord);
                    lock(&self.cancelled).remove(&coord);
                    self.pending.remove(&coord);
                    results.push(result);
                }
                WorkerEvent::Dropped(coord) => {
                    self.in_flight.remove(&coord);
                    // Wanted again after the worker already dropped it
                    if let Some(&priority) = self.pending.get(&coord) {
                        if !self.send(coord, priority) {
                            self.pending.remove(&coord);
                        }
                    }
                }
            }
        }

        results
    }

    /// Number of requested chunks not yet returned
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Number of coordinates the worker has not answered for, including
    /// cancelled ones
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Check if a specific chunk is currently pending
    pub fn is_pending(&self, coord: ChunkCoord) -> bool {
        self.pending.contains_key(&coord)
    }

    /// Withdraw a pending request
    pub fn cancel(&mut self, coord: ChunkCoord) {
        if self.pending.remove(&coord).is_some() && self.in_flight.contains(&coord) {
            lock(&self.cancelled).insert(coord);
        }
    }

    /// Withdraw every pending request for which `keep` returns false
    pub fn retain_pending(&mut self, keep: impl Fn(ChunkCoord) -> bool) {
        let stale: Vec<ChunkCoord> = self.pending.keys().copied().filter(|c| !keep(*c)).collect();
        for coord in stale {
            self.cancel(coord);
        }
    }
}

impl Drop for ChunkLoader {
    fn drop(&mut self) {
        // Don't wait for builds still on the blocking pool
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clutter::{ClutterConfig, ScatterGenerator};
    use crate::terrain::HeightField;
    use std::time::{Duration, Instant};

    fn loader() -> ChunkLoader {
        loader_with(16, 2)
    }

    fn loader_with(chunk_size: u32, max_concurrent: usize) -> ChunkLoader {
        let field = Arc::new(HeightField::default());
        let scatter = Arc::new(ScatterGenerator::new(ClutterConfig::default(), 1));
        ChunkLoader::new(ChunkBuilder::new(field, scatter, chunk_size), max_concurrent).unwrap()
    }

    fn built_coords(results: &[LoadResult]) -> Vec<ChunkCoord> {
        results
            .iter()
            .filter_map(|r| match r {
                LoadResult::Built(data) => Some(data.coord),
                LoadResult::Failed(..) => None,
            })
            .collect()
    }

    fn wait_for(loader: &mut ChunkLoader, count: usize) -> Vec<LoadResult> {
        let deadline = Instant::now() + Duration::from_secs(30);
        let mut results = Vec::new();
        while results.len() < count && Instant::now() < deadline {
            results.extend(loader.poll_results());
            std::thread::sleep(Duration::from_millis(5));
        }
        results
    }

    #[test]
    fn test_pending_tracking() {
        let mut loader = loader();
        let coord = ChunkCoord::new(5, 10);

        // First request should succeed
        assert!(loader.request(coord, 1.0));
        assert!(loader.is_pending(coord));

        // Second request for same chunk should fail
        assert!(!loader.request(coord, 2.0));
        assert_eq!(loader.pending_count(), 1);
    }

    #[test]
    fn test_cancel() {
        let mut loader = loader();
        let coord = ChunkCoord::new(1, 2);
        loader.request(coord, 1.0);

        assert!(loader.is_pending(coord));
        loader.cancel(coord);
        assert!(!loader.is_pending(coord));
    }

    #[test]
    fn test_builds_complete() {
        let mut loader = loader();
        let coords = [ChunkCoord::new(0, 0), ChunkCoord::new(1, 0), ChunkCoord::new(0, -1)];
        for (i, c) in coords.iter().enumerate() {
            assert!(loader.request(*c, 1.0 / (i as f32 + 1.0)));
        }

        let results = wait_for(&mut loader, coords.len());
        assert_eq!(results.len(), coords.len());
        for result in &results {
            match result {
                LoadResult::Built(data) => {
                    assert!(coords.contains(&data.coord));
                    assert_eq!(data.mesh.vertices.len(), 17 * 17);
                }
                LoadResult::Failed(coord, e) => panic!("build of {coord} failed: {e}"),
            }
        }
        assert_eq!(loader.pending_count(), 0);
    }

    #[test]
    fn test_cancelled_requests_are_never_built() {
        // One slot and a large chunk: the first build keeps the rest queued
        let mut loader = loader_with(256, 1);
        let keep = ChunkCoord::new(0, 0);
        assert!(loader.request(keep, 10.0));

        let dropped: Vec<ChunkCoord> = (1..10).map(|i| ChunkCoord::new(i, 0)).collect();
        for c in &dropped {
            assert!(loader.request(*c, 1.0));
        }
        loader.retain_pending(|c| c == keep);
        assert_eq!(loader.pending_count(), 1);

        let mut results = wait_for(&mut loader, 1);
        let deadline = Instant::now() + Duration::from_secs(30);
        while loader.in_flight_count() > 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
            results.extend(loader.poll_results());
        }
        std::thread::sleep(Duration::from_millis(200));
        results.extend(loader.poll_results());

        assert_eq!(built_coords(&results), vec![keep]);
        assert_eq!(loader.in_flight_count(), 0);
        assert_eq!(loader.pending_count(), 0);
    }

    #[test]
    fn test_rerequest_while_in_flight_builds_once() {
        let mut loader = loader_with(64, 1);
        let coord = ChunkCoord::new(3, -4);

        assert!(loader.request(coord, 1.0));
        loader.cancel(coord);
        assert!(!loader.is_pending(coord));

        // Still held by the worker: revived, not sent again
        assert!(loader.request(coord, 1.0));
        assert_eq!(loader.in_flight_count(), 1);

        let mut results = wait_for(&mut loader, 1);
        std::thread::sleep(Duration::from_millis(200));
        results.extend(loader.poll_results());

        assert_eq!(built_coords(&results), vec![coord]);
        assert_eq!(loader.pending_count(), 0);
        assert_eq!(loader.in_flight_count(), 0);
    }
}
