//! Bounded worker pool for cutout jobs
//!
//! Segmentation is CPU-bound, so every job runs on tokio's blocking pool.
//! A semaphore caps how many run at once and an optional deadline turns a
//! job that does not finish in time into a `SegmentationFailure`. The
//! permit travels with the blocking closure, so a job that outlives its
//! deadline still counts against the cap until it actually stops.

use crate::{
    config::CutoutConfig,
    error::{CutoutError, Result},
    processor::CutoutProcessor,
    types::{CutoutResult, PixelBuffer, SelectionRectangle},
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, warn};

/// Runs cutouts on the blocking pool with bounded concurrency
#[derive(Debug, Clone)]
pub struct CutoutWorkerPool {
    processor: Arc<CutoutProcessor>,
    permits: Arc<Semaphore>,
    capacity: usize,
    timeout: Option<Duration>,
}

impl CutoutWorkerPool {
    /// Pool with a GrabCut processor, sized and timed from `config`
    pub fn new(config: CutoutConfig) -> Result<Self> {
        Ok(Self::with_processor(CutoutProcessor::new(config)?))
    }

    #[must_use]
    pub fn with_processor(processor: CutoutProcessor) -> Self {
        let capacity = processor.config().max_concurrent_jobs.max(1);
        let timeout = processor.config().timeout();
        Self {
            processor: Arc::new(processor),
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
            timeout,
        }
    }

    #[must_use]
    pub fn processor(&self) -> &CutoutProcessor {
        &self.processor
    }

    /// Maximum number of jobs running at once
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots free right now
    #[must_use]
    pub fn available_slots(&self) -> usize {
        self.permits.available_permits()
    }

    /// Validate, segment and composite `buffer`
    ///
    /// # Errors
    /// - Everything [`CutoutProcessor::process_buffer`] returns
    /// - `SegmentationFailure` if the job times out or panics
    pub async fn submit(
        &self,
        buffer: PixelBuffer,
        rect: SelectionRectangle,
    ) -> Result<CutoutResult> {
        let permit = self.acquire().await?;
        let (result, _permit) = self
            .run(permit, move |processor| processor.process_buffer(&buffer, rect))
            .await?;
        result
    }

    /// Cut out the stored image at `path` and replace it on success
    ///
    /// The file is written only after segmentation finished inside the
    /// deadline; a timed-out job never touches storage.
    pub async fn submit_file(
        &self,
        path: impl Into<PathBuf>,
        rect: SelectionRectangle,
    ) -> Result<CutoutResult> {
        let path = path.into();
        self.submit_file_to(path.clone(), path, rect).await
    }

    /// Cut out `input` and write the composite to `output`
    pub async fn submit_file_to(
        &self,
        input: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        rect: SelectionRectangle,
    ) -> Result<CutoutResult> {
        let (input, output) = (input.into(), output.into());
        let permit = self.acquire().await?;

        let (segmented, permit) = self
            .run(permit, move |processor| processor.load_and_process(&input, rect))
            .await?;
        let (mut result, format) = segmented?;

        let processor = Arc::clone(&self.processor);
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            processor
                .persist_result(&mut result, &output, format)
                .map(|()| result)
        })
        .await
        .map_err(|e| CutoutError::Io(std::io::Error::other(format!("storage task failed: {}", e))))?
    }

    async fn acquire(&self) -> Result<OwnedSemaphorePermit> {
        Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| CutoutError::segmentation_failure("worker pool is shut down"))
    }

    /// Run `job` on the blocking pool under the deadline
    ///
    /// The permit is handed back with the job's result so callers can keep
    /// holding it for follow-up work.
    async fn run<T, F>(
        &self,
        permit: OwnedSemaphorePermit,
        job: F,
    ) -> Result<(Result<T>, OwnedSemaphorePermit)>
    where
        T: Send + 'static,
        F: FnOnce(&CutoutProcessor) -> Result<T> + Send + 'static,
    {
        let processor = Arc::clone(&self.processor);
        let handle = tokio::task::spawn_blocking(move || {
            let outcome = job(processor.as_ref());
            (outcome, permit)
        });

        let joined = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, handle).await {
                Ok(joined) => joined,
                Err(_) => {
                    warn!(timeout_ms = limit.as_millis() as u64, "cutout job timed out");
                    return Err(CutoutError::segmentation_failure(format!(
                        "processing did not finish within {} ms",
                        limit.as_millis()
                    )));
                },
            },
            None => handle.await,
        };

        joined
            .inspect(|_| debug!("cutout job finished"))
            .map_err(|e| {
                warn!(error = %e, "cutout job aborted");
                CutoutError::segmentation_failure(format!("processing task failed: {}", e))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        segmentation::{PartitionBackend, SeedOnlyBackend},
        types::{Label, LabelMask},
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct SlowBackend {
        delay: Duration,
        running: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    impl PartitionBackend for SlowBackend {
        fn name(&self) -> &'static str {
            "slow"
        }

        fn refine(
            &self,
            _image: &PixelBuffer,
            rect: &SelectionRectangle,
            _iterations: u32,
            mask: &mut LabelMask,
        ) -> Result<()> {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(self.delay);
            self.running.fetch_sub(1, Ordering::SeqCst);
            mask.fill_rect(rect, Label::ProbableForeground)
        }
    }

    struct PanickingBackend;

    impl PartitionBackend for PanickingBackend {
        fn name(&self) -> &'static str {
            "panicking"
        }

        fn refine(
            &self,
            _image: &PixelBuffer,
            _rect: &SelectionRectangle,
            _iterations: u32,
            _mask: &mut LabelMask,
        ) -> Result<()> {
            panic!("backend exploded");
        }
    }

    fn pool(config: CutoutConfig, backend: Box<dyn PartitionBackend>) -> CutoutWorkerPool {
        CutoutWorkerPool::with_processor(CutoutProcessor::with_backend(config, backend).unwrap())
    }

    fn slow(delay_ms: u64) -> (SlowBackend, Arc<AtomicUsize>) {
        let peak = Arc::new(AtomicUsize::new(0));
        let backend = SlowBackend {
            delay: Duration::from_millis(delay_ms),
            running: Arc::new(AtomicUsize::new(0)),
            peak: Arc::clone(&peak),
        };
        (backend, peak)
    }

    #[tokio::test]
    async fn test_submit_returns_result() {
        let pool = pool(CutoutConfig::default(), Box::new(SeedOnlyBackend));
        let result = pool
            .submit(PixelBuffer::filled(30, 30, [1, 2, 3]), SelectionRectangle::new(0, 0, 10, 10))
            .await
            .unwrap();
        assert_eq!(result.metadata.foreground_pixels, 100);
        assert_eq!(pool.available_slots(), pool.capacity());
    }

    #[tokio::test]
    async fn test_invalid_region_passes_through() {
        let pool = pool(CutoutConfig::default(), Box::new(SeedOnlyBackend));
        let err = pool
            .submit(PixelBuffer::filled(30, 30, [1, 2, 3]), SelectionRectangle::new(0, 0, 5, 5))
            .await
            .unwrap_err();
        assert!(matches!(err, CutoutError::InvalidRegion(_)));
    }

    #[tokio::test]
    async fn test_timeout_maps_to_segmentation_failure() {
        let config = CutoutConfig::builder().timeout_ms(20).build().unwrap();
        let (backend, _) = slow(300);
        let pool = pool(config, Box::new(backend));
        let err = pool
            .submit(PixelBuffer::filled(30, 30, [1, 2, 3]), SelectionRectangle::new(0, 0, 10, 10))
            .await
            .unwrap_err();
        assert!(matches!(err, CutoutError::SegmentationFailure(_)));
        assert!(err.to_string().contains("20 ms"));
    }

    #[tokio::test]
    async fn test_panic_maps_to_segmentation_failure() {
        let pool = pool(CutoutConfig::default(), Box::new(PanickingBackend));
        let err = pool
            .submit(PixelBuffer::filled(30, 30, [1, 2, 3]), SelectionRectangle::new(0, 0, 10, 10))
            .await
            .unwrap_err();
        assert!(matches!(err, CutoutError::SegmentationFailure(_)));
        assert_eq!(pool.available_slots(), pool.capacity());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_is_bounded() {
        let config = CutoutConfig::builder()
            .max_concurrent_jobs(2)
            .timeout_ms(0)
            .build()
            .unwrap();
        let (backend, peak) = slow(50);
        let pool = pool(config, Box::new(backend));

        let jobs: Vec<_> = (0..6)
            .map(|_| {
                let pool = pool.clone();
                tokio::spawn(async move {
                    pool.submit(
                        PixelBuffer::filled(20, 20, [0, 0, 0]),
                        SelectionRectangle::new(0, 0, 10, 10),
                    )
                    .await
                })
            })
            .collect();
        for job in jobs {
            job.await.unwrap().unwrap();
        }
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }
}
