//! Background execution of crop requests.
//!
//! The engine borrows a runtime from its caller instead of owning a thread
//! pool. Each request runs on a blocking worker and reports exactly once
//! through a [`CropHandle`], after all I/O and metadata work has finished.

use std::io;
use std::sync::Weak;

use serde::{Deserialize, Serialize};
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::error::{CropError, Result};
use crate::model::CropResult;
use crate::pipeline::{crop_image, CropRequest};
use crate::storage::Storage;

/// Receives the outcome of a crop request.
pub trait CropCallback {
    fn on_cropped(&self, result: &CropResult);
    fn on_crop_failed(&self, error: &CropError);
}

/// Worker runtime settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Threads available to crop workers.
    pub worker_threads: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { worker_threads: 1 }
    }
}

impl EngineConfig {
    /// Build a runtime sized for crop work. The caller owns and shuts it down.
    pub fn build_runtime(&self) -> io::Result<Runtime> {
        let threads = self.worker_threads.max(1);
        Builder::new_multi_thread()
            .worker_threads(threads)
            .max_blocking_threads(threads)
            .thread_name("crop-worker")
            .build()
    }
}

/// Pending outcome of one crop request.
#[derive(Debug)]
pub struct CropHandle {
    receiver: oneshot::Receiver<Result<CropResult>>,
}

impl CropHandle {
    /// Wait for the outcome.
    pub async fn wait(self) -> Result<CropResult> {
        self.receiver.await.unwrap_or_else(|_| Err(worker_lost()))
    }

    /// Wait from a thread outside the runtime.
    pub fn blocking_wait(self) -> Result<CropResult> {
        self.receiver.blocking_recv().unwrap_or_else(|_| Err(worker_lost()))
    }

    /// Wait, then hand the outcome to `callback` on the awaiting task.
    pub async fn deliver<C: CropCallback + ?Sized>(self, callback: &C) {
        match self.wait().await {
            Ok(result) => callback.on_cropped(&result),
            Err(error) => callback.on_crop_failed(&error),
        }
    }
}

fn worker_lost() -> CropError {
    CropError::ContextGone("crop worker stopped without reporting".to_string())
}

/// Runs crop requests on a caller-supplied runtime.
#[derive(Debug, Clone)]
pub struct CropEngine {
    runtime: Handle,
}

impl CropEngine {
    /// Engine that spawns its workers on `runtime`.
    pub fn new(runtime: Handle) -> Self {
        Self { runtime }
    }

    /// Start a crop. The storage is only borrowed while the worker does I/O.
    pub fn crop(&self, request: CropRequest, storage: Weak<dyn Storage>) -> CropHandle {
        let (sender, receiver) = oneshot::channel();
        self.runtime.spawn_blocking(move || {
            let outcome = crop_image(request, &storage);
            match &outcome {
                Ok(result) => info!(
                    output = %result.output,
                    width = result.width,
                    height = result.height,
                    copied = result.copied,
                    "Crop finished"
                ),
                Err(error) => warn!(kind = ?error.kind(), %error, "Crop failed"),
            }
            // Nobody is listening if the handle was dropped
            let _ = sender.send(outcome);
        });
        CropHandle { receiver }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::Bitmap;
    use crate::error::CropErrorKind;
    use crate::geometry::{Affine, Rect};
    use crate::model::{CropParameters, ImageState, Location};
    use crate::storage::MemoryStorage;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<std::result::Result<(u32, u32), CropErrorKind>>>,
    }

    impl CropCallback for Recorder {
        fn on_cropped(&self, result: &CropResult) {
            self.events.lock().unwrap().push(Ok((result.width, result.height)));
        }

        fn on_crop_failed(&self, error: &CropError) {
            self.events.lock().unwrap().push(Err(error.kind()));
        }
    }

    fn request() -> CropRequest {
        let image = Rect::new(0.0, 0.0, 64.0, 48.0);
        let crop = Rect::new(8.0, 8.0, 40.0, 40.0);
        CropRequest::new(
            Bitmap::filled(64, 48, [200, 100, 50, 255]),
            ImageState::new(crop, image, Affine::identity(), 1.0, 0.0),
            CropParameters::new(
                Location::Content("mem://in".to_string()),
                Some(Location::Content("mem://out".to_string())),
            ),
        )
    }

    #[tokio::test]
    async fn test_crop_reports_once_to_callback() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let engine = CropEngine::new(Handle::current());
        let recorder = Recorder::default();

        engine
            .crop(request(), Arc::downgrade(&storage))
            .deliver(&recorder)
            .await;

        let events = recorder.events.lock().unwrap();
        assert_eq!(events.as_slice(), &[Ok((32, 32))]);
    }

    #[tokio::test]
    async fn test_failure_reaches_callback() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let weak = Arc::downgrade(&storage);
        drop(storage);

        let recorder = Recorder::default();
        CropEngine::new(Handle::current())
            .crop(request(), weak)
            .deliver(&recorder)
            .await;

        let events = recorder.events.lock().unwrap();
        assert_eq!(events.as_slice(), &[Err(CropErrorKind::ContextGone)]);
    }

    #[test]
    fn test_blocking_wait_on_built_runtime() {
        let runtime = EngineConfig { worker_threads: 2 }.build_runtime().unwrap();
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let engine = CropEngine::new(runtime.handle().clone());

        let result = engine.crop(request(), Arc::downgrade(&storage)).blocking_wait().unwrap();
        assert_eq!((result.width, result.height), (32, 32));
        assert!(!result.copied);
    }

    #[test]
    fn test_dropped_sender_maps_to_context_gone() {
        let (sender, receiver) = oneshot::channel::<Result<CropResult>>();
        drop(sender);
        let err = CropHandle { receiver }.blocking_wait().unwrap_err();
        assert_eq!(err.kind(), CropErrorKind::ContextGone);
    }

    #[test]
    fn test_default_config() {
        assert_eq!(EngineConfig::default().worker_threads, 1);
    }
}
