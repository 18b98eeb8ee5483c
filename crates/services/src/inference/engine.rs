use std::sync::Arc;

use async_trait::async_trait;
use image::imageops::{self, FilterType};
use tracing::{debug, info, warn};

use lingo_core::model::{ModelOutput, Prediction};

use super::frame::Frame;
use super::model::{ModelArtifact, ModelSource};
use crate::error::{InferenceError, ModelLoadError};

//
// ─── INPUT TENSOR ──────────────────────────────────────────────────────────────
//

/// NHWC `int32` input with a batch of one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputTensor {
    shape: [usize; 4],
    data: Vec<i32>,
}

impl InputTensor {
    #[must_use]
    pub fn shape(&self) -> [usize; 4] {
        self.shape
    }

    #[must_use]
    pub fn data(&self) -> &[i32] {
        &self.data
    }

    #[must_use]
    pub fn into_data(self) -> Vec<i32> {
        self.data
    }
}

/// Resizes a frame to the model's square input and casts it to `int32`.
///
/// # Errors
///
/// Returns `InferenceError::EmptyFrame` for a zero-sized frame.
pub fn preprocess(frame: &Frame, edge: u32) -> Result<InputTensor, InferenceError> {
    if frame.width() == 0 || frame.height() == 0 || edge == 0 {
        return Err(InferenceError::EmptyFrame);
    }
    // Triangle is bilinear interpolation.
    let resized = imageops::resize(frame.pixels(), edge, edge, FilterType::Triangle);
    let side = edge as usize;
    let data = resized.into_raw().into_iter().map(i32::from).collect();
    Ok(InputTensor {
        shape: [1, side, side, 3],
        data,
    })
}

//
// ─── BACKEND ───────────────────────────────────────────────────────────────────
//

/// Opaque handle to a tensor living in backend (accelerator) memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TensorHandle(pub u64);

/// Runtime that owns the model weights and tensor memory.
///
/// Every handle returned by `upload` or `execute` must eventually be passed
/// to `release`, otherwise accelerator memory leaks.
#[async_trait]
pub trait TensorBackend: Send + Sync {
    /// Load weights and compile the graph described by the artifact.
    async fn prepare(&self, artifact: &ModelArtifact) -> Result<(), ModelLoadError>;

    fn upload(&self, input: InputTensor) -> Result<TensorHandle, InferenceError>;

    /// Runs the graph, returning the boxes, classes and scores tensors in that order.
    async fn execute(&self, input: TensorHandle) -> Result<[TensorHandle; 3], InferenceError>;

    /// Copies a tensor back to host memory, batch dimension flattened.
    async fn read(&self, handle: TensorHandle) -> Result<Vec<f32>, InferenceError>;

    fn release(&self, handle: TensorHandle);
}

/// Tracks tensors created during one inference call and releases them on drop.
pub struct TensorScope<'a, B: TensorBackend + ?Sized> {
    backend: &'a B,
    handles: Vec<TensorHandle>,
}

impl<'a, B: TensorBackend + ?Sized> TensorScope<'a, B> {
    #[must_use]
    pub fn new(backend: &'a B) -> Self {
        Self {
            backend,
            handles: Vec::with_capacity(4),
        }
    }

    pub fn track(&mut self, handle: TensorHandle) -> TensorHandle {
        self.handles.push(handle);
        handle
    }
}

impl<B: TensorBackend + ?Sized> Drop for TensorScope<'_, B> {
    fn drop(&mut self) {
        for handle in self.handles.drain(..) {
            self.backend.release(handle);
        }
    }
}

//
// ─── ENGINE ────────────────────────────────────────────────────────────────────
//

/// Identity of the loaded model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelHandle {
    pub url: String,
    pub weight_shards: usize,
}

/// Anything that can turn a frame into ranked predictions.
///
/// The detection loop only depends on this trait, so replays and tests can
/// supply recorded predictions instead of a real model.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// # Errors
    ///
    /// Returns `InferenceError` when the frame could not be classified.
    async fn classify(&self, frame: &Frame) -> Result<Vec<Prediction>, InferenceError>;
}

/// A loaded detection model bound to a tensor backend.
pub struct InferenceEngine<B> {
    backend: B,
    model: ModelHandle,
    input_edge: u32,
}

impl<B: TensorBackend> InferenceEngine<B> {
    /// Fetch the model artifact and prepare it on the backend.
    ///
    /// # Errors
    ///
    /// Returns `ModelLoadError` if the artifact cannot be fetched or the backend
    /// rejects it.
    pub async fn load(
        source: &dyn ModelSource,
        backend: B,
        input_edge: u32,
    ) -> Result<Self, ModelLoadError> {
        let artifact = source.fetch().await?;
        let weight_shards = artifact.weight_urls()?.len();
        backend.prepare(&artifact).await.inspect_err(|err| {
            warn!(error = %err, "backend failed to prepare model");
        })?;

        let model = ModelHandle {
            url: artifact.url().to_string(),
            weight_shards,
        };
        info!(url = %model.url, shards = weight_shards, "sign detection model ready");
        Ok(Self {
            backend,
            model,
            input_edge,
        })
    }

    #[must_use]
    pub fn model(&self) -> &ModelHandle {
        &self.model
    }

    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Classify one frame.
    ///
    /// Callers must not overlap calls; the detection loop awaits each one
    /// before scheduling the next.
    ///
    /// # Errors
    ///
    /// Returns `InferenceError` for empty frames, backend failures or an
    /// output that does not match the boxes/classes/scores contract.
    pub async fn infer(&self, frame: &Frame) -> Result<Vec<Prediction>, InferenceError> {
        let input = preprocess(frame, self.input_edge)?;
        let mut scope = TensorScope::new(&self.backend);

        let input = scope.track(self.backend.upload(input)?);
        let [boxes, classes, scores] = self.backend.execute(input).await?;
        let boxes = scope.track(boxes);
        let classes = scope.track(classes);
        let scores = scope.track(scores);

        let output = ModelOutput::from_tensors(
            self.backend.read(boxes).await?,
            self.backend.read(classes).await?,
            self.backend.read(scores).await?,
        )?;
        debug!(detections = output.len(), "frame classified");
        Ok(output.predictions())
    }
}

#[async_trait]
impl<B: TensorBackend> Classifier for InferenceEngine<B> {
    async fn classify(&self, frame: &Frame) -> Result<Vec<Prediction>, InferenceError> {
        self.infer(frame).await
    }
}

/// Loads the detection model for the quiz.
///
/// A load failure only disables sign detection, so it is logged and mapped
/// to `None` for [`crate::QuizOrchestrator::with_classifier`].
pub async fn load_classifier<B>(
    source: &dyn ModelSource,
    backend: B,
    input_edge: u32,
) -> Option<Arc<dyn Classifier>>
where
    B: TensorBackend + 'static,
{
    match InferenceEngine::load(source, backend, input_edge).await {
        Ok(engine) => Some(Arc::new(engine)),
        Err(err) => {
            warn!(error = %err, "sign detection unavailable");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::model::StaticModelSource;
    use image::RgbImage;
    use lingo_core::model::ClassId;
    use lingo_core::time::fixed_now;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU64, Ordering};
    use url::Url;

    #[derive(Default)]
    struct CountingBackend {
        next: AtomicU64,
        live: Mutex<HashMap<TensorHandle, Vec<f32>>>,
        fail_execute: bool,
        reject_model: bool,
        classes: Vec<f32>,
        scores: Vec<f32>,
        last_input_shape: Mutex<Option<[usize; 4]>>,
    }

    impl CountingBackend {
        fn alloc(&self, data: Vec<f32>) -> TensorHandle {
            let handle = TensorHandle(self.next.fetch_add(1, Ordering::SeqCst));
            self.live.lock().unwrap().insert(handle, data);
            handle
        }

        fn live_count(&self) -> usize {
            self.live.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl TensorBackend for CountingBackend {
        async fn prepare(&self, _artifact: &ModelArtifact) -> Result<(), ModelLoadError> {
            if self.reject_model {
                return Err(ModelLoadError::Backend("unsupported op".into()));
            }
            Ok(())
        }

        fn upload(&self, input: InputTensor) -> Result<TensorHandle, InferenceError> {
            *self.last_input_shape.lock().unwrap() = Some(input.shape());
            Ok(self.alloc(Vec::new()))
        }

        async fn execute(&self, _input: TensorHandle) -> Result<[TensorHandle; 3], InferenceError> {
            if self.fail_execute {
                return Err(InferenceError::Backend("device lost".into()));
            }
            let n = self.scores.len();
            Ok([
                self.alloc(vec![0.0; n * 4]),
                self.alloc(self.classes.clone()),
                self.alloc(self.scores.clone()),
            ])
        }

        async fn read(&self, handle: TensorHandle) -> Result<Vec<f32>, InferenceError> {
            self.live
                .lock()
                .unwrap()
                .get(&handle)
                .cloned()
                .ok_or_else(|| InferenceError::Backend("released".into()))
        }

        fn release(&self, handle: TensorHandle) {
            self.live.lock().unwrap().remove(&handle);
        }
    }

    fn source() -> StaticModelSource {
        let manifest = r#"{"modelTopology": {}, "weightsManifest": [{"paths": ["w.bin"]}]}"#;
        let url = Url::parse("https://models.example.com/model.json").unwrap();
        StaticModelSource::new(ModelArtifact::from_manifest_json(url, manifest.as_bytes()).unwrap())
    }

    fn frame() -> Frame {
        Frame::new(RgbImage::from_pixel(64, 48, image::Rgb([10, 20, 30])), fixed_now())
    }

    #[test]
    fn preprocess_resizes_and_casts() {
        let tensor = preprocess(&frame(), 32).unwrap();
        assert_eq!(tensor.shape(), [1, 32, 32, 3]);
        assert_eq!(tensor.data().len(), 32 * 32 * 3);
        assert_eq!(&tensor.data()[..3], &[10, 20, 30]);

        let empty = Frame::new(RgbImage::new(0, 0), fixed_now());
        assert!(matches!(preprocess(&empty, 32), Err(InferenceError::EmptyFrame)));
    }

    #[tokio::test]
    async fn infer_returns_ranked_predictions_and_releases_tensors() {
        let backend = CountingBackend {
            classes: vec![2.0, 1.0],
            scores: vec![0.3, 0.9],
            ..Default::default()
        };
        let engine = InferenceEngine::load(&source(), backend, 320).await.unwrap();
        assert_eq!(engine.model().weight_shards, 1);

        let preds = engine.infer(&frame()).await.unwrap();
        assert_eq!(preds[0].class_id, Some(ClassId::new(1)));
        assert_eq!(preds.len(), 2);
        assert_eq!(engine.backend().live_count(), 0);
        assert_eq!(
            *engine.backend().last_input_shape.lock().unwrap(),
            Some([1, 320, 320, 3])
        );
    }

    #[tokio::test]
    async fn rejected_model_disables_detection() {
        let rejecting = || CountingBackend {
            reject_model: true,
            ..Default::default()
        };
        assert!(matches!(
            InferenceEngine::load(&source(), rejecting(), 16).await,
            Err(ModelLoadError::Backend(_))
        ));
        assert!(load_classifier(&source(), rejecting(), 16).await.is_none());
        assert!(load_classifier(&source(), CountingBackend::default(), 16).await.is_some());
    }

    #[tokio::test]
    async fn failed_execute_still_releases_input() {
        let backend = CountingBackend {
            fail_execute: true,
            ..Default::default()
        };
        let engine = InferenceEngine::load(&source(), backend, 16).await.unwrap();
        assert!(matches!(
            engine.infer(&frame()).await,
            Err(InferenceError::Backend(_))
        ));
        assert_eq!(engine.backend().live_count(), 0);
    }

    #[tokio::test]
    async fn malformed_output_releases_everything() {
        let backend = CountingBackend {
            classes: vec![1.0],
            scores: vec![0.5, 0.4],
            ..Default::default()
        };
        let engine = InferenceEngine::load(&source(), backend, 16).await.unwrap();
        assert!(matches!(
            engine.classify(&frame()).await,
            Err(InferenceError::OutputShape(_))
        ));
        assert_eq!(engine.backend().live_count(), 0);
    }
}
