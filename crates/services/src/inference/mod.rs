mod engine;
mod frame;
mod model;
mod scripted;

pub use engine::{
    Classifier, InferenceEngine, InputTensor, ModelHandle, TensorBackend, TensorHandle,
    TensorScope, load_classifier, preprocess,
};
pub use frame::{Frame, FramePublisher, FrameSource, StillFrameSource, WatchFrameSource, frame_channel};
pub use model::{
    DEFAULT_MODEL_URL, HttpModelSource, ModelArtifact, ModelConfig, ModelManifest, ModelSource,
    StaticModelSource, WeightSpec, WeightsGroup,
};
pub use scripted::{ScriptStep, ScriptedClassifier, ScriptedPrediction};
