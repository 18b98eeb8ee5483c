use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::Deserialize;

use lingo_core::model::{ClassId, Prediction};

use super::engine::Classifier;
use super::frame::Frame;
use crate::error::InferenceError;

/// One recorded classifier reply.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ScriptStep {
    Predictions(Vec<ScriptedPrediction>),
    Failure { error: String },
}

/// Raw class/score pair as recorded from the model, NaN allowed via `null`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ScriptedPrediction {
    pub class: Option<f32>,
    pub score: f32,
}

impl ScriptedPrediction {
    fn into_prediction(self) -> Prediction {
        Prediction::from_raw(self.class.unwrap_or(f32::NAN), self.score)
    }
}

/// Replays a fixed sequence of classifier replies, then repeats the last one.
#[derive(Debug, Default)]
pub struct ScriptedClassifier {
    steps: Mutex<VecDeque<ScriptStep>>,
    last: Mutex<Option<ScriptStep>>,
}

impl ScriptedClassifier {
    #[must_use]
    pub fn new(steps: impl IntoIterator<Item = ScriptStep>) -> Self {
        Self {
            steps: Mutex::new(steps.into_iter().collect()),
            last: Mutex::new(None),
        }
    }

    /// A classifier that sees the same class with the given score on every frame.
    #[must_use]
    pub fn constant(class_id: ClassId, score: f32) -> Self {
        Self::new([ScriptStep::Predictions(vec![ScriptedPrediction {
            class: Some(class_id.value() as f32),
            score,
        }])])
    }

    fn next_step(&self) -> Result<Option<ScriptStep>, InferenceError> {
        let mut steps = self
            .steps
            .lock()
            .map_err(|e| InferenceError::Backend(e.to_string()))?;
        let mut last = self
            .last
            .lock()
            .map_err(|e| InferenceError::Backend(e.to_string()))?;
        if let Some(step) = steps.pop_front() {
            *last = Some(step);
        }
        Ok(last.clone())
    }
}

#[async_trait]
impl Classifier for ScriptedClassifier {
    async fn classify(&self, _frame: &Frame) -> Result<Vec<Prediction>, InferenceError> {
        match self.next_step()? {
            None => Ok(Vec::new()),
            Some(ScriptStep::Predictions(preds)) => Ok(preds
                .into_iter()
                .map(ScriptedPrediction::into_prediction)
                .collect()),
            Some(ScriptStep::Failure { error }) => Err(InferenceError::Backend(error)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::frame::{FrameSource, StillFrameSource};
    use lingo_core::time::fixed_now;

    #[tokio::test]
    async fn replays_then_repeats_last_step() {
        let json = r#"[
            [{"class": 2, "score": 0.7}],
            {"error": "timeout"},
            [{"class": null, "score": 0.9}, {"class": 1, "score": 0.8}]
        ]"#;
        let steps: Vec<ScriptStep> = serde_json::from_str(json).unwrap();
        let classifier = ScriptedClassifier::new(steps);
        let frame = StillFrameSource::blank(4, 4, fixed_now()).latest_frame().unwrap();

        let first = classifier.classify(&frame).await.unwrap();
        assert_eq!(first[0].class_id, Some(ClassId::new(2)));
        assert!(classifier.classify(&frame).await.is_err());
        let third = classifier.classify(&frame).await.unwrap();
        assert_eq!(third[0].class_id, None);
        let repeated = classifier.classify(&frame).await.unwrap();
        assert_eq!(repeated, third);
    }
}
