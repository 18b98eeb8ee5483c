use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::ClassId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum OutputShapeError {
    #[error("boxes tensor has {len} values, expected a multiple of 4")]
    RaggedBoxes { len: usize },

    #[error("model output disagrees on detection count: boxes={boxes} classes={classes} scores={scores}")]
    CountMismatch {
        boxes: usize,
        classes: usize,
        scores: usize,
    },
}

//
// ─── PREDICTION ────────────────────────────────────────────────────────────────
//

/// A single class/confidence pair produced by one model invocation.
///
/// `class_id` is `None` when the model emitted a value that does not map to a
/// class (NaN, fractional, negative).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub class_id: Option<ClassId>,
    pub score: f32,
}

impl Prediction {
    #[must_use]
    pub fn new(class_id: ClassId, score: f32) -> Self {
        Self {
            class_id: Some(class_id),
            score,
        }
    }

    #[must_use]
    pub fn from_raw(raw_class: f32, score: f32) -> Self {
        Self {
            class_id: ClassId::from_raw(raw_class),
            score,
        }
    }
}

/// Returns the highest scoring prediction that carries a valid class id.
///
/// Predictions with a NaN score are never selected.
#[must_use]
pub fn best_prediction(predictions: &[Prediction]) -> Option<(ClassId, f32)> {
    predictions
        .iter()
        .filter_map(|p| match p.class_id {
            Some(id) if !p.score.is_nan() => Some((id, p.score)),
            _ => None,
        })
        .max_by(|a, b| a.1.total_cmp(&b.1))
}

//
// ─── MODEL OUTPUT ──────────────────────────────────────────────────────────────
//

/// The three tensors a detection model returns for one frame, validated.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelOutput {
    boxes: Vec<[f32; 4]>,
    classes: Vec<f32>,
    scores: Vec<f32>,
}

impl ModelOutput {
    /// Builds an output from flattened tensors (batch dimension already stripped).
    ///
    /// # Errors
    ///
    /// Returns `OutputShapeError` if the tensors do not describe the same number
    /// of detections.
    pub fn from_tensors(
        boxes: Vec<f32>,
        classes: Vec<f32>,
        scores: Vec<f32>,
    ) -> Result<Self, OutputShapeError> {
        if boxes.len() % 4 != 0 {
            return Err(OutputShapeError::RaggedBoxes { len: boxes.len() });
        }
        let count = boxes.len() / 4;
        if classes.len() != count || scores.len() != count {
            return Err(OutputShapeError::CountMismatch {
                boxes: count,
                classes: classes.len(),
                scores: scores.len(),
            });
        }

        let boxes = boxes
            .chunks_exact(4)
            .map(|c| [c[0], c[1], c[2], c[3]])
            .collect();
        Ok(Self {
            boxes,
            classes,
            scores,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    #[must_use]
    pub fn boxes(&self) -> &[[f32; 4]] {
        &self.boxes
    }

    #[must_use]
    pub fn classes(&self) -> &[f32] {
        &self.classes
    }

    #[must_use]
    pub fn scores(&self) -> &[f32] {
        &self.scores
    }

    /// Pairs each score with its class, sorted by descending score.
    #[must_use]
    pub fn predictions(&self) -> Vec<Prediction> {
        let mut out: Vec<Prediction> = self
            .classes
            .iter()
            .zip(&self.scores)
            .map(|(class, score)| Prediction::from_raw(*class, *score))
            .collect();
        out.sort_by(|a, b| b.score.total_cmp(&a.score));
        out
    }
}
