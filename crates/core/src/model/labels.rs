use crate::model::ids::ClassId;

/// Fixed mapping from detector classes to the sign they represent.
const DEFAULT_LABELS: &[(u32, &str)] = &[
    (1, "Hello"),
    (2, "Yes"),
    (3, "No"),
    (4, "Thank you"),
    (5, "I love you"),
];

/// Immutable lookup table from `ClassId` to a human-readable sign name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMap {
    entries: &'static [(u32, &'static str)],
}

impl Default for LabelMap {
    fn default() -> Self {
        Self::asl()
    }
}

impl LabelMap {
    /// The label table the bundled ASL model was trained with.
    #[must_use]
    pub fn asl() -> Self {
        Self {
            entries: DEFAULT_LABELS,
        }
    }

    #[must_use]
    pub fn label(&self, class_id: ClassId) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(id, _)| *id == class_id.value())
            .map(|(_, label)| *label)
    }

    /// Returns true if the class maps to exactly the expected sign text.
    #[must_use]
    pub fn matches(&self, class_id: ClassId, expected: &str) -> bool {
        self.label(class_id).is_some_and(|label| label == expected)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ClassId, &'static str)> + '_ {
        self.entries.iter().map(|(id, label)| (ClassId::new(*id), *label))
    }
}
