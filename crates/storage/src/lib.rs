#![forbid(unsafe_code)]

pub mod repository;

pub use repository::{
    ChallengeProgressRepository, HeartsOutcome, HeartsRepository, InMemoryRepository,
    ProgressOutcome, Storage, StorageError, UserProgress, UserProgressRepository,
};
