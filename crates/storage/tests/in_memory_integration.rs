use lingo_core::model::{Challenge, ChallengeId, ChallengeKind, Course, CourseId, Hearts, LessonId};
use storage::repository::POINTS_PER_CHALLENGE;
use storage::{
    ChallengeProgressRepository, HeartsOutcome, HeartsRepository, InMemoryRepository,
    ProgressOutcome, Storage, UserProgressRepository,
};

fn sign(id: u64) -> Challenge {
    Challenge::new(
        ChallengeId::new(id),
        LessonId::new(1),
        ChallengeKind::Assist,
        "Hello",
        Vec::new(),
    )
    .unwrap()
}

#[tokio::test]
async fn lesson_played_twice_through_shared_storage() {
    let repo = InMemoryRepository::new();
    repo.insert_course(Course::new(CourseId::new(7), "ASL")).unwrap();
    repo.insert_challenges(&[sign(1), sign(2)]).unwrap();
    let storage = Storage::from_repository(repo.clone());

    storage
        .user_progress
        .upsert_user_progress(CourseId::new(7))
        .await
        .unwrap();

    // First run: one miss, then both signs.
    let missed = storage.hearts.reduce_hearts(ChallengeId::new(1)).await.unwrap();
    assert_eq!(missed, HeartsOutcome::Reduced);
    for id in [1, 2] {
        let outcome = storage
            .challenge_progress
            .upsert_challenge_progress(ChallengeId::new(id))
            .await
            .unwrap();
        assert_eq!(outcome, ProgressOutcome::Committed);
    }

    // Second run is practice: a heart comes back and misses are free.
    let practice = storage
        .challenge_progress
        .upsert_challenge_progress(ChallengeId::new(1))
        .await
        .unwrap();
    assert_eq!(practice, ProgressOutcome::Practice);
    let free = storage.hearts.reduce_hearts(ChallengeId::new(2)).await.unwrap();
    assert_eq!(free, HeartsOutcome::Practice);

    let user = storage
        .user_progress
        .get_user_progress()
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.active_course, CourseId::new(7));
    assert_eq!(user.hearts, Hearts::full());
    assert_eq!(user.points, 3 * POINTS_PER_CHALLENGE);
}

#[tokio::test]
async fn in_memory_storage_starts_empty() {
    let storage = Storage::in_memory();
    assert_eq!(storage.user_progress.get_user_progress().await.unwrap(), None);
    assert!(
        storage
            .user_progress
            .upsert_user_progress(CourseId::new(1))
            .await
            .is_err()
    );
}
