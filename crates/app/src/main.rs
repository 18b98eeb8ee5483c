use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use serde::Deserialize;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

use lingo_core::model::{
    Challenge, Course, CourseId, DetectionSettings, Hearts, LabelMap, LessonId, QuizStatus,
    SIGN_LANGUAGE_COURSE_TITLE,
};
use services::inference::{
    DEFAULT_MODEL_URL, ModelArtifact, ScriptStep, ScriptedClassifier, StillFrameSource,
};
use services::{
    Classifier, Clock, DetectionOutcome, HttpModelSource, ModelConfig, ModelSource,
    QuizCollaborators, QuizInit, QuizOrchestrator, RecordingFeedback,
};
use storage::{InMemoryRepository, Storage, UserProgressRepository};

/// Sign language quiz engine driver.
#[derive(Parser, Debug)]
#[command(name = "lingo")]
#[command(about = "Replay sign detection lessons and probe the detection model")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Play a lesson against a recorded prediction trace
    Replay(ReplayArgs),
    /// Fetch and validate the model manifest
    ProbeModel {
        /// Manifest location
        #[arg(long, env = "LINGO_MODEL_URL", default_value = DEFAULT_MODEL_URL)]
        url: Url,
    },
}

#[derive(Args, Debug)]
struct ReplayArgs {
    /// Lesson JSON file
    #[arg(long)]
    lesson: PathBuf,

    /// Prediction trace JSON file, one entry per detection tick
    #[arg(long)]
    trace: PathBuf,

    /// Overrides the hearts stored in the lesson file
    #[arg(long)]
    hearts: Option<u8>,

    /// Overrides the lesson progress stored in the lesson file
    #[arg(long)]
    initial_percentage: Option<f64>,

    /// Detection tick period in milliseconds
    #[arg(long, env = "LINGO_TICK_MS", default_value_t = 1_000)]
    tick_ms: u64,

    /// How long a sign must be held, in milliseconds
    #[arg(long, default_value_t = 1_500)]
    dwell_ms: u64,

    /// Seconds per detection attempt
    #[arg(long, default_value_t = 10)]
    budget_secs: u32,

    /// Give up on a sign challenge after this many failed attempts
    #[arg(long, default_value_t = 3)]
    max_attempts: u32,
}

impl ReplayArgs {
    fn settings(&self) -> Result<DetectionSettings, lingo_core::Error> {
        let defaults = DetectionSettings::default();
        let settings = DetectionSettings::new(
            Duration::from_millis(self.tick_ms),
            Duration::from_millis(self.dwell_ms),
            self.budget_secs,
            defaults.input_edge(),
            defaults.max_inference_failures(),
        )?;
        Ok(settings)
    }
}

/// Lesson file as exported by the course backend.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LessonFile {
    lesson_id: LessonId,
    #[serde(default = "Hearts::full")]
    hearts: Hearts,
    #[serde(default)]
    percentage: f64,
    challenges: Vec<Challenge>,
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let raw = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_slice(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "app=info,services=info,storage=info,lingo_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match Cli::parse().command {
        Command::Replay(args) => replay(args).await,
        Command::ProbeModel { url } => probe_model(url).await,
    }
}

async fn probe_model(url: Url) -> Result<()> {
    let source = HttpModelSource::new(ModelConfig { url });
    let artifact: ModelArtifact = source
        .fetch()
        .await
        .with_context(|| format!("failed to load model from {}", source.url()))?;
    let shards = artifact.weight_urls()?;

    println!("model: {}", artifact.url());
    if let Some(generated_by) = artifact.manifest().generated_by.as_deref() {
        println!("generated by: {generated_by}");
    }
    println!("weights: {}", artifact.weight_count());
    for shard in shards {
        println!("  {shard}");
    }
    println!("signs:");
    for (class_id, label) in LabelMap::asl().iter() {
        println!("  {class_id}: {label}");
    }
    Ok(())
}

async fn replay(args: ReplayArgs) -> Result<()> {
    let settings = args.settings().context("invalid detection settings")?;
    let lesson: LessonFile = read_json(&args.lesson)?;
    let trace: Vec<ScriptStep> = read_json(&args.trace)?;
    let hearts = args.hearts.map_or(lesson.hearts, Hearts::new);
    let percentage = args.initial_percentage.unwrap_or(lesson.percentage);

    let repo = InMemoryRepository::new();
    let course_id = CourseId::new(1);
    repo.insert_course(Course::new(course_id, SIGN_LANGUAGE_COURSE_TITLE))?;
    repo.insert_challenges(&lesson.challenges)?;
    repo.upsert_user_progress(course_id).await?;
    repo.set_hearts(hearts)?;
    let storage = Storage::from_repository(repo.clone());

    let feedback = Arc::new(RecordingFeedback::new());
    let classifier: Arc<dyn Classifier> = Arc::new(ScriptedClassifier::new(trace));
    let mut quiz = QuizOrchestrator::new(
        QuizInit {
            lesson_id: lesson.lesson_id,
            challenges: lesson.challenges,
            hearts,
            percentage,
        },
        QuizCollaborators::from(&storage),
        feedback.clone(),
    )?
    .with_classifier(Some(classifier))
    .with_detection_settings(settings)
    .with_clock(Clock::default_clock());

    while !quiz.is_complete() {
        if !play_challenge(&mut quiz, args.max_attempts).await? {
            break;
        }
    }

    for event in feedback.drain() {
        info!(?event, "feedback");
    }
    let progress = repo.get_user_progress().await?;
    match quiz.completion() {
        Some(summary) => println!(
            "lesson complete: {} points, {} hearts left",
            summary.points, summary.hearts
        ),
        None => println!(
            "lesson stopped at challenge {}/{} ({:.0}%), {} hearts left",
            quiz.active_index() + 1,
            quiz.total_challenges(),
            quiz.percentage(),
            quiz.hearts()
        ),
    }
    if let Some(progress) = progress {
        println!("points earned: {}", progress.points);
    }
    Ok(())
}

/// Plays the current challenge until it is passed. Returns false if the run should stop.
async fn play_challenge(quiz: &mut QuizOrchestrator, max_attempts: u32) -> Result<bool> {
    let Some(challenge) = quiz.current_challenge() else {
        return Ok(false);
    };
    let title = quiz.prompt_title().unwrap_or_default().to_owned();
    let question = challenge.question().to_owned();
    info!(index = quiz.active_index(), %title, %question, "challenge");

    if !challenge.requires_gesture() {
        let Some(answer) = challenge.correct_option().map(|o| o.id) else {
            bail!("challenge {} has no correct option", challenge.id());
        };
        quiz.select_option(answer)?;
        quiz.on_continue().await?;
        return finish(quiz).await;
    }

    for attempt in 1..=max_attempts {
        let camera = StillFrameSource::blank(640, 480, Clock::default_clock().now());
        quiz.start_detection(Box::new(camera))?;
        match quiz.run_detection().await? {
            DetectionOutcome::Accepted(class_id) => {
                info!(attempt, %class_id, "sign accepted");
                return finish(quiz).await;
            }
            DetectionOutcome::HeartsRequired => {
                warn!(attempt, "out of hearts");
                return Ok(false);
            }
            DetectionOutcome::TimedOut if quiz.status() == QuizStatus::Wrong => {
                warn!(attempt, hearts = %quiz.hearts(), "sign not recognised in time");
                quiz.on_continue().await?;
            }
            outcome => {
                warn!(attempt, ?outcome, "detection ended without an answer");
                return Ok(false);
            }
        }
    }
    Ok(false)
}

async fn finish(quiz: &mut QuizOrchestrator) -> Result<bool> {
    match quiz.status() {
        QuizStatus::Correct => {
            quiz.on_continue().await?;
            Ok(true)
        }
        // Hearts ran out; the answer was not recorded.
        QuizStatus::None => Ok(false),
        QuizStatus::Wrong => bail!("answer was rejected"),
    }
}
