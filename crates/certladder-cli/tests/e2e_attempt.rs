//! End-to-end attempt tests across the core engine and the store backends.
//!
//! These drive a full Step 1 attempt (gate → questions → answers → submit
//! → level application) and the manual/timer submission race.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use certladder_core::attempt::{AttemptCoordinator, SubmitResult};
use certladder_core::driver::{drive_countdown, DriveOutcome, TICK_PERIOD};
use certladder_core::error::AssessmentError;
use certladder_core::level::{AssessmentStep, CompetencyLevel};
use certladder_core::model::{AttemptStatus, Question, QuestionBank, SubmitTrigger};
use certladder_core::progression::{next_eligible_step, LevelPolicy};
use certladder_core::thresholds::{BandKind, ThresholdTable};
use certladder_core::timer::Countdown;
use certladder_core::traits::{BankQuestionSource, ResultsStore};
use certladder_store::{MemoryIdentityProvider, MemoryResultsStore, MockResultsStore};

fn make_bank(step: AssessmentStep) -> QuestionBank {
    let levels = match step {
        AssessmentStep::One => [CompetencyLevel::A1, CompetencyLevel::A2],
        AssessmentStep::Two => [CompetencyLevel::B1, CompetencyLevel::B2],
        AssessmentStep::Three => [CompetencyLevel::C1, CompetencyLevel::C2],
    };
    QuestionBank {
        id: format!("bank-{}", step.number()),
        name: format!("{step} bank"),
        description: String::new(),
        step,
        questions: (0..44)
            .map(|i| Question {
                id: format!("q{i}"),
                level: levels[i / 22],
                competency: None,
                prompt: format!("Question {i}"),
                options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
                correct_answer: i % 4,
                explanation: None,
            })
            .collect(),
    }
}

fn make_attempt(store: Arc<dyn ResultsStore>) -> Arc<AttemptCoordinator> {
    Arc::new(
        AttemptCoordinator::new(
            AssessmentStep::One,
            make_bank(AssessmentStep::One).questions,
            Arc::new(ThresholdTable::standard()),
            store,
        )
        .with_learner("ana", CompetencyLevel::Unrated),
    )
}

/// Answer the first `correct` questions right and the rest wrong.
fn answer(attempt: &AttemptCoordinator, correct: usize) {
    for (i, q) in attempt.questions().iter().enumerate() {
        let selection = if i < correct {
            q.correct_answer
        } else {
            (q.correct_answer + 1) % q.options.len()
        };
        attempt.select_answer(i, selection).unwrap();
    }
}

// --- Full attempt ---

#[tokio::test]
async fn e2e_step_one_advance() {
    let store = Arc::new(MemoryResultsStore::new());
    let identity = MemoryIdentityProvider::new();
    let source = BankQuestionSource::new([
        make_bank(AssessmentStep::One),
        make_bank(AssessmentStep::Two),
    ]);

    let attempt = AttemptCoordinator::begin(
        "ana",
        &identity,
        &source,
        Arc::new(ThresholdTable::standard()),
        store.clone(),
    )
    .await
    .unwrap()
    .expect("unrated learner gets a step");
    assert_eq!(attempt.step(), AssessmentStep::One);
    assert_eq!(attempt.len(), 44);
    assert_eq!(attempt.status(), AttemptStatus::Pending);

    answer(&attempt, 33);
    assert_eq!(attempt.status(), AttemptStatus::InProgress);

    let result = attempt.submit(SubmitTrigger::Manual).await.unwrap();
    let outcome = result.outcome().expect("first submit wins");
    assert_eq!(outcome.score, 75.0);
    assert_eq!(outcome.band, BandKind::Advance);
    assert_eq!(outcome.level, Some(CompetencyLevel::A2));
    assert!(outcome.can_advance);
    assert_eq!(outcome.next_step, Some(AssessmentStep::Two));

    let records = store.records_for("ana");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].resulting_level, Some(CompetencyLevel::A2));

    let level = identity.apply_outcome("ana", outcome, LevelPolicy::KeepHighest);
    assert_eq!(level, CompetencyLevel::A2);
    assert_eq!(next_eligible_step(level), Some(AssessmentStep::Two));

    // The next attempt picks up at Step 2.
    let next = AttemptCoordinator::begin(
        "ana",
        &identity,
        &source,
        Arc::new(ThresholdTable::standard()),
        store.clone(),
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(next.step(), AssessmentStep::Two);
}

#[tokio::test]
async fn e2e_missing_bank_for_gated_step() {
    let identity = MemoryIdentityProvider::new().with_level("ana", CompetencyLevel::B2);
    let source = BankQuestionSource::new([make_bank(AssessmentStep::One)]);

    let err = AttemptCoordinator::begin(
        "ana",
        &identity,
        &source,
        Arc::new(ThresholdTable::standard()),
        Arc::new(MemoryResultsStore::new()),
    )
    .await
    .err()
    .expect("Step 3 has no bank");
    assert!(format!("{err:#}").contains("Step 3"));
}

// --- Submission arbitration ---

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn e2e_manual_and_timer_race_forwards_once() {
    let store = Arc::new(MockResultsStore::new());
    let attempt = make_attempt(store.clone());
    answer(&attempt, 20);

    let manual = tokio::spawn({
        let attempt = attempt.clone();
        async move { attempt.submit(SubmitTrigger::Manual).await }
    });
    let timer = tokio::spawn({
        let attempt = attempt.clone();
        async move { attempt.submit(SubmitTrigger::TimerExpiry).await }
    });

    let results = [manual.await.unwrap().unwrap(), timer.await.unwrap().unwrap()];
    let winners = results
        .iter()
        .filter(|r| matches!(r, SubmitResult::Submitted(_)))
        .count();
    assert_eq!(winners, 1);
    assert_eq!(store.call_count(), 1);

    let record = store.last_record().unwrap();
    assert_eq!(record.learner_id, "ana");
    assert_eq!(record.resulting_level, Some(CompetencyLevel::A1));
}

#[tokio::test]
async fn e2e_store_failure_keeps_attempt_submitted() {
    let store = Arc::new(MockResultsStore::failing("database unavailable"));
    let attempt = make_attempt(store.clone());
    answer(&attempt, 44);

    let err = attempt.submit(SubmitTrigger::Manual).await.unwrap_err();
    assert!(matches!(err, AssessmentError::Submission(ref msg) if msg.contains("database unavailable")));
    assert!(!err.is_contract_violation());
    assert!(attempt.is_submitted());
    assert_eq!(attempt.outcome().unwrap().level, Some(CompetencyLevel::A2));

    // No automatic or repeated forwarding.
    store.set_failure(None);
    let again = attempt.submit(SubmitTrigger::Manual).await.unwrap();
    assert_eq!(again, SubmitResult::AlreadySubmitted);
    assert_eq!(store.call_count(), 1);
}

#[tokio::test]
async fn e2e_answers_locked_after_submit() {
    let attempt = make_attempt(Arc::new(MockResultsStore::new()));
    attempt.submit(SubmitTrigger::Manual).await.unwrap();

    let err = attempt.select_answer(0, 1).unwrap_err();
    assert!(matches!(
        err,
        AssessmentError::InvalidState {
            status: AttemptStatus::Submitted,
            ..
        }
    ));
    assert_eq!(attempt.outcome().unwrap().score, 0.0);
}

// --- Countdown driver ---

#[tokio::test(start_paused = true)]
async fn e2e_timer_expiry_submits_once() {
    let store = Arc::new(MockResultsStore::new());
    let attempt = make_attempt(store.clone());
    answer(&attempt, 11);

    let mut countdown = Countdown::from_minutes(1);
    countdown.start();
    let countdown = Arc::new(Mutex::new(countdown));

    let result = drive_countdown(countdown.clone(), attempt.clone(), TICK_PERIOD)
        .await
        .unwrap();
    let DriveOutcome::Expired(SubmitResult::Submitted(outcome)) = &result else {
        panic!("expected the driver to submit, got {result:?}");
    };
    assert_eq!(outcome.trigger, SubmitTrigger::TimerExpiry);
    assert_eq!(outcome.score, 25.0);
    assert_eq!(outcome.band, BandKind::Low);
    assert_eq!(outcome.level, Some(CompetencyLevel::A1));

    // A late manual submit is a no-op.
    let late = attempt.submit(SubmitTrigger::Manual).await.unwrap();
    assert_eq!(late, SubmitResult::AlreadySubmitted);
    assert_eq!(store.call_count(), 1);
    assert_eq!(countdown.lock().unwrap().time_left(), 0);
}

#[tokio::test(start_paused = true)]
async fn e2e_manual_submit_stops_driver() {
    let store = Arc::new(MockResultsStore::new());
    let attempt = make_attempt(store.clone());

    let mut countdown = Countdown::from_minutes(44);
    countdown.start();
    let countdown = Arc::new(Mutex::new(countdown));

    let driver = tokio::spawn(drive_countdown(
        countdown.clone(),
        attempt.clone(),
        TICK_PERIOD,
    ));
    tokio::time::sleep(Duration::from_secs(600) + Duration::from_millis(500)).await;
    answer(&attempt, 44);
    attempt.submit(SubmitTrigger::Manual).await.unwrap();

    assert_eq!(driver.await.unwrap().unwrap(), DriveOutcome::Cancelled);
    assert_eq!(countdown.lock().unwrap().time_left(), 44 * 60 - 600);
    assert_eq!(store.call_count(), 1);
    assert_eq!(
        store.last_record().unwrap().resulting_level,
        Some(CompetencyLevel::A2)
    );
}
