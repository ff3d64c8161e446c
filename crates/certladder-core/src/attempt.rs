//! Attempt coordinator: one assessment attempt from start to submission.
//!
//! The coordinator owns the in-progress answers and arbitrates submission.
//! Its state sits behind a mutex so it can be shared (`Arc`) between the
//! learner's submit path and the countdown driver; the `in_progress →
//! submitted` transition happens under that lock, which makes scoring,
//! resolution and forwarding to the results store run at most once.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Context;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{AssessmentError, Result};
use crate::level::{AssessmentStep, CompetencyLevel};
use crate::model::{
    answer_key, AttemptOutcome, AttemptRecord, AttemptStatus, Question, SubmitTrigger,
};
use crate::progression::next_eligible_step;
use crate::report::AttemptReport;
use crate::resolver::resolve;
use crate::scoring::{self, AnswerIndex, Selection};
use crate::thresholds::ThresholdTable;
use crate::traits::{AttemptObserver, IdentityProvider, NoopObserver, QuestionSource, ResultsStore};

/// Lock a mutex, recovering the data if a panicking holder poisoned it.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Result of a call to [`AttemptCoordinator::submit`].
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitResult {
    /// This call won the transition and produced the outcome.
    Submitted(AttemptOutcome),
    /// The attempt was already submitted; nothing happened.
    AlreadySubmitted,
}

impl SubmitResult {
    pub fn outcome(&self) -> Option<&AttemptOutcome> {
        match self {
            SubmitResult::Submitted(outcome) => Some(outcome),
            SubmitResult::AlreadySubmitted => None,
        }
    }
}

#[derive(Debug)]
struct AttemptState {
    status: AttemptStatus,
    answers: Vec<Selection>,
    current: usize,
    started_at: Option<DateTime<Utc>>,
    outcome: Option<AttemptOutcome>,
    record: Option<AttemptRecord>,
}

/// Orchestrates a single attempt.
pub struct AttemptCoordinator {
    id: Uuid,
    learner_id: String,
    prior_level: CompetencyLevel,
    step: AssessmentStep,
    questions: Vec<Question>,
    table: Arc<ThresholdTable>,
    store: Arc<dyn ResultsStore>,
    observer: Arc<dyn AttemptObserver>,
    state: Mutex<AttemptState>,
}

impl AttemptCoordinator {
    /// A pending attempt over `questions` for `step`.
    pub fn new(
        step: AssessmentStep,
        questions: Vec<Question>,
        table: Arc<ThresholdTable>,
        store: Arc<dyn ResultsStore>,
    ) -> Self {
        let answers = vec![None; questions.len()];
        Self {
            id: Uuid::new_v4(),
            learner_id: String::new(),
            prior_level: CompetencyLevel::Unrated,
            step,
            questions,
            table,
            store,
            observer: Arc::new(NoopObserver),
            state: Mutex::new(AttemptState {
                status: AttemptStatus::Pending,
                answers,
                current: 0,
                started_at: None,
                outcome: None,
                record: None,
            }),
        }
    }

    /// Associate the attempt with a learner and their level at start time.
    pub fn with_learner(mut self, learner_id: impl Into<String>, prior_level: CompetencyLevel) -> Self {
        self.learner_id = learner_id.into();
        self.prior_level = prior_level;
        self
    }

    /// Register an observer for lifecycle notifications.
    pub fn with_observer(mut self, observer: Arc<dyn AttemptObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Prepare the next attempt for a learner.
    ///
    /// Reads the learner's level, picks the step through the progression
    /// gate and fetches its questions. Returns `None` when the learner is
    /// already at the top of the ladder.
    pub async fn begin(
        learner_id: &str,
        identity: &dyn IdentityProvider,
        source: &dyn QuestionSource,
        table: Arc<ThresholdTable>,
        store: Arc<dyn ResultsStore>,
    ) -> anyhow::Result<Option<Self>> {
        let level = identity
            .current_level(learner_id)
            .await
            .with_context(|| format!("failed to read level for learner {learner_id}"))?;

        let Some(step) = next_eligible_step(level) else {
            tracing::info!(learner_id, %level, "learner already at ceiling, no step to attempt");
            return Ok(None);
        };

        let questions = source
            .questions_for(step)
            .await
            .with_context(|| format!("failed to load questions for {step}"))?;

        tracing::info!(learner_id, %level, %step, questions = questions.len(), "attempt prepared");
        Ok(Some(
            Self::new(step, questions, table, store).with_learner(learner_id, level),
        ))
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn learner_id(&self) -> &str {
        &self.learner_id
    }

    pub fn prior_level(&self) -> CompetencyLevel {
        self.prior_level
    }

    pub fn step(&self) -> AssessmentStep {
        self.step
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn status(&self) -> AttemptStatus {
        lock(&self.state).status
    }

    pub fn is_submitted(&self) -> bool {
        self.status() == AttemptStatus::Submitted
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        lock(&self.state).started_at
    }

    /// Current selections, `None` where unanswered.
    pub fn answers(&self) -> Vec<Selection> {
        lock(&self.state).answers.clone()
    }

    pub fn answered_count(&self) -> usize {
        lock(&self.state).answers.iter().filter(|a| a.is_some()).count()
    }

    /// The outcome, once submitted.
    pub fn outcome(&self) -> Option<AttemptOutcome> {
        lock(&self.state).outcome.clone()
    }

    /// The record handed to the results store, once submitted.
    pub fn record(&self) -> Option<AttemptRecord> {
        lock(&self.state).record.clone()
    }

    /// Learner-facing report, once submitted.
    pub fn report(&self) -> Option<AttemptReport> {
        let state = lock(&self.state);
        let outcome = state.outcome.as_ref()?;
        let record = state.record.as_ref()?;
        Some(AttemptReport::new(&self.questions, record, outcome))
    }

    /// Move `pending → in_progress`. No-op if already in progress.
    pub fn start(&self) -> Result<()> {
        let change = {
            let mut state = lock(&self.state);
            let status = state.status;
            match status {
                AttemptStatus::Pending => self.transition(&mut state, AttemptStatus::InProgress),
                AttemptStatus::InProgress => return Ok(()),
                status => {
                    return Err(AssessmentError::InvalidState {
                        operation: "start",
                        status,
                    })
                }
            }
        };
        self.notify(change);
        Ok(())
    }

    /// Record `answer` for question `question`, replacing any prior choice.
    ///
    /// The first answer on a pending attempt starts it.
    pub fn select_answer(&self, question: usize, answer: AnswerIndex) -> Result<()> {
        self.set_selection(question, Some(answer), "select an answer")
    }

    /// Withdraw the answer for question `question`.
    pub fn clear_answer(&self, question: usize) -> Result<()> {
        self.set_selection(question, None, "clear an answer")
    }

    fn set_selection(
        &self,
        question: usize,
        selection: Selection,
        operation: &'static str,
    ) -> Result<()> {
        let change = {
            let mut state = lock(&self.state);
            if state.status == AttemptStatus::Submitted {
                return Err(AssessmentError::InvalidState {
                    operation,
                    status: state.status,
                });
            }
            let len = state.answers.len();
            let slot = state
                .answers
                .get_mut(question)
                .ok_or(AssessmentError::Index { index: question, len })?;
            *slot = selection;
            tracing::debug!(attempt_id = %self.id, question, ?selection, "answer updated");

            (state.status == AttemptStatus::Pending)
                .then(|| self.transition(&mut state, AttemptStatus::InProgress))
        };
        if let Some(change) = change {
            self.notify(change);
        }
        Ok(())
    }

    /// Finalize the attempt.
    ///
    /// Only the first call, from either trigger, scores, resolves and
    /// forwards to the results store; later calls return
    /// [`SubmitResult::AlreadySubmitted`]. A store failure is returned as
    /// [`AssessmentError::Submission`] but the attempt stays submitted.
    pub async fn submit(&self, trigger: SubmitTrigger) -> Result<SubmitResult> {
        let (from, outcome, record) = {
            let mut state = lock(&self.state);
            if state.status == AttemptStatus::Submitted {
                tracing::debug!(attempt_id = %self.id, %trigger, "already submitted, ignoring");
                return Ok(SubmitResult::AlreadySubmitted);
            }

            let key = answer_key(&self.questions);
            let score = scoring::score(&state.answers, &key);
            let correct = scoring::count_correct(&state.answers, &key);
            let resolution = resolve(&self.table, self.step, score)?;

            let outcome = AttemptOutcome {
                score,
                correct,
                total: key.len(),
                band: resolution.band,
                level: resolution.level,
                can_advance: resolution.can_advance,
                next_step: resolution.next_step,
                trigger,
            };
            let record = AttemptRecord {
                attempt_id: self.id,
                learner_id: self.learner_id.clone(),
                step: self.step,
                answers: state.answers.clone(),
                score,
                resulting_level: resolution.level,
                can_advance: resolution.can_advance,
                submitted_at: Utc::now(),
            };

            let from = state.status;
            state.status = AttemptStatus::Submitted;
            state.outcome = Some(outcome.clone());
            state.record = Some(record.clone());
            (from, outcome, record)
        };

        tracing::debug!(attempt_id = %self.id, %from, to = %AttemptStatus::Submitted, "attempt transition");
        self.notify((from, AttemptStatus::Submitted));
        self.observer.on_submitted(self.id, &outcome);

        tracing::info!(
            attempt_id = %self.id,
            step = %self.step,
            %trigger,
            score = outcome.score,
            level = ?outcome.level,
            can_advance = outcome.can_advance,
            "attempt submitted"
        );

        if let Err(e) = self.store.record(&record).await {
            tracing::error!(
                attempt_id = %self.id,
                store = self.store.name(),
                "results store rejected attempt: {e:#}"
            );
            return Err(AssessmentError::Submission(format!("{e:#}")));
        }

        Ok(SubmitResult::Submitted(outcome))
    }

    // -----------------------------------------------------------------------
    // Navigation
    // -----------------------------------------------------------------------

    pub fn current_index(&self) -> usize {
        lock(&self.state).current
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current_index())
    }

    /// Jump to `index`; out-of-range indices are ignored.
    pub fn go_to(&self, index: usize) -> bool {
        if index >= self.questions.len() {
            return false;
        }
        lock(&self.state).current = index;
        true
    }

    /// Advance to the next question, clamped at the last one.
    pub fn next_question(&self) -> bool {
        let mut state = lock(&self.state);
        if state.current + 1 >= self.questions.len() {
            return false;
        }
        state.current += 1;
        true
    }

    /// Go back one question, clamped at the first one.
    pub fn previous_question(&self) -> bool {
        let mut state = lock(&self.state);
        if state.current == 0 {
            return false;
        }
        state.current -= 1;
        true
    }

    /// Position of the current question as a rounded percentage.
    pub fn progress_percentage(&self) -> u32 {
        progress_percentage(self.current_index(), self.questions.len())
    }

    /// Apply a status change under the state lock. Returns the
    /// `(from, to)` pair for [`Self::notify`], which must run after the
    /// guard is dropped: observers may read the coordinator.
    fn transition(&self, state: &mut AttemptState, to: AttemptStatus) -> (AttemptStatus, AttemptStatus) {
        let from = state.status;
        state.status = to;
        if to == AttemptStatus::InProgress {
            state.started_at = Some(Utc::now());
        }
        tracing::debug!(attempt_id = %self.id, %from, %to, "attempt transition");
        (from, to)
    }

    fn notify(&self, (from, to): (AttemptStatus, AttemptStatus)) {
        self.observer.on_status_change(self.id, from, to);
    }
}

/// `round((current + 1) / total × 100)`, or 0 for an empty attempt.
pub fn progress_percentage(current: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (((current + 1) as f64 / total as f64) * 100.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Weak;

    #[derive(Default)]
    struct CountingStore {
        calls: AtomicU32,
        fail: bool,
    }

    #[async_trait]
    impl ResultsStore for CountingStore {
        fn name(&self) -> &str {
            "counting"
        }

        async fn record(&self, _: &AttemptRecord) -> anyhow::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("store offline");
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingObserver {
        transitions: Mutex<Vec<(AttemptStatus, AttemptStatus)>>,
        submissions: AtomicU32,
    }

    impl AttemptObserver for RecordingObserver {
        fn on_status_change(&self, _: Uuid, from: AttemptStatus, to: AttemptStatus) {
            self.transitions.lock().unwrap().push((from, to));
        }

        fn on_submitted(&self, _: Uuid, _: &AttemptOutcome) {
            self.submissions.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn questions(n: usize) -> Vec<Question> {
        (0..n)
            .map(|i| Question {
                id: format!("q{i}"),
                level: if i % 2 == 0 { CompetencyLevel::A1 } else { CompetencyLevel::A2 },
                competency: None,
                prompt: format!("Question {i}"),
                options: vec!["a".into(), "b".into(), "c".into()],
                correct_answer: i % 3,
                explanation: None,
            })
            .collect()
    }

    fn coordinator(n: usize, store: Arc<CountingStore>) -> AttemptCoordinator {
        AttemptCoordinator::new(
            AssessmentStep::One,
            questions(n),
            Arc::new(ThresholdTable::standard()),
            store,
        )
    }

    #[test]
    fn first_answer_starts_attempt() {
        let attempt = coordinator(4, Arc::default());
        assert_eq!(attempt.status(), AttemptStatus::Pending);
        attempt.select_answer(0, 1).unwrap();
        assert_eq!(attempt.status(), AttemptStatus::InProgress);
        assert!(attempt.started_at().is_some());
    }

    #[test]
    fn answers_can_be_changed_and_cleared() {
        let attempt = coordinator(3, Arc::default());
        attempt.start().unwrap();
        attempt.select_answer(1, 0).unwrap();
        attempt.select_answer(1, 2).unwrap();
        assert_eq!(attempt.answers(), vec![None, Some(2), None]);
        attempt.clear_answer(1).unwrap();
        assert_eq!(attempt.answered_count(), 0);
    }

    #[test]
    fn out_of_range_question_is_index_error() {
        let attempt = coordinator(3, Arc::default());
        let err = attempt.select_answer(3, 0).unwrap_err();
        assert!(matches!(err, AssessmentError::Index { index: 3, len: 3 }));
        assert_eq!(attempt.status(), AttemptStatus::Pending);
    }

    #[tokio::test]
    async fn select_after_submit_is_invalid_state() {
        let attempt = coordinator(3, Arc::default());
        attempt.submit(SubmitTrigger::Manual).await.unwrap();
        let err = attempt.select_answer(0, 0).unwrap_err();
        assert!(matches!(
            err,
            AssessmentError::InvalidState {
                status: AttemptStatus::Submitted,
                ..
            }
        ));
        assert!(attempt.start().is_err());
    }

    #[tokio::test]
    async fn second_submit_is_noop() {
        let store = Arc::new(CountingStore::default());
        let attempt = coordinator(4, store.clone());
        for i in 0..4 {
            attempt.select_answer(i, i % 3).unwrap();
        }

        let first = attempt.submit(SubmitTrigger::Manual).await.unwrap();
        let outcome = first.outcome().cloned().unwrap();
        assert_eq!(outcome.score, 100.0);
        assert_eq!(outcome.trigger, SubmitTrigger::Manual);

        let second = attempt.submit(SubmitTrigger::TimerExpiry).await.unwrap();
        assert_eq!(second, SubmitResult::AlreadySubmitted);
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
        assert_eq!(attempt.outcome(), Some(outcome));
    }

    #[tokio::test]
    async fn concurrent_submits_forward_once() {
        let store = Arc::new(CountingStore::default());
        let attempt = Arc::new(coordinator(10, store.clone()));
        attempt.start().unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let attempt = Arc::clone(&attempt);
                let trigger = if i % 2 == 0 {
                    SubmitTrigger::Manual
                } else {
                    SubmitTrigger::TimerExpiry
                };
                tokio::spawn(async move { attempt.submit(trigger).await.unwrap() })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if let SubmitResult::Submitted(_) = handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn pending_attempt_can_be_submitted_blank() {
        let attempt = coordinator(4, Arc::default());
        let result = attempt.submit(SubmitTrigger::TimerExpiry).await.unwrap();
        let outcome = result.outcome().unwrap();
        assert_eq!(outcome.score, 0.0);
        assert_eq!(outcome.correct, 0);
        assert_eq!(outcome.level, None);
        assert_eq!(attempt.record().unwrap().answers, vec![None; 4]);
    }

    #[tokio::test]
    async fn store_failure_keeps_attempt_submitted() {
        let store = Arc::new(CountingStore {
            fail: true,
            ..Default::default()
        });
        let attempt = coordinator(2, store.clone());
        let err = attempt.submit(SubmitTrigger::Manual).await.unwrap_err();
        assert!(matches!(err, AssessmentError::Submission(ref m) if m.contains("store offline")));
        assert!(!err.is_contract_violation());
        assert!(attempt.is_submitted());
        assert!(attempt.outcome().is_some());

        // A retry must not count as a second attempt.
        let retry = attempt.submit(SubmitTrigger::Manual).await.unwrap();
        assert_eq!(retry, SubmitResult::AlreadySubmitted);
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn observer_sees_every_transition() {
        let observer = Arc::new(RecordingObserver::default());
        let attempt = coordinator(2, Arc::default()).with_observer(observer.clone());
        attempt.select_answer(0, 0).unwrap();
        attempt.select_answer(1, 1).unwrap();
        attempt.submit(SubmitTrigger::Manual).await.unwrap();
        attempt.submit(SubmitTrigger::Manual).await.unwrap();

        assert_eq!(
            *observer.transitions.lock().unwrap(),
            vec![
                (AttemptStatus::Pending, AttemptStatus::InProgress),
                (AttemptStatus::InProgress, AttemptStatus::Submitted),
            ]
        );
        assert_eq!(observer.submissions.load(Ordering::SeqCst), 1);
    }

    /// Reads the coordinator back from inside its callbacks.
    #[derive(Default)]
    struct PollingObserver {
        attempt: Mutex<Weak<AttemptCoordinator>>,
        seen: Mutex<Vec<(AttemptStatus, usize)>>,
    }

    impl AttemptObserver for PollingObserver {
        fn on_status_change(&self, _: Uuid, _: AttemptStatus, _: AttemptStatus) {
            if let Some(attempt) = self.attempt.lock().unwrap().upgrade() {
                self.seen
                    .lock()
                    .unwrap()
                    .push((attempt.status(), attempt.answered_count()));
            }
        }

        fn on_submitted(&self, _: Uuid, outcome: &AttemptOutcome) {
            if let Some(attempt) = self.attempt.lock().unwrap().upgrade() {
                assert_eq!(attempt.outcome().as_ref(), Some(outcome));
            }
        }
    }

    #[tokio::test]
    async fn observer_can_poll_coordinator_from_callback() {
        let observer = Arc::new(PollingObserver::default());
        let attempt = Arc::new(coordinator(2, Arc::default()).with_observer(observer.clone()));
        *observer.attempt.lock().unwrap() = Arc::downgrade(&attempt);

        let (tx, rx) = std::sync::mpsc::channel();
        let worker = Arc::clone(&attempt);
        std::thread::spawn(move || {
            let _ = tx.send(worker.select_answer(0, 0));
        });
        rx.recv_timeout(std::time::Duration::from_secs(5))
            .expect("select_answer blocked while the observer polled the coordinator")
            .unwrap();

        attempt.submit(SubmitTrigger::Manual).await.unwrap();
        assert_eq!(
            *observer.seen.lock().unwrap(),
            vec![
                (AttemptStatus::InProgress, 1),
                (AttemptStatus::Submitted, 1),
            ]
        );
    }

    #[test]
    fn start_notifies_without_holding_lock() {
        let observer = Arc::new(PollingObserver::default());
        let attempt = Arc::new(coordinator(2, Arc::default()).with_observer(observer.clone()));
        *observer.attempt.lock().unwrap() = Arc::downgrade(&attempt);

        let (tx, rx) = std::sync::mpsc::channel();
        let worker = Arc::clone(&attempt);
        std::thread::spawn(move || {
            let _ = tx.send(worker.start());
        });
        rx.recv_timeout(std::time::Duration::from_secs(5))
            .expect("start blocked while the observer polled the coordinator")
            .unwrap();
        assert_eq!(*observer.seen.lock().unwrap(), vec![(AttemptStatus::InProgress, 0)]);
    }

    #[test]
    fn navigation_is_clamped() {
        let attempt = coordinator(3, Arc::default());
        assert!(!attempt.previous_question());
        assert!(attempt.next_question());
        assert!(attempt.next_question());
        assert!(!attempt.next_question());
        assert_eq!(attempt.current_index(), 2);
        assert_eq!(attempt.current_question().unwrap().id, "q2");
        assert!(!attempt.go_to(3));
        assert!(attempt.go_to(0));
        assert_eq!(attempt.progress_percentage(), 33);
    }

    #[test]
    fn progress_percentage_rounds() {
        assert_eq!(progress_percentage(0, 0), 0);
        assert_eq!(progress_percentage(0, 44), 2);
        assert_eq!(progress_percentage(43, 44), 100);
        assert_eq!(progress_percentage(1, 3), 67);
    }
}
