// src/review.rs
//
// Wrong-answer derivation and review-exam sessions.
//
// Wrong problems are never persisted: every read replays the user's full
// attempt history against the *current* question catalog. Editing a
// question's answer after an attempt therefore changes whether that attempt
// counts as wrong, and deleting a question drops it from the derived set.
// Both are intended semantics.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::models::attempt::Attempt;
use crate::models::exam::DEFAULT_PASS_SCORE;
use crate::models::question::{AnswerValue, Question};
use crate::scoring::answers_match;

/// Review sessions are dropped if untouched for this long.
const SESSION_TTL_MINUTES: i64 = 120;

/// Floor for the generated review time limit, in minutes.
const MIN_REVIEW_MINUTES: i64 = 10;

/// A question the user currently has wrong, derived from one attempt.
/// Synthesized on every read; the id is deterministic so the client's
/// "mastered" marks survive re-derivation.
#[derive(Debug, Clone, Serialize)]
pub struct WrongProblem {
    pub id: String,
    pub exam_id: String,
    pub question: Question,
    pub wrong_answer: AnswerValue,
    pub attempted_at: DateTime<Utc>,
}

pub fn wrong_problem_id(attempt_id: &str, question_id: &str) -> String {
    format!("wp-{attempt_id}-{question_id}")
}

/// Replays attempts against the current catalog and returns the problems
/// still missed.
///
/// * `catalogs` maps exam id -> that exam's current questions. Attempts whose
///   exam is gone contribute nothing.
/// * Answers referencing a deleted question are skipped silently.
/// * Problems whose id is in `ignored` (mastered marks) are filtered out.
///
/// Output is sorted by attempt date, most recent first, for display.
pub fn derive_wrong_problems(
    attempts: &[Attempt],
    catalogs: &HashMap<String, Vec<Question>>,
    ignored: &HashSet<String>,
) -> Vec<WrongProblem> {
    let mut wrong = Vec::new();

    for attempt in attempts {
        let Some(questions) = catalogs.get(&attempt.exam_id) else {
            continue;
        };
        let by_id: HashMap<&str, &Question> =
            questions.iter().map(|q| (q.id.as_str(), q)).collect();

        for (question_id, submitted) in attempt.answers.iter() {
            let Some(question) = by_id.get(question_id.as_str()) else {
                continue;
            };
            if answers_match(&question.answer, submitted) {
                continue;
            }
            let id = wrong_problem_id(&attempt.id, question_id);
            if ignored.contains(&id) {
                continue;
            }
            wrong.push(WrongProblem {
                id,
                exam_id: attempt.exam_id.clone(),
                question: (*question).clone(),
                wrong_answer: submitted.clone(),
                attempted_at: attempt.created_at,
            });
        }
    }

    wrong.sort_by(|a, b| b.attempted_at.cmp(&a.attempted_at).then(a.id.cmp(&b.id)));
    wrong
}

/// An ephemeral exam assembled from wrong problems. Lives only in the
/// [`ReviewStore`]; never written to the exams table, and submitting it
/// reconciles mastered marks instead of appending an attempt row.
#[derive(Debug, Clone)]
pub struct ReviewSession {
    pub exam_id: String,
    pub user_id: i64,
    pub title: String,
    /// Minutes: one per question with a ten-minute floor.
    pub time_limit: i64,
    pub pass_score: i64,
    pub questions: Vec<Question>,
    /// Question id -> every wrong-problem id it came from. One question can
    /// originate several wrong problems (missed across retakes); answering
    /// it correctly masters all of them.
    pub wrong_problem_ids: HashMap<String, Vec<String>>,
    pub created_at: DateTime<Utc>,
}

/// Builds a review session from the selected wrong problems. Question
/// objects keep their original ids; nothing here is persisted.
///
/// A question missed in more than one attempt arrives as several wrong
/// problems. It is asked once, and all of its originating wrong-problem
/// ids are tracked so reconciliation clears every one of them.
pub fn synthesize_review(user_id: i64, wrong_problems: Vec<WrongProblem>) -> ReviewSession {
    let exam_id = format!("review-{}", uuid::Uuid::new_v4());

    let mut questions: Vec<Question> = Vec::with_capacity(wrong_problems.len());
    let mut wrong_problem_ids: HashMap<String, Vec<String>> =
        HashMap::with_capacity(wrong_problems.len());
    for wp in wrong_problems {
        let ids = wrong_problem_ids.entry(wp.question.id.clone()).or_default();
        if ids.is_empty() {
            questions.push(wp.question);
        }
        ids.push(wp.id);
    }
    let count = questions.len() as i64;

    ReviewSession {
        exam_id,
        user_id,
        title: "Wrong-answer review".to_string(),
        time_limit: count.max(MIN_REVIEW_MINUTES),
        pass_score: DEFAULT_PASS_SCORE,
        questions,
        wrong_problem_ids,
        created_at: Utc::now(),
    }
}

#[derive(Default)]
struct ReviewStoreInner {
    /// One active session per user; starting a new review replaces it.
    sessions: HashMap<i64, ReviewSession>,
    /// Mastered wrong-problem ids per user. Process-local on purpose: the
    /// soft-delete semantics of the mastered mark are lossy by design.
    /// Unlike sessions, marks are never pruned; they grow with use and
    /// reset on restart.
    ignored: HashMap<i64, HashSet<String>>,
}

/// Keyed in-memory state for review sessions and mastered marks.
///
/// Sessions are keyed by user id, so concurrent users never clobber each
/// other; within one user, last writer wins (a second "start review" from
/// another tab replaces the first). Stale sessions are pruned on write.
#[derive(Clone, Default)]
pub struct ReviewStore {
    inner: Arc<Mutex<ReviewStoreInner>>,
}

impl ReviewStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a session as the user's active review, replacing any
    /// previous one.
    pub fn start(&self, session: ReviewSession) {
        let mut inner = self.inner.lock().expect("review store lock poisoned");
        let cutoff = Utc::now() - Duration::minutes(SESSION_TTL_MINUTES);
        inner.sessions.retain(|_, s| s.created_at > cutoff);
        inner.sessions.insert(session.user_id, session);
    }

    /// Looks up the user's active session by its synthesized exam id.
    pub fn get(&self, user_id: i64, exam_id: &str) -> Option<ReviewSession> {
        let inner = self.inner.lock().expect("review store lock poisoned");
        inner
            .sessions
            .get(&user_id)
            .filter(|s| s.exam_id == exam_id)
            .filter(|s| s.created_at > Utc::now() - Duration::minutes(SESSION_TTL_MINUTES))
            .cloned()
    }

    /// Removes and returns the user's active session if it matches
    /// `exam_id`. Used by the submit path; reconciliation is terminal.
    pub fn finish(&self, user_id: i64, exam_id: &str) -> Option<ReviewSession> {
        let mut inner = self.inner.lock().expect("review store lock poisoned");
        match inner.sessions.get(&user_id) {
            Some(s) if s.exam_id == exam_id => inner.sessions.remove(&user_id),
            _ => None,
        }
    }

    /// Marks one wrong problem mastered. Idempotent.
    pub fn mark_mastered(&self, user_id: i64, wrong_problem_id: &str) {
        let mut inner = self.inner.lock().expect("review store lock poisoned");
        inner
            .ignored
            .entry(user_id)
            .or_default()
            .insert(wrong_problem_id.to_string());
    }

    /// Snapshot of the user's mastered marks, for filtering derivation.
    pub fn ignored_for(&self, user_id: i64) -> HashSet<String> {
        let inner = self.inner.lock().expect("review store lock poisoned");
        inner.ignored.get(&user_id).cloned().unwrap_or_default()
    }
}
