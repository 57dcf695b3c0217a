// src/scoring.rs

use std::collections::HashMap;

use serde::Serialize;

use crate::models::question::{AnswerValue, Question};

/// Outcome of scoring one submitted answer set against an exam's catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScoreOutcome {
    pub raw_correct: i64,
    /// 0-100, rounded half away from zero.
    pub normalized_score: i64,
    pub passed: bool,
}

/// Coercing answer equality.
///
/// Question banks store the correct answer loosely: an option index may
/// arrive as the number 2 or the string "2". If the correct answer has a
/// numeric reading, both sides are compared as numbers; otherwise both are
/// compared as trimmed strings. A strict typed comparison here would mark
/// every numeric-string key wrong, which is the regression this function
/// exists to prevent.
pub fn answers_match(correct: &AnswerValue, submitted: &AnswerValue) -> bool {
    match correct.as_number() {
        Some(expected) => submitted.as_number() == Some(expected),
        None => correct.as_text() == submitted.as_text(),
    }
}

/// Scores a submitted answer set. Pure: persistence is the caller's problem.
///
/// * A question with no submitted answer counts as incorrect.
/// * `normalized_score = round(raw * 100 / total)`, with the denominator
///   clamped to 1 so a zero-question exam scores 0 instead of dividing by
///   zero.
/// * `passed = normalized_score >= pass_score`.
pub fn score_exam(
    questions: &[Question],
    answers: &HashMap<String, AnswerValue>,
    pass_score: i64,
) -> ScoreOutcome {
    let raw_correct = questions
        .iter()
        .filter(|q| {
            answers
                .get(&q.id)
                .is_some_and(|submitted| answers_match(&q.answer, submitted))
        })
        .count() as i64;

    let total = questions.len() as i64;
    let normalized_score = (raw_correct as f64 * 100.0 / total.max(1) as f64).round() as i64;

    ScoreOutcome {
        raw_correct,
        normalized_score,
        passed: normalized_score >= pass_score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::exam::DEFAULT_PASS_SCORE;
    use sqlx::types::Json;

    fn question(id: &str, answer: AnswerValue) -> Question {
        Question {
            id: id.to_string(),
            exam_id: "exam-1".to_string(),
            category: "general".to_string(),
            content: format!("question {id}"),
            options: Json(vec![
                "a".to_string(),
                "b".to_string(),
                "c".to_string(),
                "d".to_string(),
            ]),
            answer: Json(answer),
            image_url: None,
            option_images: None,
            explanation: None,
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn numeric_string_key_matches_index_answer() {
        assert!(answers_match(
            &AnswerValue::Text("2".to_string()),
            &AnswerValue::Index(2)
        ));
        assert!(answers_match(
            &AnswerValue::Index(2),
            &AnswerValue::Text("2".to_string())
        ));
    }

    #[test]
    fn text_answers_compare_trimmed() {
        assert!(answers_match(
            &AnswerValue::Text("모델링".to_string()),
            &AnswerValue::Text(" 모델링 ".to_string())
        ));
        assert!(!answers_match(
            &AnswerValue::Text("modeling".to_string()),
            &AnswerValue::Text("normalization".to_string())
        ));
    }

    #[test]
    fn different_indexes_do_not_match() {
        assert!(!answers_match(&AnswerValue::Index(1), &AnswerValue::Index(0)));
    }

    #[test]
    fn scoring_is_deterministic() {
        let questions = vec![
            question("q1", AnswerValue::Index(0)),
            question("q2", AnswerValue::Index(1)),
            question("q3", AnswerValue::Text("정규화".to_string())),
        ];
        let answers: HashMap<String, AnswerValue> = [
            ("q1".to_string(), AnswerValue::Index(0)),
            ("q2".to_string(), AnswerValue::Index(3)),
            ("q3".to_string(), AnswerValue::Text("정규화".to_string())),
        ]
        .into();

        let first = score_exam(&questions, &answers, DEFAULT_PASS_SCORE);
        let second = score_exam(&questions, &answers, DEFAULT_PASS_SCORE);
        assert_eq!(first, second);
        assert_eq!(first.raw_correct, 2);
        assert_eq!(first.normalized_score, 67);
        assert!(first.passed);
    }

    #[test]
    fn missing_answers_count_as_incorrect() {
        let questions = vec![
            question("q1", AnswerValue::Index(0)),
            question("q2", AnswerValue::Index(1)),
        ];
        let answers: HashMap<String, AnswerValue> =
            [("q1".to_string(), AnswerValue::Index(0))].into();

        let outcome = score_exam(&questions, &answers, DEFAULT_PASS_SCORE);
        assert_eq!(outcome.raw_correct, 1);
        assert_eq!(outcome.normalized_score, 50);
        assert!(!outcome.passed);
    }

    #[test]
    fn zero_question_exam_scores_zero_and_fails() {
        let outcome = score_exam(&[], &HashMap::new(), DEFAULT_PASS_SCORE);
        assert_eq!(outcome.raw_correct, 0);
        assert_eq!(outcome.normalized_score, 0);
        assert!(!outcome.passed);
    }

    #[test]
    fn custom_pass_score_is_honored() {
        let questions = vec![
            question("q1", AnswerValue::Index(0)),
            question("q2", AnswerValue::Index(1)),
        ];
        let answers: HashMap<String, AnswerValue> =
            [("q1".to_string(), AnswerValue::Index(0))].into();

        // 50 fails the default threshold but passes a threshold of 50.
        let outcome = score_exam(&questions, &answers, 50);
        assert!(outcome.passed);
    }
}
