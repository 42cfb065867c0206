use crate::question::Question;

/// Coarse single-question mastery signal. Placeholder values kept for parity with the web client;
/// they are not a statistical estimate.
pub const MASTERY_WHEN_CORRECT: f32 = 0.8;
pub const MASTERY_WHEN_INCORRECT: f32 = 0.2;

const CORRECT_MARKER: &str = "✅ Correct!";
const INCORRECT_MARKER: &str = "❌ Incorrect.";
const CORRECT_FALLBACK: &str = "This is the right answer.";
const INCORRECT_FALLBACK: &str = "This is not the correct answer.";
const REVIEW_FALLBACK: &str = "Please review this topic.";

/// Outcome of checking one answer against the data shipped with the question.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerValidation {
    pub correct: bool,
    pub explanation: String,
    pub suggest_remediation: bool,
    pub mastery_level: f32,
}

/// Check `selected_index` against `question`. The caller guarantees the index is one of the
/// question's own choices.
pub fn evaluate(question: &Question, selected_index: usize) -> AnswerValidation {
    debug_assert!(
        selected_index < question.choice_count(),
        "selected index {} outside {} choices",
        selected_index,
        question.choice_count()
    );

    let correct = selected_index == question.correct_index();
    let selected_explanation = question.explanation_for(selected_index);

    let explanation = if correct {
        format!(
            "{} {}",
            CORRECT_MARKER,
            selected_explanation.unwrap_or(CORRECT_FALLBACK)
        )
    } else {
        format!(
            "{} {} The correct answer is: {}. {}",
            INCORRECT_MARKER,
            selected_explanation.unwrap_or(INCORRECT_FALLBACK),
            question.correct_choice(),
            question
                .explanation_for(question.correct_index())
                .unwrap_or(REVIEW_FALLBACK)
        )
    };

    AnswerValidation {
        correct,
        explanation,
        suggest_remediation: !correct,
        mastery_level: if correct {
            MASTERY_WHEN_CORRECT
        } else {
            MASTERY_WHEN_INCORRECT
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::question::{QuestionPayload, sample_payload};
    use std::collections::BTreeMap;

    fn question(payload: QuestionPayload) -> Question {
        Question::try_from(payload).unwrap()
    }

    #[test]
    fn correct_answer_uses_registered_explanation() {
        let result = evaluate(&question(sample_payload()), 1);
        assert!(result.correct);
        assert!(!result.suggest_remediation);
        assert_eq!(result.mastery_level, MASTERY_WHEN_CORRECT);
        assert_eq!(result.explanation, "✅ Correct! right");
    }

    #[test]
    fn incorrect_answer_names_the_correct_choice() {
        let result = evaluate(&question(sample_payload()), 0);
        assert!(!result.correct);
        assert!(result.suggest_remediation);
        assert_eq!(result.mastery_level, MASTERY_WHEN_INCORRECT);
        assert_eq!(
            result.explanation,
            "❌ Incorrect. This is not the correct answer. The correct answer is: b. right"
        );
    }

    #[test]
    fn falls_back_when_nothing_is_registered() {
        let mut payload = sample_payload();
        payload.explanations = BTreeMap::new();
        let q = question(payload);

        assert_eq!(evaluate(&q, 1).explanation, "✅ Correct! This is the right answer.");
        assert_eq!(
            evaluate(&q, 2).explanation,
            "❌ Incorrect. This is not the correct answer. The correct answer is: b. Please review this topic."
        );
    }

    #[test]
    fn every_wrong_index_suggests_remediation() {
        let payload = QuestionPayload {
            question: "Which test confirms a high ankle sprain?".to_string(),
            choices: vec![
                "A. Talar tilt".to_string(),
                "B. Anterior drawer".to_string(),
                "C. Thompson".to_string(),
                "D. Kleiger".to_string(),
            ],
            correct: 3,
            explanations: BTreeMap::from([
                (0, "Lateral ligament test.".to_string()),
                (3, "External rotation stress of the syndesmosis.".to_string()),
            ]),
            links: BTreeMap::new(),
        };
        let q = question(payload);

        for index in 0..q.choice_count() {
            let result = evaluate(&q, index);
            assert_eq!(result.correct, index == 3);
            assert_eq!(result.suggest_remediation, index != 3);
        }
        assert!(evaluate(&q, 0).explanation.contains("Lateral ligament test."));
        assert!(evaluate(&q, 0).explanation.contains("D. Kleiger"));
    }

    #[test]
    fn evaluation_is_deterministic() {
        let q = question(sample_payload());
        for index in 0..q.choice_count() {
            assert_eq!(evaluate(&q, index), evaluate(&q, index));
        }
    }
}
