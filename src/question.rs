use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::FetchError;

/// Question as delivered by the question service. Explanation and link maps are keyed by choice
/// index, which travels as a decimal string key in JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestionPayload {
    pub question: String,
    pub choices: Vec<String>,
    pub correct: usize,
    #[serde(default)]
    pub explanations: BTreeMap<usize, String>,
    #[serde(default)]
    pub links: BTreeMap<usize, Vec<String>>,
}

/// A payload that passed the structural checks: at least one choice and a correct index inside
/// the choice list. Only this type can be installed into a session.
#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    payload: QuestionPayload,
}

impl Question {
    pub fn stem(&self) -> &str {
        &self.payload.question
    }

    pub fn choices(&self) -> &[String] {
        &self.payload.choices
    }

    pub fn choice_count(&self) -> usize {
        self.payload.choices.len()
    }

    pub fn correct_index(&self) -> usize {
        self.payload.correct
    }

    pub fn correct_choice(&self) -> &str {
        &self.payload.choices[self.payload.correct]
    }

    /// Registered explanation for a choice, ignoring blank entries.
    pub fn explanation_for(&self, index: usize) -> Option<&str> {
        self.payload
            .explanations
            .get(&index)
            .map(|text| text.trim())
            .filter(|text| !text.is_empty())
    }

    pub fn links_for(&self, index: usize) -> &[String] {
        self.payload
            .links
            .get(&index)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

impl TryFrom<QuestionPayload> for Question {
    type Error = FetchError;

    fn try_from(payload: QuestionPayload) -> Result<Self, Self::Error> {
        if payload.choices.is_empty() {
            return Err(FetchError::MalformedPayload(
                "question has no choices".to_string(),
            ));
        }
        if payload.correct >= payload.choices.len() {
            return Err(FetchError::MalformedPayload(format!(
                "correct index {} is outside the {} available choices",
                payload.correct,
                payload.choices.len()
            )));
        }
        Ok(Self { payload })
    }
}

/// Decode a response body into a payload, classifying decode failures as contract violations.
pub fn parse_payload(body: &str) -> Result<QuestionPayload, FetchError> {
    serde_json::from_str(body).map_err(|err| FetchError::MalformedPayload(err.to_string()))
}

#[cfg(test)]
pub(crate) fn sample_payload() -> QuestionPayload {
    QuestionPayload {
        question: "Q1".to_string(),
        choices: vec!["a".to_string(), "b".to_string(), "c".to_string()],
        correct: 1,
        explanations: BTreeMap::from([(1, "right".to_string())]),
        links: BTreeMap::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_string_keyed_maps_from_wire_json() {
        let body = r#"{
            "question": "A patient presents with chest pain. What first?",
            "choices": ["A. Catheterization", "B. PFT", "C. Vitals and auscultation", "D. CT"],
            "correct": 2,
            "explanations": {"0": "Too invasive.", "2": "Basic assessment comes first."},
            "links": {"0": ["https://www.heart.org"], "3": ["https://www.radiologyinfo.org"]}
        }"#;

        let payload = parse_payload(body).unwrap();
        assert_eq!(payload.correct, 2);
        assert_eq!(payload.explanations.get(&0).unwrap(), "Too invasive.");
        assert_eq!(payload.links.get(&3).unwrap().len(), 1);

        let question = Question::try_from(payload).unwrap();
        assert_eq!(question.correct_choice(), "C. Vitals and auscultation");
        assert_eq!(question.explanation_for(1), None);
        assert!(question.links_for(2).is_empty());
    }

    #[test]
    fn serializes_back_to_string_keys() {
        let mut payload = sample_payload();
        payload.links.insert(0, vec!["https://apta.org".to_string()]);
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["explanations"]["1"], "right");
        assert_eq!(json["links"]["0"][0], "https://apta.org");
    }

    #[test]
    fn rejects_empty_choices() {
        let mut payload = sample_payload();
        payload.choices.clear();
        payload.correct = 0;
        assert!(matches!(
            Question::try_from(payload),
            Err(FetchError::MalformedPayload(_))
        ));
    }

    #[test]
    fn rejects_correct_index_out_of_range() {
        let mut payload = sample_payload();
        payload.correct = 3;
        assert!(matches!(
            Question::try_from(payload),
            Err(FetchError::MalformedPayload(_))
        ));
    }

    #[test]
    fn undecodable_bodies_are_malformed_not_transport() {
        assert!(matches!(
            parse_payload(r#"{"question": "x", "choices": ["a"], "correct": -1}"#),
            Err(FetchError::MalformedPayload(_))
        ));
        assert!(matches!(
            parse_payload("<html>bad gateway</html>"),
            Err(FetchError::MalformedPayload(_))
        ));
    }

    #[test]
    fn blank_explanations_count_as_missing() {
        let mut payload = sample_payload();
        payload.explanations.insert(0, "   ".to_string());
        let question = Question::try_from(payload).unwrap();
        assert_eq!(question.explanation_for(0), None);
        assert_eq!(question.explanation_for(1), Some("right"));
    }
}
