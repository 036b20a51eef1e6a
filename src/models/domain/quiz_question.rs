use serde::{Deserialize, Serialize};

/// Number of options every generated question carries.
pub const OPTION_COUNT: usize = 4;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub id: u32,
    pub question: String,
    pub options: Vec<String>, // index is the answer key
    pub correct_answer_index: usize,
    pub explanation: String,
}

impl QuizQuestion {
    pub fn new(
        id: u32,
        question: &str,
        options: [&str; OPTION_COUNT],
        correct_answer_index: usize,
        explanation: &str,
    ) -> Self {
        QuizQuestion {
            id,
            question: question.to_string(),
            options: options.iter().map(|o| o.to_string()).collect(),
            correct_answer_index,
            explanation: explanation.to_string(),
        }
    }

    pub fn is_correct(&self, selected: Option<usize>) -> bool {
        selected == Some(self.correct_answer_index)
    }

    pub fn has_option(&self, index: usize) -> bool {
        index < self.options.len()
    }

    /// Letter shown next to an option (`A`..`D`).
    pub fn option_label(index: usize) -> char {
        (b'A' + (index % 26) as u8) as char
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question() -> QuizQuestion {
        QuizQuestion::new(
            7,
            "Which planet is closest to the sun?",
            ["Venus", "Mercury", "Earth", "Mars"],
            1,
            "Mercury orbits closest to the sun.",
        )
    }

    #[test]
    fn quiz_question_serializes_with_camel_case_keys() {
        let json = serde_json::to_value(question()).expect("question should serialize");

        assert_eq!(json["correctAnswerIndex"], 1);
        assert_eq!(json["options"].as_array().map(|o| o.len()), Some(4));
    }

    #[test]
    fn unanswered_question_is_not_correct() {
        let q = question();

        assert!(q.is_correct(Some(1)));
        assert!(!q.is_correct(Some(0)));
        assert!(!q.is_correct(None));
    }

    #[test]
    fn option_labels_follow_alphabet() {
        assert_eq!(QuizQuestion::option_label(0), 'A');
        assert_eq!(QuizQuestion::option_label(3), 'D');
        assert!(question().has_option(3));
        assert!(!question().has_option(4));
    }
}
