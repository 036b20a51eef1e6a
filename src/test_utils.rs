use crate::models::domain::{FileData, HistoryItem, Language, QuizQuestion, QuizSet};

#[cfg(test)]
pub mod fixtures {
    use super::*;

    use async_trait::async_trait;

    use crate::errors::{AppError, AppResult};
    use crate::services::model_service::{DocumentIntelligence, StudySource};

    /// A small PDF-typed upload named `notes.pdf`.
    pub fn sample_file() -> FileData {
        FileData::new(b"%PDF-1.4 sample".to_vec(), "application/pdf", "notes.pdf")
    }

    /// Questions with ids `1..=count`, each with four options.
    pub fn sample_quiz_set(count: usize) -> QuizSet {
        let questions = (1..=count as u32)
            .map(|id| {
                QuizQuestion::new(
                    id,
                    &format!("Question {}?", id),
                    ["Alpha", "Beta", "Gamma", "Delta"],
                    id as usize % 4,
                    &format!("Explanation {}", id),
                )
            })
            .collect();
        QuizSet::new(questions).expect("sample ids are unique")
    }

    /// History entry whose stored size grows with `payload_len`.
    pub fn sample_history_item(owner: &str, payload_len: usize) -> HistoryItem {
        let file = FileData::new(vec![b'x'; payload_len], "application/pdf", "notes.pdf");
        HistoryItem::new(owner, file, "", None, None, Language::En)
    }

    /// Provider stand-in that answers with canned responses; anything not
    /// configured fails as a generation error.
    #[derive(Default)]
    pub struct ScriptedProvider {
        extraction: Option<String>,
        summary: Option<String>,
        quiz: Option<QuizSet>,
    }

    impl ScriptedProvider {
        pub fn with_extraction(mut self, text: &str) -> Self {
            self.extraction = Some(text.to_string());
            self
        }

        pub fn with_summary(mut self, text: &str) -> Self {
            self.summary = Some(text.to_string());
            self
        }

        pub fn with_quiz(mut self, quiz: QuizSet) -> Self {
            self.quiz = Some(quiz);
            self
        }
    }

    fn unscripted(what: &str) -> AppError {
        AppError::GenerationFailed(format!("No scripted {} response", what))
    }

    #[async_trait]
    impl DocumentIntelligence for ScriptedProvider {
        async fn extract_text(&self, _file: &FileData) -> AppResult<String> {
            self.extraction.clone().ok_or_else(|| unscripted("extraction"))
        }

        async fn summarize(&self, _source: &StudySource, _language: Language) -> AppResult<String> {
            self.summary.clone().ok_or_else(|| unscripted("summary"))
        }

        async fn generate_quiz(
            &self,
            _source: &StudySource,
            _count: u32,
            _language: Language,
        ) -> AppResult<QuizSet> {
            self.quiz.clone().ok_or_else(|| unscripted("quiz"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;

    #[test]
    fn sample_quiz_set_has_unique_ids() {
        let quiz = sample_quiz_set(6);
        let ids: Vec<u32> = quiz.ids().collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5, 6]);
        assert!(quiz.questions().iter().all(|q| q.has_option(q.correct_answer_index)));
    }

    #[test]
    fn sample_history_item_carries_payload() {
        let item = sample_history_item("u-1", 12);
        assert_eq!(item.file_data.bytes.len(), 12);
        assert!(item.owned_by("u-1"));
    }
}
