use crate::models::domain::Language;

pub const EXTRACTION_PROMPT: &str = "Extract all the readable text from this document or image exactly as it appears. Do not summarize, just extract the raw text content.";

pub const TEXT_INPUT_PREFIX: &str = "Analyze the following text:";

pub const SUMMARY_PROMPT: &str = "Please analyze this content and provide a highly organized, structured summary.

Follow this exact structure:
1. **Title**: A clear title for the summary.
2. **Introduction**: A brief overview of what the document is about.
3. **Key Concepts**: A section with bullet points highlighting the most important ideas, definitions, or dates.
4. **Detailed Analysis**: A section breaking down the main topics with bold headings.
5. **Conclusion**: A brief wrap-up.

Use Markdown formatting (## for headers, - for bullets, ** for bold).";

pub fn summary_language_instruction(language: Language) -> String {
    format!(
        "The output summary MUST be in {} language.",
        language.display_name()
    )
}

pub fn quiz_prompt(count: u32, language: Language, schema: &str) -> String {
    format!(
        "Generate {count} multiple-choice questions based on the key concepts in this content. \
Each question should have 4 options and exactly one correct answer. \
Number the questions with unique ids starting at 1. \
The questions, options, and explanation MUST be in {lang} language. \
Return the result as a raw JSON array matching this JSON schema:\n{schema}",
        count = count,
        lang = language.display_name(),
        schema = schema,
    )
}
