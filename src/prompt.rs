use crate::error::StartupError;

/// Phrase the model is told to put before its answer; the splitter searches for it.
pub const FINAL_ANSWER_KEY: &str = "Final Answer:";

const USER_PROMPT_PLACEHOLDER: &str = "{user_prompt}";
const FINAL_ANSWER_KEY_PLACEHOLDER: &str = "{final_answer_key}";

const REASONING_PROMPT_TEMPLATE: &str = "
Question: {user_prompt}

Think step-by-step and provide your reasoning here:

{final_answer_key}
";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
    final_answer_key: String,
}

impl PromptTemplate {
    /// The step-by-step template ending in [`FINAL_ANSWER_KEY`].
    pub fn reasoning() -> Self {
        Self {
            template: REASONING_PROMPT_TEMPLATE.to_string(),
            final_answer_key: FINAL_ANSWER_KEY.to_string(),
        }
    }

    pub fn new(
        template: impl Into<String>,
        final_answer_key: impl Into<String>,
    ) -> Result<Self, StartupError> {
        let template = template.into();
        let final_answer_key = final_answer_key.into();

        if final_answer_key.is_empty() {
            return Err(StartupError::InvalidTemplate {
                reason: "final answer key must not be empty".to_string(),
            });
        }
        if final_answer_key.contains(USER_PROMPT_PLACEHOLDER) {
            return Err(StartupError::InvalidTemplate {
                reason: format!("final answer key must not contain {USER_PROMPT_PLACEHOLDER}"),
            });
        }
        for placeholder in [USER_PROMPT_PLACEHOLDER, FINAL_ANSWER_KEY_PLACEHOLDER] {
            if !template.contains(placeholder) {
                return Err(StartupError::InvalidTemplate {
                    reason: format!("template is missing {placeholder}"),
                });
            }
        }

        Ok(Self {
            template,
            final_answer_key,
        })
    }

    pub fn final_answer_key(&self) -> &str {
        &self.final_answer_key
    }

    /// Fills in both placeholders. User text is inserted last so it is never re-expanded.
    pub fn format(&self, user_prompt: &str) -> String {
        self.template
            .replace(FINAL_ANSWER_KEY_PLACEHOLDER, &self.final_answer_key)
            .replace(USER_PROMPT_PLACEHOLDER, user_prompt)
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::reasoning()
    }
}

#[cfg(test)]
mod tests {
    use super::{FINAL_ANSWER_KEY, PromptTemplate};
    use crate::error::StartupError;

    #[test]
    fn reasoning_template_formats_question_and_key() {
        let formatted = PromptTemplate::reasoning().format("What is 6 * 7?");
        assert_eq!(
            formatted,
            "\nQuestion: What is 6 * 7?\n\nThink step-by-step and provide your reasoning here:\n\nFinal Answer:\n"
        );
    }

    #[test]
    fn embedded_key_matches_splitter_key() {
        let template = PromptTemplate::reasoning();
        assert_eq!(template.final_answer_key(), FINAL_ANSWER_KEY);
        assert!(template.format("x").contains(template.final_answer_key()));
    }

    #[test]
    fn user_text_with_placeholders_is_inserted_verbatim() {
        let formatted = PromptTemplate::reasoning().format("echo {final_answer_key} {user_prompt}");
        assert!(formatted.contains("Question: echo {final_answer_key} {user_prompt}\n"));
    }

    #[test]
    fn custom_template_uses_its_own_key() {
        let template = PromptTemplate::new("Q: {user_prompt}\nend with {final_answer_key}", "ANSWER>")
            .expect("template should be valid");
        assert_eq!(template.format("hi"), "Q: hi\nend with ANSWER>");
        assert_eq!(template.final_answer_key(), "ANSWER>");
    }

    #[test]
    fn new_rejects_missing_placeholders_and_empty_key() {
        assert!(matches!(
            PromptTemplate::new("no placeholders", FINAL_ANSWER_KEY),
            Err(StartupError::InvalidTemplate { .. })
        ));
        assert!(matches!(
            PromptTemplate::new("{user_prompt}", FINAL_ANSWER_KEY),
            Err(StartupError::InvalidTemplate { .. })
        ));
        assert!(matches!(
            PromptTemplate::new("{user_prompt} {final_answer_key}", ""),
            Err(StartupError::InvalidTemplate { .. })
        ));
        assert!(matches!(
            PromptTemplate::new("{user_prompt} {final_answer_key}", "key {user_prompt}"),
            Err(StartupError::InvalidTemplate { .. })
        ));
    }
}
