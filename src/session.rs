use futures::StreamExt;
use std::io::Write;
use tracing::{debug, warn};

use crate::config::{Config, FailedTurnPolicy};
use crate::error::TurnError;
use crate::inference::{GenerationRequest, InferenceClient};
use crate::model::{ConversationHistory, Message};
use crate::prompt::PromptTemplate;
use crate::splitter::{SplitResponse, split_response};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationSettings {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl From<&Config> for GenerationSettings {
    fn from(cfg: &Config) -> Self {
        Self {
            max_tokens: cfg.max_tokens,
            temperature: cfg.temperature,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnReply {
    /// Unsplit model output, as stored in history.
    pub raw: String,
    pub split: SplitResponse,
}

/// Everything one chat session needs: the model client, the prompt template and the history.
pub struct Session<C> {
    client: C,
    template: PromptTemplate,
    history: ConversationHistory,
    settings: GenerationSettings,
    failed_turn_policy: FailedTurnPolicy,
}

impl<C> Session<C>
where
    C: InferenceClient,
{
    pub fn new(
        client: C,
        template: PromptTemplate,
        settings: GenerationSettings,
        failed_turn_policy: FailedTurnPolicy,
    ) -> Self {
        Self {
            client,
            template,
            history: ConversationHistory::new(),
            settings,
            failed_turn_policy,
        }
    }

    pub fn from_config(client: C, cfg: &Config) -> Self {
        Self::new(
            client,
            PromptTemplate::reasoning(),
            GenerationSettings::from(cfg),
            cfg.failed_turn_policy,
        )
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    pub fn model(&self) -> &str {
        self.client.model()
    }

    pub fn template(&self) -> &PromptTemplate {
        &self.template
    }

    /// Sends one question, echoing fragments to `out` as they arrive.
    ///
    /// The assistant message is appended only when the whole stream succeeds.
    pub async fn run_turn<W>(&mut self, user_input: &str, out: &mut W) -> Result<TurnReply, TurnError>
    where
        W: Write + ?Sized,
    {
        let formatted = self.template.format(user_input);
        self.history.push(Message::user(formatted));

        let result = self.stream_reply(out).await;
        let raw = match result {
            Ok(raw) => raw,
            Err(err) => {
                if matches!(err, TurnError::Invocation(_))
                    && self.failed_turn_policy == FailedTurnPolicy::Rollback
                {
                    self.history.pop_unanswered_user();
                }
                warn!(
                    error = %err,
                    policy = self.failed_turn_policy.as_str(),
                    history_len = self.history.len(),
                    "turn failed"
                );
                return Err(err);
            }
        };

        let split = split_response(&raw, self.template.final_answer_key());
        self.history.push(Message::assistant(raw.clone()));
        debug!(
            response_len = raw.len(),
            delimiter_found = raw.contains(self.template.final_answer_key()),
            history_len = self.history.len(),
            "turn completed"
        );
        Ok(TurnReply { raw, split })
    }

    async fn stream_reply<W>(&self, out: &mut W) -> Result<String, TurnError>
    where
        W: Write + ?Sized,
    {
        let request = GenerationRequest {
            messages: self.history.messages(),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            stream: true,
        };

        let mut fragments = self.client.generate(request).await?;
        let mut full_content = String::new();
        while let Some(fragment) = fragments.next().await {
            let fragment = fragment?;
            out.write_all(fragment.as_bytes())?;
            out.flush()?;
            full_content.push_str(&fragment);
        }
        Ok(full_content)
    }
}
