// Decides whether the bot owes a reply and, if so, produces and stores it.

use std::path::PathBuf;

use minijinja::{context, Environment};
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::chat_log::{self, LogError, Message};
use crate::config::{GenerationParams, TurnConfig};
use crate::llm_interaction::{ChatModel, ChatRequest, ExamplePair, ModelError};

#[derive(Debug, Error)]
pub enum TurnError {
    #[error(transparent)]
    Log(#[from] LogError),

    #[error("chat log {} has no messages", path.display())]
    EmptyLog { path: PathBuf },

    #[error("model call failed: {0}")]
    Model(#[from] ModelError),

    #[error("bad response from model: {reply:?}")]
    BlockedResponse { reply: String },

    #[error("failed to render chat context: {0}")]
    Template(#[from] minijinja::Error),

    #[error("failed to serialize latest message: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The bot wrote the last message; nothing to answer.
    Skipped,
    /// The reply that was appended to the log.
    Replied(Message),
}

/// Pairs consecutive texts as (input, output). An odd trailing text is dropped.
pub fn pair_examples<S: AsRef<str>>(texts: &[S]) -> Vec<ExamplePair> {
    texts
        .chunks_exact(2)
        .map(|pair| ExamplePair {
            input: pair[0].as_ref().to_string(),
            output: pair[1].as_ref().to_string(),
        })
        .collect()
}

pub fn is_blocked(reply: &str, blocklist: &[String]) -> bool {
    blocklist.iter().any(|bad| bad == reply)
}

/// Expands `{{ user }}` in the context template.
pub fn render_context(template: &str, bot_user: &str) -> Result<String, minijinja::Error> {
    let env = Environment::new();
    env.render_str(template, context! { user => bot_user })
}

pub struct TurnController<M> {
    config: TurnConfig,
    params: GenerationParams,
    model: M,
}

impl<M: ChatModel> TurnController<M> {
    pub fn new(config: TurnConfig, params: GenerationParams, model: M) -> Self {
        Self {
            config,
            params,
            model,
        }
    }

    /// Runs one turn. Either exactly one message is appended or none is.
    #[instrument(skip(self), fields(chat_file = %self.config.chat_file.display(), bot = %self.config.bot_user))]
    pub async fn run(&self) -> Result<TurnOutcome, TurnError> {
        let messages = chat_log::load(&self.config.chat_file)?;

        let (latest, history) = messages.split_last().ok_or_else(|| TurnError::EmptyLog {
            path: self.config.chat_file.clone(),
        })?;

        if latest.user == self.config.bot_user {
            info!("Last message is from '{}', no reply needed", self.config.bot_user);
            return Ok(TurnOutcome::Skipped);
        }

        debug!("Last message is from '{}', generating response", latest.user);

        // Latest turn goes out as its full JSON line, author included.
        // Examples carry text only.
        let latest_line = serde_json::to_string(latest)?;
        debug!("Processing {}", latest_line);

        let texts: Vec<&str> = history.iter().map(|m| m.text.as_str()).collect();
        let request = ChatRequest {
            context: render_context(&self.config.context, &self.config.bot_user)?,
            examples: pair_examples(&texts),
            message: latest_line,
            parameters: self.params,
        };

        let reply = self.model.send_message(&request).await?;

        if is_blocked(&reply, &self.config.blocklist) {
            return Err(TurnError::BlockedResponse { reply });
        }

        let message = Message::ai(self.config.bot_user.clone(), reply);
        chat_log::append(&self.config.chat_file, &message)?;
        info!(model = %self.model.model_id(), "Appended reply to {}", self.config.chat_file.display());

        Ok(TurnOutcome::Replied(message))
    }
}
