// Defaults for the chat log location, bot identity and the Vertex AI model.
// Each one can be overridden from the environment (or a .env file) and again
// on the command line.

use std::env;

lazy_static::lazy_static! {
    pub static ref CHAT_FILE: String = env::var("SLINK_CHAT_FILE").unwrap_or_else(|_| "chats/chat.ndjson".to_string());
    pub static ref BOT_USER: String = env::var("SLINK_BOT_USER").unwrap_or_else(|_| "fraser".to_string());
    pub static ref CHAT_MODEL: String = env::var("SLINK_MODEL").unwrap_or_else(|_| "chat-bison@001".to_string());
    pub static ref LOCATION: String = env::var("SLINK_LOCATION").unwrap_or_else(|_| "us-central1".to_string());
    pub static ref PROJECT_ID: Option<String> = env::var("GOOGLE_CLOUD_PROJECT").ok().filter(|p| !p.is_empty());
    pub static ref ACCESS_TOKEN: Option<String> = env::var("SLINK_ACCESS_TOKEN").ok().filter(|t| !t.is_empty());
    pub static ref VERTEX_ENDPOINT: Option<String> = env::var("SLINK_VERTEX_ENDPOINT").ok().filter(|e| !e.is_empty());
}

/// Persona handed to the model as chat context. `{{ user }}` is the bot's name.
pub const DEFAULT_CONTEXT: &str = "You are {{ user }} a helpful engineering manager of Data Infrastructure at \
Virta Health who responds to slack messages in a single sentence.";

/// Replies the model falls back to when it refuses; never worth posting.
pub const BAD_RESPONSES: &[&str] = &[
    "I'm not able to help with that, as I'm only a language model. If you believe this is an error, please send us your feedback.",
];

pub const DEFAULT_TEMPERATURE: f32 = 0.2;
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 256;
pub const DEFAULT_TOP_P: f32 = 0.8;
pub const DEFAULT_TOP_K: u32 = 40;
