pub mod chat_log;
pub mod config;
pub mod constants;
pub mod llm_interaction;
pub mod turn;

pub use chat_log::{LogError, Message, UserType};
pub use config::{ConfigError, GenerationParams, TurnConfig, VertexConfig};
pub use llm_interaction::{ChatModel, ChatRequest, ExamplePair, ModelError, ModelErrorKind, VertexChatModel};
pub use turn::{TurnController, TurnError, TurnOutcome};
