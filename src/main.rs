use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use slink::chat_log::{self, Message};
use slink::config::{GenerationParams, TurnConfig, VertexConfig};
use slink::constants;
use slink::llm_interaction::VertexChatModel;
use slink::turn::{TurnController, TurnOutcome};

// Define the command-line interface structure using clap
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path of the NDJSON chat log.
    #[arg(long, global = true, default_value_t = constants::CHAT_FILE.clone())]
    chat_file: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Answer the last message in the chat log unless the bot wrote it.
    Reply(ReplyArgs),
    /// Append a message from a human participant to the chat log.
    Post {
        #[arg(long, help = "Name of the participant posting the message.")]
        user: String,
        text: String,
    },
    /// Print the chat log.
    Show,
}

#[derive(clap::Args, Debug)]
struct ReplyArgs {
    #[arg(long, default_value_t = constants::BOT_USER.clone(), help = "Name the bot posts under.")]
    user: String,
    #[arg(long, default_value = constants::DEFAULT_CONTEXT, help = "Chat context template; {{ user }} expands to the bot name.")]
    context: String,
    #[arg(long, env = "GOOGLE_CLOUD_PROJECT", help = "Google Cloud project id.")]
    project: Option<String>,
    #[arg(long, default_value_t = constants::LOCATION.clone())]
    location: String,
    #[arg(long, default_value_t = constants::CHAT_MODEL.clone())]
    model: String,
    #[arg(long, env = "SLINK_VERTEX_ENDPOINT", help = "Override the Vertex AI base URL.")]
    endpoint: Option<String>,
    #[arg(long, env = "SLINK_ACCESS_TOKEN", hide_env_values = true, help = "Bearer token; defaults to `gcloud auth print-access-token`.")]
    access_token: Option<String>,
    #[arg(long, default_value_t = constants::DEFAULT_TEMPERATURE)]
    temperature: f32,
    #[arg(long, default_value_t = constants::DEFAULT_MAX_OUTPUT_TOKENS)]
    max_output_tokens: u32,
    #[arg(long, default_value_t = constants::DEFAULT_TOP_P)]
    top_p: f32,
    #[arg(long, default_value_t = constants::DEFAULT_TOP_K)]
    top_k: u32,
}

async fn reply(chat_file: PathBuf, args: ReplyArgs) -> Result<()> {
    let params = GenerationParams {
        temperature: args.temperature,
        max_output_tokens: args.max_output_tokens,
        top_p: args.top_p,
        top_k: args.top_k,
    };
    params.validate().context("Invalid generation parameters")?;

    let defaults = VertexConfig::default();
    let vertex = VertexConfig {
        project_id: args.project.or(defaults.project_id),
        location: args.location,
        model: args.model,
        endpoint: args.endpoint.or(defaults.endpoint),
        access_token: args.access_token.or(defaults.access_token),
    };
    let model = VertexChatModel::new(vertex).context("Failed to configure the Vertex AI chat model")?;

    let config = TurnConfig {
        chat_file,
        bot_user: args.user,
        context: args.context,
        ..TurnConfig::default()
    };

    let controller = TurnController::new(config, params, model);
    match controller.run().await.context("Failed to reply to the chat")? {
        TurnOutcome::Skipped => info!("Nothing to answer"),
        TurnOutcome::Replied(message) => info!(text = %message.text, "Replied"),
    }
    Ok(())
}

// The main entry point of the application, using tokio's async runtime
#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (project id, access token, ...)
    dotenvy::dotenv().ok();

    // Reads log level from RUST_LOG (e.g., RUST_LOG=slink=debug). Logs go to
    // stderr so `show` output stays clean.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let chat_file = PathBuf::from(&cli.chat_file);

    match cli.command {
        Commands::Reply(args) => reply(chat_file, args).await?,
        Commands::Post { user, text } => {
            chat_log::append(&chat_file, &Message::human(user, text))
                .with_context(|| format!("Failed to append to {}", chat_file.display()))?;
        }
        Commands::Show => {
            let messages = chat_log::load(&chat_file)
                .with_context(|| format!("Failed to load {}", chat_file.display()))?;
            for message in messages {
                println!("{}: {}", message.user, message.text);
            }
        }
    }

    Ok(())
}
