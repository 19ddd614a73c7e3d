// Append-only chat log: one JSON message per line, oldest first.
//
// There is no locking. Two processes appending at the same time may
// interleave their lines.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Human,
    Ai,
}

/// A single line of the chat log.
///
/// Human messages usually arrive without `user_type`; it stays `None` and is
/// omitted again when the message is written back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_type: Option<UserType>,
    pub text: String,
}

impl Message {
    pub fn human(user: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            user_type: None,
            text: text.into(),
        }
    }

    pub fn ai(user: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            user_type: Some(UserType::Ai),
            text: text.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum LogError {
    #[error("chat log not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to access chat log {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed message in {} at line {line}: {source}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize message: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl LogError {
    fn io(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            LogError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            LogError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }
}

fn ensure_parent_dir(path: &Path) -> Result<(), LogError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|e| LogError::Io {
                path: parent.to_path_buf(),
                source: e,
            })
        }
        _ => Ok(()),
    }
}

/// Loads every message in the log. The file itself is never created here,
/// only its directory.
pub fn load(path: &Path) -> Result<Vec<Message>, LogError> {
    ensure_parent_dir(path)?;

    let file = File::open(path).map_err(|e| LogError::io(path, e))?;
    let reader = BufReader::new(file);

    let mut messages = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| LogError::io(path, e))?;
        let message = serde_json::from_str::<Message>(line.trim()).map_err(|source| {
            LogError::Parse {
                path: path.to_path_buf(),
                line: idx + 1,
                source,
            }
        })?;
        messages.push(message);
    }

    debug!("Loaded {} messages from {}", messages.len(), path.display());
    Ok(messages)
}

/// Appends one message as a single JSON line, creating the file if needed.
pub fn append(path: &Path, message: &Message) -> Result<(), LogError> {
    ensure_parent_dir(path)?;

    let mut line = serde_json::to_string(message)?;
    line.push('\n');

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| LogError::io(path, e))?;
    file.write_all(line.as_bytes())
        .and_then(|_| file.flush())
        .map_err(|e| LogError::io(path, e))?;

    Ok(())
}
