use std::panic::Location;
use std::{fmt, sync::Arc};

use tracing::error;

#[derive(Debug, Clone)]
pub enum Cause {
    Any(BotError),
    Std(Arc<dyn std::error::Error + Send + Sync>),
}

#[derive(Debug, Clone)]
pub struct BotError {
    pub key: &'static str,
    pub causes: Vec<Cause>,
    pub file: &'static str,
    pub line: u32,
}

impl BotError {
    #[track_caller]
    #[inline]
    pub fn new(key: &'static str) -> Self {
        let loc = Location::caller();
        Self {
            key,
            causes: Vec::new(),
            file: loc.file(),
            line: loc.line(),
        }
    }

    #[inline]
    pub fn push_any(mut self, cause: BotError) -> Self {
        self.causes.push(Cause::Any(cause));
        self
    }

    #[inline]
    pub fn push_str(mut self, message: impl Into<String>) -> Self {
        self.causes
            .push(Cause::Std(Arc::new(std::io::Error::other(message.into()))));
        self
    }

    #[inline]
    pub fn push_std(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.causes.push(Cause::Std(Arc::new(cause)));
        self
    }

    /// Human readable message of the deepest cause, falling back to the key.
    ///
    /// This is what ends up in user-facing error embeds, so a handler that
    /// fails with `"boom"` shows `boom` rather than the internal key.
    pub fn message(&self) -> String {
        match self.causes.last() {
            Some(Cause::Any(inner)) => inner.message(),
            Some(Cause::Std(e)) => e.to_string(),
            None => self.key.to_string(),
        }
    }

    /// Log the error with an ASCII tree of its causes.
    pub fn log_tree(&self) {
        let mut lines = Vec::new();
        self.collect_causes("", &mut lines);
        if lines.is_empty() {
            error!("{}:{} - {}", self.file, self.line, self.key);
        } else {
            error!("{}:{} - {}\n{}", self.file, self.line, self.key, lines.join("\n"));
        }
    }

    fn collect_causes(&self, prefix: &str, out: &mut Vec<String>) {
        for (i, cause) in self.causes.iter().enumerate() {
            let is_last = i == self.causes.len() - 1;
            let branch = if is_last { "└── " } else { "├── " };
            let extension = if is_last { "    " } else { "│   " };

            match cause {
                Cause::Any(e) => {
                    out.push(format!("{}{}[{}:{}] {}", prefix, branch, e.file, e.line, e.key));
                    e.collect_causes(&format!("{}{}", prefix, extension), out);
                }
                Cause::Std(e) => {
                    out.push(format!("{}{}{}", prefix, branch, e));

                    let mut source = e.source();
                    let mut depth = 0;
                    while let Some(err) = source {
                        out.push(format!("{}{}{}↳ {}", prefix, extension, "  ".repeat(depth), err));
                        source = err.source();
                        depth += 1;
                    }
                }
            }
        }
    }
}

impl fmt::Display for BotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}:{}] {}", self.file, self.line, self.key)?;
        if !self.causes.is_empty() {
            write!(f, ": {}", self.message())?;
        }
        Ok(())
    }
}

impl std::error::Error for BotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.causes.iter().find_map(|c| match c {
            Cause::Any(e) => Some(e as &dyn std::error::Error),
            Cause::Std(e) => Some(e.as_ref() as &(dyn std::error::Error + 'static)),
        })
    }
}

impl From<reqwest::Error> for BotError {
    #[track_caller]
    fn from(e: reqwest::Error) -> Self {
        BotError::new("reqwest").push_std(e)
    }
}

impl From<serde_json::Error> for BotError {
    #[track_caller]
    fn from(e: serde_json::Error) -> Self {
        BotError::new("serde_json").push_std(e)
    }
}

impl From<url::ParseError> for BotError {
    #[track_caller]
    fn from(e: url::ParseError) -> Self {
        BotError::new("url_parse").push_std(e)
    }
}

impl From<hex::FromHexError> for BotError {
    #[track_caller]
    fn from(e: hex::FromHexError) -> Self {
        BotError::new("hex_decode").push_std(e)
    }
}

impl From<ed25519_dalek::SignatureError> for BotError {
    #[track_caller]
    fn from(e: ed25519_dalek::SignatureError) -> Self {
        BotError::new("ed25519").push_std(e)
    }
}

impl From<std::io::Error> for BotError {
    #[track_caller]
    fn from(e: std::io::Error) -> Self {
        BotError::new("io_error").push_std(e)
    }
}

impl From<String> for BotError {
    #[track_caller]
    fn from(s: String) -> Self {
        BotError::new("string_error").push_str(s)
    }
}

impl From<&str> for BotError {
    #[track_caller]
    fn from(s: &str) -> Self {
        BotError::new("str_error").push_str(s)
    }
}

pub type Result<T> = std::result::Result<T, BotError>;
