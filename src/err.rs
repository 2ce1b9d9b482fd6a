use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type DecodeResult<T> = std::result::Result<T, DecodeError>;
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
pub type Result<T> = std::result::Result<T, WtsError>;

/// Errors raised while turning a recognised element into a `Record`.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Offset {offset}: XML tokenizer failed inside `{element}`: {source}")]
    Xml {
        element: String,
        offset: u64,
        source: quick_xml::Error,
    },

    #[error("Offset {offset}: malformed attribute on `{element}`: {source}")]
    Attribute {
        element: String,
        offset: u64,
        source: quick_xml::events::attributes::AttrError,
    },

    #[error("Offset {offset}: `{element}` is missing required attribute `{attribute}`")]
    MissingAttribute {
        element: String,
        attribute: &'static str,
        offset: u64,
    },

    #[error("Offset {offset}: unknown request method `{method}`, expected `GET` or `POST`")]
    UnknownMethod { method: String, offset: u64 },

    #[error("string body of request `{url}` is not valid base64: {source}")]
    InvalidStringBody {
        url: String,
        source: base64::DecodeError,
    },

    #[error("Reached end of document while decoding `{element}`")]
    UnexpectedEof { element: String },
}

/// Errors in the configuration handed to a pass, reported before any output.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid check pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },

    #[error("failed to read raw-rule file {}: {source}", path.display())]
    RawRuleIo { path: PathBuf, source: io::Error },

    #[error("malformed raw-rule file {}: {source}", path.display())]
    MalformedRawRule {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("invalid rule pattern `{pattern}` in raw-rule file {}: {source}", path.display())]
    InvalidRawRulePattern {
        path: PathBuf,
        pattern: String,
        source: regex::Error,
    },
}

#[derive(Debug, Error)]
pub enum WtsError {
    #[error("Failed to open file {}: {source}", path.display())]
    Input { path: PathBuf, source: io::Error },

    #[error("Failed to decode web test script, caused by:\n\t{0}")]
    Decode(#[from] DecodeError),

    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("An I/O error has occurred while writing output: {0}")]
    Output(#[from] io::Error),
}
