#![deny(unused_must_use)]
#![forbid(unsafe_code)]

//! Streaming converter from recorded web test scripts (`.webtest`) to normalized tagged text.

pub use err::{ConfigError, DecodeError, Result, WtsError};
pub use model::{Block, ExtractionRule, Method, ParameterBlock, Record, Request};
pub use pipeline::{Extractor, Pipeline, Step};
pub use raw_rule::{load_raw_rules, parse_raw_rules};
pub use request_filter::RequestFilter;
pub use settings::{CheckSettings, DumpSettings};
pub use text_output::{TextOutput, WtsOutput};
pub use wts_parser::{TraversalState, WtsParser};

pub mod deserializer;
pub mod err;
pub mod model;
pub mod pipeline;
pub mod raw_rule;
pub mod request_filter;
pub mod settings;
pub mod text_output;
pub mod utils;
pub mod wts_parser;

#[cfg(test)]
use std::sync::Once;

#[cfg(test)]
static LOGGER_INIT: Once = Once::new();

// Rust runs the tests concurrently, so unless we synchronize logging access
// it will crash when attempting to run `cargo test` with some logging facilities.
#[cfg(test)]
pub fn ensure_env_logger_initialized() {
    use std::io::Write;

    LOGGER_INIT.call_once(|| {
        let mut builder = env_logger::Builder::from_default_env();
        builder
            .format(|buf, record| writeln!(buf, "[{}] - {}", record.level(), record.args()))
            .init();
    });
}
