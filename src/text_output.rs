use crate::err::{DecodeError, DecodeResult, Result};
use crate::model::{Block, Method, Record, Request};
use crate::pipeline::{Extractor, Pipeline};
use crate::settings::DumpSettings;
use crate::utils::{decode_string_body, minify, unescape_entities};
use crate::wts_parser::TraversalState;

use log::{debug, trace};
use regex::Regex;
use std::collections::BTreeMap;
use std::io::Write;
use std::sync::LazyLock;

pub const LINE_SEPARATOR: &str = "\r\n";

pub const TIME_STRING_PLACEHOLDER: &str = "-time-string-";
pub const HOST_PLACEHOLDER: &str = "-host-";
pub const SESSION_TICKET_PLACEHOLDER: &str = "-session-ticket-";
pub const CLIENT_BROWSER_ID_PLACEHOLDER: &str = "-client-browser-id-";

static COMMENT_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[#\d+]").expect("valid regex"));

static TIME_STRING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(20\d{2}-\d{1,2}-\d{1,2}[T0-9:.]*|\d{1,2}/\d{1,2}/20\d{2})").expect("valid regex")
});

static HOST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://[^/]*?\w+\.\w+\.com").expect("valid regex"));

static SESSION_TICKET: LazyLock<Extractor> = LazyLock::new(|| {
    Extractor::new("<SessionTicket>(.*?)</SessionTicket>").expect("valid regex")
});

static CLIENT_BROWSER_ID: LazyLock<Extractor> =
    LazyLock::new(|| Extractor::new("force/u/([^/]+)/").expect("valid regex"));

// Every `/>`-terminated query string parameter on its own `Q:` line.
static QUERY_SPLIT: LazyLock<Pipeline> = LazyLock::new(|| {
    Pipeline::minifier()
        .regex_replace_all(r"/>\s*<", format!("/>{}  Q: <", LINE_SEPARATOR))
        .expect("valid regex")
});

// The order of these substitutions matters, each one works on what the previous left over.
static CORE_SERVICE: LazyLock<Pipeline> = LazyLock::new(|| {
    Pipeline::new()
        .regex_replace_all(
            r".*(Get)</ReadableRequestName><RequestName>(.*?)</RequestName>.*",
            "${1}.${2}",
        )
        .and_then(|p| p.regex_replace_all(r".*<ReadableCorrelator>|</ReadableCorrelator>.*", ""))
        .and_then(|p| p.regex_replace_all(r".*<ReadableRequestName>|</ReadableRequestName>.*", ""))
        .expect("valid regex")
});

/// Removes bracketed comment numbers, `[#30]` becomes `[]`.
pub fn remove_comment_numbers(comment: &str) -> String {
    COMMENT_NUMBER_RE.replace_all(comment, "[]").into_owned()
}

/// Short label summarising a POST body, empty when the body carries no readable name markup.
pub fn core_service(body: &str) -> String {
    let label = CORE_SERVICE.apply(body);
    if label == body {
        return String::new();
    }

    minify(label.trim()).into_owned()
}

/// Receives the decoded structure of a web test script, one record at a time, in document order.
pub trait WtsOutput {
    /// Called as soon as a recognised element has been fully decoded.
    fn visit_record(&mut self, record: &Record, state: &TraversalState) -> Result<()>;

    /// Called on `</Condition>` and `</Loop>`.
    fn visit_close_block(&mut self, block: Block) -> Result<()>;

    /// Called once when the end of the document is reached.
    fn visit_end_of_stream(&mut self) -> Result<()>;
}

/// A value captured the first time its pattern matches, then substituted everywhere.
#[derive(Debug)]
struct Latch {
    extractor: &'static Extractor,
    placeholder: &'static str,
    value: Option<String>,
}

impl Latch {
    fn new(extractor: &'static Extractor, placeholder: &'static str) -> Self {
        Latch {
            extractor,
            placeholder,
            value: None,
        }
    }

    fn discover(&mut self, text: &str, pipeline: &mut Pipeline) {
        if self.value.is_some() {
            return;
        }

        let found = self.extractor.apply(text);
        if found.is_empty() {
            return;
        }

        debug!("latched `{}` for {}", found, self.placeholder);
        *pipeline = std::mem::take(pipeline).replace_all(found, self.placeholder);
        self.value = Some(found.to_owned());
    }
}

/// Per-pass raw mode state: the body-fix transforms and the discovered-once identifiers.
#[derive(Debug)]
struct RawContext {
    body_fix: Pipeline,
    session_ticket: Latch,
    client_browser_id: Latch,
}

impl RawContext {
    fn new(rules: &Pipeline) -> Self {
        RawContext {
            body_fix: rules.clone(),
            session_ticket: Latch::new(&SESSION_TICKET, SESSION_TICKET_PLACEHOLDER),
            client_browser_id: Latch::new(&CLIENT_BROWSER_ID, CLIENT_BROWSER_ID_PLACEHOLDER),
        }
    }
}

/// Renders records as tagged text lines.
pub struct TextOutput<W: Write> {
    writer: W,
    settings: DumpSettings,
    raw: RawContext,
    dates: BTreeMap<String, usize>,
}

impl<W: Write> TextOutput<W> {
    pub fn with_writer(target: W, settings: &DumpSettings) -> Self {
        TextOutput {
            writer: target,
            settings: settings.clone(),
            raw: RawContext::new(settings.get_raw_rules()),
            dates: BTreeMap::new(),
        }
    }

    pub fn into_writer(self) -> W {
        self.writer
    }

    /// Every date-like string seen so far, with its number of occurrences.
    pub fn date_strings(&self) -> &BTreeMap<String, usize> {
        &self.dates
    }

    fn write_lines(&mut self, lines: &[&str]) -> Result<()> {
        for line in lines {
            write!(self.writer, "{}{}", line, LINE_SEPARATOR)?;
        }
        Ok(())
    }

    pub fn comment_line(&self, comment: &str) -> String {
        if self.settings.removes_comment_numbers() {
            format!("C: {}", remove_comment_numbers(comment))
        } else {
            format!("C: {}", comment)
        }
    }

    /// Blank separator line followed by the transaction header.
    pub fn transaction_lines(&self, transaction: &str) -> String {
        format!("{}T: {}", LINE_SEPARATOR, transaction)
    }

    fn collect_time_strings(&mut self, text: &str) -> String {
        if !self.settings.get_time_string_removal() {
            return text.to_owned();
        }

        for m in TIME_STRING_RE.find_iter(text) {
            *self.dates.entry(m.as_str().to_owned()).or_insert(0) += 1;
        }
        TIME_STRING_RE
            .replace_all(text, TIME_STRING_PLACEHOLDER)
            .into_owned()
    }

    fn render_addons(&self, request: &Request) -> String {
        let mut addons = String::new();
        let mut line = |s: String| {
            addons.push_str(&s);
            addons.push_str(LINE_SEPARATOR);
        };

        if !request.query_string.trim().is_empty() {
            line(format!("  Q: {}", QUERY_SPLIT.apply(&request.query_string)));
        }
        let form_post = minify(&request.form_post);
        if !form_post.trim().is_empty() {
            line(format!("  F: {}", form_post));
        }
        for plugin in &request.plugins {
            line(format!("  R: ({}) {}", plugin.name, minify(&plugin.parameters)));
        }
        for rule in &request.extraction_rules {
            line(format!(
                "  E: ({}: {}) {}",
                rule.block.name,
                rule.variable_name,
                minify(&rule.block.parameters)
            ));
        }
        for rule in &request.validation_rules {
            line(format!("  V: ({}) {}", rule.name, minify(&rule.parameters)));
        }

        addons
    }

    /// Renders a whole request block: header, body (POST only), addons and the closing blank line.
    pub fn render_request(&mut self, request: &Request) -> DecodeResult<String> {
        let raw = self.settings.get_raw();

        let (think_time, timeout) = if raw {
            ("0", "0")
        } else {
            (request.think_time.as_str(), request.timeout.as_str())
        };

        let decoded = match request.string_body.as_deref().filter(|b| !b.is_empty()) {
            Some(encoded) => Some(decode_string_body(encoded).map_err(|source| {
                DecodeError::InvalidStringBody {
                    url: request.url.clone(),
                    source,
                }
            })?),
            None => None,
        };

        // Both identifiers must be latched before the URL goes through the body fix.
        let url = if raw {
            if let Some(decoded) = &decoded {
                self.raw
                    .session_ticket
                    .discover(decoded, &mut self.raw.body_fix);
            }
            self.raw
                .client_browser_id
                .discover(&request.url, &mut self.raw.body_fix);
            let url = HOST_RE.replace(&request.url, HOST_PLACEHOLDER);
            self.raw.body_fix.apply(&url)
        } else {
            request.url.clone()
        };

        let mut body = None;
        let mut label = String::new();
        if let Some(decoded) = decoded {
            let mut text = if self.settings.get_as_is() {
                decoded
            } else {
                unescape_entities(&decoded).into_owned()
            };
            if raw {
                text = self.raw.body_fix.apply(&text);
                label = core_service(&text);
            }
            body = Some(self.collect_time_strings(&text));
        }

        let mut block = match request.method {
            Method::Get => format!(
                "{}: ({},{}) {} ({}):{}",
                Method::Get.tag(),
                think_time,
                timeout,
                url,
                request.reporting_name,
                request.record_result
            ),
            Method::Post => format!(
                "{}: ({},{}) {} {} ({}):{}",
                Method::Post.tag(),
                think_time,
                timeout,
                url,
                label,
                request.reporting_name,
                request.record_result
            ),
        };
        block.push_str(LINE_SEPARATOR);

        if let Some(body) = body {
            block.push_str(&body);
            block.push_str(LINE_SEPARATOR);
        }

        let mut addons = self.render_addons(request);
        if raw {
            addons = self.raw.body_fix.apply(&addons);
        }
        block.push_str(&self.collect_time_strings(&addons));
        block.push_str(LINE_SEPARATOR);

        Ok(block)
    }
}

impl<W: Write> WtsOutput for TextOutput<W> {
    fn visit_record(&mut self, record: &Record, _state: &TraversalState) -> Result<()> {
        trace!("visit_record: {:?}", record);
        match record {
            Record::Comment(text) => {
                let line = self.comment_line(text);
                self.write_lines(&[&line])
            }
            Record::ContextParameter { name, value } => {
                self.write_lines(&[&format!("CP: {}={}", name, value)])
            }
            Record::DataSource {
                name,
                connection,
                tables,
            } => self.write_lines(&[&format!("DS: ({}, {}) {}", name, connection, minify(tables))]),
            Record::ConditionalRule { rule, in_loop } => {
                let marker = if *in_loop { "LP" } else { "CB" };
                let line = format!("{}: ({}) {}", marker, rule.name, minify(&rule.parameters));
                self.write_lines(&["", "<=", &line])
            }
            Record::IncludedWebTest(name) => self.write_lines(&[&format!("I: {}", name)]),
            Record::Request(request) => {
                let block = self.render_request(request)?;
                self.writer.write_all(block.as_bytes())?;
                Ok(())
            }
            Record::TransactionTimer(name) => {
                let lines = self.transaction_lines(name);
                self.write_lines(&[&lines])
            }
            Record::ValidationRules(rules) => {
                for rule in rules {
                    let line = format!("VR: ({}) {}", rule.name, minify(&rule.parameters));
                    self.write_lines(&[&line])?;
                }
                Ok(())
            }
        }
    }

    fn visit_close_block(&mut self, block: Block) -> Result<()> {
        trace!("visit_close_block: {:?}", block);
        match block {
            Block::Condition => self.write_lines(&["CE: ", "=>", ""]),
            Block::Loop => self.write_lines(&["LP: ", "=>", ""]),
        }
    }

    fn visit_end_of_stream(&mut self) -> Result<()> {
        trace!("visit_end_of_stream");
        if self.settings.get_time_string_removal() {
            let lines: Vec<String> = self
                .dates
                .iter()
                .map(|(date, count)| format!("TS: {}: {}", date, count))
                .collect();
            for line in &lines {
                self.write_lines(&[line])?;
            }
        }
        self.writer.flush()?;
        Ok(())
    }
}
