use crate::deserializer::Deserializer;
use crate::err::{Result, WtsError};
use crate::model::{Block, Record};
use crate::request_filter::RequestFilter;
use crate::settings::{CheckSettings, DumpSettings};
use crate::text_output::{TextOutput, WtsOutput};

use log::{debug, trace, warn};
use quick_xml::events::{BytesStart, Event};
use std::fs;
use std::io::{Read, Write};
use std::path::Path;

/// Mutable context carried across the events of a single document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraversalState {
    /// Name of the last `TransactionTimer` seen.
    pub transaction: String,
    /// Text of the last `Comment` seen.
    pub comment: String,
    /// Set on `<Loop>`, consumed by the next `ConditionalRule`.
    pub in_loop: bool,
}

/// Reads a whole web test script and walks it once per `dump`/`check` call.
///
/// ```
/// use wts::{DumpSettings, WtsParser};
///
/// let script = br#"<WebTest>
///   <Items>
///     <Comment CommentText="[#1] log on" />
///     <Request Method="GET" Url="{{web}}Account/LogOn" ThinkTime="0" Timeout="300" RecordResult="True" ReportingName="" />
///   </Items>
/// </WebTest>"#;
///
/// let parser = WtsParser::from_buffer(script.to_vec())
///     .with_configuration(DumpSettings::new().comment_number_removal(true));
/// let text = String::from_utf8(parser.dump(Vec::new()).unwrap()).unwrap();
///
/// assert_eq!(text, "C: [] log on\r\nG: (0,300) {{web}}Account/LogOn ():True\r\n\r\n");
/// ```
pub struct WtsParser {
    data: Vec<u8>,
    settings: DumpSettings,
}

impl WtsParser {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path).map_err(|source| WtsError::Input {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(WtsParser::from_buffer(data))
    }

    pub fn from_reader(mut input: impl Read) -> Result<Self> {
        let mut data = Vec::new();
        input
            .read_to_end(&mut data)
            .map_err(|source| WtsError::Input {
                path: "-".into(),
                source,
            })?;

        Ok(WtsParser::from_buffer(data))
    }

    pub fn from_buffer(data: Vec<u8>) -> Self {
        WtsParser {
            data,
            settings: DumpSettings::default(),
        }
    }

    pub fn with_configuration(mut self, configuration: DumpSettings) -> Self {
        self.settings = configuration;
        self
    }

    pub fn settings(&self) -> &DumpSettings {
        &self.settings
    }

    /// Renders the whole document to `target`, returning it once the pass is complete.
    pub fn dump<W: Write>(&self, target: W) -> Result<W> {
        let mut output = TextOutput::with_writer(target, &self.settings);
        self.walk(&mut output)?;

        Ok(output.into_writer())
    }

    /// Echoes every request matching `check` to `echo`, returning how many were reported.
    pub fn check<W: Write>(&self, check: &CheckSettings, echo: W) -> Result<usize> {
        let mut filter = RequestFilter::new(&self.settings, check.clone(), echo);
        self.walk(&mut filter)?;

        Ok(filter.reported())
    }

    /// Single forward pass over the document, feeding every decoded record to `output`.
    ///
    /// Malformed markup between recognised elements ends the walk early, malformed markup
    /// inside one is an error.
    pub fn walk<O: WtsOutput>(&self, output: &mut O) -> Result<()> {
        let mut de = Deserializer::from_bytes(&self.data);
        let mut state = TraversalState::default();

        loop {
            let event = match de.read_event() {
                Ok(event) => event,
                Err(e) => {
                    warn!("Offset {}: stopping at malformed markup: {}", de.position(), e);
                    break;
                }
            };

            match event {
                Event::Start(start) => {
                    dispatch_start(&mut de, &start, false, &mut state, output)?;
                }
                Event::Empty(start) => {
                    dispatch_start(&mut de, &start, true, &mut state, output)?;
                }
                Event::End(end) => match end.local_name().as_ref() {
                    b"Condition" => output.visit_close_block(Block::Condition)?,
                    b"Loop" => output.visit_close_block(Block::Loop)?,
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
        }

        output.visit_end_of_stream()
    }
}

fn dispatch_start<'a, O: WtsOutput>(
    de: &mut Deserializer<'a>,
    start: &BytesStart<'a>,
    empty: bool,
    state: &mut TraversalState,
    output: &mut O,
) -> Result<()> {
    trace!(
        "Offset {}: <{}>",
        de.position(),
        String::from_utf8_lossy(start.local_name().as_ref())
    );

    let record = match start.local_name().as_ref() {
        b"Comment" => de.decode_comment(start, empty)?,
        b"ContextParameter" => de.decode_context_parameter(start, empty)?,
        b"DataSource" => de.decode_data_source(start, empty)?,
        b"ConditionalRule" => {
            let record = de.decode_conditional_rule(start, empty, state.in_loop)?;
            state.in_loop = false;
            record
        }
        b"IncludedWebTest" => de.decode_included_web_test(start, empty)?,
        b"Request" => de.decode_request(start, empty)?,
        b"TransactionTimer" => de.decode_transaction_timer(start)?,
        b"ValidationRules" => de.decode_validation_rules(start, empty)?,
        b"Loop" => {
            state.in_loop = true;
            if empty {
                output.visit_close_block(Block::Loop)?;
            }
            return Ok(());
        }
        b"Condition" => {
            if empty {
                output.visit_close_block(Block::Condition)?;
            }
            return Ok(());
        }
        _ => return Ok(()),
    };

    match &record {
        Record::Comment(text) => state.comment.clone_from(text),
        Record::TransactionTimer(name) => {
            debug!("entering transaction `{}`", name);
            state.transaction.clone_from(name);
        }
        _ => {}
    }

    output.visit_record(&record, state)
}
