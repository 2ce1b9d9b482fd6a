use crate::err::Result;
use crate::model::{Block, Record, Request};
use crate::settings::{CheckSettings, DumpSettings};
use crate::text_output::{LINE_SEPARATOR, TextOutput, WtsOutput};
use crate::wts_parser::TraversalState;

use log::debug;
use std::io::{self, Write};

/// Renders every request like `TextOutput` would, but only echoes the suspicious ones.
///
/// Nothing except reported requests reaches `echo`: structural lines are rendered into a sink.
pub struct RequestFilter<W: Write> {
    renderer: TextOutput<io::Sink>,
    check: CheckSettings,
    echo: W,
    reported: usize,
}

/// Integer value of a think-time or timeout attribute, anything unparsable counts as 0.
fn lenient_int(value: &str) -> i64 {
    value.trim().parse().unwrap_or(0)
}

impl<W: Write> RequestFilter<W> {
    pub fn new(settings: &DumpSettings, check: CheckSettings, echo: W) -> Self {
        RequestFilter {
            renderer: TextOutput::with_writer(io::sink(), settings),
            check,
            echo,
            reported: 0,
        }
    }

    /// Number of requests written to the echo sink so far.
    pub fn reported(&self) -> usize {
        self.reported
    }

    pub fn into_writer(self) -> W {
        self.echo
    }

    pub fn is_reported(&self, request: &Request, block: &str) -> bool {
        let think_time = lenient_int(&request.think_time);
        let timeout = lenient_int(&request.timeout);

        if think_time != self.check.get_think_time() {
            debug!("`{}`: think time {} differs", request.url, think_time);
            return true;
        }
        if timeout < self.check.get_min_timeout() {
            debug!("`{}`: timeout {} is below minimum", request.url, timeout);
            return true;
        }
        if self.check.get_pattern().is_match(block) {
            debug!("`{}`: matches check pattern", request.url);
            return true;
        }

        false
    }
}

impl<W: Write> WtsOutput for RequestFilter<W> {
    fn visit_record(&mut self, record: &Record, state: &TraversalState) -> Result<()> {
        let request = match record {
            Record::Request(request) => request,
            other => return self.renderer.visit_record(other, state),
        };

        let block = self.renderer.render_request(request)?;
        if !self.is_reported(request, &block) {
            return Ok(());
        }

        self.reported += 1;
        let header = [
            self.renderer.transaction_lines(&state.transaction),
            self.renderer.comment_line(&state.comment),
        ];
        for line in &header {
            write!(self.echo, "{}{}", line, LINE_SEPARATOR)?;
        }
        self.echo.write_all(block.as_bytes())?;

        Ok(())
    }

    fn visit_close_block(&mut self, block: Block) -> Result<()> {
        self.renderer.visit_close_block(block)
    }

    fn visit_end_of_stream(&mut self) -> Result<()> {
        self.echo.flush()?;
        Ok(())
    }
}
