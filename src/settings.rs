use crate::err::{ConfigError, ConfigResult};
use crate::pipeline::Pipeline;

use regex::Regex;

pub const DEFAULT_CHECK_PATTERN: &str = r"\d\d*/\d\d*/20\d\d|20\d\d-";
pub const DEFAULT_THINK_TIME: i64 = 0;
pub const DEFAULT_MIN_TIMEOUT: i64 = 270;

/// How records are rendered.
#[derive(Debug, Clone, Default)]
pub struct DumpSettings {
    /// Normalizes recording environment noise: timings, host, session identifiers.
    raw: bool,
    /// `[#30]` -> `[]` in comments.
    comment_number_removal: bool,
    /// Replaces and tallies date strings.
    time_string_removal: bool,
    /// Skips entity decoding of string bodies.
    as_is: bool,
    raw_rules: Pipeline,
}

impl DumpSettings {
    pub fn new() -> Self {
        DumpSettings::default()
    }

    pub fn raw(mut self, raw: bool) -> Self {
        self.raw = raw;
        self
    }

    pub fn comment_number_removal(mut self, comment_number_removal: bool) -> Self {
        self.comment_number_removal = comment_number_removal;
        self
    }

    pub fn time_string_removal(mut self, time_string_removal: bool) -> Self {
        self.time_string_removal = time_string_removal;
        self
    }

    pub fn as_is(mut self, as_is: bool) -> Self {
        self.as_is = as_is;
        self
    }

    /// Extra body-fix steps, applied before any other raw mode processing.
    pub fn raw_rules(mut self, raw_rules: Pipeline) -> Self {
        self.raw_rules = raw_rules;
        self
    }

    pub fn get_raw(&self) -> bool {
        self.raw
    }

    /// Raw mode always removes comment numbers.
    pub fn removes_comment_numbers(&self) -> bool {
        self.raw || self.comment_number_removal
    }

    pub fn get_time_string_removal(&self) -> bool {
        self.time_string_removal
    }

    pub fn get_as_is(&self) -> bool {
        self.as_is
    }

    pub fn get_raw_rules(&self) -> &Pipeline {
        &self.raw_rules
    }
}

/// Which requests a check pass reports.
#[derive(Debug, Clone)]
pub struct CheckSettings {
    pattern: Regex,
    think_time: i64,
    min_timeout: i64,
}

impl Default for CheckSettings {
    fn default() -> Self {
        CheckSettings {
            pattern: Regex::new(DEFAULT_CHECK_PATTERN).expect("valid default pattern"),
            think_time: DEFAULT_THINK_TIME,
            min_timeout: DEFAULT_MIN_TIMEOUT,
        }
    }
}

impl CheckSettings {
    pub fn new() -> Self {
        CheckSettings::default()
    }

    pub fn pattern(mut self, pattern: &str) -> ConfigResult<Self> {
        self.pattern = Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
            pattern: pattern.to_owned(),
            source,
        })?;
        Ok(self)
    }

    /// The think time every request is expected to carry.
    pub fn think_time(mut self, think_time: i64) -> Self {
        self.think_time = think_time;
        self
    }

    /// Requests with a smaller timeout are reported.
    pub fn min_timeout(mut self, min_timeout: i64) -> Self {
        self.min_timeout = min_timeout;
        self
    }

    pub fn get_pattern(&self) -> &Regex {
        &self.pattern
    }

    pub fn get_think_time(&self) -> i64 {
        self.think_time
    }

    pub fn get_min_timeout(&self) -> i64 {
        self.min_timeout
    }
}
