//! Composable string transforms.
//!
//! A [`Pipeline`] is an ordered list of [`Step`]s, each a pure `&str -> String` function.
//! Steps run strictly in registration order, the output of one feeding the next.
//! Pipelines are cheap to clone, so a specialised variant can be derived from a generic one
//! without touching the original:
//!
//! ```
//! use wts::pipeline::Pipeline;
//!
//! let minify = Pipeline::minifier();
//! let split = minify.clone().replace_all("/><", "/>|<");
//!
//! assert_eq!(minify.apply("<A/>\n  <B/>"), "<A/><B/>");
//! assert_eq!(split.apply("<A/>\n  <B/>"), "<A/>|<B/>");
//! ```

use std::borrow::Cow;

use regex::Regex;

use crate::utils::{LINE_BREAK_PATTERN, unescape_entities};

#[derive(Debug, Clone)]
pub enum Step {
    /// Literal substring, global.
    Replace { from: String, to: String },
    /// Regular expression, global, with `$1`/`${name}` back-references in the template.
    RegexReplace { regex: Regex, template: String },
    /// HTML/XML entity references (`&lt;`, `&#34;`, `&nbsp;`, ...).
    Unescape,
}

impl Step {
    pub fn apply<'a>(&self, input: &'a str) -> Cow<'a, str> {
        match self {
            Step::Replace { from, to } => {
                if from.is_empty() || !input.contains(from.as_str()) {
                    Cow::Borrowed(input)
                } else {
                    Cow::Owned(input.replace(from.as_str(), to))
                }
            }
            Step::RegexReplace { regex, template } => regex.replace_all(input, template.as_str()),
            Step::Unescape => unescape_entities(input),
        }
    }
}

/// Whole-string filter: steps applied in sequence.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    steps: Vec<Step>,
}

impl Pipeline {
    pub fn new() -> Self {
        Pipeline::default()
    }

    /// Collapses line breaks and the indentation following them.
    pub fn minifier() -> Self {
        let mut pipeline = Pipeline::new();
        pipeline.push(Step::RegexReplace {
            regex: Regex::new(LINE_BREAK_PATTERN).expect("valid regex"),
            template: String::new(),
        });
        pipeline
    }

    pub fn push(&mut self, step: Step) {
        self.steps.push(step);
    }

    pub fn replace_all(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.push(Step::Replace {
            from: from.into(),
            to: to.into(),
        });
        self
    }

    pub fn regex_replace_all(
        mut self,
        pattern: &str,
        template: impl Into<String>,
    ) -> Result<Self, regex::Error> {
        self.push(Step::RegexReplace {
            regex: Regex::new(pattern)?,
            template: template.into(),
        });
        Ok(self)
    }

    pub fn unescape(mut self) -> Self {
        self.push(Step::Unescape);
        self
    }

    /// Appends all steps of `other` after the steps of `self`.
    pub fn extend(mut self, other: &Pipeline) -> Self {
        self.steps.extend(other.steps.iter().cloned());
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn apply(&self, input: &str) -> String {
        let mut current = Cow::Borrowed(input);
        for step in &self.steps {
            let changed = match step.apply(&current) {
                Cow::Borrowed(_) => continue,
                Cow::Owned(changed) => changed,
            };
            current = Cow::Owned(changed);
        }
        current.into_owned()
    }
}

/// Capturing filter: yields the first capture group of the first match, or an empty string.
#[derive(Debug, Clone)]
pub struct Extractor {
    regex: Regex,
}

impl Extractor {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Extractor {
            regex: Regex::new(pattern)?,
        })
    }

    pub fn apply<'a>(&self, input: &'a str) -> &'a str {
        self.regex
            .captures(input)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
            .unwrap_or("")
    }
}
