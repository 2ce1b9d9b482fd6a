use crate::err::{DecodeError, DecodeResult};
use crate::model::{ExtractionRule, Method, ParameterBlock, Record, Request};

use log::trace;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

fn element_name(start: &BytesStart) -> String {
    String::from_utf8_lossy(start.name().as_ref()).into_owned()
}

/// Forward-only decoder over a web test script.
///
/// The dispatcher pulls structural events with [`Deserializer::read_event`] and hands every
/// recognised start tag back to one of the `decode_*` methods, which consume the element up to
/// and including its closing tag.
pub struct Deserializer<'a> {
    reader: Reader<&'a [u8]>,
}

impl<'a> Deserializer<'a> {
    pub fn from_bytes(data: &'a [u8]) -> Self {
        let mut reader = Reader::from_reader(data);
        reader.config_mut().trim_text(false);

        Deserializer { reader }
    }

    pub fn read_event(&mut self) -> quick_xml::Result<Event<'a>> {
        self.reader.read_event()
    }

    pub fn position(&self) -> u64 {
        self.reader.buffer_position() as u64
    }

    fn xml_error(&self, start: &BytesStart, source: quick_xml::Error) -> DecodeError {
        DecodeError::Xml {
            element: element_name(start),
            offset: self.position(),
            source,
        }
    }

    fn attribute(&self, start: &BytesStart<'a>, name: &str) -> DecodeResult<Option<String>> {
        for attr in start.attributes() {
            let attr = attr.map_err(|source| DecodeError::Attribute {
                element: element_name(start),
                offset: self.position(),
                source,
            })?;

            if attr.key.local_name().as_ref() == name.as_bytes() {
                let value = attr
                    .unescape_value()
                    .map_err(|e| self.xml_error(start, e))?;
                return Ok(Some(value.into_owned()));
            }
        }

        Ok(None)
    }

    fn attribute_or_default(&self, start: &BytesStart<'a>, name: &str) -> DecodeResult<String> {
        Ok(self.attribute(start, name)?.unwrap_or_default())
    }

    /// Raw markup between the start tag and its matching end tag, verbatim.
    fn inner_markup(&mut self, start: &BytesStart<'a>, empty: bool) -> DecodeResult<String> {
        if empty {
            return Ok(String::new());
        }

        let text = self.reader.read_text(start.name());
        text.map(|t| t.into_owned())
            .map_err(|e| self.xml_error(start, e))
    }

    fn skip(&mut self, start: &BytesStart<'a>, empty: bool) -> DecodeResult<()> {
        if empty {
            return Ok(());
        }

        let skipped = self.reader.read_to_end(start.name());
        skipped.map(|_| ()).map_err(|e| self.xml_error(start, e))
    }

    /// Walks the direct children of `start` until its end tag.
    ///
    /// `visit` returns whether it consumed the child; unconsumed children are skipped whole.
    fn for_each_child<F>(&mut self, start: &BytesStart<'a>, empty: bool, mut visit: F) -> DecodeResult<()>
    where
        F: FnMut(&mut Self, &BytesStart<'a>, bool) -> DecodeResult<bool>,
    {
        if empty {
            return Ok(());
        }

        loop {
            let event = self.reader.read_event();
            match event.map_err(|e| self.xml_error(start, e))? {
                Event::Start(child) => {
                    if !visit(self, &child, false)? {
                        self.skip(&child, false)?;
                    }
                }
                Event::Empty(child) => {
                    visit(self, &child, true)?;
                }
                Event::End(_) => return Ok(()),
                Event::Eof => {
                    return Err(DecodeError::UnexpectedEof {
                        element: element_name(start),
                    });
                }
                _ => {}
            }
        }
    }

    fn decode_parameter_block(&mut self, start: &BytesStart<'a>, empty: bool) -> DecodeResult<ParameterBlock> {
        let name = self.attribute_or_default(start, "DisplayName")?;
        let mut parameters = String::new();

        self.for_each_child(start, empty, |de, child, child_empty| {
            if child.local_name().as_ref() != b"RuleParameters" {
                return Ok(false);
            }
            parameters = de.inner_markup(child, child_empty)?;
            Ok(true)
        })?;

        Ok(ParameterBlock { name, parameters })
    }

    fn decode_parameter_blocks(
        &mut self,
        start: &BytesStart<'a>,
        empty: bool,
        item: &[u8],
    ) -> DecodeResult<Vec<ParameterBlock>> {
        let mut blocks = Vec::new();

        self.for_each_child(start, empty, |de, child, child_empty| {
            if child.local_name().as_ref() != item {
                return Ok(false);
            }
            blocks.push(de.decode_parameter_block(child, child_empty)?);
            Ok(true)
        })?;

        Ok(blocks)
    }

    fn decode_extraction_rules(&mut self, start: &BytesStart<'a>, empty: bool) -> DecodeResult<Vec<ExtractionRule>> {
        let mut rules = Vec::new();

        self.for_each_child(start, empty, |de, child, child_empty| {
            if child.local_name().as_ref() != b"ExtractionRule" {
                return Ok(false);
            }
            let variable_name = de.attribute_or_default(child, "VariableName")?;
            let block = de.decode_parameter_block(child, child_empty)?;
            rules.push(ExtractionRule {
                block,
                variable_name,
            });
            Ok(true)
        })?;

        Ok(rules)
    }

    pub fn decode_comment(&mut self, start: &BytesStart<'a>, empty: bool) -> DecodeResult<Record> {
        let text = self.attribute_or_default(start, "CommentText")?;
        self.skip(start, empty)?;

        Ok(Record::Comment(text))
    }

    pub fn decode_context_parameter(&mut self, start: &BytesStart<'a>, empty: bool) -> DecodeResult<Record> {
        let name = self.attribute_or_default(start, "Name")?;
        let value = self.attribute_or_default(start, "Value")?;
        self.skip(start, empty)?;

        Ok(Record::ContextParameter { name, value })
    }

    /// ```xml
    /// <DataSource Name="DataSource1" Connection="|DataDirectory|\.\Data\text.csv">
    ///   <Tables>
    ///     <DataSourceTable Name="text#csv" SelectColumns="SelectOnlyBoundColumns" />
    ///   </Tables>
    /// </DataSource>
    /// ```
    pub fn decode_data_source(&mut self, start: &BytesStart<'a>, empty: bool) -> DecodeResult<Record> {
        let name = self.attribute_or_default(start, "Name")?;
        let connection = self.attribute_or_default(start, "Connection")?;
        let mut tables = String::new();

        self.for_each_child(start, empty, |de, child, child_empty| {
            if child.local_name().as_ref() != b"Tables" {
                return Ok(false);
            }
            tables = de.inner_markup(child, child_empty)?;
            Ok(true)
        })?;

        Ok(Record::DataSource {
            name,
            connection,
            tables,
        })
    }

    pub fn decode_conditional_rule(
        &mut self,
        start: &BytesStart<'a>,
        empty: bool,
        in_loop: bool,
    ) -> DecodeResult<Record> {
        let rule = self.decode_parameter_block(start, empty)?;
        Ok(Record::ConditionalRule { rule, in_loop })
    }

    pub fn decode_included_web_test(&mut self, start: &BytesStart<'a>, empty: bool) -> DecodeResult<Record> {
        let name = self.attribute_or_default(start, "Name")?;
        self.skip(start, empty)?;

        Ok(Record::IncludedWebTest(name))
    }

    pub fn decode_validation_rules(&mut self, start: &BytesStart<'a>, empty: bool) -> DecodeResult<Record> {
        let rules = self.decode_parameter_blocks(start, empty, b"ValidationRule")?;
        Ok(Record::ValidationRules(rules))
    }

    /// Only reads the start tag, the timer's children are regular script items.
    pub fn decode_transaction_timer(&self, start: &BytesStart<'a>) -> DecodeResult<Record> {
        if let Some(name) = self.attribute(start, "Name")? {
            return Ok(Record::TransactionTimer(name));
        }

        let first = match start.attributes().next() {
            Some(attr) => attr.map_err(|source| DecodeError::Attribute {
                element: element_name(start),
                offset: self.position(),
                source,
            })?,
            None => {
                return Err(DecodeError::MissingAttribute {
                    element: element_name(start),
                    attribute: "Name",
                    offset: self.position(),
                });
            }
        };
        let name = first
            .unescape_value()
            .map_err(|e| self.xml_error(start, e))?;

        Ok(Record::TransactionTimer(name.into_owned()))
    }

    pub fn decode_request(&mut self, start: &BytesStart<'a>, empty: bool) -> DecodeResult<Record> {
        let offset = self.position();
        let method = match self.attribute(start, "Method")?.as_deref() {
            Some("GET") => Method::Get,
            Some("POST") => Method::Post,
            Some(other) => {
                return Err(DecodeError::UnknownMethod {
                    method: other.to_owned(),
                    offset,
                });
            }
            None => {
                return Err(DecodeError::MissingAttribute {
                    element: element_name(start),
                    attribute: "Method",
                    offset,
                });
            }
        };

        let mut request = Request::new(method);
        request.url = self.attribute_or_default(start, "Url")?;
        request.think_time = self.attribute_or_default(start, "ThinkTime")?;
        request.timeout = self.attribute_or_default(start, "Timeout")?;
        request.record_result = self.attribute_or_default(start, "RecordResult")?;
        request.reporting_name = self.attribute_or_default(start, "ReportingName")?;
        trace!("Offset {}: decoding {:?} request {}", offset, method, request.url);

        self.for_each_child(start, empty, |de, child, child_empty| {
            match child.local_name().as_ref() {
                b"RequestPlugins" => {
                    let plugins = de.decode_parameter_blocks(child, child_empty, b"RequestPlugin")?;
                    request.plugins.extend(plugins);
                }
                b"ExtractionRules" => {
                    let rules = de.decode_extraction_rules(child, child_empty)?;
                    request.extraction_rules.extend(rules);
                }
                b"ValidationRules" => {
                    let rules = de.decode_parameter_blocks(child, child_empty, b"ValidationRule")?;
                    request.validation_rules.extend(rules);
                }
                b"QueryStringParameters" => {
                    request.query_string = de.inner_markup(child, child_empty)?;
                }
                b"FormPostHttpBody" => {
                    request.form_post = de.inner_markup(child, child_empty)?;
                }
                b"StringHttpBody" if method == Method::Post => {
                    request.string_body = Some(de.inner_markup(child, child_empty)?);
                }
                _ => return Ok(false),
            }
            Ok(true)
        })?;

        Ok(Record::Request(request))
    }
}
