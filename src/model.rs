//! Typed shapes of the elements a web test script is made of.
//!
//! Every recognised element is decoded eagerly into one [`Record`] variant once its
//! closing boundary has been read.

/// The `DisplayName` plus opaque `RuleParameters` inner markup shared by every rule-like element.
///
/// ```xml
/// <ValidationRule DisplayName="Response Time Goal" ...>
///   <RuleParameters>
///     <RuleParameter Name="Tolerance" Value="0" />
///   </RuleParameters>
/// </ValidationRule>
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterBlock {
    pub name: String,
    pub parameters: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionRule {
    pub block: ParameterBlock,
    pub variable_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn tag(self) -> &'static str {
        match self {
            Method::Get => "G",
            Method::Post => "P",
        }
    }
}

/// `<Request Method="GET" Url="{{web}}Account/LogOn" ThinkTime="0" Timeout="300" ...>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub think_time: String,
    pub timeout: String,
    pub reporting_name: String,
    pub record_result: String,
    /// Inner markup of `QueryStringParameters`.
    pub query_string: String,
    /// Inner markup of `FormPostHttpBody`.
    pub form_post: String,
    pub plugins: Vec<ParameterBlock>,
    pub extraction_rules: Vec<ExtractionRule>,
    pub validation_rules: Vec<ParameterBlock>,
    /// Base64 encoded UTF-16LE `StringHttpBody`, only ever set on POST requests.
    pub string_body: Option<String>,
}

impl Request {
    pub fn new(method: Method) -> Self {
        Request {
            method,
            url: String::new(),
            think_time: String::new(),
            timeout: String::new(),
            reporting_name: String::new(),
            record_result: String::new(),
            query_string: String::new(),
            form_post: String::new(),
            plugins: Vec::new(),
            extraction_rules: Vec::new(),
            validation_rules: Vec::new(),
            string_body: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// `<Comment CommentText="[#30]" />`
    Comment(String),
    /// `<ContextParameter Name="web" Value="http://localhost:50357/" />`
    ContextParameter { name: String, value: String },
    DataSource {
        name: String,
        connection: String,
        /// Inner markup of `Tables`.
        tables: String,
    },
    ConditionalRule { rule: ParameterBlock, in_loop: bool },
    IncludedWebTest(String),
    Request(Request),
    TransactionTimer(String),
    ValidationRules(Vec<ParameterBlock>),
}

/// Containers whose closing tag renders a marker line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Block {
    Condition,
    Loop,
}
