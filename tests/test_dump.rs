
use fixtures::*;
use pretty_assertions::assert_eq;
use wts::{DumpSettings, WtsError, WtsParser, load_raw_rules};

fn dump(settings: DumpSettings) -> Vec<String> {
    ensure_env_logger_initialized();
    let parser = WtsParser::from_path(regular_sample())
        .unwrap()
        .with_configuration(settings);

    lines(&parser.dump(Vec::new()).unwrap())
}

const QUERY_RETURN_URL: &str = r#"  Q: <QueryStringParameter Name="returnUrl" Value="%2f" RecordedValue="" CorrelationBinding="" UrlEncode="False" UseToGroupResults="False" />"#;
const QUERY_SINCE: &str = r#"  Q: <QueryStringParameter Name="since" Value="2016-03-15" RecordedValue="" CorrelationBinding="" UrlEncode="False" UseToGroupResults="False" />"#;
const EXTRACT_HIDDEN_FIELDS: &str = r#"  E: (Extract Hidden Fields: 1) <RuleParameter Name="Required" Value="True" /><RuleParameter Name="HtmlDecode" Value="True" />"#;

#[test]
fn test_dumps_regular_sample() {
    let expected = vec![
        "C: [#1] open logon page",
        "",
        "T: Logon",
        "G: (0,300) http://app01.example.com/force/u/AB12CD/Account/LogOn ():True",
        QUERY_RETURN_URL,
        QUERY_SINCE,
        EXTRACT_HIDDEN_FIELDS,
        "",
        "C: [#2] submit profile",
        "P: (5,200) http://app01.example.com/force/u/AB12CD/Service.svc  (Profile):True",
        "<Request><SessionTicket>3f2a-77c1</SessionTicket><ReadableRequestName>Account.Get</ReadableRequestName><RequestName>Profile</RequestName><Since>2016-03-15T10:20:30</Since><Note>a & b</Note></Request>",
        r#"  R: (Set Context) <RuleParameter Name="Key" Value="ticket" />"#,
        "",
        "",
        "<=",
        r#"LP: (For Loop) <RuleParameter Name="ContextParameterName" Value="i" /><RuleParameter Name="IncrementValue" Value="1" />"#,
        "P: (0,300) {{web}}Order.svc?client=AB12CD  (Order):True",
        "<Request><SessionTicket>3f2a-77c1</SessionTicket><ReadableCorrelator>Order.Save</ReadableCorrelator><Item>u/AB12CD</Item><Due>3/15/2016</Due></Request>",
        "",
        "LP: ",
        "=>",
        "",
        "",
        "<=",
        r#"CB: (Context Parameter Exists) <RuleParameter Name="ContextParameterName" Value="ticket" />"#,
        "I: Logoff",
        "CE: ",
        "=>",
        "",
        r#"DS: (Users, |DataDirectory|\Data\users.csv) <DataSourceTable Name="users#csv" SelectColumns="SelectOnlyBoundColumns" AccessMethod="Sequential" />"#,
        "CP: web=http://app01.example.com/",
        "VR: (Response URL) ",
        "",
    ];

    assert_eq!(dump(DumpSettings::new()), expected);
}

#[test]
fn test_as_is_keeps_body_entities() {
    let lines = dump(DumpSettings::new().as_is(true));
    assert!(
        lines
            .iter()
            .any(|l| l.ends_with("<Note>a &amp; b</Note></Request>")),
        "{:#?}",
        lines
    );
}

#[test]
fn test_comment_number_removal() {
    let lines = dump(DumpSettings::new().comment_number_removal(true));
    assert_eq!(lines[0], "C: [] open logon page");
    assert!(lines.contains(&"C: [] submit profile".to_owned()));
}

#[test]
fn test_raw_mode_normalizes_volatile_values() {
    let rules = load_raw_rules(regular_sample_rules()).unwrap().unwrap();
    let lines = dump(DumpSettings::new().raw(true).raw_rules(rules));

    assert_eq!(lines[0], "C: [] open logon page");
    assert_eq!(
        lines[3],
        "G: (0,0) -host-/force/u/-client-browser-id-/Account/LogOn ():True"
    );
    assert_eq!(
        lines[9],
        "P: (0,0) -host-/force/u/-client-browser-id-/Service.svc Get.Profile (Profile):True"
    );
    assert_eq!(
        lines[10],
        "<Request><SessionTicket>-session-ticket-</SessionTicket><ReadableRequestName>Account.Get</ReadableRequestName><RequestName>Profile</RequestName><Since>2016-03-15T10:20:30</Since><Note>a & b</Note></Request>"
    );
    assert_eq!(
        lines[16],
        "P: (0,0) {{web}}Order.svc?client=-client-browser-id- Order.Store (Order):True"
    );
    assert_eq!(
        lines[17],
        "<Request><SessionTicket>-session-ticket-</SessionTicket><ReadableCorrelator>Order.Store</ReadableCorrelator><Item>u/-client-browser-id-</Item><Due/></Request>"
    );
}

#[test]
fn test_raw_mode_without_rules_keeps_bodies() {
    let lines = dump(DumpSettings::new().raw(true));
    assert_eq!(
        lines[16],
        "P: (0,0) {{web}}Order.svc?client=-client-browser-id- Order.Save (Order):True"
    );
    assert!(lines[17].contains("<Due>3/15/2016</Due>"));
}

#[test]
fn test_time_string_removal_tallies_dates() {
    let lines = dump(DumpSettings::new().time_string_removal(true));

    let since = QUERY_SINCE.replace("2016-03-15", "-time-string-");
    assert!(lines.contains(&since), "{:#?}", lines);
    assert!(lines[10].contains("<Since>-time-string-</Since>"));
    assert!(lines[17].contains("<Due>-time-string-</Due>"));

    let n = lines.len();
    assert_eq!(
        &lines[n - 4..],
        &[
            "TS: 2016-03-15: 1",
            "TS: 2016-03-15T10:20:30: 1",
            "TS: 3/15/2016: 1",
            "",
        ]
    );
}

#[test]
fn test_unknown_method_aborts_the_pass() {
    let parser = WtsParser::from_path(sample_with_unknown_method()).unwrap();
    assert!(matches!(parser.dump(Vec::new()), Err(WtsError::Decode(_))));
}

#[test]
fn test_truncated_document_keeps_what_was_rendered() {
    let script = br#"<WebTest><Items><Comment CommentText="kept" /><Comment"#;
    let out = WtsParser::from_buffer(script.to_vec())
        .dump(Vec::new())
        .unwrap();

    assert_eq!(lines(&out), vec!["C: kept", ""]);
}
