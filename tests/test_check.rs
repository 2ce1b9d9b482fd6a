
use fixtures::*;
use pretty_assertions::assert_eq;
use wts::{CheckSettings, ConfigError, WtsParser};

fn check(settings: &CheckSettings) -> (usize, Vec<String>) {
    ensure_env_logger_initialized();
    let parser = WtsParser::from_path(regular_sample()).unwrap();

    let mut echo = Vec::new();
    let reported = parser.check(settings, &mut echo).unwrap();
    (reported, lines(&echo))
}

#[test]
fn test_default_check_reports_date_and_think_time_hits() {
    let (reported, lines) = check(&CheckSettings::new());

    assert_eq!(reported, 3);
    assert_eq!(
        lines.iter().filter(|l| l.as_str() == "T: Logon").count(),
        3
    );
}

#[test]
fn test_think_time_mismatch_is_echoed_with_context() {
    let settings = CheckSettings::new()
        .pattern("never-matches")
        .unwrap()
        .min_timeout(100);
    let (reported, lines) = check(&settings);

    assert_eq!(reported, 1);
    assert_eq!(
        lines,
        vec![
            "",
            "T: Logon",
            "C: [#2] submit profile",
            "P: (5,200) http://app01.example.com/force/u/AB12CD/Service.svc  (Profile):True",
            "<Request><SessionTicket>3f2a-77c1</SessionTicket><ReadableRequestName>Account.Get</ReadableRequestName><RequestName>Profile</RequestName><Since>2016-03-15T10:20:30</Since><Note>a & b</Note></Request>",
            r#"  R: (Set Context) <RuleParameter Name="Key" Value="ticket" />"#,
            "",
            "",
        ]
    );
}

#[test]
fn test_timeout_below_minimum_is_reported() {
    let settings = CheckSettings::new()
        .pattern("never-matches")
        .unwrap()
        .think_time(5)
        .min_timeout(300);
    let (reported, lines) = check(&settings);

    // GET and the looped POST differ on think time, the first POST times out early.
    assert_eq!(reported, 3);
    assert!(lines.contains(&"C: [#2] submit profile".to_owned()));
}

#[test]
fn test_canonical_requests_are_not_reported() {
    let settings = CheckSettings::new()
        .pattern("never-matches")
        .unwrap()
        .think_time(0)
        .min_timeout(0);
    let parser = WtsParser::from_buffer(
        br#"<Items><Request Method="GET" Url="{{web}}" ThinkTime="0" Timeout="300" /></Items>"#
            .to_vec(),
    );

    let mut echo = Vec::new();
    assert_eq!(parser.check(&settings, &mut echo).unwrap(), 0);
    assert!(echo.is_empty());
}

#[test]
fn test_invalid_pattern_is_a_config_error() {
    assert!(matches!(
        CheckSettings::new().pattern("(unclosed"),
        Err(ConfigError::InvalidPattern { .. })
    ));
}
