use anyhow::{Context, Result, bail};
use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use indoc::indoc;
use log::{LevelFilter, info};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::process::exit;

use wts::settings::{DEFAULT_CHECK_PATTERN, DEFAULT_MIN_TIMEOUT, DEFAULT_THINK_TIME};
use wts::{CheckSettings, DumpSettings, WtsParser, load_raw_rules};

const OUTPUT_EXTENSION: &str = "webtext";
const RAW_RULE_EXTENSION: &str = "rawrule";

fn dump_command() -> Command {
    Command::new("dump")
        .about("Convert a web test script into tagged text")
        .long_about(indoc!(r#"
            Convert a web test script into tagged text.

            Every recognised element becomes one or more lines:
                C:  comment                 T:  transaction
                G:  GET request             P:  POST request (body on the next line)
                Q:  query string            F:  form post body
                R:  request plugin          E:  extraction rule
                V:  validation rule         VR: top level validation rule
                CP: context parameter       DS: data source
                I:  included web test       CB/LP, CE/LP: condition and loop blocks

            In raw mode the output is normalized for comparison between recordings:
            think times and timeouts are zeroed, hosts and the session ticket and client
            browser id are replaced by placeholders, and the rules of the raw-rule file are applied.
        "#))
        .arg(
            Arg::new("input")
                .long("input")
                .short('i')
                .required(true)
                .value_name("PATH")
                .help("Web test script to convert."),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .value_name("PATH")
                .help("Writes output to the file specified, defaults to the input path with the `.webtext` extension. \
                       Will create parent directories if needed."),
        )
        .arg(
            Arg::new("asis")
                .long("asis")
                .action(ArgAction::SetTrue)
                .help("Do not unescape entities in request bodies."),
        )
        .arg(
            Arg::new("cnr")
                .long("cnr")
                .short('c')
                .action(ArgAction::SetTrue)
                .help("Comment number removal, `[#30]` becomes `[]`."),
        )
        .arg(
            Arg::new("tsr")
                .long("tsr")
                .short('t')
                .action(ArgAction::SetTrue)
                .help("Time string removal, dates are replaced and tallied at the end of the output."),
        )
        .arg(
            Arg::new("raw")
                .long("raw")
                .short('r')
                .action(ArgAction::SetTrue)
                .help("Raw mode, normalizes volatile values. Implies `--cnr`."),
        )
        .arg(
            Arg::new("rawrule")
                .long("rawrule")
                .value_name("PATH")
                .help("Raw-rule file applied in raw mode, defaults to the input path with the `.rawrule` extension."),
        )
}

fn check_command() -> Command {
    Command::new("check")
        .about("Report requests with unexpected think time, timeout or content")
        .long_about(indoc!(r#"
            Report requests with unexpected think time, timeout or content.

            A request is reported when its think time differs from `--thinktime`,
            when its timeout is below `--timeout`, or when its rendered text matches `--check`.
            Reported requests are printed to stdout with their transaction and comment.
        "#))
        .arg(
            Arg::new("input")
                .long("input")
                .short('i')
                .required(true)
                .value_name("PATH")
                .help("Web test script to check."),
        )
        .arg(
            Arg::new("check")
                .long("check")
                .short('c')
                .value_name("REGEX")
                .default_value(DEFAULT_CHECK_PATTERN)
                .help("Regular expression matched against every rendered request."),
        )
        .arg(
            Arg::new("thinktime")
                .long("thinktime")
                .value_name("N")
                .value_parser(value_parser!(i64))
                .help("Expected think time, defaults to 0."),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .value_name("N")
                .value_parser(value_parser!(i64))
                .help("Minimum timeout, defaults to 270."),
        )
}

fn command() -> Command {
    Command::new("wts")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Utility to dump and check web test scripts")
        .arg(
            Arg::new("verbose")
                .short('v')
                .global(true)
                .action(ArgAction::Count)
                .help(indoc!("
                    Sets debug prints level for the application:
                        -v   - info
                        -vv  - debug
                        -vvv - trace
                    NOTE: trace output is only available in debug builds, as it is extremely verbose."))
        )
        .arg(
            Arg::new("quiet")
                .long("quiet")
                .short('q')
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Do not print the error message on failure."),
        )
        .subcommand(dump_command())
        .subcommand(check_command())
}

fn input_path(matches: &ArgMatches) -> PathBuf {
    PathBuf::from(
        matches
            .get_one::<String>("input")
            .expect("This is a required argument"),
    )
}

/// Refuses directories, creates missing parent directories.
fn create_output_file(path: impl AsRef<Path>) -> Result<File> {
    let p = path.as_ref();

    if p.is_dir() {
        bail!(
            "There is a directory at {}, refusing to overwrite",
            p.display()
        );
    }

    match p.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        Some(_) => {}
        None => bail!("Output file cannot be root."),
    }

    File::create(p).with_context(|| format!("Failed to create output file {}", p.display()))
}

fn run_dump(matches: &ArgMatches) -> Result<()> {
    let input = input_path(matches);
    let output = matches
        .get_one::<String>("output")
        .map(PathBuf::from)
        .unwrap_or_else(|| input.with_extension(OUTPUT_EXTENSION));

    let raw = matches.get_flag("raw");
    let mut settings = DumpSettings::new()
        .raw(raw)
        .comment_number_removal(matches.get_flag("cnr"))
        .time_string_removal(matches.get_flag("tsr"))
        .as_is(matches.get_flag("asis"));

    let parser = WtsParser::from_path(&input)?;

    if raw {
        let rule_path = matches
            .get_one::<String>("rawrule")
            .map(PathBuf::from)
            .unwrap_or_else(|| input.with_extension(RAW_RULE_EXTENSION));

        if let Some(rules) = load_raw_rules(&rule_path)? {
            info!("{} raw rules loaded from {}", rules.len(), rule_path.display());
            settings = settings.raw_rules(rules);
        }
    }

    let file = create_output_file(&output)?;
    parser
        .with_configuration(settings)
        .dump(BufWriter::new(file))
        .with_context(|| format!("Failed to dump {}", input.display()))?;

    info!("{} written", output.display());
    Ok(())
}

fn run_check(matches: &ArgMatches) -> Result<()> {
    let input = input_path(matches);

    let pattern = matches
        .get_one::<String>("check")
        .expect("has set default");
    let check = CheckSettings::new()
        .pattern(pattern)?
        .think_time(
            matches
                .get_one::<i64>("thinktime")
                .copied()
                .unwrap_or(DEFAULT_THINK_TIME),
        )
        .min_timeout(
            matches
                .get_one::<i64>("timeout")
                .copied()
                .unwrap_or(DEFAULT_MIN_TIMEOUT),
        );

    let parser = WtsParser::from_path(&input)?;
    let reported = parser
        .check(&check, io::stdout().lock())
        .with_context(|| format!("Failed to check {}", input.display()))?;

    info!("{} requests reported in {}", reported, input.display());
    Ok(())
}

fn try_to_initialize_logging(verbosity: u8) {
    let level = match verbosity {
        0 => return,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        3 => LevelFilter::Trace,
        _ => {
            eprintln!("using more than -vvv does not affect verbosity level");
            LevelFilter::Trace
        }
    };

    if let Err(e) = TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    ) {
        eprintln!("Failed to initialize logging: {}", e);
    }
}

fn main() {
    let mut cmd = command();
    let matches = cmd.clone().get_matches();

    let verbosity = matches.get_count("verbose");
    let quiet = matches.get_flag("quiet") && verbosity == 0;
    try_to_initialize_logging(verbosity);

    let result = match matches.subcommand() {
        Some(("dump", sub)) => run_dump(sub),
        Some(("check", sub)) => run_check(sub),
        _ => {
            // Help goes to stdout, the failure is in the exit code.
            let _ = cmd.print_help();
            exit(2);
        }
    };

    if let Err(e) = result {
        if !quiet {
            eprintln!("wts error: {:#}", e);
        }
        exit(1);
    }
}
