use anyhow::{Context, Result, bail, format_err};
use clap::{Arg, ArgAction, ArgMatches, Command};
use dialoguer::Confirm;
use log::LevelFilter;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

use usagestats::batch::{classify_frequency, is_artifact_name};
use usagestats::{
    ArtifactCandidate, BatchStats, HtmlReportSink, JsonLinesSink, ParserSettings, RecordSink,
    decode_batch, discover_artifacts,
};

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::exit;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum OutputFormat {
    Json,
    Jsonl,
    Html,
}

struct UsageStatsDump {
    parser_settings: ParserSettings,
    input: PathBuf,
    output_format: OutputFormat,
    output_target: Option<PathBuf>,
    confirm_overwrite: bool,
    frequency: Option<String>,
    verbosity_level: Option<LevelFilter>,
}

impl UsageStatsDump {
    pub fn from_cli_matches(matches: &ArgMatches) -> Result<Self> {
        let input = matches
            .get_one::<PathBuf>("INPUT")
            .cloned()
            .ok_or_else(|| format_err!("missing INPUT"))?;

        let output_format = match matches
            .get_one::<String>("output-format")
            .map(String::as_str)
            .unwrap_or("jsonl")
        {
            "json" => OutputFormat::Json,
            "html" => OutputFormat::Html,
            _ => OutputFormat::Jsonl,
        };

        let num_threads = matches.get_one::<usize>("num-threads").copied().unwrap_or(0);
        let num_threads = match (cfg!(feature = "multithreading"), num_threads) {
            (true, number) => number,
            (false, 1) => 1,
            (false, _) => {
                eprintln!(
                    "turned on threads, but library was compiled without `multithreading` feature! using fallback sync iterator"
                );
                1
            }
        };

        let verbosity_level = match matches.get_count("verbose") {
            0 => None,
            1 => Some(LevelFilter::Info),
            2 => Some(LevelFilter::Debug),
            3 => Some(LevelFilter::Trace),
            _ => {
                eprintln!("using more than -vvv does not affect verbosity level");
                Some(LevelFilter::Trace)
            }
        };

        Ok(UsageStatsDump {
            parser_settings: ParserSettings::new()
                .num_threads(num_threads)
                .indent(output_format == OutputFormat::Json),
            input,
            output_format,
            output_target: matches.get_one::<PathBuf>("output-target").cloned(),
            confirm_overwrite: !matches.get_flag("no-confirm-overwrite"),
            frequency: matches.get_one::<String>("frequency").cloned(),
            verbosity_level,
        })
    }

    /// Main entry point for `UsageStatsDump`
    pub fn run(&self) -> Result<()> {
        self.try_to_initialize_logging();

        let candidates = if self.input.is_dir() {
            discover_artifacts(&self.input)
                .with_context(|| format!("failed to scan `{}`", self.input.display()))?
        } else {
            vec![self.single_candidate()?]
        };

        let output: Box<dyn Write> = match &self.output_target {
            Some(path) => Box::new(BufWriter::new(Self::create_output_file(
                path,
                self.confirm_overwrite,
            )?)),
            None => Box::new(io::stdout().lock()),
        };

        let mut sink: Box<dyn RecordSink> = match self.output_format {
            OutputFormat::Json | OutputFormat::Jsonl => Box::new(JsonLinesSink::new(
                output,
                self.parser_settings.should_indent(),
            )),
            OutputFormat::Html => Box::new(HtmlReportSink::new(output)),
        };

        let mut stats = BatchStats::default();
        decode_batch(&candidates, &self.parser_settings, sink.as_mut(), &mut stats)?;
        sink.finish()?;

        eprintln!("{stats}");

        Ok(())
    }

    fn single_candidate(&self) -> Result<ArtifactCandidate> {
        let file_name = self
            .input
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| format_err!("`{}` is not a file", self.input.display()))?;

        if !is_artifact_name(file_name) {
            bail!(
                "`{}` is not a usagestats artifact, its name must be an epoch-millisecond timestamp",
                self.input.display()
            );
        }

        let frequency = match &self.frequency {
            Some(frequency) => frequency.clone(),
            None => classify_frequency(&self.input)
                .map(|f| f.as_str().to_owned())
                .unwrap_or_else(|| "unknown".to_owned()),
        };

        Ok(ArtifactCandidate {
            path: self.input.clone(),
            file_name: file_name.to_owned(),
            frequency,
        })
    }

    /// If `prompt` is passed, will display a confirmation prompt before overwriting files.
    fn create_output_file(path: impl AsRef<Path>, prompt: bool) -> Result<File> {
        let p = path.as_ref();

        if p.is_dir() {
            bail!(
                "There is a directory at {}, refusing to overwrite",
                p.display()
            );
        }

        if p.exists() && prompt {
            let confirmed = Confirm::new()
                .with_prompt(format!(
                    "Are you sure you want to override output file at {}",
                    p.display()
                ))
                .default(false)
                .interact()
                .context("Failed to write confirmation prompt to term")?;

            if !confirmed {
                bail!("Cancelled");
            }
        }

        if let Some(parent) = p.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create `{}`", parent.display()))?;
            }
        }

        File::create(p).with_context(|| format!("failed to create `{}`", p.display()))
    }

    fn try_to_initialize_logging(&self) {
        if let Some(level) = self.verbosity_level {
            if let Err(e) = TermLogger::init(
                level,
                Config::default(),
                TerminalMode::Stderr,
                ColorChoice::Auto,
            ) {
                eprintln!("Failed to initialize logging: {e}");
            }
        }
    }
}

fn command() -> Command {
    Command::new("usagestats_dump")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Utility to parse Android usagestats artifacts (XML and protobuf)")
        .arg(
            Arg::new("INPUT")
                .required(true)
                .value_parser(clap::value_parser!(PathBuf))
                .help("A usagestats directory (containing daily/weekly/monthly/yearly), or a single artifact file."),
        )
        .arg(
            Arg::new("output-format")
                .short('o')
                .long("format")
                .value_parser(["json", "jsonl", "html"])
                .default_value("jsonl")
                .help("Sets the output format")
                .long_help(
                    "Sets the output format:\n\
                     \"jsonl\" - one JSON record per line.\n\
                     \"json\"  - indented JSON records.\n\
                     \"html\"  - a single HTML table, most recently active first.",
                ),
        )
        .arg(
            Arg::new("output-target")
                .long("output")
                .short('f')
                .value_parser(clap::value_parser!(PathBuf))
                .help("Writes output to the file specified instead of stdout, errors will still be printed to stderr. \
                       Will ask for confirmation before overwriting files, to allow overwriting, pass `--no-confirm-overwrite`. \
                       Will create parent directories if needed."),
        )
        .arg(
            Arg::new("no-confirm-overwrite")
                .long("no-confirm-overwrite")
                .action(ArgAction::SetTrue)
                .help("When set, will not ask for confirmation before overwriting files, useful for automation"),
        )
        .arg(
            Arg::new("frequency")
                .long("frequency")
                .value_name("LABEL")
                .help("Frequency label for a single-file INPUT. Defaults to the parent directory name."),
        )
        .arg(
            Arg::new("num-threads")
                .short('t')
                .long("threads")
                .default_value("0")
                .value_parser(clap::value_parser!(usize))
                .help("Sets the number of worker threads, defaults to number of CPU cores."),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .action(ArgAction::Count)
                .help("-v - info, -vv - debug, -vvv - trace."),
        )
}

fn main() {
    let matches = command().get_matches();

    let result = UsageStatsDump::from_cli_matches(&matches).and_then(|app| app.run());

    if let Err(e) = result {
        eprintln!("{e:?}");
        exit(1);
    }
}
