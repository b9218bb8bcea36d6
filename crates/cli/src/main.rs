use anyhow::{bail, Result};
use batch_renamer_core::{
    app_paths, is_valid_date_format, load_config, run_batch, save_config, undo, AppConfig,
    BatchOptions, BatchReport, DirectoryReport, FilterOptions, InvalidCharPolicy, LogMode,
    RenameError, RenameOutcome, RenameRecord, RenameSink, Replacement, UndoReport,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::warn;
use tracing_subscriber::EnvFilter;

const FORMAT_HELP: &str = "\
-- Formats --
$[EXT]          : the file's extension
$[0:10]         : a digit that starts at 0 and increments by 1 until 10
$[0:2:10]       : a digit that starts at 0 and increments by 2 until 10
$[RND:0:999]    : a random number anywhere from 0-999
$[FDM]          : the file date modified
$[FDC]          : the file date created
$[CD]           : the current date
$[CD:%Y-%m-%d]  : a custom date format (see `date-formats`)
";

const DATE_FORMAT_HELP: &str = "\
Code  Example     Description
%a    Sun         Abbreviated weekday name.
%A    Sunday      Full weekday name.
%w    0           Weekday as a number, Sunday = 0.
%d    08          Day of the month, zero-padded.
%-d   8           Day of the month.
%b    Sep         Abbreviated month name.
%B    September   Full month name.
%m    09          Month, zero-padded.
%-m   9           Month.
%y    13          Year without century, zero-padded.
%Y    2013        Year with century.
%H    07          Hour (24-hour clock), zero-padded.
%I    07          Hour (12-hour clock), zero-padded.
%p    AM          AM or PM.
%M    06          Minute, zero-padded.
%S    05          Second, zero-padded.
%f    000000000   Nanoseconds, zero-padded.
%z    +0000       UTC offset.
%j    251         Day of the year, zero-padded.
%U    36          Week of the year, Sunday first.
%W    35          Week of the year, Monday first.
%F    2013-09-08  Same as %Y-%m-%d.
%T    07:06:05    Same as %H:%M:%S.
%%    %           A literal '%'.
";

#[derive(Debug, Parser)]
#[command(name = "batch-renamer")]
#[command(about = "フォルダ内のファイルをテンプレートで一括リネームし、取り消しログを残します")]
struct Cli {
    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Warnings only
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Rename(RenameArgs),
    Undo(UndoArgs),
    /// Show format string placeholders
    Formats,
    /// Show custom date format codes
    DateFormats,
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
struct ConfigArgs {
    #[command(subcommand)]
    action: ConfigAction,
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    Show,
    /// Write the default config file if none exists
    Init,
}

#[derive(Debug, Args)]
struct RenameArgs {
    #[arg(short, long = "input", required = true)]
    inputs: Vec<PathBuf>,
    #[arg(short, long)]
    format: Option<String>,
    /// OLD:NEW, split at the last ':'
    #[arg(short, long)]
    replace: Vec<String>,
    #[arg(long)]
    start_with: Vec<String>,
    #[arg(long)]
    ends_with: Vec<String>,
    /// Regex matched anywhere in the file name
    #[arg(short = 'm', long = "match")]
    matches: Vec<String>,
    /// Do not create the undo log
    #[arg(long, default_value_t = false)]
    no_file: bool,
    /// Append to an existing undo log instead of overwriting it
    #[arg(short, long, default_value_t = false)]
    append_rn: bool,
    #[arg(short, long)]
    sep: Option<String>,
    #[arg(long, value_enum)]
    restrict: Option<RestrictArg>,
    /// Use epoch timestamps when a file vanished before its date was read
    #[arg(long, default_value_t = false)]
    allow_missing: bool,
    #[arg(long, default_value_t = false)]
    dry_run: bool,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
}

#[derive(Debug, Args)]
struct UndoArgs {
    /// Undo log files, or folders containing them
    #[arg(required = true)]
    paths: Vec<PathBuf>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RestrictArg {
    Auto,
    Unix,
    Windows,
}

impl From<RestrictArg> for InvalidCharPolicy {
    fn from(value: RestrictArg) -> Self {
        match value {
            RestrictArg::Auto => InvalidCharPolicy::Auto,
            RestrictArg::Unix => InvalidCharPolicy::Unix,
            RestrictArg::Windows => InvalidCharPolicy::Windows,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Rename(args) => cmd_rename(args),
        Commands::Undo(args) => cmd_undo(args),
        Commands::Formats => {
            print!("{FORMAT_HELP}");
            Ok(())
        }
        Commands::DateFormats => {
            print!("{DATE_FORMAT_HELP}");
            Ok(())
        }
        Commands::Config(config) => match config.action {
            ConfigAction::Show => cmd_config_show(),
            ConfigAction::Init => cmd_config_init(),
        },
    }
}

fn init_tracing(verbose: bool, quiet: bool) {
    let level = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_rename(args: RenameArgs) -> Result<()> {
    let config = load_config()?;
    let options = rename_options(&config, &args)?;

    let mut sink = TableSink {
        enabled: matches!(args.output, OutputFormat::Table),
    };
    let report = run_batch(&args.inputs, &options, &mut sink)?;

    match args.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Table => print_summary(&report),
    }

    if options.dry_run {
        eprintln!("dry-runモード: 実ファイルは変更していません。");
    }
    Ok(())
}

fn rename_options(config: &AppConfig, args: &RenameArgs) -> Result<BatchOptions> {
    if args.format.is_none() && args.replace.is_empty() {
        bail!("--format か --replace を指定してください (書式は `formats` で確認できます)");
    }
    if !is_valid_date_format(&config.date_format) {
        bail!("設定の日付書式が不正です: {}", config.date_format);
    }

    let mut options = config.batch_options();
    options.template = args.format.clone();
    options.replacements = parse_replacements(&args.replace);
    options.filter = FilterOptions {
        start_with: args.start_with.clone(),
        ends_with: args.ends_with.clone(),
        matches: args.matches.clone(),
    };
    options.log.enabled = !args.no_file;
    if args.append_rn {
        options.log.mode = LogMode::Append;
    }
    if let Some(sep) = &args.sep {
        options.log.separator = sep.clone();
    }
    validate_separator(&options.log.separator)?;
    if let Some(restrict) = args.restrict {
        options.restrict = restrict.into();
    }
    if args.allow_missing {
        options.require_file_exist = false;
    }
    options.dry_run = args.dry_run;
    Ok(options)
}

fn parse_replacements(rules: &[String]) -> Vec<Replacement> {
    rules
        .iter()
        .filter_map(|rule| {
            let parsed = Replacement::parse(rule);
            if parsed.is_none() {
                warn!("置換ルールに ':' がありません (無視します): {rule}");
            }
            parsed
        })
        .collect()
}

fn validate_separator(sep: &str) -> Result<()> {
    if sep.is_empty() || sep.contains(['\n', '\r']) {
        bail!("区切り文字が不正です: {sep:?}");
    }
    Ok(())
}

fn cmd_undo(args: UndoArgs) -> Result<()> {
    let config = load_config()?;
    let report = undo(&args.paths, &config.log_file_name);

    match args.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Table => print_undo(&report),
    }
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config = load_config()?;
    let paths = app_paths()?;
    println!("設定ファイル: {}", paths.config_path.display());
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let paths = app_paths()?;
    if paths.config_path.exists() {
        println!("設定ファイルは既に存在します: {}", paths.config_path.display());
        return Ok(());
    }
    let path = save_config(&AppConfig::default())?;
    println!("設定ファイルを作成しました: {}", path.display());
    Ok(())
}

struct TableSink {
    enabled: bool,
}

impl RenameSink for TableSink {
    fn directory_started(&mut self, dir: &Path) {
        if self.enabled {
            println!("{}:", dir.display());
        }
    }

    fn renamed(&mut self, record: &RenameRecord) {
        if !self.enabled {
            return;
        }
        match record.outcome {
            RenameOutcome::Success => {
                println!("   {} -> {}", record.old_name, record.new_name)
            }
            RenameOutcome::Failed => println!(
                "   {} -x {} ({})",
                record.old_name,
                record.new_name,
                record.error.as_deref().unwrap_or_default()
            ),
        }
    }

    fn planned(&mut self, old_name: &str, new_name: &str) {
        if self.enabled {
            println!("   {old_name} -> {new_name} (dry-run)");
        }
    }

    fn skipped(&mut self, file_name: &str, reason: &RenameError) {
        if self.enabled {
            println!("   {file_name} -x ({reason})");
        }
    }

    fn directory_finished(&mut self, report: &DirectoryReport) {
        if !self.enabled {
            return;
        }
        if let Some(err) = &report.error {
            println!("   中断: {err}");
        }
    }
}

fn print_summary(report: &BatchReport) {
    println!(
        "\n集計: folders={} renamed={} failed={} aborted={}",
        report.directories.len(),
        report.renamed(),
        report.failed(),
        report.aborted()
    );
}

fn print_undo(report: &UndoReport) {
    for log in &report.logs {
        match &log.error {
            Some(err) => println!("{}: 中断 ({err})", log.log_path.display()),
            None => println!(
                "{}: restored={} skipped={} failed={} ignored={}",
                log.log_path.display(),
                log.restored,
                log.skipped,
                log.failed,
                log.ignored
            ),
        }
    }
    println!("取り消し完了: {}件", report.restored());
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn rename_collects_repeated_flags() {
        let cli = Cli::try_parse_from([
            "batch-renamer",
            "rename",
            "-i",
            "a",
            "-i",
            "b",
            "-f",
            "$[1:9]",
            "--start-with",
            "x",
            "-m",
            r"\d",
        ])
        .expect("parse");
        let Commands::Rename(args) = cli.command else {
            panic!("expected rename");
        };
        assert_eq!(args.inputs, vec![PathBuf::from("a"), PathBuf::from("b")]);
        assert_eq!(args.start_with, vec!["x"]);
        assert_eq!(args.matches, vec![r"\d"]);
    }

    #[test]
    fn rename_requires_input() {
        assert!(Cli::try_parse_from(["batch-renamer", "rename", "-f", "x"]).is_err());
    }

    #[test]
    fn replacements_without_colon_are_dropped() {
        let rules = parse_replacements(&["a:b".to_string(), "nope".to_string()]);
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].from, "a");
    }

    #[test]
    fn separator_must_be_single_line() {
        assert!(validate_separator("|").is_ok());
        assert!(validate_separator("").is_err());
        assert!(validate_separator("\n").is_err());
    }

    fn rename_args(extra: &[&str]) -> RenameArgs {
        let mut argv = vec!["batch-renamer", "rename", "-i", "dir", "-f", "$[1:9]"];
        argv.extend_from_slice(extra);
        let cli = Cli::try_parse_from(argv).expect("parse");
        let Commands::Rename(args) = cli.command else {
            panic!("expected rename");
        };
        args
    }

    #[test]
    fn empty_separator_from_config_is_rejected() {
        let config = AppConfig {
            separator: String::new(),
            ..AppConfig::default()
        };
        assert!(rename_options(&config, &rename_args(&[])).is_err());

        let options = rename_options(&config, &rename_args(&["-s", ";"])).expect("options");
        assert_eq!(options.log.separator, ";");
    }

    #[test]
    fn flags_override_config() {
        let options = rename_options(
            &AppConfig::default(),
            &rename_args(&["-a", "--restrict", "unix", "--allow-missing", "-r", "a:b"]),
        )
        .expect("options");
        assert_eq!(options.log.mode, LogMode::Append);
        assert_eq!(options.restrict, InvalidCharPolicy::Unix);
        assert!(!options.require_file_exist);
        assert_eq!(options.replacements.len(), 1);
        assert_eq!(options.template.as_deref(), Some("$[1:9]"));
    }
}
