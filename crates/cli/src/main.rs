use anyhow::{Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand};
use flags::{OutputFormat, PresetFlag, ScopeFlag};
use scanner::SourceScanner;
use settings::FileSettings;
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::process::ExitCode;
use xref_graph::{AnalysisScope, Analyzer, Batch, CancellationToken, SourceInput};

mod flags;
mod report;
mod scanner;
mod settings;

/// Exit status when `--fail-on-problems` finds something
const PROBLEMS_EXIT_CODE: u8 = 2;

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "xref")]
#[command(about = "Cross-file dependency and symbol resolution", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze files and directories as one batch
    Analyze(AnalyzeArgs),

    /// List the size presets and their bands
    Presets,
}

#[derive(Args)]
struct AnalyzeArgs {
    /// Files or directories to analyze (default: the root)
    paths: Vec<PathBuf>,

    /// Project root that logical paths are relative to (default: current directory)
    #[arg(long)]
    root: Option<PathBuf>,

    /// Selection scope recorded in the context (default: inferred from the paths)
    #[arg(long, value_enum)]
    scope: Option<ScopeFlag>,

    /// Config file (default: <root>/xref.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Size preset for unit classification
    #[arg(long, value_enum)]
    preset: Option<PresetFlag>,

    /// Maximum concurrent extraction tasks
    #[arg(long)]
    workers: Option<usize>,

    /// Minimum framework confidence (0-100)
    #[arg(long)]
    min_confidence: Option<u8>,

    /// Match import targets against paths ignoring case
    #[arg(long)]
    case_insensitive: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Summary)]
    format: OutputFormat,

    /// Exit with status 2 when findings or cycles are present
    #[arg(long)]
    fail_on_problems: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    match cli.command {
        Commands::Analyze(args) => run_analyze(args).await,
        Commands::Presets => {
            run_presets()?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run_analyze(args: AnalyzeArgs) -> Result<ExitCode> {
    let cwd = env::current_dir().context("Failed to read current directory")?;
    let root = args.root.clone().unwrap_or_else(|| cwd.clone());
    let root = root
        .canonicalize()
        .with_context(|| format!("Failed to resolve root {}", root.display()))?;

    let settings = FileSettings::load(args.config.as_deref(), &root)?;
    let mut config = settings.analysis.clone();
    if let Some(workers) = args.workers {
        config.workers = Some(workers);
    }
    if let Some(min_confidence) = args.min_confidence {
        config.min_confidence = min_confidence;
    }
    if args.case_insensitive {
        config.case_insensitive_paths = true;
    }
    let thresholds = match args.preset {
        Some(preset) => settings::preset(preset.as_str())?,
        None => match settings
            .size_thresholds()?
            .or_else(|| config.size_thresholds.take())
        {
            Some(thresholds) => thresholds,
            None => settings::preset(settings::DEFAULT_PRESET)?,
        },
    };
    config.size_thresholds = Some(thresholds);

    let targets = resolve_targets(&args.paths, &cwd, &root)?;
    let scope = args
        .scope
        .map(ScopeFlag::as_domain)
        .unwrap_or_else(|| infer_scope(&targets, &root));
    let files = collect_files(&targets);

    let mut inputs = Vec::with_capacity(files.len());
    for file in &files {
        let content =
            fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
        inputs.push(match logical_path(file, &root) {
            Some(path) => SourceInput::new(path, content),
            None => SourceInput::rebased(file.to_string_lossy(), content),
        });
    }
    let batch = Batch::new(inputs)
        .with_root(root.to_string_lossy())
        .with_scope(scope);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, cancelling analysis");
            on_interrupt.cancel();
        }
    });

    let analyzer = Analyzer::new(config)?;
    let context = analyzer
        .analyze_with_cancel(batch, &cancel)
        .await
        .with_context(|| format!("Analysis of {} failed", root.display()))?;

    let rendered = match args.format {
        OutputFormat::Summary => report::render_summary(&context),
        OutputFormat::Json => context.to_json()?,
        OutputFormat::Pretty => context.to_json_pretty()?,
    };
    print_stdout(rendered.trim_end())?;

    if args.fail_on_problems && report::has_problems(&context) {
        return Ok(ExitCode::from(PROBLEMS_EXIT_CODE));
    }
    Ok(ExitCode::SUCCESS)
}

fn run_presets() -> Result<()> {
    let mut lines = Vec::new();
    for name in settings::preset_names() {
        let thresholds = settings::preset(name)?;
        let bands: Vec<String> = thresholds
            .bands()
            .iter()
            .map(|band| match band.max_lines {
                Some(max) => format!("{} <= {max}", band.label),
                None => format!("{} above", band.label),
            })
            .collect();
        lines.push(format!("{name:<9} {}", bands.join(", ")));
    }
    print_stdout(&lines.join("\n"))
}

/// Canonical analysis targets; the root itself when none are given
fn resolve_targets(paths: &[PathBuf], cwd: &Path, root: &Path) -> Result<Vec<PathBuf>> {
    if paths.is_empty() {
        return Ok(vec![root.to_path_buf()]);
    }
    paths
        .iter()
        .map(|path| {
            let absolute = if path.is_absolute() {
                path.clone()
            } else {
                cwd.join(path)
            };
            absolute
                .canonicalize()
                .with_context(|| format!("Failed to resolve {}", path.display()))
        })
        .collect()
}

fn infer_scope(targets: &[PathBuf], root: &Path) -> AnalysisScope {
    match targets {
        [only] if only.is_file() => AnalysisScope::Single,
        [only] if only.as_path() != root => AnalysisScope::Module,
        _ => AnalysisScope::Project,
    }
}

/// Expand directories into source files, deduplicated and sorted
fn collect_files(targets: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = BTreeSet::new();
    for target in targets {
        if target.is_dir() {
            files.extend(SourceScanner::new(target).scan());
        } else {
            files.insert(target.clone());
        }
    }
    files.into_iter().collect()
}

/// `/`-separated path of `file` relative to `root`, if it lies under it
fn logical_path(file: &Path, root: &Path) -> Option<String> {
    let relative = file.strip_prefix(root).ok()?;
    let segments: Vec<String> = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    (!segments.is_empty()).then(|| segments.join("/"))
}
