//! CLI entry point for arbor

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::Duration;

use arbor::index::{ClauseOp, ClauseTest};
use arbor::{
    ArchiveError, ArchiveState, ArchiveStats, DirectorySource, EntrySource, ExtractReport,
    FilteredProjection, JsonNode, LoaderConfig, ManifestSource, NodeId, Notification, OutputConfig,
    PathTreeIndex, RecordLayout, SortKey, SortOrder, SortSpec, TreeFilter, TreeFormatter,
    Workspace, WorkspaceConfig, print_json, print_stats,
};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

/// Longest we wait for background loads and extractions.
const WAIT_LIMIT: Duration = Duration::from_secs(24 * 60 * 60);

/// Color output mode
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum ColorMode {
    /// Auto-detect based on terminal and environment
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

/// Determine whether to use color output based on mode and environment.
fn should_use_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => {
            // Respect NO_COLOR environment variable (https://no-color.org/)
            if std::env::var_os("NO_COLOR").is_some() {
                return false;
            }
            if std::env::var_os("FORCE_COLOR").is_some() {
                return true;
            }
            if std::env::var("TERM").map(|t| t == "dumb").unwrap_or(false) {
                return false;
            }
            std::io::stdout().is_terminal()
        }
    }
}

/// Sort field for sibling ordering
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum SortField {
    #[default]
    Name,
    Size,
    Kind,
    Date,
}

impl From<SortField> for SortKey {
    fn from(field: SortField) -> Self {
        match field {
            SortField::Name => SortKey::Name,
            SortField::Size => SortKey::Size,
            SortField::Kind => SortKey::Kind,
            SortField::Date => SortKey::Modified,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "arbor")]
#[command(about = "Browse flat archive listings as a filtered tree")]
#[command(version)]
struct Args {
    /// Archives to open: a directory (package) or a JSON manifest
    #[arg(required = true, value_name = "ARCHIVE")]
    archives: Vec<PathBuf>,

    /// Show hidden files and ignore .gitignore rules in directory archives
    #[arg(short, long)]
    all: bool,

    /// Only show entries whose path contains TEXT (case-insensitive)
    #[arg(short = 'f', long = "filter", value_name = "TEXT")]
    filter: Option<String>,

    /// Treat --filter as a regular expression
    #[arg(long = "regex", requires = "filter")]
    regex: bool,

    /// Also match --filter against record keys
    #[arg(short = 'k', long = "keys", requires = "filter")]
    keys: bool,

    /// Only show names matching glob PATTERN (can be used multiple times)
    #[arg(short = 'g', long = "glob", value_name = "PATTERN")]
    glob: Vec<String>,

    /// Hide names matching glob PATTERN (can be used multiple times)
    #[arg(short = 'I', long = "exclude", value_name = "PATTERN")]
    exclude: Vec<String>,

    /// Only show records of type NAME (can be used multiple times)
    #[arg(short = 't', long = "type", value_name = "NAME")]
    types: Vec<String>,

    /// Sort siblings by this field
    #[arg(long = "sort", value_name = "FIELD", default_value = "name")]
    sort: SortField,

    /// Reverse the sort order
    #[arg(short = 'r', long = "reverse")]
    reverse: bool,

    /// Descend only N levels deep
    #[arg(short = 'L', long = "level")]
    level: Option<usize>,

    /// List directories only
    #[arg(short = 'd', long = "dirs-only")]
    dirs_only: bool,

    /// Show size, modification date and type columns
    #[arg(short = 'l', long = "long")]
    long: bool,

    /// Output in JSON format
    #[arg(long = "json")]
    json: bool,

    /// Show archive statistics (counts, total size, breakdown by type)
    #[arg(long = "stats")]
    stats: bool,

    /// Look up a single entry by path
    #[arg(long = "lookup", value_name = "PATH", conflicts_with = "key")]
    lookup: Option<String>,

    /// Look up a single record by key
    #[arg(long = "key", value_name = "KEY")]
    key: Option<String>,

    /// Extract the shown leaves (or the looked-up entry) below DIR
    #[arg(short = 'x', long = "extract", value_name = "DIR")]
    extract: Option<PathBuf>,

    /// Stop loading after N listing entries
    #[arg(long = "limit", value_name = "N")]
    limit: Option<usize>,

    /// Minimum gap between progress updates
    /// Duration format: 250ms, 1s, 2m
    #[arg(long = "interval", value_name = "DURATION", default_value = "500ms")]
    interval: String,

    /// Number of worker threads for loading and extraction
    /// (0 = auto-detect, N = use N workers)
    #[arg(short = 'j', long = "jobs", default_value = "0")]
    jobs: usize,

    /// Path prefix stripped from record paths
    #[arg(long = "records-root", value_name = "PREFIX")]
    records_root: Option<String>,

    /// Keep record paths exactly as listed
    #[arg(long = "raw-paths", conflicts_with = "records_root")]
    raw_paths: bool,

    /// Print progress to stderr while archives load
    #[arg(long = "progress")]
    progress: bool,

    /// Control color output: auto, always, never
    #[arg(long = "color", value_name = "WHEN", default_value = "auto")]
    color: ColorMode,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Parse a duration string like "500ms" or "2s".
fn parse_duration_string(s: &str) -> Result<Duration, String> {
    humantime::parse_duration(s.trim()).map_err(|e| e.to_string())
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("arbor: {}", message);
    process::exit(1);
}

fn open_source(path: &Path, all: bool) -> arbor::Result<Arc<dyn EntrySource>> {
    if path.is_dir() {
        let source = DirectorySource::new(path)
            .show_hidden(all)
            .respect_ignore(!all);
        return Ok(Arc::new(source));
    }
    Ok(Arc::new(ManifestSource::open(path)?))
}

fn build_filter(args: &Args) -> arbor::Result<TreeFilter> {
    let mut filter = match (&args.filter, args.regex) {
        (Some(text), true) => TreeFilter::regex(text)?,
        (Some(text), false) => TreeFilter::substring(text),
        (None, _) => TreeFilter::new(),
    };
    filter = filter.matching_keys(args.keys);
    for pattern in &args.glob {
        filter = filter.with_clause(ClauseOp::And, ClauseTest::name_glob(pattern)?);
    }
    for pattern in &args.exclude {
        filter = filter.with_clause(ClauseOp::Not, ClauseTest::name_glob(pattern)?);
    }
    if !args.types.is_empty() {
        filter = filter.with_clause(ClauseOp::And, ClauseTest::TypeName(args.types.clone()));
    }
    Ok(filter)
}

fn loader_config(args: &Args, interval: Duration) -> LoaderConfig {
    let record_layout = if args.raw_paths {
        None
    } else {
        let mut layout = RecordLayout::default();
        if let Some(ref root) = args.records_root {
            layout.root_prefix = root.clone();
        }
        Some(layout)
    };
    LoaderConfig {
        progress_interval: interval,
        load_limit: args.limit,
        record_layout,
    }
}

/// Resolve `--lookup` / `--key` against one index.
fn lookup(index: &PathTreeIndex, args: &Args) -> arbor::Result<Option<NodeId>> {
    if let Some(ref path) = args.lookup {
        return index
            .lookup_by_path(path)
            .map(Some)
            .ok_or_else(|| ArchiveError::NotFound(path.clone()));
    }
    if let Some(ref key) = args.key {
        return index
            .lookup_by_key(key)
            .map(Some)
            .ok_or_else(|| ArchiveError::NotFound(key.clone()));
    }
    Ok(None)
}

fn print_entry(index: &PathTreeIndex, id: NodeId) {
    let node = index.node(id);
    let mut line = format!(
        "{}  {}  {}",
        node.path(),
        index.size_label(id),
        index.date_label(id)
    );
    if !node.type_label().is_empty() {
        line.push_str("  ");
        line.push_str(node.type_label());
    }
    if let Some(key) = node.secondary_key() {
        line.push_str("  ");
        line.push_str(key);
    }
    println!("{}", line);
}

fn report_extraction(report: &ExtractReport) {
    for failure in &report.failed {
        eprintln!("arbor: cannot extract '{}': {}", failure.path, failure.reason);
    }
    eprintln!(
        "Extracted {} files to {}",
        report.written.len(),
        report.target.display()
    );
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    let interval = parse_duration_string(&args.interval).unwrap_or_else(|e| {
        fail(format!("invalid --interval duration '{}': {}", args.interval, e))
    });
    let filter = build_filter(&args).unwrap_or_else(|e| fail(e));
    let sort = SortSpec::new(
        args.sort.into(),
        if args.reverse {
            SortOrder::Descending
        } else {
            SortOrder::Ascending
        },
    );
    let use_color = should_use_color(args.color);
    let output_config = OutputConfig {
        use_color,
        long: args.long,
        max_depth: args.level,
        dirs_only: args.dirs_only,
    };

    let mut workspace = Workspace::new(WorkspaceConfig {
        parallel_workers: args.jobs,
        progress_interval: interval,
    });

    let mut opened = Vec::new();
    for path in &args.archives {
        if !path.exists() {
            fail(format!(
                "cannot access '{}': No such file or directory",
                path.display()
            ));
        }
        let source = open_source(path, args.all).unwrap_or_else(|e| fail(e));
        opened.push(workspace.open(source, loader_config(&args, interval)));
    }

    let show_progress = args.progress;
    let on_notification = |notification: &Notification| {
        if let Notification::StatusChanged(status) = notification {
            if show_progress && !status.is_idle() {
                eprintln!("{}", status);
            }
        }
    };
    if !workspace.wait_idle_with(WAIT_LIMIT, on_notification) {
        fail("timed out waiting for archives to load");
    }

    let mut failed = false;
    let mut trees = Vec::new();
    let mut all_stats = Vec::new();

    for id in opened {
        let Some(handle) = workspace.archive(id) else {
            continue;
        };
        let label = handle.label().to_string();
        let index = match handle.state() {
            ArchiveState::Failed(message) => {
                eprintln!("arbor: {}", message);
                failed = true;
                continue;
            }
            ArchiveState::Loading => continue,
            ArchiveState::Ready => match handle.index() {
                Some(index) => Arc::clone(index),
                None => continue,
            },
        };

        let found = match lookup(&index, &args) {
            Ok(found) => found,
            Err(e) => {
                eprintln!("arbor: {}: {}", label, e);
                failed = true;
                continue;
            }
        };

        let projection = FilteredProjection::new(&index, filter.clone(), sort);
        let selection = match found {
            Some(node) => index.leaves_under(&[node]),
            None => projection.leaves(&[NodeId::ROOT]),
        };

        if let Some(node) = found {
            if args.json {
                trees.push(JsonNode::build(&projection, node, &output_config));
            } else {
                print_entry(&index, node);
            }
        } else if args.stats {
            all_stats.push(ArchiveStats::collect(&label, &index, workspace.report(id)));
        } else if args.json {
            trees.push(JsonNode::build(&projection, NodeId::ROOT, &output_config));
        } else if let Err(e) = TreeFormatter::new(output_config.clone()).print(&projection, &label) {
            fail(e);
        }

        if let Some(ref target) = args.extract {
            if let Err(e) = workspace.extract(id, selection, target.clone()) {
                eprintln!("arbor: {}: {}", label, e);
                failed = true;
            }
        }
    }

    let result = if args.json && args.stats {
        print_json(&all_stats)
    } else if args.json {
        match trees.len() {
            0 => Ok(()),
            1 => print_json(&trees[0]),
            _ => print_json(&trees),
        }
    } else {
        all_stats
            .iter()
            .try_for_each(|stats| print_stats(stats, use_color))
    };
    if let Err(e) = result {
        fail(e);
    }

    if args.extract.is_some() {
        let mut reports = Vec::new();
        let idle = workspace.wait_idle_with(WAIT_LIMIT, |notification| {
            if let Notification::ExtractionFinished { report, .. } = notification {
                reports.push(report.clone());
            }
        });
        if !idle {
            fail("timed out waiting for extraction");
        }
        for report in &reports {
            report_extraction(report);
            failed |= !report.is_clean();
        }
    }

    if failed {
        process::exit(1);
    }
}
