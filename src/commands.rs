use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use mapper::Rules;

/// Migrate Grafana dashboard JSON into the SigNoz import format
#[derive(Parser)]
#[command(name = "dashmover", version, about)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable quiet mode (minimal output)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert Grafana dashboard JSON to SigNoz JSON
    Convert {
        /// Path to a Grafana dashboard JSON file, or a directory of them
        #[arg(long)]
        input: PathBuf,

        /// Path to write the SigNoz JSON (a directory in directory mode)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Optional path to custom mapping rules JSON
        #[arg(long)]
        rules: Option<PathBuf>,

        /// Print SigNoz JSON to stdout without writing a file
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate a SigNoz dashboard JSON file
    Validate {
        /// Path to a SigNoz dashboard JSON file
        #[arg(long)]
        input: PathBuf,
    },
    /// Compare a Grafana dashboard against its converted SigNoz dashboard
    Compare {
        /// Path to the Grafana dashboard JSON
        #[arg(long)]
        grafana: PathBuf,

        /// Path to the converted SigNoz dashboard JSON
        #[arg(long)]
        signoz: PathBuf,

        /// Optional path to custom mapping rules JSON
        #[arg(long)]
        rules: Option<PathBuf>,
    },
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        self.init_logging();
        match self.command {
            Commands::Convert {
                input,
                output,
                rules,
                dry_run,
            } => run_convert(&input, output.as_deref(), rules.as_deref(), dry_run),
            Commands::Validate { input } => run_validate(&input),
            Commands::Compare {
                grafana,
                signoz,
                rules,
            } => run_compare(&grafana, &signoz, rules.as_deref()),
        }
    }

    fn init_logging(&self) {
        let level = if self.quiet {
            "warn"
        } else if self.verbose {
            "debug"
        } else {
            "info"
        };
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn run_convert(
    input: &Path,
    output: Option<&Path>,
    rules_path: Option<&Path>,
    dry_run: bool,
) -> anyhow::Result<()> {
    let rules = Rules::load(rules_path)?;
    let meta = fs::metadata(input)
        .with_context(|| format!("failed to read input {}", input.display()))?;
    if meta.is_dir() {
        return convert_dir(input, output, &rules);
    }

    let dash = grafana::Dashboard::from_file(input)
        .with_context(|| format!("failed to parse {}", input.display()))?;
    let converted = mapper::convert(&dash, &rules);
    for issue in signoz::validate(&converted) {
        tracing::warn!("validation: {issue}");
    }

    if dry_run {
        let stdout = std::io::stdout();
        signoz::write_dashboard(stdout.lock(), &converted)?;
        return Ok(());
    }
    let Some(output) = output else {
        anyhow::bail!("--output is required when not using --dry-run");
    };
    let file = File::create(output)
        .with_context(|| format!("failed to create {}", output.display()))?;
    signoz::write_dashboard(file, &converted)?;
    Ok(())
}

/// Converts every `*.json` file directly under `input`. Files that fail
/// keep the run going; the last error is reported once the rest are done.
fn convert_dir(input: &Path, output: Option<&Path>, rules: &Rules) -> anyhow::Result<()> {
    let out_dir = match output {
        Some(path) => path.to_path_buf(),
        None => input.join("..").join("converted-signoz"),
    };
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("failed to create output directory {}", out_dir.display()))?;

    let mut paths = Vec::new();
    for entry in fs::read_dir(input)
        .with_context(|| format!("failed to read directory {}", input.display()))?
    {
        let path = entry?.path();
        if path.is_dir() || path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            continue;
        }
        paths.push(path);
    }
    paths.sort();

    let mut last_err: Option<anyhow::Error> = None;
    for path in paths {
        let name = file_name(&path);
        let dash = match grafana::Dashboard::from_file(&path) {
            Ok(dash) => dash,
            Err(err) => {
                tracing::warn!("skip {name}: {err}");
                last_err = Some(err.into());
                continue;
            }
        };
        let converted = mapper::convert(&dash, rules);
        for issue in signoz::validate(&converted) {
            tracing::warn!("{name}: validation: {issue}");
        }

        let out_file = out_dir.join(format!("converted-{name}"));
        let file = match File::create(&out_file) {
            Ok(file) => file,
            Err(err) => {
                tracing::warn!("write {}: {err}", out_file.display());
                last_err = Some(err.into());
                continue;
            }
        };
        if let Err(err) = signoz::write_dashboard(file, &converted) {
            tracing::warn!("write {}: {err}", out_file.display());
            last_err = Some(err.into());
        }
    }

    match last_err {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn run_validate(input: &Path) -> anyhow::Result<()> {
    let dash = signoz::read_dashboard_file(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let issues = signoz::validate(&dash);
    if issues.is_empty() {
        println!("OK: looks like a valid SigNoz dashboard structure");
        return Ok(());
    }
    for issue in &issues {
        eprintln!("validation: {issue}");
    }
    anyhow::bail!("validation failed with {} issue(s)", issues.len())
}

fn run_compare(
    grafana_path: &Path,
    signoz_path: &Path,
    rules_path: Option<&Path>,
) -> anyhow::Result<()> {
    let rules = Rules::load(rules_path)?;
    let stdout = std::io::stdout();
    let mismatches = compare::compare_dashboards(stdout.lock(), grafana_path, signoz_path, &rules)?;
    if mismatches > 0 {
        anyhow::bail!("found {mismatches} mismatch(es)");
    }
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
