use anyhow::Result;
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use stylelens::check::{ReconciliationDriver, Severity, TaxonomyTable};
use stylelens::config::{Config, Overrides};
use stylelens::host::{self, Diagnostic};
use stylelens::{llm, prompt, sources};

/// Exit status when configuration is unusable
const EXIT_CONFIG: u8 = 2;
/// Exit status when at least one error-severity diagnostic was reported
const EXIT_VIOLATIONS: u8 = 1;

#[derive(Parser, Debug)]
#[command(
    name = "stylelens",
    about = "Java naming and documentation review backed by a language model",
    version
)]
struct Args {
    /// Java files or directories to check
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Config file (default: ./stylelens.toml, then the user config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Chat/completions endpoint URL
    #[arg(long)]
    endpoint: Option<String>,

    /// Model name sent to the endpoint
    #[arg(long)]
    model: Option<String>,

    /// API key (falls back to STYLELENS_API_KEY or the provider's variable)
    #[arg(long)]
    api_key: Option<String>,

    /// Tab stop used when computing columns
    #[arg(long)]
    tab_width: Option<usize>,

    /// Added to every computed column
    #[arg(long, allow_hyphen_values = true)]
    column_offset: Option<i64>,

    /// Hide [WARN] findings
    #[arg(long)]
    no_warnings: bool,

    /// Always ask the backend, never read or write the reply cache
    #[arg(long)]
    no_cache: bool,

    /// Reply cache directory (default: ~/.llm-checks-cache)
    #[arg(long)]
    cache_dir: Option<PathBuf>,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            endpoint: self.endpoint.clone(),
            model: self.model.clone(),
            api_key: self.api_key.clone(),
            tab_width: self.tab_width,
            column_offset: self.column_offset,
            no_warnings: self.no_warnings,
            no_cache: self.no_cache,
            cache_dir: self.cache_dir.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    let mut driver = match build_driver(&args) {
        Ok(driver) => driver,
        Err(err) => {
            eprintln!("stylelens: {:#}", err);
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    let files = sources::collect_java_files(&args.paths);
    if files.is_empty() {
        log::warn!("No Java files found");
    }

    let mut diagnostics = 0;
    let mut errors = 0;
    for path in &files {
        let source = match fs::read_to_string(path) {
            Ok(source) => source,
            Err(err) => {
                log::warn!("Failed to read {}: {}", path.display(), err);
                continue;
            }
        };
        let root = match host::java::parse(&source) {
            Ok(root) => root,
            Err(err) => {
                log::warn!("Failed to parse {}: {:#}", path.display(), err);
                continue;
            }
        };

        let mut sink: Vec<Diagnostic> = Vec::new();
        driver.check_source(path, &source, &root, &mut sink).await;

        for diagnostic in &sink {
            println!("{}", diagnostic.to_line(path));
        }
        diagnostics += sink.len();
        errors += sink
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count();
    }

    eprintln!(
        "stylelens: {} file(s) checked, {} diagnostic(s), {} cache hit(s)",
        files.len(),
        diagnostics,
        driver.cache_stats().hits
    );

    if errors > 0 {
        ExitCode::from(EXIT_VIOLATIONS)
    } else {
        ExitCode::SUCCESS
    }
}

fn build_driver(args: &Args) -> Result<ReconciliationDriver> {
    let mut config = Config::load(args.config.as_deref())?;
    config.finish(args.overrides());

    let backend = llm::create_backend(&config.backend)?;
    let template = prompt::load_template(config.prompt_template.as_deref())?;

    Ok(ReconciliationDriver::new(
        config.check.clone(),
        TaxonomyTable::default(),
        config.response_cache(),
        Box::new(backend),
        template,
    ))
}
