//! gitmigrate command-line interface.
//!
//! Progress lines go to stdout, logs to stderr.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use gitmigrate::config::{MigrateConfig, RetryPolicy};
use gitmigrate::git::{set_network_timeout, BranchName};
use gitmigrate::hosted::DEFAULT_API_URL;
use gitmigrate::migrate::{BatchEngine, Pipeline};
use gitmigrate::session::Session;

#[derive(Parser)]
#[command(name = "gitmigrate", version)]
#[command(about = "Migrate local git repositories to a hosted organization", long_about = None)]
struct Cli {
    /// Directories to search for repositories
    #[arg(required = true)]
    roots: Vec<PathBuf>,

    /// Organization that owns the hosted repositories
    #[arg(long, env = "GITMIGRATE_ORG")]
    org: String,

    /// Primary branch to license and push
    #[arg(long, default_value = BranchName::MAIN)]
    branch: String,

    /// Name of the local remote pointing at the hosted repository
    #[arg(long, default_value = "origin-hosted")]
    remote_name: String,

    /// Parent directory for scratch clones
    #[arg(long)]
    scratch_dir: Option<PathBuf>,

    /// License text to add to unlicensed repositories
    #[arg(long)]
    license: Option<PathBuf>,

    /// Default README appended alongside the license
    #[arg(long)]
    readme: Option<PathBuf>,

    /// Repository name to skip (repeatable)
    #[arg(long = "exclude", value_name = "NAME")]
    excluded: Vec<String>,

    /// Hosts file holding the API token
    #[arg(long, env = "GITMIGRATE_HOSTS_FILE")]
    hosts_file: Option<PathBuf>,

    /// Hosted API base URL
    #[arg(long, default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Attempts per repository before giving up, 0 for unlimited
    #[arg(long, default_value_t = 10)]
    max_attempts: u32,

    /// Pause before the first retry cycle, doubled for each further cycle
    #[arg(long, default_value_t = 1000)]
    retry_delay_ms: u64,

    /// Create hosted repositories as private
    #[arg(long)]
    private: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn config(&self) -> Result<MigrateConfig> {
        let branch = BranchName::new(&self.branch)
            .with_context(|| format!("invalid branch '{}'", self.branch))?;

        let retry = RetryPolicy {
            max_attempts: (self.max_attempts > 0).then_some(self.max_attempts),
            ..RetryPolicy::default()
        }
        .with_delay(
            Duration::from_millis(self.retry_delay_ms),
            RetryPolicy::default().max_delay,
        );

        let mut config = MigrateConfig::new(&self.org)
            .branch(branch)
            .remote_name(&self.remote_name)
            .api_url(&self.api_url)
            .retry(retry)
            .private(self.private);

        if let Some(dir) = &self.scratch_dir {
            config = config.scratch_root(dir);
        }
        if self.license.is_some() || self.readme.is_some() {
            let license = self.license.clone().unwrap_or(config.license_file.clone());
            let readme = self.readme.clone().unwrap_or(config.readme_file.clone());
            config = config.license_assets(license, readme);
        }
        if let Some(path) = &self.hosts_file {
            config = config.hosts_file(path);
        }
        for name in &self.excluded {
            config = config.exclude(name);
        }

        config.validate()?;
        Ok(config)
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "gitmigrate=debug" } else { "gitmigrate=info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(cli: &Cli) -> Result<bool> {
    let config = cli.config()?;
    set_network_timeout(config.http_timeout).context("cannot configure git timeouts")?;
    let session = Session::establish(&config).context("cannot reach the hosted service")?;

    let mut engine = BatchEngine::new(Pipeline::new(&config, &session), config.retry.clone())
        .exclude(config.excluded.iter().cloned());

    let mut clean = true;
    for root in &cli.roots {
        match engine.run_root(root, |record| println!("{record}")) {
            Ok(report) => {
                println!("{report}");
                clean &= report.is_complete();
            }
            Err(e) if e.is_fatal_argument() => {
                error!(root = %root.display(), "{e}");
                eprintln!("error: {}: {e}", root.display());
                clean = false;
            }
            Err(e) => return Err(e).with_context(|| format!("migrating {}", root.display())),
        }
    }
    Ok(clean)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => {
            info!("finished with failures");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
