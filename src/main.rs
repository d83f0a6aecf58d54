use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use folio::audit::audit_html;
use folio::page::Page;
use folio::platform::DeviceMetrics;
use folio::FolioConfig;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG: &str = "folio.json";

#[derive(Parser, Debug)]
#[command(name = "folio", version, about = "Portfolio site tooling")]
struct Cli {
    /// Configuration file (defaults to ./folio.json when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// More output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Only print errors
    #[arg(short, long, global = true)]
    quiet: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate responsive WebP variants and a JPEG fallback per image
    Optimize {
        #[arg(long)]
        src: Option<PathBuf>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Check a built page for its SEO and accessibility contract
    Audit {
        #[arg(default_value = "site/index.html")]
        page: PathBuf,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the accessibility tree of a page as JSON
    A11y {
        #[arg(default_value = "site/index.html")]
        page: PathBuf,
        /// Device preset: desktop or mobile
        #[arg(long, default_value = "desktop")]
        device: String,
    },
    /// Serve a directory locally
    Preview {
        #[arg(default_value = "site")]
        root: PathBuf,
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long, default_value_t = folio::preview::DEFAULT_PORT)]
        port: u16,
    },
}

/// `RUST_LOG` sets the base filter; `-v`/`-q` override it
fn init_logging(verbose: u8, quiet: bool) {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    let level = match (quiet, verbose) {
        (true, _) => Some(log::LevelFilter::Error),
        (false, 0) => None,
        (false, 1) => Some(log::LevelFilter::Debug),
        (false, _) => Some(log::LevelFilter::Trace),
    };
    if let Some(level) = level {
        builder.filter_level(level);
    }
    builder.format_timestamp(None).init();
}

fn load_config(path: Option<&Path>) -> Result<FolioConfig> {
    match path {
        Some(p) => FolioConfig::from_file(p).with_context(|| format!("loading {}", p.display())),
        None if Path::new(DEFAULT_CONFIG).is_file() => {
            FolioConfig::from_file(DEFAULT_CONFIG).context("loading folio.json")
        }
        None => Ok(FolioConfig::default()),
    }
}

#[cfg(feature = "optimize")]
async fn run_optimize(mut config: folio::optimize::OptimizeConfig, src: Option<PathBuf>, out: Option<PathBuf>) -> Result<()> {
    if let Some(src) = src {
        config.src_dir = src;
    }
    if let Some(out) = out {
        config.out_dir = out;
    }
    let summary = folio::optimize::optimize(&config)
        .await
        .with_context(|| format!("optimizing {}", config.src_dir.display()))?;
    if !summary.is_success() {
        for (path, reason) in &summary.failures {
            log::error!("{}: {}", path.display(), reason);
        }
        bail!("{} image(s) failed", summary.failures.len());
    }
    Ok(())
}

#[cfg(not(feature = "optimize"))]
async fn run_optimize(_: folio::optimize::OptimizeConfig, _: Option<PathBuf>, _: Option<PathBuf>) -> Result<()> {
    bail!("folio was built without the `optimize` feature")
}

#[cfg(feature = "preview")]
fn run_preview(root: &Path, host: &str, port: u16) -> Result<()> {
    let server = folio::preview::PreviewServer::bind(root, &format!("{}:{}", host, port))
        .with_context(|| format!("binding {}:{}", host, port))?;
    server.serve()?;
    Ok(())
}

#[cfg(not(feature = "preview"))]
fn run_preview(_: &Path, _: &str, _: u16) -> Result<()> {
    bail!("folio was built without the `preview` feature")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Optimize { src, out } => run_optimize(config.optimize, src, out).await?,
        Command::Audit { page, json } => {
            let html = std::fs::read_to_string(&page).with_context(|| format!("reading {}", page.display()))?;
            let report = audit_html(&html, &config.identity, &config.page.contract)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                for f in &report.findings {
                    println!("{} {:<18} {}", if f.passed { "ok  " } else { "FAIL" }, f.check, f.detail);
                }
            }
            report.into_result()?;
        }
        Command::A11y { page, device } => {
            let Some(device) = DeviceMetrics::preset(&device) else {
                bail!("unknown device preset `{}` (expected desktop or mobile)", device);
            };
            let mut page_config = config.page;
            page_config.viewport = device.viewport();
            let page = Page::load_file(&page, page_config).with_context(|| format!("loading {}", page.display()))?;
            println!("{}", serde_json::to_string_pretty(&page.accessibility_tree())?);
        }
        Command::Preview { root, host, port } => run_preview(&root, &host, port)?,
    }

    Ok(())
}
