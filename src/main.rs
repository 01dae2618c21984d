// SPDX-License-Identifier: MIT
// axescan — CLI adapter over the scan orchestration core.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use axescan::config::ScanConfig;
use axescan::model::{Browser, Engine, ScanOptions, ScanTarget};
use axescan::{batch, mcp, report, rest, summary, target, AppContext};
use clap::{Args as ClapArgs, Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const BLUE: &str = "\x1b[34m";
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";

#[derive(Parser)]
#[command(name = "axescan", about = "Run axe-core accessibility scans", version)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Path to config.toml (defaults apply when absent)
    #[arg(long, env = "AXESCAN_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Log filter (trace, debug, info, warn, error)
    #[arg(long, env = "AXESCAN_LOG", global = true)]
    log: Option<String>,
}

#[derive(ClapArgs)]
struct BrowserOpts {
    /// Browser to drive: chrome or firefox
    #[arg(long)]
    browser: Option<String>,

    /// Run the browser with a visible window
    #[arg(long)]
    no_headless: bool,
}

#[derive(ClapArgs)]
struct OutputOpts {
    /// Print the JSON-serialized scan result
    #[arg(long)]
    output_json: bool,

    /// Generate an HTML report file (requires --save)
    #[arg(long)]
    output_html: bool,

    /// Save report files to the current directory
    #[arg(long)]
    save: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Scan a URL for accessibility issues.
    ScanUrl {
        /// URL to scan
        url: String,

        /// Scanning engine: selenium (default) or playwright
        #[arg(long, default_value = "selenium")]
        engine: String,

        #[command(flatten)]
        browser: BrowserOpts,

        #[command(flatten)]
        output: OutputOpts,
    },
    /// Scan a local HTML file for accessibility issues.
    ScanHtml {
        /// HTML file to scan
        html_file: PathBuf,

        #[command(flatten)]
        browser: BrowserOpts,

        #[command(flatten)]
        output: OutputOpts,
    },
    /// Scan several URLs, isolating per-target failures.
    Batch {
        /// URLs to scan
        #[arg(required_unless_present = "file")]
        urls: Vec<String>,

        /// File with one target URL per line (blank lines and `#` comments
        /// are skipped)
        #[arg(long)]
        file: Option<PathBuf>,

        /// Scanning engine: selenium or playwright (default)
        #[arg(long, default_value = "playwright")]
        engine: String,

        #[command(flatten)]
        browser: BrowserOpts,
    },
    /// Start the REST API server.
    Serve {
        #[arg(long, env = "AXESCAN_PORT", default_value_t = rest::REST_PORT)]
        port: u16,
    },
    /// Serve the MCP tool protocol over stdio.
    Mcp,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = args
        .log
        .as_deref()
        .map(EnvFilter::new)
        .unwrap_or_else(|| EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = ScanConfig::load(args.config.as_deref())?;
    let ctx = Arc::new(AppContext::new(config)?);

    match args.command {
        Command::ScanUrl {
            url,
            engine,
            browser,
            output,
        } => {
            let engine: Engine = engine.parse()?;
            let opts = scan_options(&ctx, &browser)?;
            let result = ctx
                .scanner(engine)
                .scan(&ScanTarget::RemoteUrl(url.clone()), &opts)
                .await?;
            let payload = serde_json::to_value(&result)?;
            handle_output(&payload, &url, engine.as_str(), opts.browser.as_str(), &output)?;
        }
        Command::ScanHtml {
            html_file,
            browser,
            output,
        } => {
            let html = std::fs::read_to_string(&html_file)
                .with_context(|| format!("reading HTML file {}", html_file.display()))?;
            let opts = scan_options(&ctx, &browser)?;
            let materialized = target::materialize(&html)?;
            let result = ctx
                .scanner(Engine::Playwright)
                .scan(&ScanTarget::LocalHtml(materialized), &opts)
                .await?;
            let payload = serde_json::to_value(&result)?;
            let source = html_file.display().to_string();
            handle_output(&payload, &source, "html-scan", opts.browser.as_str(), &output)?;
        }
        Command::Batch {
            urls,
            file,
            engine,
            browser,
        } => {
            let engine: Engine = engine.parse()?;
            let opts = scan_options(&ctx, &browser)?;
            let targets = gather_targets(urls, file.as_deref())?;
            let result = batch::run(ctx.scanner(engine).as_ref(), engine, &targets, &opts).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Serve { port } => {
            rest::start_rest_server(ctx, port).await?;
        }
        Command::Mcp => {
            mcp::serve_stdio(ctx).await?;
        }
    }
    Ok(())
}

fn scan_options(ctx: &AppContext, opts: &BrowserOpts) -> Result<ScanOptions> {
    let browser: Browser = opts
        .browser
        .as_deref()
        .unwrap_or(&ctx.config.scan.browser)
        .parse()?;
    let headless = if opts.no_headless {
        false
    } else {
        ctx.config.scan.headless
    };
    Ok(ScanOptions { browser, headless })
}

/// Print and/or persist a scan result the way the caller asked for it.
fn handle_output(
    result: &Value,
    source: &str,
    engine: &str,
    browser: &str,
    output: &OutputOpts,
) -> Result<()> {
    if output.output_json {
        println!("{}", serde_json::to_string_pretty(result)?);
    }
    if output.save {
        let dir = std::env::current_dir()?;
        let json_path = report::write_json_report(&dir, engine, browser, result)?;
        eprintln!("JSON report saved: {}", json_path.display());
        if output.output_html {
            let html_path = report::write_html_report(&dir, engine, browser, source, result)?;
            eprintln!("HTML report saved: {}", html_path.display());
        }
    }

    if !output.output_json {
        let rows = summary::summarize(result);
        println!(
            "{BOLD}{BLUE}Found {} accessibility issues:{RESET}",
            rows.len()
        );
        for row in rows {
            let color = impact_color(&row.impact);
            println!(
                "- {color}{} ({}): {} instances{RESET}",
                row.id, row.impact, row.affected_node_count
            );
        }
    }
    Ok(())
}

/// Critical violations stand out in red; everything else is yellow.
fn impact_color(impact: &str) -> &'static str {
    if impact == "critical" {
        RED
    } else {
        YELLOW
    }
}

/// Merge positional URLs with the optional target file. File lines are
/// trimmed; blanks and `#` comments are skipped.
fn gather_targets(urls: Vec<String>, file: Option<&Path>) -> Result<Vec<String>> {
    let mut targets = urls;
    if let Some(path) = file {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading target file {}", path.display()))?;
        targets.extend(
            contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(str::to_string),
        );
    }
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn test_impact_color_highlights_critical() {
        assert_eq!(impact_color("critical"), RED);
        assert_eq!(impact_color("serious"), YELLOW);
        assert_eq!(impact_color("unknown"), YELLOW);
    }

    #[test]
    fn test_gather_targets_merges_file_and_positional() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "https://a.example").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "# staging, re-enable after the cert renewal").unwrap();
        writeln!(file, "  https://b.example  ").unwrap();

        let targets = gather_targets(
            vec!["https://cli.example".to_string()],
            Some(file.path()),
        )
        .unwrap();
        assert_eq!(
            targets,
            vec!["https://cli.example", "https://a.example", "https://b.example"]
        );
    }

    #[test]
    fn test_gather_targets_reports_missing_file() {
        let err = gather_targets(Vec::new(), Some(Path::new("/nonexistent/urls.txt")))
            .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/urls.txt"));
    }
}
