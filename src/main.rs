// Journal scraper: searches DOAJ for articles, checks which links are
// reachable, and renders the verified list into a Word report.

// Copyright 2025 Servus Altissimi (Pseudonym)

// Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

mod acquisition;
mod config;
mod error;
mod identity;
mod record;
mod report;
mod selection;
mod verify;
mod web;

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use clap::Parser;
use config::{ScraperConfig, DOAJ_API_BASE, DOAJ_SITE_BASE};
use identity::{FixedAgent, Identity, RandomAgent};
use selection::Pipeline;
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// CL arguments for config
#[derive(Parser, Debug)]
#[command(author, version, about = "DOAJ journal scraper with link verification", long_about = None)]
struct Args {
    #[arg(short, long, default_value = "photosynthesis")]
    query: String,

    #[arg(short, long, default_value_t = 10)]
    count: i64,

    /// Write the .docx report here
    #[arg(short, long)]
    output: Option<String>,

    #[arg(long, default_value = DOAJ_API_BASE)]
    api_base: String,

    #[arg(long, default_value = DOAJ_SITE_BASE)]
    site_base: String,

    #[arg(long, default_value_t = 10)]
    timeout: u64,

    #[arg(long, default_value_t = 3)]
    probe_timeout: u64,

    /// Send this user agent instead of a random one
    #[arg(long)]
    user_agent: Option<String>,

    #[arg(long, default_value_t = false)]
    serve: bool,

    #[arg(short, long, default_value_t = 6601)]
    port: u16,

    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

impl Args {
    fn config(&self) -> ScraperConfig {
        ScraperConfig {
            api_base: self.api_base.clone(),
            site_base: self.site_base.clone(),
            acquisition_timeout: Duration::from_secs(self.timeout),
            probe_timeout: Duration::from_secs(self.probe_timeout),
            ..ScraperConfig::default()
        }
    }

    fn identity(&self) -> Arc<dyn Identity> {
        match &self.user_agent {
            Some(agent) => Arc::new(FixedAgent(agent.clone())),
            None => Arc::new(RandomAgent),
        }
    }
}

// RUST_LOG wins when set; --verbose only changes the fallback level.
fn env_filter(verbose: bool) -> EnvFilter {
    let level = if verbose { "journal_scraper=debug" } else { "journal_scraper=info" };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

fn init_logging(verbose: bool) {
    tracing_subscriber::fmt().with_env_filter(env_filter(verbose)).init();
}

async fn run_once(args: &Args, pipeline: &Pipeline) -> Result<()> {
    println!("{}", "=".repeat(64));
    println!("   DOAJ Journal Scraper with Link Verification");
    println!("{}", "=".repeat(64));
    println!("\nQuery: {}", args.query);
    println!("Requested: {}", pipeline.config().clamp_count(args.count));
    println!("API: {}\n", args.api_base);

    let records = pipeline.acquire_and_verify(&args.query, args.count).await;

    for (i, r) in records.iter().enumerate() {
        let status = if r.is_valid { "VALID" } else { "INVALID" };
        println!("[{}] {} ({})", i + 1, r.record.title, status);
        println!("    Authors: {}", r.record.authors);
        println!("    Publisher: {}", r.record.publisher);
        println!("    Link: {}", r.record.link);
    }

    let valid = records.iter().filter(|r| r.is_valid).count();
    println!("\n{}", "=".repeat(64));
    println!("Results");
    println!("{}", "=".repeat(64));
    println!("Total: {}", records.len());
    println!("Valid links: {}", valid);
    println!("Invalid links: {}", records.len() - valid);

    if records.is_empty() {
        println!("No results found for the given query.\n");
        return Ok(());
    }

    if let Some(path) = &args.output {
        let encoded = report::generate_report(&args.query, &records)?;
        let bytes = STANDARD.decode(encoded).context("report encoding")?;
        fs::write(path, bytes).with_context(|| format!("writing report to {}", path))?;
        println!("Report: {}\n", path);
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let pipeline = Arc::new(Pipeline::from_config(args.config(), args.identity())?);

    if args.serve {
        web::start_web_server(pipeline, args.port).await;
        return Ok(());
    }

    run_once(&args, &pipeline).await
}

#[cfg(test)]
mod tests {
    use super::*;

    // Single test so the RUST_LOG mutations never race another test.
    #[test]
    fn rust_log_overrides_default_level() {
        std::env::remove_var("RUST_LOG");
        assert_eq!(env_filter(false).to_string(), "journal_scraper=info");
        assert_eq!(env_filter(true).to_string(), "journal_scraper=debug");

        std::env::set_var("RUST_LOG", "journal_scraper=warn");
        assert_eq!(env_filter(true).to_string(), "journal_scraper=warn");
        std::env::remove_var("RUST_LOG");
    }
}
