//! eqgen CLI - Command-line client for the EQ test generation engine

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tabled::{Table, Tabled};

const DEFAULT_API_URL: &str = "http://127.0.0.1:5000";

#[derive(Parser)]
#[command(name = "eqgen")]
#[command(about = "EQ test generation CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// HTTP API base URL
    #[arg(long, env = "EQGEN_URL", default_value = DEFAULT_API_URL)]
    url: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start generating a test
    Generate {
        /// Age of the test takers (12-18)
        #[arg(short, long)]
        age: Option<i64>,

        /// Backend provider: local (ollama) or cloud (deepseek)
        #[arg(short, long)]
        provider: Option<String>,

        /// Block until the test is completed or failed
        #[arg(short, long)]
        wait: bool,
    },

    /// Show one test
    Status {
        /// Test ID
        test_id: String,
    },

    /// List all tests
    List,

    /// Poll a test until it is completed or failed
    Wait {
        /// Test ID
        test_id: String,

        /// Seconds between polls
        #[arg(long, default_value = "2")]
        interval: u64,

        /// Give up after this many seconds
        #[arg(long, default_value = "1800")]
        timeout: u64,
    },

    /// Check that the service is up
    Health,
}

#[derive(Debug, Clone, Deserialize, Tabled)]
struct TestRow {
    test_id: String,
    age: u8,
    status: String,
    current_section: String,
    provider: String,
    created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
struct TestDetails {
    test_id: String,
    status: String,
    progress: String,
    current_section: String,
    provider: String,
    file_path: Option<String>,
}

impl TestDetails {
    fn is_terminal(&self) -> bool {
        self.status == "completed" || self.status == "failed"
    }
}

struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Value> {
        let response = request.send().await.context("Failed to connect to service")?;
        let status = response.status();
        let body: Value = response.json().await.context("Failed to parse response")?;

        if !status.is_success() {
            let message = body["error"].as_str().unwrap_or("unknown error");
            bail!("API error ({}): {}", status.as_u16(), message);
        }
        Ok(body)
    }

    async fn generate(&self, age: Option<i64>, provider: Option<&str>) -> Result<Value> {
        let mut body = json!({});
        if let Some(age) = age {
            body["age"] = json!(age);
        }
        if let Some(provider) = provider {
            body["provider"] = json!(provider);
        }
        self.send(self.http.post(format!("{}/generate", self.base_url)).json(&body))
            .await
    }

    async fn status(&self, test_id: &str) -> Result<TestDetails> {
        let body = self
            .send(self.http.get(format!("{}/status/{}", self.base_url, test_id)))
            .await?;
        serde_json::from_value(body).context("Unexpected status payload")
    }

    async fn list(&self) -> Result<Vec<TestRow>> {
        let body = self
            .send(self.http.get(format!("{}/tests", self.base_url)))
            .await?;
        serde_json::from_value(body["tests"].clone()).context("Unexpected list payload")
    }

    async fn health(&self) -> Result<Value> {
        self.send(self.http.get(format!("{}/health", self.base_url)))
            .await
    }

    /// Poll until the test reaches a terminal status
    async fn wait(&self, test_id: &str, interval: Duration, timeout: Duration) -> Result<TestDetails> {
        let started = Instant::now();
        let mut last_section = String::new();
        loop {
            let details = self.status(test_id).await?;
            if details.is_terminal() {
                return Ok(details);
            }
            if details.current_section != last_section {
                println!("  {} {}", "•".bold(), details.progress);
                last_section = details.current_section.clone();
            }
            if started.elapsed() >= timeout {
                bail!("Timed out waiting for test {}", test_id);
            }
            tokio::time::sleep(interval).await;
        }
    }
}

fn print_details(details: &TestDetails) {
    let status = match details.status.as_str() {
        "completed" => details.status.green(),
        "failed" => details.status.red(),
        _ => details.status.yellow(),
    };
    println!("  {} {}", "Test ID:".bold(), details.test_id);
    println!("  {} {}", "Status:".bold(), status);
    println!("  {} {}", "Section:".bold(), details.current_section);
    println!("  {} {}", "Provider:".bold(), details.provider);
    println!("  {} {}", "Progress:".bold(), details.progress);
    if let Some(path) = &details.file_path {
        println!("  {} {}", "File:".bold(), path);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = ApiClient::new(&cli.url);

    match cli.command {
        Commands::Generate {
            age,
            provider,
            wait,
        } => {
            let result = client.generate(age, provider.as_deref()).await?;
            let test_id = result["test_id"].as_str().unwrap_or_default().to_string();

            println!("{}", "✓ Test generation started".green().bold());
            println!("  {} {}", "Test ID:".bold(), test_id);
            println!("  {} {}", "Provider:".bold(), result["provider"]);

            if wait {
                println!();
                let details = client
                    .wait(&test_id, Duration::from_secs(2), Duration::from_secs(1800))
                    .await?;
                print_details(&details);
            }
        }

        Commands::Status { test_id } => {
            let details = client.status(&test_id).await?;
            print_details(&details);
        }

        Commands::List => {
            let tests = client.list().await?;
            if tests.is_empty() {
                println!("{}", "No tests yet".yellow());
            } else {
                println!("{}", Table::new(tests));
            }
        }

        Commands::Wait {
            test_id,
            interval,
            timeout,
        } => {
            let details = client
                .wait(
                    &test_id,
                    Duration::from_secs(interval),
                    Duration::from_secs(timeout),
                )
                .await?;
            print_details(&details);
            if details.status == "failed" {
                bail!("Test {} failed", test_id);
            }
        }

        Commands::Health => match client.health().await {
            Ok(health) => {
                println!("  {} {}", "URL:".bold(), cli.url);
                println!("  {} {}", "Status:".bold(), "ONLINE".green());
                println!("  {} {}", "Version:".bold(), health["version"]);
            }
            Err(e) => {
                println!("  {} {}", "Status:".bold(), "ERROR".red());
                println!("  {} {}", "Error:".bold(), e);
            }
        },
    }

    Ok(())
}
