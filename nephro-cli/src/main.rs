//! nephro-cli — command-line client for the NéphroPredict HTTP API
//!
//! # Subcommands
//! - `predict --creatinine <mg/L> ... [--json]` — submit a stage prediction
//! - `contact --name ... --email ... --subject ... --message ...`
//! - `stages [--json]`                          — list the IRC stage catalogue
//! - `status`                                   — show server health

use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};

const DEFAULT_SERVER: &str = "http://127.0.0.1:5000";
const BAR_WIDTH: usize = 30;

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "nephro-cli",
    version,
    about = "NéphroPredict — chronic kidney disease stage prediction client"
)]
struct Cli {
    /// NéphroPredict HTTP server URL (overrides NEPHRO_HTTP_URL env var)
    #[arg(long, env = "NEPHRO_HTTP_URL", default_value = DEFAULT_SERVER)]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Predict the IRC stage from clinical measurements
    Predict {
        #[command(flatten)]
        input: PredictArgs,

        /// Print the raw JSON response
        #[arg(long)]
        json: bool,
    },

    /// Send a message through the contact form
    Contact {
        #[arg(long)]
        name: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        subject: String,

        #[arg(long)]
        message: String,
    },

    /// List the IRC stages with their recommendations
    Stages {
        /// Print the raw JSON response
        #[arg(long)]
        json: bool,
    },

    /// Show NéphroPredict server status
    Status,
}

/// Request body for POST /api/predict. Range checks are left to the server.
#[derive(Debug, Args, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictArgs {
    /// Serum creatinine (mg/L)
    #[arg(long)]
    pub creatinine: f64,

    /// Urea (g/L)
    #[arg(long)]
    pub urea: f64,

    #[arg(long)]
    pub age: u32,

    /// Sodium (meq/L)
    #[arg(long)]
    pub sodium: f64,

    /// Systolic blood pressure (mmHg)
    #[arg(long = "bp-systolic")]
    pub bp_systolic: f64,

    /// Apex beat felt (0 or 1)
    #[arg(long)]
    pub shock: u8,

    /// 1 = male, 0 = female
    #[arg(long)]
    pub sex: u8,

    #[arg(long)]
    pub anemia: u8,

    /// Glasgow coma score (3-15)
    #[arg(long)]
    pub glasgow: f64,

    #[arg(long)]
    pub tobacco: u8,

    #[arg(long)]
    pub alcohol: u8,
}

// ============================================================================
// API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StageProbability {
    pub stage: u8,
    pub probability: f64,
}

#[derive(Debug, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Response from POST /api/predict
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResponse {
    pub predicted_stage: u8,
    pub confidence: f64,
    pub all_stages_probabilities: Vec<StageProbability>,
    pub feature_importance: Vec<FeatureImportance>,
}

/// One entry of GET /api/stages
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageDescription {
    pub stage: u8,
    pub name: String,
    pub dfg_range: String,
    pub description: String,
    pub recommendations: Vec<String>,
}

// ============================================================================
// Rendering
// ============================================================================

fn bar(fraction: f64) -> String {
    let filled = (fraction.clamp(0.0, 1.0) * BAR_WIDTH as f64).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled))
}

/// Human-readable prediction report. `source` is the `x-prediction-source` header.
pub fn render_prediction(resp: &PredictionResponse, source: Option<&str>) -> String {
    let mut out = format!(
        "Predicted stage: {}\nConfidence:      {:.1}%\n",
        resp.predicted_stage,
        resp.confidence * 100.0
    );
    if source == Some("fallback") {
        out.push_str("WARNING: inference service unavailable, these numbers are a demo estimate\n");
    }

    out.push_str("\nStage probabilities\n");
    for p in &resp.all_stages_probabilities {
        let marker = if p.stage == resp.predicted_stage { '>' } else { ' ' };
        out.push_str(&format!(
            "{} {} {} {:5.1}%\n",
            marker,
            p.stage,
            bar(p.probability),
            p.probability * 100.0
        ));
    }

    if !resp.feature_importance.is_empty() {
        let mut features: Vec<&FeatureImportance> = resp.feature_importance.iter().collect();
        features.sort_by(|a, b| b.importance.total_cmp(&a.importance));
        out.push_str("\nFeature importance\n");
        for f in features {
            out.push_str(&format!("  {:<32} {:.2}\n", f.feature, f.importance));
        }
    }

    out
}

/// Flatten a `{"_errors": [...], field: {"_errors": [...]}}` tree into lines.
pub fn render_errors(errors: &serde_json::Value) -> Vec<String> {
    let mut lines = Vec::new();
    let Some(tree) = errors.as_object() else {
        return lines;
    };

    for (key, node) in tree {
        let messages = if key == "_errors" {
            Some(node)
        } else {
            node.get("_errors")
        };
        let prefix = if key == "_errors" { "request" } else { key.as_str() };
        for msg in messages.and_then(|m| m.as_array()).into_iter().flatten() {
            lines.push(format!("{}: {}", prefix, msg.as_str().unwrap_or("invalid")));
        }
    }

    lines
}

pub fn render_stages(stages: &[StageDescription]) -> String {
    let mut out = String::new();
    for s in stages {
        out.push_str(&format!(
            "Stage {} — {} (DFG {})\n  {}\n",
            s.stage, s.name, s.dfg_range, s.description
        ));
        for r in &s.recommendations {
            out.push_str(&format!("  - {}\n", r));
        }
        out.push('\n');
    }
    out
}

// ============================================================================
// HTTP Client Calls
// ============================================================================

fn client(timeout_secs: u64) -> anyhow::Result<reqwest::blocking::Client> {
    Ok(reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

/// Report a non-2xx response and exit. 400 bodies carry a validation tree.
fn fail_with_body(resp: reqwest::blocking::Response) -> ! {
    let status = resp.status();
    let text = resp.text().unwrap_or_default();
    match serde_json::from_str::<serde_json::Value>(&text) {
        Ok(body) => {
            eprintln!(
                "nephro-cli: server returned {}: {}",
                status,
                body["message"].as_str().unwrap_or("unknown error")
            );
            for line in render_errors(&body["errors"]) {
                eprintln!("  {}", line);
            }
            if let Some(detail) = body["error"].as_str() {
                eprintln!("  {}", detail);
            }
        }
        Err(_) => eprintln!("nephro-cli: server returned {}: {}", status, text),
    }
    std::process::exit(1);
}

fn send(
    request: reqwest::blocking::RequestBuilder,
    url: &str,
) -> reqwest::blocking::Response {
    match request.send() {
        Ok(r) if r.status().is_success() => r,
        Ok(r) => fail_with_body(r),
        Err(e) => {
            eprintln!("nephro-cli: connection failed to {}: {}", url, e);
            std::process::exit(1);
        }
    }
}

fn do_predict(server: &str, input: &PredictArgs, json_output: bool) -> anyhow::Result<()> {
    let url = format!("{}/api/predict", server);
    let resp = send(client(60)?.post(&url).json(input), &url);

    let source = resp
        .headers()
        .get("x-prediction-source")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    if json_output {
        let body: serde_json::Value = resp.json()?;
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    let prediction: PredictionResponse = resp.json()?;
    print!("{}", render_prediction(&prediction, source.as_deref()));
    Ok(())
}

fn do_contact(
    server: &str,
    name: &str,
    email: &str,
    subject: &str,
    message: &str,
) -> anyhow::Result<()> {
    let url = format!("{}/api/contact", server);
    let body = serde_json::json!({
        "name": name,
        "email": email,
        "subject": subject,
        "message": message,
    });

    let resp = send(client(10)?.post(&url).json(&body), &url);
    let body: serde_json::Value = resp.json()?;
    println!("{}", body["message"].as_str().unwrap_or("Message sent"));
    Ok(())
}

fn do_stages(server: &str, json_output: bool) -> anyhow::Result<()> {
    let url = format!("{}/api/stages", server);
    let resp = send(client(10)?.get(&url), &url);

    if json_output {
        let body: serde_json::Value = resp.json()?;
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        let stages: Vec<StageDescription> = resp.json()?;
        print!("{}", render_stages(&stages));
    }
    Ok(())
}

/// Show the server status by calling GET /health.
fn do_status(server: &str) -> anyhow::Result<()> {
    let url = format!("{}/health", server);
    let resp = send(client(10)?.get(&url), &url);
    let body: serde_json::Value = resp.json().unwrap_or_default();

    println!("NéphroPredict: {}", body["status"].as_str().unwrap_or("unknown"));
    println!("Version:       {}", body["version"].as_str().unwrap_or("?"));
    println!(
        "Inference:     {} ({}, reachable: {})",
        body["inference"]["base_url"].as_str().unwrap_or("?"),
        body["inference"]["mode"].as_str().unwrap_or("?"),
        body["inference"]["reachable"].as_bool().unwrap_or(false)
    );
    let storage = &body["storage"];
    if storage["enabled"].as_bool().unwrap_or(false) {
        println!(
            "Storage:       {}",
            storage["version"]
                .as_str()
                .or_else(|| storage["error"].as_str())
                .unwrap_or("?")
        );
    } else {
        println!("Storage:       disabled");
    }

    Ok(())
}

// ============================================================================
// Main
// ============================================================================

fn main() {
    let cli = Cli::parse();
    let server = cli.server.trim_end_matches('/').to_string();

    let result = match cli.command {
        Commands::Predict { input, json } => do_predict(&server, &input, json),
        Commands::Contact {
            name,
            email,
            subject,
            message,
        } => do_contact(&server, &name, &email, &subject, &message),
        Commands::Stages { json } => do_stages(&server, json),
        Commands::Status => do_status(&server),
    };

    if let Err(e) = result {
        eprintln!("nephro-cli: {}", e);
        std::process::exit(1);
    }
}

// ============================================================================
// Tests
// ============================================================================
