//! Command line tool for sending email through Exchange
//!
//! # Usage
//!
//! ```bash
//! # Send with the default Persian layout
//! exmailer --subject "سلام" --body "متن پیام" --to user@example.com
//!
//! # English layout, variables, attachments and CC
//! exmailer --template english --subject "Report {date}" --body @body.html \
//!     --var date=2024-05-01 --to a@corp.com --cc b@corp.com --attach report.pdf
//!
//! # Explicit configuration file
//! exmailer --config ~/.config/exmailer/config.yaml --subject Hi --to a@corp.com
//! ```

use anyhow::{bail, Context, Result};
use clap::Parser;
use exmailer::message::Importance;
use exmailer::{
    AuthType, ConfigResolver, Emailer, EwsTransport, SendRequest, Settings, TemplateSelector,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "exmailer")]
#[command(about = "Send emails via Microsoft Exchange server", long_about = None)]
struct Cli {
    /// Path to a JSON or YAML configuration file (the built-in transport needs auth_type: BASIC)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Layout name (persian, english, minimal, plain, or a registered name)
    #[arg(short, long, default_value = "persian")]
    template: String,

    /// Email subject
    #[arg(short, long)]
    subject: String,

    /// Email body, or @path to read it from a file
    #[arg(short, long)]
    body: Option<String>,

    /// Template variable, repeatable
    #[arg(long = "var", value_name = "KEY=VALUE", value_parser = parse_var)]
    vars: Vec<(String, String)>,

    /// Template variables as a JSON object
    #[arg(long, value_name = "JSON")]
    template_vars: Option<String>,

    /// Recipient email addresses
    #[arg(long, required = true, num_args = 1..)]
    to: Vec<String>,

    /// CC recipient email addresses
    #[arg(long, num_args = 1..)]
    cc: Vec<String>,

    /// BCC recipient email addresses
    #[arg(long, num_args = 1..)]
    bcc: Vec<String>,

    /// File to attach, repeatable
    #[arg(short, long = "attach", value_name = "FILE")]
    attachments: Vec<PathBuf>,

    /// Message importance (low, normal, high)
    #[arg(long, default_value = "normal")]
    importance: Importance,

    /// HTTP timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => {
            println!("✓ Email sent successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(if verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

fn run(cli: Cli) -> Result<()> {
    // .env must be loaded before the resolver snapshots the environment
    dotenvy::dotenv().ok();

    let body = read_body(cli.body.as_deref())?;
    let vars = collect_vars(cli.template_vars.as_deref(), cli.vars)?;

    let mut resolver = ConfigResolver::new();
    if let Some(path) = cli.config {
        resolver = resolver.with_config_path(path);
    }
    let settings = resolver
        .resolve()
        .context("failed to load configuration")?;

    let transport = EwsTransport::new().with_timeout(Duration::from_secs(cli.timeout));
    let connect_error = connect_context(&settings);
    let mut emailer = Emailer::connect(settings, transport).context(connect_error)?;

    let mut request = SendRequest::new(cli.subject, body, cli.to)
        .cc(cli.cc)
        .bcc(cli.bcc)
        .template(TemplateSelector::from(cli.template))
        .importance(cli.importance);
    if let Some(vars) = vars {
        request = request.vars(vars);
    }
    for path in cli.attachments {
        request = request.attach(path);
    }

    emailer
        .send_email(request)
        .context("failed to send email")?;
    emailer.close();

    Ok(())
}

/// Message for a failed connect, with a hint when NTLM is configured
fn connect_context(settings: &Settings) -> String {
    match settings.auth_type() {
        AuthType::Ntlm => format!(
            "failed to connect to {}: the built-in EWS transport only supports BASIC \
             authentication, set auth_type: BASIC in the config file or EXCHANGE_AUTH_TYPE=BASIC",
            settings.server()
        ),
        AuthType::Basic => format!("failed to connect to {}", settings.server()),
    }
}

fn parse_var(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{}'", s)),
    }
}

/// Body text, reading `@path` arguments from disk
fn read_body(body: Option<&str>) -> Result<String> {
    match body {
        Some(arg) => match arg.strip_prefix('@') {
            Some(path) => std::fs::read_to_string(path)
                .with_context(|| format!("failed to read body file {}", path)),
            None => Ok(arg.to_string()),
        },
        None => Ok(String::new()),
    }
}

/// Merge `--template-vars` JSON with `--var` pairs, the latter winning
fn collect_vars(
    json: Option<&str>,
    pairs: Vec<(String, String)>,
) -> Result<Option<HashMap<String, String>>> {
    if json.is_none() && pairs.is_empty() {
        return Ok(None);
    }

    let mut vars = HashMap::new();
    if let Some(json) = json {
        let value: serde_json::Value =
            serde_json::from_str(json).context("--template-vars is not valid JSON")?;
        let serde_json::Value::Object(map) = value else {
            bail!("--template-vars must be a JSON object");
        };
        for (key, value) in map {
            let value = match value {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            vars.insert(key, value);
        }
    }
    vars.extend(pairs);

    Ok(Some(vars))
}
