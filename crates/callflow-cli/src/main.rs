//! Callflow CLI - Scripted calls from the terminal
//!
//! Thin client over the Callflow operator API.

mod api;
mod config;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use dialoguer::{Confirm, Password};
use std::fs;
use uuid::Uuid;

use api::{
    CallResponse, CallflowClient, CreateDeliveryRequest, CreateScriptRequest, DeliveryResponse,
    InitiateCallRequest,
};
use config::Config;

#[derive(Parser)]
#[command(name = "callflow")]
#[command(about = "Callflow CLI - Scripted outbound calls and notifications", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Login and store API key
    Login {
        /// API key (will prompt if not provided)
        #[arg(short, long)]
        key: Option<String>,
        /// Server URL (e.g. https://callflow.shuttle.app)
        #[arg(short, long)]
        url: Option<String>,
    },

    /// Saved call scripts
    Script {
        #[command(subcommand)]
        action: ScriptAction,
    },

    /// Calls and operator actions
    Call {
        #[command(subcommand)]
        action: CallAction,
    },

    /// Outbound notification queue
    Delivery {
        #[command(subcommand)]
        action: DeliveryAction,
    },

    /// Show current configuration
    Config,
}

#[derive(Subcommand)]
enum ScriptAction {
    /// List saved scripts
    List,
    /// Show a script's flow
    Show {
        id: Uuid,
    },
    /// Save a script from a JSON flow file
    Create {
        /// Script name
        name: String,
        /// Flow JSON file ({ "steps": [...], "finalMessage": "..." })
        #[arg(short, long)]
        file: String,
        /// Speech language tag (e.g. en-US)
        #[arg(short, long)]
        language: Option<String>,
        /// Speech voice name (e.g. Joey)
        #[arg(short, long)]
        voice: Option<String>,
    },
    /// Delete a script
    Delete {
        id: Uuid,
    },
}

#[derive(Subcommand)]
enum CallAction {
    /// List recent calls
    List {
        /// Filter by status (ringing, in-progress, awaiting-input, completed, failed, escalated, hung-up)
        #[arg(short, long)]
        status: Option<String>,
        /// Max results
        #[arg(short, long, default_value = "20")]
        limit: i64,
    },
    /// Show a call with its event log
    Show {
        call_id: String,
    },
    /// Place a scripted call
    Start {
        /// Number to dial
        phone_number: String,
        /// Saved script to run
        #[arg(short, long, conflicts_with = "flow")]
        script: Option<Uuid>,
        /// Inline flow JSON file to run instead of a saved script
        #[arg(short, long)]
        flow: Option<String>,
        /// Record the call
        #[arg(short, long)]
        record: bool,
        /// URL notified when the call ends or is escalated
        #[arg(short, long)]
        callback: Option<String>,
    },
    /// Transfer a live call to the operator phone
    Escalate {
        call_id: String,
    },
    /// End a live call
    Hangup {
        call_id: String,
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Start recording a live call
    Record {
        call_id: String,
    },
    /// Call outcome statistics
    Stats,
}

#[derive(Subcommand)]
enum DeliveryAction {
    /// List delivery tasks
    List {
        /// Filter by status (pending, completed, failed)
        #[arg(short, long)]
        status: Option<String>,
        /// Max results
        #[arg(short, long, default_value = "20")]
        limit: i64,
    },
    /// Show one delivery task
    Show {
        id: Uuid,
    },
    /// Queue a notification
    Send {
        /// Target URL
        url: String,
        /// Event tag
        #[arg(short, long, default_value = "manual")]
        kind: String,
        /// JSON payload (or use -f for file)
        #[arg(short, long)]
        payload: Option<String>,
        /// Read payload from file
        #[arg(short, long)]
        file: Option<String>,
        /// Attempts before giving up
        #[arg(long)]
        max_retries: Option<i32>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Login { key, url } => cmd_login(key, url).await,
        Commands::Script { action } => cmd_script(action).await,
        Commands::Call { action } => cmd_call(action).await,
        Commands::Delivery { action } => cmd_delivery(action).await,
        Commands::Config => cmd_config(),
    }
}

// ============================================
// Command Implementations
// ============================================

fn client(config: &Config) -> Result<CallflowClient> {
    let api_key = config
        .api_key
        .as_ref()
        .context("Not logged in. Run 'callflow login' first.")?;
    Ok(CallflowClient::new(&config.base_url, api_key))
}

fn read_json_file(path: &str) -> Result<serde_json::Value> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path))
}

async fn cmd_login(key: Option<String>, url: Option<String>) -> Result<()> {
    let mut config = Config::load_file()?;
    if let Some(url) = url {
        config.set_base_url(url);
    }

    let api_key = match key {
        Some(k) => k,
        None => Password::new()
            .with_prompt("API Key")
            .interact()
            .context("Failed to read API key")?,
    };

    // Test connection
    let client = CallflowClient::new(&config.base_url, &api_key);
    print!("Testing connection... ");

    match client.health().await {
        Ok(true) => {}
        _ => {
            println!("{}", "Failed".red());
            bail!("Could not reach Callflow API at {}", config.base_url);
        }
    }
    if let Err(e) = client.check_auth().await {
        println!("{}", "Failed".red());
        bail!("API key rejected: {}", e);
    }
    println!("{}", "OK".green());

    config.set_api_key(api_key);
    config.save()?;

    println!("{} API key saved to {:?}", "✓".green(), Config::config_path()?);

    Ok(())
}

async fn cmd_script(action: ScriptAction) -> Result<()> {
    let config = Config::load()?;
    let client = client(&config)?;

    match action {
        ScriptAction::List => {
            let scripts = client.list_scripts().await?;

            if scripts.is_empty() {
                println!("No scripts found.");
                println!("\n{}", "Save one with:".dimmed());
                println!("  callflow script create <name> --file flow.json");
                return Ok(());
            }

            println!("{}", "Scripts:".bold());
            for script in scripts {
                println!(
                    "  {} {} [{} steps] {}",
                    script.id.to_string().dimmed(),
                    script.name.cyan().bold(),
                    script.step_count,
                    format!("{}/{}", script.language, script.voice).dimmed()
                );
            }
        }

        ScriptAction::Show { id } => {
            let script = client.get_script(id).await?;
            println!("{} {}", script.name.cyan().bold(), script.id.to_string().dimmed());
            println!(
                "  Voice: {} ({}), created {}",
                script.voice,
                script.language,
                script.created_at.format("%Y-%m-%d %H:%M")
            );
            println!("{}", serde_json::to_string_pretty(&script.flow)?);
        }

        ScriptAction::Create {
            name,
            file,
            language,
            voice,
        } => {
            let flow = read_json_file(&file)?;
            let script = client
                .create_script(&CreateScriptRequest {
                    name,
                    flow,
                    language,
                    voice,
                })
                .await?;

            println!(
                "{} Script '{}' saved ({} steps)",
                "✓".green(),
                script.name.cyan(),
                script.step_count
            );
            println!("  {}", script.id.to_string().dimmed());
        }

        ScriptAction::Delete { id } => {
            client.delete_script(id).await?;
            println!("{} Script {} deleted", "✓".green(), id);
        }
    }

    Ok(())
}

async fn cmd_call(action: CallAction) -> Result<()> {
    let config = Config::load()?;
    let client = client(&config)?;

    match action {
        CallAction::List { status, limit } => {
            let calls = client.list_calls(status.as_deref(), Some(limit)).await?;

            if calls.is_empty() {
                println!("No calls found.");
                return Ok(());
            }

            println!("{}", "Calls:".bold());
            for call in &calls {
                println!(
                    "  {} {} {} [{}/{}] {}",
                    call.call_id.dimmed(),
                    call.phone_number.cyan(),
                    colorize_call_status(&call.status),
                    call.current_step,
                    call.total_steps,
                    call.created_at.format("%Y-%m-%d %H:%M").to_string().dimmed()
                );
            }
        }

        CallAction::Show { call_id } => {
            let detail = client.get_call(&call_id).await?;
            print_call(&detail.call);

            if let Some(script_id) = detail.call.script_id {
                println!("  Script: {}", script_id);
            }
            if let Some(url) = &detail.call.recording_url {
                println!("  Recording: {}", url);
            }

            println!("\n{}", "Events:".bold());
            for event in detail.events {
                println!(
                    "  {} {} {}",
                    event.created_at.format("%H:%M:%S").to_string().dimmed(),
                    event.kind.cyan(),
                    truncate_string(&event.data.to_string(), 80).dimmed()
                );
            }
        }

        CallAction::Start {
            phone_number,
            script,
            flow,
            record,
            callback,
        } => {
            let flow = flow.as_deref().map(read_json_file).transpose()?;
            if script.is_none() && flow.is_none() {
                bail!("Specify a saved script (--script <ID>) or a flow file (--flow <FILE>)");
            }

            let call = client
                .initiate_call(&InitiateCallRequest {
                    phone_number,
                    script_id: script,
                    flow,
                    recording_enabled: record,
                    status_callback_url: callback,
                })
                .await?;

            println!("{} Call placed", "✓".green());
            print_call(&call);
        }

        CallAction::Escalate { call_id } => {
            let call = client.call_action(&call_id, "escalate").await?;
            println!("{} Call transferred to operator", "✓".green());
            print_call(&call);
        }

        CallAction::Hangup { call_id, yes } => {
            if !yes
                && !Confirm::new()
                    .with_prompt(format!("Hang up call {}?", call_id))
                    .default(false)
                    .interact()
                    .context("Failed to read confirmation")?
            {
                println!("Cancelled.");
                return Ok(());
            }

            let call = client.call_action(&call_id, "hangup").await?;
            println!("{} Call hung up", "✓".green());
            print_call(&call);
        }

        CallAction::Record { call_id } => {
            client.call_action(&call_id, "record").await?;
            println!("{} Recording started for {}", "✓".green(), call_id);
        }

        CallAction::Stats => {
            let stats = client.stats().await?;
            println!("{}", "Call statistics:".bold());
            println!("  Total:     {}", stats.total);
            println!("  Active:    {}", stats.active.to_string().cyan());
            println!("  Completed: {}", stats.completed.to_string().green());
            println!("  Failed:    {}", stats.failed.to_string().red());
            println!("  Hung up:   {}", stats.hung_up.to_string().yellow());
            println!("  Escalated: {}", stats.escalated.to_string().yellow());
            println!("  Success:   {:.1}%", stats.success_rate);
        }
    }

    Ok(())
}

async fn cmd_delivery(action: DeliveryAction) -> Result<()> {
    let config = Config::load()?;
    let client = client(&config)?;

    match action {
        DeliveryAction::List { status, limit } => {
            let tasks = client
                .list_deliveries(status.as_deref(), Some(limit))
                .await?;

            if tasks.is_empty() {
                println!("No deliveries found.");
                return Ok(());
            }

            println!("{}", "Deliveries:".bold());
            for task in &tasks {
                println!(
                    "  {} {} {} [{}/{}] {}",
                    task.id.to_string().dimmed(),
                    task.kind.cyan(),
                    colorize_delivery_status(&task.status),
                    task.retry_count,
                    task.max_retries,
                    truncate_string(&task.url, 50).dimmed()
                );
            }
        }

        DeliveryAction::Show { id } => {
            let task = client.get_delivery(id).await?;
            print_delivery(&task);
            println!("{}", serde_json::to_string_pretty(&task.payload)?);
        }

        DeliveryAction::Send {
            url,
            kind,
            payload,
            file,
            max_retries,
        } => {
            let payload = match (payload, file) {
                (Some(p), None) => serde_json::from_str(&p).context("Invalid JSON payload")?,
                (None, Some(f)) => read_json_file(&f)?,
                (Some(_), Some(_)) => bail!("Cannot specify both --payload and --file"),
                (None, None) => serde_json::json!({}),
            };

            let task = client
                .create_delivery(&CreateDeliveryRequest {
                    kind,
                    payload,
                    url,
                    max_retries,
                })
                .await?;

            println!("{} Delivery queued", "✓".green());
            print_delivery(&task);
        }
    }

    Ok(())
}

fn print_call(call: &CallResponse) {
    println!(
        "  {} {} {}",
        call.call_id.dimmed(),
        call.phone_number.cyan().bold(),
        colorize_call_status(&call.status)
    );
    println!(
        "  Step {}/{}, {} invalid attempts",
        call.current_step, call.total_steps, call.invalid_attempts
    );
    for input in &call.collected {
        println!("    step {}: {}", input.step, input.digits.green());
    }
    if let Some(ended_at) = call.ended_at {
        println!("  Ended {}", ended_at.format("%Y-%m-%d %H:%M:%S"));
    }
}

fn print_delivery(task: &DeliveryResponse) {
    println!(
        "  {} {} {}",
        task.id.to_string().dimmed(),
        task.kind.cyan().bold(),
        colorize_delivery_status(&task.status)
    );
    println!("  URL: {}", task.url);
    println!(
        "  Attempts: {}/{} (queued {}, next {})",
        task.retry_count,
        task.max_retries,
        task.created_at.format("%Y-%m-%d %H:%M"),
        task.next_attempt_at.format("%H:%M:%S")
    );
    if let Some(error) = &task.last_error {
        let code = task
            .last_status_code
            .map(|c| format!(" [{}]", c))
            .unwrap_or_default();
        println!("  Last error{}: {}", code, error.red());
    }
}

fn colorize_call_status(status: &str) -> colored::ColoredString {
    match status {
        "completed" => status.green(),
        "failed" => status.red(),
        "escalated" | "hung-up" => status.yellow(),
        _ => status.cyan(),
    }
}

fn colorize_delivery_status(status: &str) -> colored::ColoredString {
    match status {
        "completed" => status.green(),
        "failed" => status.red(),
        _ => status.yellow(),
    }
}

/// Truncate string safely for UTF-8 (by char count, not bytes)
fn truncate_string(s: &str, max_chars: usize) -> String {
    let chars: Vec<char> = s.chars().take(max_chars).collect();
    if s.chars().count() > max_chars {
        format!("{}...", chars.into_iter().collect::<String>())
    } else {
        s.to_string()
    }
}

fn cmd_config() -> Result<()> {
    let config = Config::load()?;

    println!("{}", "Configuration:".bold());
    println!("  Path: {:?}", Config::config_path()?);
    println!("  Base URL: {}", config.base_url);
    println!(
        "  API Key: {}",
        if config.api_key.is_some() {
            "Set".green()
        } else {
            "Not set".red()
        }
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_string_counts_chars() {
        assert_eq!(truncate_string("short", 10), "short");
        assert_eq!(truncate_string("ééééé", 3), "ééé...");
    }

    #[test]
    fn test_cli_parses_call_start() {
        let cli = Cli::try_parse_from([
            "callflow",
            "call",
            "start",
            "15550111",
            "--script",
            "00000000-0000-0000-0000-000000000000",
            "--record",
        ])
        .unwrap();

        match cli.command {
            Commands::Call {
                action:
                    CallAction::Start {
                        phone_number,
                        script,
                        record,
                        ..
                    },
            } => {
                assert_eq!(phone_number, "15550111");
                assert_eq!(script, Some(Uuid::nil()));
                assert!(record);
            }
            _ => panic!("expected call start"),
        }
    }

    #[test]
    fn test_script_and_flow_conflict() {
        let result = Cli::try_parse_from([
            "callflow",
            "call",
            "start",
            "15550111",
            "--script",
            "00000000-0000-0000-0000-000000000000",
            "--flow",
            "flow.json",
        ]);
        assert!(result.is_err());
    }
}
