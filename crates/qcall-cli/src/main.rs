//! qcall CLI - Operate the call sequencer and ticket printer
//!
//! Thin client over the qcall HTTP API for counter staff and administrators.

mod api;
mod config;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use uuid::Uuid;

use api::{EnqueueCallRequest, EnqueueCallResponse, QcallClient};
use config::Config;

#[derive(Parser)]
#[command(name = "qcall")]
#[command(about = "qcall CLI - Call sequencer and ticket printer operations", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show call queue and print queue status
    Status,

    /// Start the call sequencer (also resets the failure breaker)
    Start,

    /// Stop the call sequencer after the current call
    Stop,

    /// Forget dispatched first calls so tickets can be called again
    ClearHistory,

    /// Call a ticket to a counter
    Call {
        /// Ticket ID
        ticket_id: Uuid,
        /// Counter ID (defaults to the configured counter)
        counter: Option<Uuid>,
    },

    /// Recall a ticket to a counter
    Recall {
        /// Ticket ID
        ticket_id: Uuid,
        /// Counter ID (defaults to the configured counter)
        counter: Option<Uuid>,
    },

    /// Print queue operations
    Print {
        #[command(subcommand)]
        action: PrintAction,
    },

    /// Show or update configuration
    Config {
        /// API base URL
        #[arg(long)]
        base_url: Option<String>,
        /// This station's counter ID
        #[arg(long)]
        counter: Option<Uuid>,
        /// Label sent with calls from this station
        #[arg(long)]
        source_label: Option<String>,
    },
}

#[derive(Subcommand)]
enum PrintAction {
    /// Show print queue status
    Status,
    /// Drop every queued slip
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Status => cmd_status().await,
        Commands::Start => cmd_start().await,
        Commands::Stop => cmd_stop().await,
        Commands::ClearHistory => cmd_clear_history().await,
        Commands::Call { ticket_id, counter } => cmd_call(ticket_id, counter, false).await,
        Commands::Recall { ticket_id, counter } => cmd_call(ticket_id, counter, true).await,
        Commands::Print { action } => cmd_print(action).await,
        Commands::Config {
            base_url,
            counter,
            source_label,
        } => cmd_config(base_url, counter, source_label),
    }
}

fn client() -> Result<(Config, QcallClient)> {
    let config = Config::load()?;
    let client = QcallClient::new(&config.base_url);
    Ok((config, client))
}

// ============================================
// Command Implementations
// ============================================

async fn cmd_status() -> Result<()> {
    let (config, client) = client()?;

    if !client.health().await.unwrap_or(false) {
        bail!("qcall API is not reachable at {}", config.base_url);
    }

    let calls = client.status().await?;
    let state = if calls.is_running {
        "running".green()
    } else {
        "stopped".red()
    };

    println!("{}", "Call sequencer".bold());
    println!("  State:       {}", state);
    if calls.is_processing {
        println!("  In flight:   {}", "yes".yellow());
    }
    println!("  Pending:     {}", calls.pending);
    println!("  Processing:  {}", calls.processing);
    println!("  Failed:      {}", calls.failed);
    println!("  History:     {} first calls", calls.first_call_records);
    if calls.consecutive_failures > 0 {
        println!(
            "  {} {} consecutive failures",
            "⚠".yellow(),
            calls.consecutive_failures
        );
    }

    let print = client.print_status().await?;
    println!("\n{}", "Print queue".bold());
    println!(
        "  Jobs:        {} ({} pending, {} processing, {} failed)",
        print.total, print.pending, print.processing, print.failed
    );
    println!(
        "  Draining:    {}",
        if print.is_processing { "yes" } else { "no" }
    );
    println!(
        "  Sweeps:      {}",
        if print.is_running { "running" } else { "stopped" }
    );

    Ok(())
}

async fn cmd_start() -> Result<()> {
    let (_, client) = client()?;
    let state = client.start().await?;

    if state.changed {
        println!("{} Call sequencer started", "✓".green());
    } else {
        println!("{} Call sequencer was already running", "•".dimmed());
    }
    Ok(())
}

async fn cmd_stop() -> Result<()> {
    let (_, client) = client()?;
    let state = client.stop().await?;

    if state.changed {
        println!("{} Call sequencer stopped", "✓".green());
    } else if !state.running {
        println!("{} Call sequencer was not running", "•".dimmed());
    }
    Ok(())
}

async fn cmd_clear_history() -> Result<()> {
    let (_, client) = client()?;
    let result = client.clear_history().await?;

    println!(
        "{} Cleared {} first-call records",
        "✓".green(),
        result.cleared
    );
    Ok(())
}

async fn cmd_call(ticket_id: Uuid, counter: Option<Uuid>, recall: bool) -> Result<()> {
    let (config, client) = client()?;

    let Some(counter_id) = config.resolve_counter(counter) else {
        bail!("No counter given. Pass one or set it with `qcall config --counter <ID>`.");
    };

    let request = EnqueueCallRequest {
        ticket_id,
        counter_id,
        source_label: config.source_label.clone(),
    };

    let response = if recall {
        client.recall(&request).await?
    } else {
        client.call(&request).await?
    };

    print_enqueue(&response);
    Ok(())
}

fn print_enqueue(response: &EnqueueCallResponse) {
    match (response.result.as_str(), &response.request) {
        ("queued", Some(request)) => println!(
            "{} {} {} queued for counter {} ({})",
            "✓".green(),
            if request.is_recall { "Recall of" } else { "Ticket" },
            request.ticket_number.bold(),
            request.counter_number,
            request.priority
        ),
        ("already_queued", Some(request)) => println!(
            "{} Ticket {} is already waiting to be called",
            "•".dimmed(),
            request.ticket_number.bold()
        ),
        ("duplicate", _) => println!(
            "{} Ticket was called moments ago; not calling again",
            "⚠".yellow()
        ),
        (other, _) => println!("{} Unexpected result: {}", "?".yellow(), other),
    }
}

async fn cmd_print(action: PrintAction) -> Result<()> {
    let (_, client) = client()?;

    match action {
        PrintAction::Status => {
            let status = client.print_status().await?;
            println!(
                "{} jobs ({} pending, {} processing, {} failed)",
                status.total, status.pending, status.processing, status.failed
            );
        }
        PrintAction::Clear => {
            let result = client.clear_print_queue().await?;
            println!("{} Removed {} print jobs", "✓".green(), result.cleared);
        }
    }
    Ok(())
}

fn cmd_config(
    base_url: Option<String>,
    counter: Option<Uuid>,
    source_label: Option<String>,
) -> Result<()> {
    let mut config = Config::load()?;
    let changed = base_url.is_some() || counter.is_some() || source_label.is_some();

    if let Some(url) = base_url {
        config.base_url = url;
    }
    if let Some(counter) = counter {
        config.counter_id = Some(counter);
    }
    if let Some(label) = source_label {
        config.source_label = Some(label);
    }

    if changed {
        config.save()?;
        println!("{} Configuration saved", "✓".green());
    }

    println!("{}", "qcall Configuration".bold());
    println!("  Config file: {:?}", Config::config_path()?);
    println!("  API URL:     {}", config.base_url);
    println!(
        "  Counter:     {}",
        config
            .counter_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "(not set)".dimmed().to_string())
    );
    println!(
        "  Source:      {}",
        config
            .source_label
            .as_deref()
            .unwrap_or("(server default)")
    );
    Ok(())
}
