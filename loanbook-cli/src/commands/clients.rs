//! Clients command - list, inspect and remove loan accounts

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use comfy_table::{ContentArrangement, Table};
use loanbook_core::{Client, LogEvent};

use super::{get_context, get_logger, log_event};
use crate::output::{create_table, format_amount, info, success};

#[derive(Subcommand)]
pub enum ClientsCommands {
    /// List every client in the directory
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one client's loan terms
    Show {
        /// Client id
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove a client and all of its transactions
    Remove {
        /// Client id
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: ClientsCommands) -> Result<()> {
    let ctx = get_context()?;
    let logger = get_logger();

    match command {
        ClientsCommands::List { json } => {
            let clients = ctx.repository.get_clients()?;
            log_event(&logger, LogEvent::new("command_executed").with_command("clients list"));
            list(&clients, json)
        }
        ClientsCommands::Show { id, json } => {
            let client = ctx.repository.get_client_by_id(&id)?;
            log_event(&logger, LogEvent::new("command_executed").with_command("clients show"));
            let Some(client) = client else {
                anyhow::bail!("Client '{}' not found", id);
            };
            show(&client, json)
        }
        ClientsCommands::Remove { id, json } => {
            let removed = ctx.repository.delete_client(&id)?;
            log_event(&logger, LogEvent::new("command_executed").with_command("clients remove"));
            if json {
                println!("{}", serde_json::json!({ "id": id, "removed": removed }));
                return Ok(());
            }
            if !removed {
                anyhow::bail!("Client '{}' not found", id);
            }
            success(&format!("Removed client '{}' and its transactions", id));
            Ok(())
        }
    }
}

fn list(clients: &[Client], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(clients)?);
        return Ok(());
    }
    if clients.is_empty() {
        info("No clients yet. Run 'lb import clients FILE' first.");
        return Ok(());
    }

    let mut table = create_table();
    table.set_header(vec!["Client", "Name", "Daily", "Loan", "Start", "Status"]);
    for client in clients {
        table.add_row(vec![
            client.id.clone(),
            client.name.clone(),
            format_amount(client.daily_payment),
            format_amount(client.loan_amount),
            client.start_date.map(|d| d.to_string()).unwrap_or_default(),
            status_label(client),
        ]);
    }
    println!("{}", table);
    Ok(())
}

fn show(client: &Client, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(client)?);
        return Ok(());
    }

    println!("{}", format!("{} ({})", client.name, client.id).bold());
    println!();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.add_row(vec!["Status".to_string(), status_label(client)]);
    table.add_row(vec!["Loan amount".to_string(), format_amount(client.loan_amount)]);
    table.add_row(vec!["Daily payment".to_string(), format_amount(client.daily_payment)]);
    table.add_row(vec!["Balance".to_string(), format_amount(client.balance)]);
    table.add_row(vec![
        "Start date".to_string(),
        client.start_date.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string()),
    ]);
    table.add_row(vec!["Phone".to_string(), client.phone.clone().unwrap_or_default()]);
    table.add_row(vec!["Address".to_string(), client.address.clone().unwrap_or_default()]);
    println!("{}", table);
    Ok(())
}

fn status_label(client: &Client) -> String {
    let label = match client.status.as_str() {
        "" => "(none)",
        s => s,
    };
    if client.status.is_active() {
        label.green().to_string()
    } else {
        label.dimmed().to_string()
    }
}
