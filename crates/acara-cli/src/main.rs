//! Acara CLI - command-line client for the berita acara API.
//!
//! Set ACARA_API_URL (or API_URL); defaults to http://localhost:4000.

use std::path::PathBuf;
use std::sync::Arc;

use acara_cli::{format_record_table, init_tracing};
use acara_client::form::load_form;
use acara_client::{drain_pending_uploads, ApiClient};
use acara_core::constants::UPLOAD_CONCURRENCY;
use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "acara", about = "Berita acara API CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload the form's local images and submit it as a new record
    Submit {
        /// JSON form; image fields may be {"file": "<path relative to the form>"}
        form: PathBuf,
    },
    /// List records, newest first
    List {
        /// Maximum number of records
        #[arg(long, default_value = "20")]
        limit: i64,
        /// Offset for pagination
        #[arg(long, default_value = "0")]
        offset: i64,
        /// Output format: json or table
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Show a record with signed image URLs
    Get {
        /// Record UUID
        id: Uuid,
    },
    /// Print the data handed to the document generator
    PrintData {
        /// Record UUID
        id: Uuid,
    },
    /// Render a record into a .docx file
    Render {
        /// Record UUID
        id: Uuid,
        /// Template file name; the server default when omitted
        #[arg(long)]
        template: Option<String>,
        /// Output path; the server-suggested file name when omitted
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    dotenvy::dotenv().ok();

    let client = ApiClient::from_env()
        .context("Failed to create API client. Set ACARA_API_URL (or API_URL)")?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Submit { form } => {
            let raw = std::fs::read_to_string(&form)
                .with_context(|| format!("Failed to read form: {}", form.display()))?;
            let raw: serde_json::Value =
                serde_json::from_str(&raw).context("Form is not valid JSON")?;
            let base_dir = form
                .parent()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."));

            let mut record = load_form(raw, &base_dir)?;
            let uploaded =
                drain_pending_uploads(&mut record, Arc::new(client.clone()), UPLOAD_CONCURRENCY)
                    .await?;

            let submission = serde_json::to_value(&record).context("Serialize record")?;
            let id = client.create_record(&submission).await?;
            print_json(&serde_json::json!({ "id": id, "uploaded_images": uploaded }))?;
        }
        Commands::List {
            limit,
            offset,
            format,
        } => {
            let rows = client.list_records(limit, offset).await?;
            match format.as_str() {
                "json" => print_json(&rows)?,
                "table" => print!("{}", format_record_table(&rows)),
                other => anyhow::bail!("Invalid format {}. Must be: json or table", other),
            }
        }
        Commands::Get { id } => {
            let record = client.get_record(id).await?;
            print_json(&record)?;
        }
        Commands::PrintData { id } => {
            let data = client.get_print_data(id).await?;
            print_json(&data)?;
        }
        Commands::Render { id, template, out } => {
            let document = client.render_document(id, template.as_deref()).await?;
            let out = out.unwrap_or_else(|| PathBuf::from(&document.file_name));
            std::fs::write(&out, &document.bytes)
                .with_context(|| format!("Failed to write {}", out.display()))?;
            print_json(&serde_json::json!({
                "file": out.display().to_string(),
                "size_bytes": document.bytes.len()
            }))?;
        }
    }

    Ok(())
}
