//! Inspect command implementation
//!
//! This module implements the `issue-relay inspect` command: run the event
//! extractor over a saved webhook payload and show what the receiver would
//! answer and relay, without making any network call.

use anyhow::{Context, Result};
use issue_relay_dispatch::{RelayConfig, RelaySettings};
use issue_relay_adapters::reply_for;
use issue_relay_protocol::{extract, NormalizedIssue};
use std::fs;
use std::path::Path;

use super::config::relay_plan;

/// Arguments for the inspect command
pub struct InspectArgs {
    /// Path to the payload file
    pub payload: String,
    /// Raw relay settings
    pub relay: RelaySettings,
}

/// What the receiver would answer for a payload.
#[derive(Debug, PartialEq, Eq)]
pub struct Inspection {
    /// HTTP status the caller would receive
    pub status: u16,
    /// JSON body the caller would receive
    pub response: serde_json::Value,
    /// Issue that would be relayed, if any
    pub issue: Option<NormalizedIssue>,
}

/// Execute the inspect command
pub fn execute_inspect_command(args: InspectArgs) -> Result<()> {
    println!("🔍 Inspecting webhook payload...");
    println!("📁 Payload: {}", args.payload);
    println!();

    let inspection = inspect_file(Path::new(&args.payload))?;

    println!("📨 Response: {} {}", inspection.status, inspection.response);

    if let Some(issue) = &inspection.issue {
        println!();
        println!("📋 Issue:");
        println!("   Number: {}", issue.number);
        println!("   Title: {}", issue.title);
        println!("   Action: {}", issue.action);
        println!("   Assignee: {}", issue.assignee);
        println!("   Description: {}", issue.description);
        println!();
        println!("{}", relay_plan(&RelayConfig::resolve(args.relay)));
    }

    Ok(())
}

/// Read a payload file and run it through the extractor.
pub fn inspect_file(path: &Path) -> Result<Inspection> {
    if !path.exists() {
        anyhow::bail!("Payload file not found: {}", path.display());
    }

    let raw = fs::read(path)
        .with_context(|| format!("Failed to read payload file: {}", path.display()))?;

    Ok(inspect_bytes(&raw))
}

/// Run the extractor and map the outcome to the receiver's reply.
pub fn inspect_bytes(raw: &[u8]) -> Inspection {
    let (status, response, issue) = reply_for(extract(raw));
    Inspection {
        status: status.as_u16(),
        response,
        issue,
    }
}
