//! Config command implementation
//!
//! Prints the relay mode resolved from flags and environment, the same way
//! `serve` would resolve it, with the trigger token redacted.

use anyhow::Result;
use issue_relay_dispatch::{RelayConfig, RelaySettings};

/// Execute the config command
pub fn execute_config_command(settings: RelaySettings) -> Result<()> {
    let relay = RelayConfig::resolve(settings);

    println!("⚙️  Relay configuration:");
    for line in describe_config(&relay) {
        println!("   {}", line);
    }
    println!();
    println!("{}", relay_plan(&relay));
    Ok(())
}

/// Human-readable settings, one per line.
pub fn describe_config(relay: &RelayConfig) -> Vec<String> {
    let show = |value: Option<&str>| value.unwrap_or("(unset)").to_string();

    let mut lines = vec![format!("Mode: {}", relay.mode())];
    match relay {
        RelayConfig::Disabled => {}
        RelayConfig::Generic(generic) => {
            lines.push(format!("Target URL: {}", show(generic.target_url.as_deref())));
        }
        RelayConfig::Pipeline(pipeline) => {
            lines.push(format!("Project id: {}", show(pipeline.project_id.as_deref())));
            lines.push(format!(
                "Trigger token: {}",
                pipeline
                    .token
                    .as_ref()
                    .map(|token| token.to_string())
                    .unwrap_or_else(|| "(unset)".to_string())
            ));
            lines.push(format!("Ref: {}", show(pipeline.ref_name.as_deref())));
            lines.push(format!("Base URL: {}", show(pipeline.base_url.as_deref())));
            lines.push(format!(
                "TLS verification: {}",
                if pipeline.accept_invalid_certs { "disabled" } else { "enabled" }
            ));
        }
    }
    lines
}

/// What an accepted issue would lead to under this configuration.
pub fn relay_plan(relay: &RelayConfig) -> String {
    match relay {
        RelayConfig::Disabled => "⏸️  Relay disabled: issues are acknowledged only".to_string(),
        RelayConfig::Generic(generic) => match generic.target_url.as_deref() {
            Some(url) => format!("📤 Issues will be POSTed as JSON to {}", url),
            None => "⚠️  Relay will be skipped: missing configuration: RELAY_TARGET_URL".to_string(),
        },
        RelayConfig::Pipeline(pipeline) => match pipeline.target() {
            Ok(target) => format!(
                "🚀 Issues will trigger a pipeline on '{}' via {}",
                target.ref_name, target.url
            ),
            Err(reason) => format!("⚠️  Relay will be skipped: {}", reason),
        },
    }
}
