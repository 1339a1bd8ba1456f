//! One-shot subcommands.

use anyhow::{Context, Result};
use serde_json::Value;
use sift_core::config::{Config, unknown_fields};
use sift_core::{Request, request_once};
use std::path::Path;

/// JSON if it parses, otherwise the raw word as a string
fn parse_payload(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

pub async fn request(executable: &str, action: &str, payload: Option<&str>) -> Result<()> {
    let request = match payload {
        Some(raw) => Request::new(action, parse_payload(raw)),
        None => Request::bare(action),
    };

    let response = request_once(executable, &request)
        .await
        .with_context(|| format!("request to '{executable}' failed"))?;

    println!("{}", response.to_line()?);
    Ok(())
}

pub fn show_config(path: &Path) -> Result<()> {
    if path.exists() {
        println!("Config file: {}", path.display());
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        for field in unknown_fields(&content) {
            println!("Unknown field: {field}");
        }
    } else {
        println!("Config file: {} (not found, using defaults)", path.display());
    }

    let config = Config::load(path)?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
