use std::fs;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use colored::Colorize;

use crate::{get_logs_dir, safe_truncate};

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn redact_key(api_key: &str) -> String {
    format!("{}***", api_key.chars().take(10).collect::<String>())
}

fn describe_url(url: &str, out: &mut String) {
    if let Ok(parsed_url) = reqwest::Url::parse(url) {
        out.push_str(&format!("URL: {}\n", url));
        out.push_str(&format!(
            "Host: {}\n",
            parsed_url.host_str().unwrap_or("unknown")
        ));
        out.push_str(&format!("Scheme: {}\n\n", parsed_url.scheme()));
    } else {
        out.push_str(&format!("URL: {}\n\n", url));
    }
}

/// Log HTTP request details for debugging (console output)
pub fn log_request(url: &str, request: &serde_json::Value, api_key: &str, verbose: bool) {
    if !verbose {
        return;
    }

    println!("\n{}", "═".repeat(80).bright_cyan());
    println!("{}", "HTTP REQUEST DEBUG".bright_cyan().bold());
    println!("{}", "═".repeat(80).bright_cyan());

    println!("{}: {}", "URL".bright_yellow(), url);
    println!("\n{}", "Headers:".bright_yellow());
    println!("  Content-Type: application/json");
    println!("  Authorization: Bearer {}", redact_key(api_key));

    println!("\n{}", "Request Body:".bright_yellow());
    match serde_json::to_string_pretty(request) {
        Ok(json) => {
            // Truncate very long requests for readability
            if json.chars().count() > 5000 {
                println!("{}", safe_truncate(&json, 5000));
                println!(
                    "\n{}",
                    format!("... (truncated, total {} bytes)", json.len()).bright_black()
                );
            } else {
                println!("{}", json);
            }
        }
        Err(e) => println!("{}", format!("Error serializing request: {}", e).red()),
    }

    println!("{}", "═".repeat(80).bright_cyan());
    println!();
}

/// Log HTTP request to file for persistent debugging.
///
/// Returns the request timestamp so the response log can be paired with it.
pub fn log_request_to_file(
    url: &str,
    request: &serde_json::Value,
    model_id: &str,
    api_key: &str,
) -> Result<u64> {
    let logs_dir = get_logs_dir()?;
    let timestamp = unix_timestamp();

    let model_name = model_id.replace('/', "-");
    let filename = format!("req-{}-{}.txt", timestamp, model_name);
    let file_path = logs_dir.join(&filename);

    let mut log_content = String::new();
    log_content.push_str("HTTP REQUEST LOG\n");
    log_content.push_str("================\n\n");
    log_content.push_str(&format!("Timestamp: {}\n", timestamp));
    log_content.push_str(&format!("Model: {}\n\n", model_id));

    describe_url(url, &mut log_content);

    log_content.push_str("Headers:\n");
    log_content.push_str("  Content-Type: application/json\n");
    log_content.push_str(&format!("  Authorization: Bearer {}\n\n", redact_key(api_key)));

    log_content.push_str("Request Body:\n");
    match serde_json::to_string_pretty(request) {
        Ok(json) => {
            log_content.push_str(&json);
            log_content.push('\n');
        }
        Err(e) => {
            log_content.push_str(&format!("Error serializing request: {}\n", e));
        }
    }

    fs::write(&file_path, log_content)
        .with_context(|| format!("Failed to write request log to {}", file_path.display()))?;

    Ok(timestamp)
}

/// Log HTTP response to file, paired with the request timestamp
pub fn log_response_to_file(
    status: &reqwest::StatusCode,
    body: &str,
    request_timestamp: u64,
    model_id: &str,
) -> Result<()> {
    let logs_dir = get_logs_dir()?;

    let model_name = model_id.replace('/', "-");
    let filename = format!("resp-{}-{}.txt", request_timestamp, model_name);
    let file_path = logs_dir.join(&filename);

    let mut log_content = String::new();
    log_content.push_str("HTTP RESPONSE LOG\n");
    log_content.push_str("=================\n\n");
    log_content.push_str(&format!("Timestamp: {}\n", request_timestamp));
    log_content.push_str(&format!("Model: {}\n\n", model_id));
    log_content.push_str(&format!(
        "Status: {} {}\n\n",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown")
    ));

    log_content.push_str("Response Body:\n");
    // Try to pretty-print JSON, fall back to raw text
    match serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| serde_json::to_string_pretty(&v).ok())
    {
        Some(pretty) => {
            log_content.push_str(&pretty);
            log_content.push('\n');
        }
        None => {
            log_content.push_str(body);
            log_content.push('\n');
        }
    }

    log_content.push_str(&format!("\n---\nResponse Size: {} bytes\n", body.len()));

    fs::write(&file_path, log_content)
        .with_context(|| format!("Failed to write response log to {}", file_path.display()))?;

    Ok(())
}

/// Log HTTP response details for debugging (console output)
pub fn log_response(status: &reqwest::StatusCode, body: &str, verbose: bool) {
    if !verbose {
        return;
    }

    println!("\n{}", "═".repeat(80).bright_green());
    println!("{}", "HTTP RESPONSE DEBUG".bright_green().bold());
    println!("{}", "═".repeat(80).bright_green());

    println!(
        "{}: {} {}",
        "Status".bright_yellow(),
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown")
    );

    println!("\n{}", "Response Body:".bright_yellow());
    if body.chars().count() > 5000 {
        println!("{}", safe_truncate(body, 5000));
        println!(
            "\n{}",
            format!("... (truncated, total {} bytes)", body.len()).bright_black()
        );
    } else {
        println!("{}", body);
    }

    println!("{}", "═".repeat(80).bright_green());
    println!();
}

/// Log streaming chunk for debugging (console output)
pub fn log_stream_chunk(chunk_num: usize, data: &str, verbose: bool) {
    if !verbose {
        return;
    }

    println!(
        "{}",
        format!(
            "Stream Chunk #{}: {}",
            chunk_num,
            if data.chars().count() > 200 {
                format!("{}... ({} bytes)", safe_truncate(data, 200), data.len())
            } else {
                data.to_string()
            }
        )
        .bright_black()
    );
}
