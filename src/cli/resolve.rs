use crate::core::request::handle_request;
use crate::core::resolver::PriceResolver;
use anyhow::{Context, Result};
use std::io::Read;

/// Reads a JSON request from `request` or stdin and prints the JSON
/// response. A malformed request still prints a response carrying the
/// error.
pub async fn run(resolver: &PriceResolver, request: Option<String>) -> Result<()> {
    let body = match request {
        Some(body) => body,
        None => {
            let mut body = String::new();
            std::io::stdin()
                .read_to_string(&mut body)
                .context("Failed to read request from stdin")?;
            body
        }
    };

    let response = handle_request(resolver, &body).await;
    let json = serde_json::to_string_pretty(&response).context("Failed to serialize response")?;
    println!("{json}");
    Ok(())
}
