use anyhow::{bail, Context, Result};
use indicatif::ProgressBar;
use serde::Deserialize;
use serde_json::Value;

use crate::output::spinner;

const API_PREFIX: &str = "/chronograf/v1";

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

pub fn kapacitors_url(base: &str, src: i64) -> String {
    format!("{base}{API_PREFIX}/sources/{src}/kapacitors")
}

pub fn rules_url(base: &str, src: i64, kid: i64) -> String {
    format!("{}/{kid}/rules", kapacitors_url(base, src))
}

/// Reads a JSON document from a file path, or parses the argument itself.
pub fn parse_json_data(data: &str) -> Result<serde_json::Value> {
    let path = std::path::Path::new(data);
    if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
    } else {
        serde_json::from_str(data).context("parsing inline JSON")
    }
}

/// Turns a non-success reply into an error carrying the server's message.
pub async fn check(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let message = resp
        .json::<ErrorBody>()
        .await
        .map(|b| b.message)
        .unwrap_or_else(|_| status.to_string());
    bail!("HTTP {}: {message}", status.as_u16())
}

pub async fn send(req: reqwest::RequestBuilder) -> Result<reqwest::Response> {
    let resp = req.send().await.context("failed to reach server")?;
    check(resp).await
}

/// Sends under a spinner, marking it failed when the request does not succeed.
pub async fn send_tracked(
    sp: Option<&ProgressBar>,
    failed: &str,
    req: reqwest::RequestBuilder,
) -> Result<reqwest::Response> {
    let result = send(req).await;
    if let (Err(_), Some(sp)) = (&result, sp) {
        spinner::finish_err(sp, failed);
    }
    result
}

/// Like [`send_tracked`], also decoding the JSON reply.
pub async fn fetch_tracked(
    sp: Option<&ProgressBar>,
    failed: &str,
    req: reqwest::RequestBuilder,
) -> Result<Value> {
    let resp = send_tracked(sp, failed, req).await?;
    let result = resp.json::<Value>().await.context("decoding server reply");
    if let (Err(_), Some(sp)) = (&result, sp) {
        spinner::finish_err(sp, failed);
    }
    result
}
