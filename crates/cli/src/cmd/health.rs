use std::time::Duration;

use anyhow::{bail, Result};
use clap::Args;
use serde::Serialize;
use serde_json::json;

use crate::output::{print_json, theme, OutputMode};

#[derive(Args)]
pub struct HealthArgs {
    #[arg(long, default_value_t = 5, help = "Seconds to wait for each check")]
    timeout: u64,
}

/// Outcome of one control plane endpoint.
#[derive(Debug, Serialize)]
pub struct Check {
    pub endpoint: &'static str,
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Check {
    pub fn passed(&self) -> bool {
        self.status.is_some_and(|s| (200..300).contains(&s))
    }

    pub fn describe(&self) -> String {
        match (self.status, &self.error) {
            (Some(code), _) => reqwest::StatusCode::from_u16(code)
                .map(|s| s.to_string())
                .unwrap_or_else(|_| code.to_string()),
            (None, Some(err)) => format!("unreachable ({err})"),
            (None, None) => "unreachable".into(),
        }
    }
}

async fn run_check(client: &reqwest::Client, base: &str, endpoint: &'static str) -> Check {
    match client.get(format!("{base}{endpoint}")).send().await {
        Ok(resp) => Check {
            endpoint,
            status: Some(resp.status().as_u16()),
            error: None,
        },
        Err(e) => Check {
            endpoint,
            status: None,
            error: Some(e.without_url().to_string()),
        },
    }
}

/// Checks liveness and readiness; readiness covers the instance registry.
pub async fn execute(args: HealthArgs, mode: OutputMode, base: &str) -> Result<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(args.timeout))
        .build()?;
    let live = run_check(&client, base, "/healthz").await;
    let ready = run_check(&client, base, "/ready").await;
    let healthy = live.passed() && ready.passed();

    match mode {
        OutputMode::Json => print_json(&json!({
            "server": base,
            "healthy": healthy,
            "checks": [&live, &ready],
        }))?,
        OutputMode::Human => {
            theme::print_header("Control Plane");
            theme::print_kv("Server", base);
            theme::print_kv_colored("Liveness", &live.describe(), live.passed());
            theme::print_kv_colored("Readiness", &ready.describe(), ready.passed());
            println!();
        }
    }

    if !healthy {
        bail!("control plane at {base} is not healthy");
    }
    Ok(())
}
