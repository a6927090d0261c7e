mod health;
pub(crate) mod helpers;
mod kapacitors;
mod rules;

use anyhow::Result;
use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Manage kapacitor instances registered under a source
    Kapacitors(kapacitors::KapacitorsArgs),
    /// Manage alert rules on a kapacitor instance
    Rules(rules::RulesArgs),
    /// Check control plane liveness and readiness
    Health(health::HealthArgs),
}

pub async fn run(opts: crate::Opts) -> Result<()> {
    let mode = opts.output_mode();
    let base = opts.server.trim_end_matches('/').to_string();
    match opts.cmd {
        Commands::Kapacitors(args) => kapacitors::execute(args, mode, &base).await,
        Commands::Rules(args) => rules::execute(args, mode, &base).await,
        Commands::Health(args) => health::execute(args, mode, &base).await,
    }
}
