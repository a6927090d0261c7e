use anyhow::Result;
use clap::{Subcommand, ValueEnum};
use serde_json::{json, Value};

use super::helpers;
use crate::output::{
    build_table, confirm, flag_cell, print_json, print_success, spinner, text_cell, theme,
    OutputMode,
};

#[derive(clap::Args)]
pub struct RulesArgs {
    #[arg(long, default_value_t = 1, help = "Owning source ID")]
    source: i64,

    #[arg(long, help = "Kapacitor ID")]
    kapacitor: i64,

    #[command(subcommand)]
    cmd: RulesCmd,
}

#[derive(Subcommand)]
pub enum RulesCmd {
    List,
    Get(GetArgs),
    Create(CreateArgs),
    Update(UpdateArgs),
    Status(StatusArgs),
    Delete(DeleteArgs),
}

#[derive(clap::Args)]
pub struct GetArgs {
    #[arg(help = "Rule ID")]
    id: String,
}

#[derive(clap::Args)]
pub struct CreateArgs {
    #[arg(long, help = "JSON file path or inline JSON")]
    data: String,
}

#[derive(clap::Args)]
pub struct UpdateArgs {
    #[arg(help = "Rule ID")]
    id: String,
    #[arg(long, help = "JSON file path or inline JSON; replaces the whole rule")]
    data: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum RuleStatus {
    Enabled,
    Disabled,
}

impl RuleStatus {
    fn as_str(self) -> &'static str {
        match self {
            Self::Enabled => "enabled",
            Self::Disabled => "disabled",
        }
    }
}

#[derive(clap::Args)]
pub struct StatusArgs {
    #[arg(help = "Rule ID")]
    id: String,
    #[arg(value_enum)]
    status: RuleStatus,
}

#[derive(clap::Args)]
pub struct DeleteArgs {
    #[arg(help = "Rule ID")]
    id: String,
    #[arg(long, help = "Skip confirmation prompt")]
    yes: bool,
}

pub async fn execute(args: RulesArgs, mode: OutputMode, base: &str) -> Result<()> {
    let url = helpers::rules_url(base, args.source, args.kapacitor);
    match args.cmd {
        RulesCmd::List => list(&url, mode).await,
        RulesCmd::Get(a) => get(&url, a, mode).await,
        RulesCmd::Create(a) => create(&url, a, mode).await,
        RulesCmd::Update(a) => update(&url, a, mode).await,
        RulesCmd::Status(a) => set_status(&url, a, mode).await,
        RulesCmd::Delete(a) => delete(&url, a, mode).await,
    }
}

fn print_rule(rule: &Value) {
    theme::print_header("Alert Rule");
    theme::print_kv("ID", rule["id"].as_str().unwrap_or("-"));
    theme::print_kv("Name", rule["name"].as_str().unwrap_or("-"));
    theme::print_kv("Trigger", rule["trigger"].as_str().unwrap_or("-"));
    theme::print_kv("Every", rule["every"].as_str().unwrap_or("-"));
    let status = rule["status"].as_str().unwrap_or("-");
    theme::print_kv_colored("Status", status, status == "enabled");
    if let Some(script) = rule["tickscript"].as_str() {
        theme::print_block("TICKscript", script);
    }
    println!();
}

async fn list(url: &str, mode: OutputMode) -> Result<()> {
    let sp = spinner::for_mode(mode, "Fetching rules...");
    let body =
        helpers::fetch_tracked(sp.as_ref(), "Listing failed", reqwest::Client::new().get(url))
            .await?;
    if let Some(sp) = sp {
        spinner::finish_clear(&sp);
    }

    let rules = body["rules"].as_array().cloned().unwrap_or_default();
    match mode {
        OutputMode::Json => print_json(&rules)?,
        OutputMode::Human => {
            if rules.is_empty() {
                print_success("No alert rules defined");
                return Ok(());
            }
            theme::print_header("Alert Rules");
            let mut table = build_table(&["ID", "Name", "Trigger", "Measurement", "Status"]);
            for r in &rules {
                let status = r["status"].as_str().unwrap_or("-");
                table.add_row(vec![
                    text_cell(&r["id"]),
                    text_cell(&r["name"]),
                    text_cell(&r["trigger"]),
                    text_cell(&r["query"]["measurement"]),
                    flag_cell(status, status == "enabled"),
                ]);
            }
            println!("{table}");
        }
    }
    Ok(())
}

async fn get(url: &str, args: GetArgs, mode: OutputMode) -> Result<()> {
    let rule: Value = helpers::send(reqwest::Client::new().get(format!("{url}/{}", args.id)))
        .await?
        .json()
        .await?;
    match mode {
        OutputMode::Json => print_json(&rule)?,
        OutputMode::Human => print_rule(&rule),
    }
    Ok(())
}

async fn create(url: &str, args: CreateArgs, mode: OutputMode) -> Result<()> {
    let body = helpers::parse_json_data(&args.data)?;
    let sp = spinner::for_mode(mode, "Creating rule...");
    let req = reqwest::Client::new().post(url).json(&body);
    let created = helpers::fetch_tracked(sp.as_ref(), "Rule rejected", req).await?;
    if let Some(sp) = sp {
        spinner::finish_ok(&sp, "Rule created");
    }

    match mode {
        OutputMode::Json => print_json(&created)?,
        OutputMode::Human => print_rule(&created),
    }
    Ok(())
}

async fn update(url: &str, args: UpdateArgs, mode: OutputMode) -> Result<()> {
    let body = helpers::parse_json_data(&args.data)?;
    let sp = spinner::for_mode(mode, "Replacing rule...");
    let req = reqwest::Client::new()
        .put(format!("{url}/{}", args.id))
        .json(&body);
    let updated = helpers::fetch_tracked(sp.as_ref(), "Rule rejected", req).await?;
    if let Some(sp) = sp {
        spinner::finish_ok(&sp, &format!("Rule {} replaced", args.id));
    }

    if mode == OutputMode::Json {
        print_json(&updated)?;
    }
    Ok(())
}

async fn set_status(url: &str, args: StatusArgs, mode: OutputMode) -> Result<()> {
    let req = reqwest::Client::new()
        .put(format!("{url}/{}/status", args.id))
        .json(&json!({"status": args.status.as_str()}));
    let rule: Value = helpers::send(req).await?.json().await?;

    match mode {
        OutputMode::Json => print_json(&rule)?,
        OutputMode::Human => {
            print_success(&format!("Rule {} {}", args.id, args.status.as_str()));
        }
    }
    Ok(())
}

async fn delete(url: &str, args: DeleteArgs, mode: OutputMode) -> Result<()> {
    if mode == OutputMode::Human && !args.yes {
        let msg = format!("Delete rule '{}'?", args.id);
        if !confirm::confirm_action(&msg) {
            theme::print_dim("Cancelled.");
            return Ok(());
        }
    }

    let sp = spinner::for_mode(mode, "Deleting rule...");
    let req = reqwest::Client::new().delete(format!("{url}/{}", args.id));
    helpers::send_tracked(sp.as_ref(), "Delete failed", req).await?;
    if let Some(sp) = sp {
        spinner::finish_ok(&sp, &format!("Rule '{}' deleted", args.id));
    }

    if mode == OutputMode::Json {
        print_json(&json!({"deleted": true, "id": args.id}))?;
    }
    Ok(())
}
