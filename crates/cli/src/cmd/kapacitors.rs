use anyhow::Result;
use clap::Subcommand;
use serde_json::{json, Map, Value};

use super::helpers;
use crate::output::{
    build_table, confirm, flag_cell, print_json, print_success, spinner, text_cell, theme,
    OutputMode,
};

#[derive(clap::Args)]
pub struct KapacitorsArgs {
    #[arg(long, default_value_t = 1, help = "Owning source ID")]
    source: i64,

    #[command(subcommand)]
    cmd: KapacitorsCmd,
}

#[derive(Subcommand)]
pub enum KapacitorsCmd {
    List,
    Get(GetArgs),
    Create(CreateArgs),
    Update(UpdateArgs),
    Delete(DeleteArgs),
}

#[derive(clap::Args)]
pub struct GetArgs {
    #[arg(help = "Kapacitor ID")]
    id: i64,
}

#[derive(clap::Args)]
pub struct CreateArgs {
    #[arg(long)]
    name: String,
    #[arg(long, help = "Absolute URL, e.g. http://localhost:9092")]
    url: String,
    #[arg(long)]
    username: Option<String>,
    #[arg(long)]
    password: Option<String>,
    #[arg(long)]
    active: bool,
}

#[derive(clap::Args)]
pub struct UpdateArgs {
    #[arg(help = "Kapacitor ID")]
    id: i64,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    url: Option<String>,
    #[arg(long)]
    username: Option<String>,
    #[arg(long)]
    password: Option<String>,
    #[arg(long)]
    active: Option<bool>,
}

#[derive(clap::Args)]
pub struct DeleteArgs {
    #[arg(help = "Kapacitor ID")]
    id: i64,
    #[arg(long, help = "Skip confirmation prompt")]
    yes: bool,
}

impl CreateArgs {
    fn body(&self) -> Value {
        json!({
            "name": self.name,
            "url": self.url,
            "username": self.username.clone().unwrap_or_default(),
            "password": self.password.clone().unwrap_or_default(),
            "active": self.active,
        })
    }
}

impl UpdateArgs {
    /// Only the flags that were given, so the server keeps everything else.
    fn patch(&self) -> Value {
        let mut body = Map::new();
        let strings = [
            ("name", &self.name),
            ("url", &self.url),
            ("username", &self.username),
            ("password", &self.password),
        ];
        for (key, value) in strings {
            if let Some(v) = value {
                body.insert(key.into(), Value::String(v.clone()));
            }
        }
        if let Some(active) = self.active {
            body.insert("active".into(), Value::Bool(active));
        }
        Value::Object(body)
    }
}

pub async fn execute(args: KapacitorsArgs, mode: OutputMode, base: &str) -> Result<()> {
    let url = helpers::kapacitors_url(base, args.source);
    match args.cmd {
        KapacitorsCmd::List => list(&url, mode).await,
        KapacitorsCmd::Get(a) => get(&url, a, mode).await,
        KapacitorsCmd::Create(a) => create(&url, a, mode).await,
        KapacitorsCmd::Update(a) => update(&url, a, mode).await,
        KapacitorsCmd::Delete(a) => delete(&url, a, mode).await,
    }
}

fn print_details(k: &Value) {
    theme::print_header("Kapacitor");
    theme::print_kv("ID", k["id"].as_str().unwrap_or("-"));
    theme::print_kv("Name", k["name"].as_str().unwrap_or("-"));
    theme::print_kv("URL", k["url"].as_str().unwrap_or("-"));
    theme::print_kv("Username", k["username"].as_str().unwrap_or("-"));
    let active = k["active"].as_bool().unwrap_or(false);
    theme::print_kv_colored("Active", if active { "yes" } else { "no" }, active);
    theme::print_kv("Rules", k["links"]["rules"].as_str().unwrap_or("-"));
    println!();
}

async fn list(url: &str, mode: OutputMode) -> Result<()> {
    let sp = spinner::for_mode(mode, "Fetching kapacitors...");
    let body =
        helpers::fetch_tracked(sp.as_ref(), "Listing failed", reqwest::Client::new().get(url))
            .await?;
    if let Some(sp) = sp {
        spinner::finish_clear(&sp);
    }

    let kapacitors = body["kapacitors"].as_array().cloned().unwrap_or_default();
    match mode {
        OutputMode::Json => print_json(&kapacitors)?,
        OutputMode::Human => {
            if kapacitors.is_empty() {
                print_success("No kapacitors registered");
                return Ok(());
            }
            theme::print_header("Kapacitors");
            let mut table = build_table(&["ID", "Name", "URL", "Active"]);
            for k in &kapacitors {
                let active = k["active"].as_bool().unwrap_or(false);
                table.add_row(vec![
                    text_cell(&k["id"]),
                    text_cell(&k["name"]),
                    text_cell(&k["url"]),
                    flag_cell(if active { "yes" } else { "no" }, active),
                ]);
            }
            println!("{table}");
        }
    }
    Ok(())
}

async fn get(url: &str, args: GetArgs, mode: OutputMode) -> Result<()> {
    let resp = helpers::send(reqwest::Client::new().get(format!("{url}/{}", args.id))).await?;
    let k: Value = resp.json().await?;
    match mode {
        OutputMode::Json => print_json(&k)?,
        OutputMode::Human => print_details(&k),
    }
    Ok(())
}

async fn create(url: &str, args: CreateArgs, mode: OutputMode) -> Result<()> {
    let sp = spinner::for_mode(mode, "Registering kapacitor...");
    let req = reqwest::Client::new().post(url).json(&args.body());
    let created = helpers::fetch_tracked(sp.as_ref(), "Registration failed", req).await?;
    if let Some(sp) = sp {
        spinner::finish_ok(&sp, "Kapacitor registered");
    }

    match mode {
        OutputMode::Json => print_json(&created)?,
        OutputMode::Human => print_details(&created),
    }
    Ok(())
}

async fn update(url: &str, args: UpdateArgs, mode: OutputMode) -> Result<()> {
    let sp = spinner::for_mode(mode, "Updating kapacitor...");
    let req = reqwest::Client::new()
        .patch(format!("{url}/{}", args.id))
        .json(&args.patch());
    let updated = helpers::fetch_tracked(sp.as_ref(), "Update failed", req).await?;
    if let Some(sp) = sp {
        spinner::finish_ok(&sp, &format!("Kapacitor {} updated", args.id));
    }

    if mode == OutputMode::Json {
        print_json(&updated)?;
    }
    Ok(())
}

async fn delete(url: &str, args: DeleteArgs, mode: OutputMode) -> Result<()> {
    if mode == OutputMode::Human && !args.yes {
        let msg = format!("Delete kapacitor {}?", args.id);
        if !confirm::confirm_action(&msg) {
            theme::print_dim("Cancelled.");
            return Ok(());
        }
    }

    let sp = spinner::for_mode(mode, "Deleting kapacitor...");
    let req = reqwest::Client::new().delete(format!("{url}/{}", args.id));
    helpers::send_tracked(sp.as_ref(), "Delete failed", req).await?;
    if let Some(sp) = sp {
        spinner::finish_ok(&sp, &format!("Kapacitor {} deleted", args.id));
    }

    if mode == OutputMode::Json {
        print_json(&json!({"deleted": true, "id": args.id}))?;
    }
    Ok(())
}
