mod cmd;
mod output;

use std::process::ExitCode;

use clap::Parser;
use cmd::Commands;
use output::OutputMode;

#[derive(Parser)]
#[command(name = "kapaplane", version, about = "Kapacitor fleet admin CLI")]
pub struct Opts {
    #[clap(subcommand)]
    cmd: Commands,

    #[arg(long, global = true, help = "Output as JSON")]
    json: bool,

    #[arg(
        long,
        global = true,
        env = "KAPAPLANE_URL",
        default_value = "http://localhost:8888",
        help = "Control plane base URL"
    )]
    server: String,
}

impl Opts {
    pub fn output_mode(&self) -> OutputMode {
        OutputMode::from_json_flag(self.json)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let opts = Opts::parse();
    match cmd::run(opts).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::print_error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}
