use crate::demo::{run_demo, run_import, run_score, DemoArgs, ImportArgs, ScoreArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use lendmarket::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Lendmarket",
    about = "Run the credit-offer marketplace service and its scoring tools from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Score a single applicant and print the factor breakdown
    Score(ScoreArgs),
    /// Work with applicant exports
    Leads {
        #[command(subcommand)]
        command: LeadsCommand,
    },
    /// Walk a lead through offers, acceptance, and disbursement on the in-memory store
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum LeadsCommand {
    /// Score every applicant in a CSV export and print them ranked
    Import(ImportArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Score(args) => run_score(args),
        Command::Leads {
            command: LeadsCommand::Import(args),
        } => run_import(args),
        Command::Demo(args) => run_demo(args),
    }
}
