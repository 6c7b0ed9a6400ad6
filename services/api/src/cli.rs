use crate::commands::{run_distance, run_quote, run_refund_pass, DistanceArgs, QuoteArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use toolshare::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Toolshare settlement service",
    about = "Run the Toolshare pricing, admission, and refund service from the command line",
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
    /// Print the price breakdown for a rental
    Quote(QuoteArgs),
    /// Print the distance in miles between two points
    Distance(DistanceArgs),
    /// Refund queue operations
    Refunds {
        #[command(subcommand)]
        command: RefundsCommand,
    },
}

#[derive(Subcommand, Debug)]
enum RefundsCommand {
    /// Run a single refund pass and print the per-job results as JSON
    Run,
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
        Command::Quote(args) => run_quote(args),
        Command::Distance(args) => run_distance(args),
        Command::Refunds {
            command: RefundsCommand::Run,
        } => run_refund_pass().await,
    }
}
