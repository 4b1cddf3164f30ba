use crate::admin::{self, SeedArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use homestead::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "homestead",
    about = "Run and administer the Homestead property management portal",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP server (default command)
    Serve(ServeArgs),
    /// Manage the SQLite database
    Db {
        #[command(subcommand)]
        command: DbCommand,
    },
}

#[derive(Subcommand, Debug)]
enum DbCommand {
    /// Create the database file and schema if they do not exist
    Init,
    /// Create a verified account, optionally with an organization it owns
    Seed(SeedArgs),
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
        Command::Db {
            command: DbCommand::Init,
        } => admin::run_init(),
        Command::Db {
            command: DbCommand::Seed(args),
        } => admin::run_seed(args),
    }
}
