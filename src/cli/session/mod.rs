use clap::{Args, Subcommand};

mod list;
mod purge;
mod revoke;

#[derive(Debug, Args)]
pub(crate) struct SessionCommand {
    #[command(subcommand)]
    command: SessionSubcommand,
}

#[derive(Debug, Subcommand)]
enum SessionSubcommand {
    /// List active sessions for a principal
    List(list::ListSessionsArgs),
    /// Revoke a single session or every session of a principal
    Revoke(revoke::RevokeSessionsArgs),
    /// Delete renewal credentials past their expiry
    Purge(purge::PurgeSessionsArgs),
}

pub(crate) async fn run(command: SessionCommand) -> Result<(), String> {
    match command.command {
        SessionSubcommand::List(args) => list::run(args).await,
        SessionSubcommand::Revoke(args) => revoke::run(args).await,
        SessionSubcommand::Purge(args) => purge::run(args).await,
    }
}
