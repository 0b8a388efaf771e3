use arbor_auth::{
    auth::{PgRefreshTokenRepository, RefreshTokenStore},
    database,
};
use clap::Args;
use jiff::Timestamp;

#[derive(Debug, Args)]
pub(crate) struct PurgeSessionsArgs {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: String,
}

pub(crate) async fn run(args: PurgeSessionsArgs) -> Result<(), String> {
    let pool = database::connect(&args.database_url)
        .await
        .map_err(|error| format!("failed to connect to database: {error}"))?;

    let purged = PgRefreshTokenRepository::new(pool)
        .purge_expired(Timestamp::now())
        .await
        .map_err(|error| format!("failed to purge sessions: {error}"))?;

    println!("purged {purged} expired sessions");

    Ok(())
}
