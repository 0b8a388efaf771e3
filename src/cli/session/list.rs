use arbor_auth::{
    auth::{PgRefreshTokenRepository, RefreshTokenStore},
    database,
    principals::PrincipalUuid,
};
use clap::Args;
use uuid::Uuid;

#[derive(Debug, Args)]
pub(crate) struct ListSessionsArgs {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: String,

    /// Principal UUID whose active sessions should be listed
    #[arg(long)]
    principal_uuid: Uuid,
}

pub(crate) async fn run(args: ListSessionsArgs) -> Result<(), String> {
    let pool = database::connect(&args.database_url)
        .await
        .map_err(|error| format!("failed to connect to database: {error}"))?;

    let repository = PgRefreshTokenRepository::new(pool);

    let sessions = repository
        .find_active_by_principal(PrincipalUuid::from_uuid(args.principal_uuid))
        .await
        .map_err(|error| format!("failed to list sessions: {error}"))?;

    if sessions.is_empty() {
        println!("no active sessions for principal {}", args.principal_uuid);
        return Ok(());
    }

    for session in sessions {
        println!("token: {}", session.token);
        println!("issued_at: {}", session.issued_at);
        println!("expires_at: {}", session.expires_at);
        println!("created_by_ip: {}", session.created_by_ip);
        println!();
    }

    Ok(())
}
