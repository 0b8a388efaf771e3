use arbor_auth::{
    auth::{PgRefreshTokenRepository, RefreshTokenStore, RevokeOutcome},
    database,
    principals::PrincipalUuid,
};
use clap::Args;
use uuid::Uuid;

#[derive(Debug, Args)]
pub(crate) struct RevokeSessionsArgs {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: String,

    /// Renewal credential value to revoke
    #[arg(long, conflicts_with = "principal_uuid")]
    token: Option<String>,

    /// Principal UUID whose sessions should all be removed
    #[arg(long)]
    principal_uuid: Option<Uuid>,
}

pub(crate) async fn run(args: RevokeSessionsArgs) -> Result<(), String> {
    if args.token.is_none() && args.principal_uuid.is_none() {
        return Err("pass either --token or --principal-uuid".to_string());
    }

    let pool = database::connect(&args.database_url)
        .await
        .map_err(|error| format!("failed to connect to database: {error}"))?;

    let repository = PgRefreshTokenRepository::new(pool);

    if let Some(token) = args.token {
        let outcome = repository
            .revoke_if_active(&token, "cli", None)
            .await
            .map_err(|error| format!("failed to revoke session: {error}"))?;

        match outcome {
            RevokeOutcome::Revoked { .. } => println!("revoked 1 session"),
            RevokeOutcome::AlreadyRevoked => println!("session was not active"),
        }

        return Ok(());
    }

    if let Some(principal_uuid) = args.principal_uuid {
        let deleted = repository
            .delete_all_for_principal(PrincipalUuid::from_uuid(principal_uuid))
            .await
            .map_err(|error| format!("failed to remove sessions: {error}"))?;

        println!("removed {deleted} sessions for principal {principal_uuid}");
    }

    Ok(())
}
