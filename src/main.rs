use anyhow::anyhow;
use serde::Serialize;
use std::sync::Arc;
use tokenkeeper::application_port::*;
use tokenkeeper::domain_model::*;
use tokenkeeper::domain_port::IdentityDirectory;
use tokenkeeper::infra_memory::InMemoryIdentityDirectory;
use tokenkeeper::logger::*;
use tokenkeeper::server::*;
use tokenkeeper::settings::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let logger = Logger::new_bootstrap();

    let project_settings = parse_settings(cli.settings.as_deref())?;
    info!(?project_settings);
    let logger_config = LogConfig {
        filter: project_settings.log.filter.clone(),
    };
    logger.reload_from_config(&logger_config)?;

    let identities = Arc::new(InMemoryIdentityDirectory::from_identities(
        project_settings.identities.iter().cloned(),
    ));
    let server = Server::try_new(&project_settings, identities.clone()).await?;

    let command = cli.command.unwrap_or(Command::Demo);
    let result = run(command, &server, &identities, &project_settings.identities).await;

    server.shutdown().await;
    result
}

async fn run(
    command: Command,
    server: &Server,
    directory: &InMemoryIdentityDirectory,
    seeded: &[Identity],
) -> anyhow::Result<()> {
    let tokens = server.token_service.as_ref();
    match command {
        Command::Issue { user } => {
            let identity = directory
                .get_identity(UserId(user))
                .await
                .map_err(report)?
                .ok_or_else(|| anyhow!("no seeded identity with id {}", user))?;
            print_json(&tokens.issue_login_tokens(&identity).await.map_err(report)?)
        }
        Command::Verify { token } => print_json(&tokens.verify_access(&token).await.map_err(report)?),
        Command::Authorize { token, roles } => {
            print_json(&tokens.authorize(&token, &roles).await.map_err(report)?)
        }
        Command::Rotate { token } => print_json(&tokens.rotate(&token).await.map_err(report)?),
        Command::Revoke { sid } => {
            tokens
                .revoke_session(&SessionId(sid))
                .await
                .map_err(report)?;
            println!("revoked");
            Ok(())
        }
        Command::Logout { token } => {
            tokens.logout(&token).await.map_err(report)?;
            println!("logged out");
            Ok(())
        }
        Command::Demo => demo(tokens, seeded).await,
    }
}

fn report(error: TokenError) -> anyhow::Error {
    let code = error.code();
    warn!(%error, "token operation failed");
    anyhow!("{} [{:?}, retryable: {}]", code, code, error.is_retryable())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn outcome<T>(label: &str, result: &Result<T, TokenError>) {
    match result {
        Ok(_) => println!("{:<36} ok", label),
        Err(e) => println!("{:<36} {} -> \"{}\"", label, e, e.code()),
    }
}

async fn demo(tokens: &dyn TokenService, seeded: &[Identity]) -> anyhow::Result<()> {
    let identity = seeded
        .iter()
        .find(|identity| identity.status.is_active())
        .ok_or_else(|| anyhow!("demo needs at least one ACTIVE identity in settings"))?;

    let login = tokens.issue_login_tokens(identity).await.map_err(report)?;
    println!("{:<36} sid={}", "login", login.session_id);

    let claims = tokens.verify_access(&login.access_token.0).await;
    outcome("verify access token", &claims);

    let rotated = tokens.rotate(&login.refresh_token.0).await;
    outcome("rotate first refresh token", &rotated);
    let rotated = rotated.map_err(report)?;

    outcome(
        "replay first refresh token",
        &tokens.rotate(&login.refresh_token.0).await,
    );

    let (a, b) = tokio::join!(
        tokens.rotate(&rotated.refresh_token.0),
        tokens.rotate(&rotated.refresh_token.0)
    );
    outcome("concurrent rotation #1", &a);
    outcome("concurrent rotation #2", &b);
    let latest = a.or(b).map_err(report)?;

    tokens
        .revoke_session(&login.session_id)
        .await
        .map_err(report)?;
    println!("{:<36} sid={}", "revoke session", login.session_id);

    outcome(
        "rotate latest token after revoke",
        &tokens.rotate(&latest.refresh_token.0).await,
    );
    outcome(
        "access token after revoke",
        &tokens.verify_access(&latest.access_token.0).await,
    );
    Ok(())
}
