use super::{Parser, Subcommand};
use crate::domain_model::UserRole;

#[derive(Parser, Debug)]
#[command(name = "tokenkeeper", version, about = "Issue, verify and rotate session tokens")]
pub struct Cli {
    #[arg(long, global = true)]
    pub settings: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sign in a seeded identity and print the token pair
    Issue {
        #[arg(long)]
        user: i64,
    },
    /// Verify an access token and print its claims
    Verify { token: String },
    /// Verify an access token and require one of the given roles
    Authorize {
        token: String,
        #[arg(long = "role")]
        roles: Vec<UserRole>,
    },
    /// Exchange a refresh token for a new pair
    Rotate { token: String },
    /// Mark a session as revoked
    Revoke { sid: String },
    /// End the session a refresh token belongs to
    Logout { token: String },
    /// Walk through login, rotation, replay and revocation in-process
    Demo,
}
