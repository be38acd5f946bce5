//! Checks a settings file the way the service would at startup.
//!
//! $ cargo run --bin settings_demo -- --settings=settings/release.toml

use tokenkeeper::domain_model::parse_expiry_secs;
use tokenkeeper::server::jwt_config;
use tokenkeeper::settings::*;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let project_settings = parse_settings(cli.settings.as_deref())?;
    println!("{:#?}", project_settings);

    for (name, expiry) in [
        ("access", &project_settings.token.access_expires_in),
        ("refresh", &project_settings.token.refresh_expires_in),
    ] {
        match parse_expiry_secs(expiry) {
            Ok(secs) => println!("{:<8} {:>10} -> {} s", name, expiry, secs),
            Err(e) => println!("{:<8} {:>10} -> {}", name, expiry, e),
        }
    }

    match jwt_config(&project_settings.token) {
        Ok(cfg) => println!("signing config ok: {:?}", cfg),
        Err(e) => println!("signing config rejected: {:#}", e),
    }
    println!(
        "session backend: {} (prefix {:?}, timeout {} ms)",
        project_settings.session.backend,
        project_settings.session.key_prefix,
        project_settings.session.timeout_ms
    );
    Ok(())
}
