//! Configuration validation functions.

use super::Config;

/// Validate configuration and warn about risky production settings.
pub fn validate_config_security(config: &Config) -> anyhow::Result<()> {
    let is_prod = is_production_mode();

    if config.security.cors_origins.trim() == "*" && is_prod {
        eprintln!(
            "\nSECURITY WARNING: CORS is wide open (\"*\") in what looks like a production environment.\n\
             Set CARD_HUB__SECURITY__CORS_ORIGINS to an explicit comma-separated origin list.\n"
        );
    }

    if config.security.min_password_length < 8 {
        eprintln!(
            "\nWARNING: security.min_password_length is {} — fewer than 8 characters is not recommended.\n",
            config.security.min_password_length
        );
    }

    config.websocket.validate()?;

    Ok(())
}

/// Detect if we're running in production mode.
///
/// Checks the `CARD_HUB__ENVIRONMENT` variable first, then well-known generic ones.
pub fn is_production_mode() -> bool {
    use std::env;

    if let Ok(mode) = env::var("CARD_HUB__ENVIRONMENT") {
        return mode.eq_ignore_ascii_case("production") || mode.eq_ignore_ascii_case("prod");
    }

    env::var("CARD_HUB_PRODUCTION").is_ok() || env::var("PRODUCTION").is_ok() || env::var("PROD").is_ok()
}
