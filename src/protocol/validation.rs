use crate::config::SecurityConfig;

/// Validates a username against the configured length bounds. The store is
/// the authority on uniqueness; this only checks shape.
pub fn validate_username_with_config(name: &str, config: &SecurityConfig) -> Result<(), String> {
    let len = name.chars().count();
    if len < config.min_username_length {
        return Err(format!(
            "Username must be at least {} characters",
            config.min_username_length
        ));
    }
    if len > config.max_username_length {
        return Err(format!(
            "Username must be at most {} characters",
            config.max_username_length
        ));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err("Username may only contain letters, digits, '_' and '-'".to_string());
    }
    Ok(())
}

/// Validates a raw password before it is handed to the hasher.
pub fn validate_password_with_config(password: &str, config: &SecurityConfig) -> Result<(), String> {
    if password.len() < config.min_password_length {
        return Err(format!(
            "Password must be at least {} characters",
            config.min_password_length
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_and_long_usernames() {
        let cfg = SecurityConfig::default();
        assert!(validate_username_with_config("ab", &cfg).is_err());
        assert!(validate_username_with_config(&"a".repeat(16), &cfg).is_err());
        assert!(validate_username_with_config("abc", &cfg).is_ok());
    }

    #[test]
    fn rejects_invalid_characters() {
        let cfg = SecurityConfig::default();
        assert!(validate_username_with_config("bad name!", &cfg).is_err());
        assert!(validate_username_with_config("good_name-1", &cfg).is_ok());
    }

    #[test]
    fn rejects_short_passwords() {
        let cfg = SecurityConfig::default();
        assert!(validate_password_with_config("short", &cfg).is_err());
        assert!(validate_password_with_config("longenough", &cfg).is_ok());
    }
}
