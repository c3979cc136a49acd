//! Configuration validation.

use super::{Config, DatabaseConfig};
use crate::error::{Result, TypegenError};
use crate::naming::is_bare_identifier;

const SSL_MODES: &[&str] = &["disable", "require", "verify-ca", "verify-full"];

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    if let Some(db) = &config.database {
        validate_database(db)?;
    }

    if config.schemas.entries().is_empty() {
        return Err(TypegenError::Config(
            "schemas must name at least one schema".into(),
        ));
    }

    for (option, name) in [
        ("table_enum_name", &config.table_enum_name),
        ("table_map_name", &config.table_map_name),
    ] {
        if !is_bare_identifier(name) {
            return Err(TypegenError::Config(format!(
                "{} must be a valid identifier, got '{}'",
                option, name
            )));
        }
    }

    if config.table_enum_name == config.table_map_name {
        return Err(TypegenError::Config(
            "table_enum_name and table_map_name must differ".into(),
        ));
    }

    for (raw, name) in &config.overrides {
        if name.trim().is_empty() {
            return Err(TypegenError::Config(format!(
                "override for '{}' cannot be empty",
                raw
            )));
        }
    }

    Ok(())
}

/// Validate connection settings.
pub fn validate_database(db: &DatabaseConfig) -> Result<()> {
    if db.host.is_empty() {
        return Err(TypegenError::Config("database.host is required".into()));
    }
    if db.database.is_empty() {
        return Err(TypegenError::Config("database.database is required".into()));
    }
    if db.user.is_empty() {
        return Err(TypegenError::Config("database.user is required".into()));
    }
    if !SSL_MODES.contains(&db.ssl_mode.as_str()) {
        return Err(TypegenError::Config(format!(
            "Invalid ssl_mode '{}'. Valid options: {}",
            db.ssl_mode,
            SSL_MODES.join(", ")
        )));
    }
    Ok(())
}
