//! Sanity validation for a loaded configuration.

use super::Config;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("port must be nonzero")]
    ZeroPort,
    #[error("idle_room_timeout_secs must be at least room_sweep_interval_secs")]
    SweepFasterThanIdleTimeout,
    #[error("max_team_size must be between 1 and 6")]
    InvalidMaxTeamSize,
}

/// Validate a loaded [`Config`], returning the first violated constraint.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.port == 0 {
        return Err(ConfigError::ZeroPort);
    }
    if config.server.idle_room_timeout_secs < config.server.room_sweep_interval_secs {
        return Err(ConfigError::SweepFasterThanIdleTimeout);
    }
    if config.server.max_team_size == 0 || config.server.max_team_size > 6 {
        return Err(ConfigError::InvalidMaxTeamSize);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn zero_port_is_rejected() {
        let mut config = Config::default();
        config.port = 0;
        assert!(matches!(validate_config(&config), Err(ConfigError::ZeroPort)));
    }
}
