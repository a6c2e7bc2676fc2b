use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::domain::registration::DEFAULT_MAX_SEATS_PER_LINE;
use crate::utils::PollProfile;

// ============================================================================
// Configuration
// ============================================================================
//
// Layered: built-in defaults, then an optional `config/registration.*` file,
// then environment variables such as
// `REGISTRATION__POLLING__PRICING__MAX_WAIT_MS=1500`.
//
// ============================================================================

#[derive(Debug, Deserialize, Clone)]
pub struct RegistrationConfig {
    pub polling: PollingConfig,
    pub registration: FlowConfig,
    pub messaging: MessagingConfig,
    pub metrics: MetricsConfig,
    pub simulation: SimulationConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PollingConfig {
    pub reservation: PollProfileConfig,
    pub pricing: PollProfileConfig,
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct PollProfileConfig {
    pub max_wait_ms: u64,
    pub interval_ms: u64,
}

impl PollProfileConfig {
    fn profile(&self, name: &'static str) -> PollProfile {
        PollProfile::new(
            name,
            Duration::from_millis(self.max_wait_ms),
            Duration::from_millis(self.interval_ms),
        )
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct FlowConfig {
    pub max_seats_per_line: i32,
    /// Base of the redirect and payment callback URLs
    pub public_base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MessagingConfig {
    /// Redpanda brokers; the in-memory bus is used when unset
    pub brokers: Option<String>,
    pub topic: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SimulationConfig {
    pub reservation_hold_minutes: i64,
    pub projection_delay_ms: u64,
}

impl RegistrationConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::from_builder(
            Self::builder()?
                .add_source(config::File::with_name("config/registration").required(false))
                .add_source(config::Environment::with_prefix("REGISTRATION").separator("__")),
        )
    }

    /// Defaults only, no file or environment
    pub fn defaults() -> Result<Self, config::ConfigError> {
        Self::from_builder(Self::builder()?)
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, config::ConfigError> {
        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        let invalid = |message: String| -> Result<(), config::ConfigError> {
            Err(config::ConfigError::Message(message))
        };

        for (name, profile) in [
            ("reservation", &self.polling.reservation),
            ("pricing", &self.polling.pricing),
        ] {
            if profile.interval_ms == 0 {
                return invalid(format!("polling.{}.interval_ms must be positive", name));
            }
        }
        if self.registration.max_seats_per_line < 1 {
            return invalid(format!(
                "registration.max_seats_per_line must be at least 1, got {}",
                self.registration.max_seats_per_line
            ));
        }
        match Url::parse(&self.registration.public_base_url) {
            Ok(url) if !url.cannot_be_a_base() => {}
            Ok(_) => {
                return invalid(format!(
                    "registration.public_base_url cannot carry a path: {}",
                    self.registration.public_base_url
                ))
            }
            Err(e) => {
                return invalid(format!("registration.public_base_url is invalid: {}", e))
            }
        }
        if self.simulation.reservation_hold_minutes < 1 {
            return invalid(
                "simulation.reservation_hold_minutes must be at least 1".to_string(),
            );
        }

        Ok(())
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>, config::ConfigError> {
        config::Config::builder()
            .set_default("polling.reservation.max_wait_ms", 5000)?
            .set_default("polling.reservation.interval_ms", 500)?
            .set_default("polling.pricing.max_wait_ms", 1000)?
            .set_default("polling.pricing.interval_ms", 300)?
            .set_default("registration.max_seats_per_line", DEFAULT_MAX_SEATS_PER_LINE)?
            .set_default("registration.public_base_url", "http://localhost:8080")?
            .set_default("messaging.topic", "registration-commands")?
            .set_default("metrics.enabled", true)?
            .set_default("metrics.port", 9090)?
            .set_default("simulation.reservation_hold_minutes", 15)?
            .set_default("simulation.projection_delay_ms", 200)
    }

    pub fn reservation_profile(&self) -> PollProfile {
        self.polling.reservation.profile("reservation")
    }

    pub fn pricing_profile(&self) -> PollProfile {
        self.polling.pricing.profile("pricing")
    }

    pub fn public_base_url(&self) -> anyhow::Result<Url> {
        Ok(Url::parse(&self.registration.public_base_url)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_profiles() {
        let config = RegistrationConfig::defaults().unwrap();

        assert_eq!(config.reservation_profile(), PollProfile::reservation());
        assert_eq!(config.pricing_profile(), PollProfile::pricing());
        assert_eq!(config.registration.max_seats_per_line, DEFAULT_MAX_SEATS_PER_LINE);
        assert!(config.messaging.brokers.is_none());
        assert_eq!(config.messaging.topic, "registration-commands");
        assert_eq!(config.metrics.port, 9090);
        assert_eq!(
            config.public_base_url().unwrap().as_str(),
            "http://localhost:8080/"
        );
    }

    fn with_override(key: &str, value: i64) -> Result<RegistrationConfig, config::ConfigError> {
        RegistrationConfig::from_builder(
            RegistrationConfig::builder()
                .unwrap()
                .set_override(key, value)
                .unwrap(),
        )
    }

    #[test]
    fn test_zero_poll_interval_is_rejected() {
        for key in ["polling.reservation.interval_ms", "polling.pricing.interval_ms"] {
            match with_override(key, 0) {
                Err(config::ConfigError::Message(message)) => assert!(message.contains(key)),
                other => panic!("expected {} to be rejected, got {:?}", key, other),
            }
        }
    }

    #[test]
    fn test_seat_cap_must_be_positive() {
        assert!(with_override("registration.max_seats_per_line", -1).is_err());
        assert!(with_override("registration.max_seats_per_line", 0).is_err());
        assert_eq!(
            with_override("registration.max_seats_per_line", 8)
                .unwrap()
                .registration
                .max_seats_per_line,
            8
        );
    }

    #[test]
    fn test_zero_max_wait_is_allowed() {
        let config = with_override("polling.pricing.max_wait_ms", 0).unwrap();
        assert_eq!(config.pricing_profile().max_wait, Duration::ZERO);
    }

    #[test]
    fn test_base_url_must_accept_paths() {
        let result = RegistrationConfig::from_builder(
            RegistrationConfig::builder()
                .unwrap()
                .set_override("registration.public_base_url", "mailto:tickets@example.org")
                .unwrap(),
        );
        assert!(matches!(result, Err(config::ConfigError::Message(_))));
    }
}
