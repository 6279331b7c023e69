use std::time::Duration;

use clap::Parser;
use rust_decimal::Decimal;

use crate::pipeline::StageKind;

// ============================================================================
// Application Configuration
// ============================================================================
//
// Every option can come from the command line or the environment. The
// stage list decides how the chain is composed at process start.
//
// ============================================================================

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for field '{field}': {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required field: {field}")]
    MissingRequired { field: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Parser, Debug, Clone)]
#[command(name = "order_pipeline")]
#[command(about = "Order processing pipeline served over HTTP")]
pub struct AppConfig {
    /// Address to bind the HTTP server to
    #[arg(long, env = "ORDER_PIPELINE_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port for the HTTP server
    #[arg(long, env = "ORDER_PIPELINE_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Stages to chain, in order
    #[arg(
        long,
        env = "ORDER_PIPELINE_STAGES",
        value_enum,
        value_delimiter = ',',
        default_values_t = StageKind::default_chain()
    )]
    pub stages: Vec<StageKind>,

    /// Upper bound for every inventory, payment and shipping call, retries included
    #[arg(long, env = "ORDER_PIPELINE_EFFECT_TIMEOUT_MS", default_value_t = 2000)]
    pub effect_timeout_ms: u64,

    /// Upper bound for a single attempt; timeouts count against the circuit breaker
    #[arg(long, env = "ORDER_PIPELINE_ATTEMPT_TIMEOUT_MS", default_value_t = 1000)]
    pub attempt_timeout_ms: u64,

    /// Largest amount the simulated payment gateway will approve
    #[arg(long, env = "ORDER_PIPELINE_PAYMENT_LIMIT", default_value = "5000")]
    pub payment_limit: Decimal,

    /// Countries the simulated carrier ships to
    #[arg(
        long,
        env = "ORDER_PIPELINE_SHIPPING_COUNTRIES",
        value_delimiter = ',',
        default_values = ["US", "CA", "GB", "DE", "FR"]
    )]
    pub shipping_countries: Vec<String>,

    /// Attempts per external call, counting the first
    #[arg(long, env = "ORDER_PIPELINE_RETRY_ATTEMPTS", default_value_t = 3)]
    pub retry_attempts: u32,
}

impl AppConfig {
    pub fn effect_timeout(&self) -> Duration {
        Duration::from_millis(self.effect_timeout_ms)
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "port".to_string(),
                value: "0".to_string(),
                reason: "must be between 1 and 65535".to_string(),
            });
        }

        if self.stages.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "stages".to_string(),
            });
        }

        if self.effect_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "effect_timeout_ms".to_string(),
                value: "0".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        // The attempt timer has to fire first or the breaker never hears of it
        if self.attempt_timeout_ms == 0 || self.attempt_timeout_ms >= self.effect_timeout_ms {
            return Err(ConfigError::InvalidValue {
                field: "attempt_timeout_ms".to_string(),
                value: self.attempt_timeout_ms.to_string(),
                reason: format!(
                    "must be greater than zero and below effect_timeout_ms ({})",
                    self.effect_timeout_ms
                ),
            });
        }

        if self.payment_limit <= Decimal::ZERO {
            return Err(ConfigError::InvalidValue {
                field: "payment_limit".to_string(),
                value: self.payment_limit.to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        if self.retry_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "retry_attempts".to_string(),
                value: "0".to_string(),
                reason: "at least one attempt is required".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> AppConfig {
        AppConfig::try_parse_from(std::iter::once("order_pipeline").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = parse(&[]);

        assert_eq!(config.port, 8080);
        assert_eq!(config.stages, StageKind::default_chain());
        assert_eq!(config.effect_timeout(), Duration::from_millis(2000));
        assert_eq!(config.attempt_timeout(), Duration::from_millis(1000));
        assert_eq!(config.payment_limit, Decimal::from(5000));
        assert_eq!(config.shipping_countries.len(), 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_stage_list_is_comma_separated() {
        let config = parse(&["--stages", "validation,shipping"]);
        assert_eq!(config.stages, vec![StageKind::Validation, StageKind::Shipping]);
    }

    #[test]
    fn test_unknown_stage_is_rejected() {
        let result = AppConfig::try_parse_from(["order_pipeline", "--stages", "validation,fraud"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_port_fails_validation() {
        let config = parse(&["--port", "0"]);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "port"
        ));
    }

    #[test]
    fn test_zero_timeout_fails_validation() {
        let config = parse(&["--effect-timeout-ms", "0"]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_attempt_timeout_must_undercut_effect_timeout() {
        let config = parse(&["--effect-timeout-ms", "500", "--attempt-timeout-ms", "500"]);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "attempt_timeout_ms"
        ));

        let config = parse(&["--effect-timeout-ms", "500", "--attempt-timeout-ms", "200"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_stage_list_fails_validation() {
        let mut config = parse(&[]);
        config.stages.clear();
        assert_eq!(
            config.validate(),
            Err(ConfigError::MissingRequired {
                field: "stages".to_string()
            })
        );
    }
}
