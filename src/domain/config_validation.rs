//! Configuration validation.
//!
//! Validates config fields before a backtest or live session starts.

use crate::domain::error::TraderError;
use crate::ports::config_port::ConfigPort;

pub const NOTIFY_BACKENDS: &[&str] = &["log", "pushover"];

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), TraderError> {
    validate_strategy(config)?;
    validate_risk(config)?;
    Ok(())
}

pub fn validate_live_config(config: &dyn ConfigPort) -> Result<(), TraderError> {
    validate_strategy(config)?;
    validate_risk(config)?;
    validate_live(config)?;
    validate_notify(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: &str) -> TraderError {
    TraderError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn validate_strategy(config: &dyn ConfigPort) -> Result<(), TraderError> {
    if config.get_int("strategy", "ma_window", 10) < 2 {
        return Err(invalid("strategy", "ma_window", "ma_window must be at least 2"));
    }
    if config.get_int("strategy", "atr_period", 14) < 1 {
        return Err(invalid("strategy", "atr_period", "atr_period must be at least 1"));
    }
    if config.get_double("strategy", "volatility_threshold", 0.001) <= 0.0 {
        return Err(invalid(
            "strategy",
            "volatility_threshold",
            "volatility_threshold must be positive",
        ));
    }
    Ok(())
}

fn validate_risk(config: &dyn ConfigPort) -> Result<(), TraderError> {
    if config.get_double("risk", "initial_capital", 10_000.0) <= 0.0 {
        return Err(invalid("risk", "initial_capital", "initial_capital must be positive"));
    }
    let fraction = config.get_double("risk", "risk_fraction", 0.01);
    if fraction <= 0.0 || fraction > 1.0 {
        return Err(invalid(
            "risk",
            "risk_fraction",
            "risk_fraction must be in (0, 1]",
        ));
    }
    if config.get_double("risk", "leverage", 100.0) <= 0.0 {
        return Err(invalid("risk", "leverage", "leverage must be positive"));
    }
    Ok(())
}

fn validate_live(config: &dyn ConfigPort) -> Result<(), TraderError> {
    match config.get_string("live", "symbol") {
        Some(s) if !s.trim().is_empty() => {}
        _ => {
            return Err(TraderError::ConfigMissing {
                section: "live".to_string(),
                key: "symbol".to_string(),
            });
        }
    }

    let timeframe = config.get_int("live", "timeframe_minutes", 5);
    if !(1..=60).contains(&timeframe) || 60 % timeframe != 0 {
        return Err(invalid(
            "live",
            "timeframe_minutes",
            "timeframe_minutes must divide 60",
        ));
    }

    let ma_window = config.get_int("strategy", "ma_window", 10);
    if config.get_int("live", "fetch_count", 12) < ma_window + 2 {
        return Err(invalid(
            "live",
            "fetch_count",
            "fetch_count must be at least ma_window + 2",
        ));
    }

    for key in ["stale_limit", "retry_interval_secs", "closure_poll_secs"] {
        if config.get_int("live", key, 1) < 1 {
            return Err(invalid("live", key, "must be at least 1"));
        }
    }
    if config.get_int("live", "closure_lookback_hours", 3) < 0 {
        return Err(invalid(
            "live",
            "closure_lookback_hours",
            "closure_lookback_hours must be non-negative",
        ));
    }
    Ok(())
}

fn validate_notify(config: &dyn ConfigPort) -> Result<(), TraderError> {
    let backend = config
        .get_string("notify", "backend")
        .unwrap_or_else(|| "log".to_string())
        .to_lowercase();
    if !NOTIFY_BACKENDS.contains(&backend.as_str()) {
        return Err(invalid(
            "notify",
            "backend",
            &format!("unknown backend '{}', expected one of {:?}", backend, NOTIFY_BACKENDS),
        ));
    }

    if backend == "pushover" {
        for key in ["user_key", "api_token"] {
            match config.get_string("notify", key) {
                Some(v) if !v.trim().is_empty() => {}
                _ => {
                    return Err(TraderError::ConfigMissing {
                        section: "notify".to_string(),
                        key: key.to_string(),
                    });
                }
            }
        }
    }
    Ok(())
}
