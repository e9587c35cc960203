//! Configuration validation.
//!
//! Validates all config fields before a simulation runs.

use crate::domain::error::BetbenchError;
use crate::domain::series::DATE_FORMAT;
use crate::domain::strategy::StrategyKind;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub fn validate_simulation_config(config: &dyn ConfigPort) -> Result<(), BetbenchError> {
    validate_initial_cash(config)?;
    validate_allowance(config)?;
    validate_fee(config)?;
    validate_invest_fraction(config)?;
    validate_max_markets(config)?;
    validate_random_seed(config)?;
    validate_dates(config)?;
    parse_baselines(config)?;
    Ok(())
}

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), BetbenchError> {
    require_path(config, "data", "decisions_path")?;
    require_path(config, "data", "prices_dir")?;
    Ok(())
}

fn invalid(key: &str, reason: &str) -> BetbenchError {
    BetbenchError::ConfigInvalid {
        section: "simulation".to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn validate_initial_cash(config: &dyn ConfigPort) -> Result<(), BetbenchError> {
    let value = config.get_double("simulation", "initial_cash", 1.0);
    if !value.is_finite() || value <= 0.0 {
        return Err(invalid("initial_cash", "initial_cash must be positive"));
    }
    Ok(())
}

fn validate_allowance(config: &dyn ConfigPort) -> Result<(), BetbenchError> {
    let value = config.get_double("simulation", "allowance_per_step", 0.0);
    if !value.is_finite() || value < 0.0 {
        return Err(invalid(
            "allowance_per_step",
            "allowance_per_step must be non-negative",
        ));
    }
    Ok(())
}

fn validate_fee(config: &dyn ConfigPort) -> Result<(), BetbenchError> {
    let value = config.get_double("simulation", "fee_pct", 0.0);
    if !value.is_finite() || !(0.0..100.0).contains(&value) {
        return Err(invalid("fee_pct", "fee_pct must be in [0, 100)"));
    }
    Ok(())
}

fn validate_invest_fraction(config: &dyn ConfigPort) -> Result<(), BetbenchError> {
    let value = config.get_double("simulation", "invest_fraction", 1.0);
    if !value.is_finite() || value <= 0.0 || value > 1.0 {
        return Err(invalid(
            "invest_fraction",
            "invest_fraction must be between 0 and 1",
        ));
    }
    Ok(())
}

fn validate_max_markets(config: &dyn ConfigPort) -> Result<(), BetbenchError> {
    if config.get_int("simulation", "max_markets", 5) < 1 {
        return Err(invalid("max_markets", "max_markets must be at least 1"));
    }
    Ok(())
}

fn validate_random_seed(config: &dyn ConfigPort) -> Result<(), BetbenchError> {
    if config.get_int("simulation", "random_seed", 42) < 0 {
        return Err(invalid("random_seed", "random_seed must be non-negative"));
    }
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), BetbenchError> {
    let start_date = parse_optional_date(config, "start_date")?;
    let end_date = parse_optional_date(config, "end_date")?;

    if let (Some(start), Some(end)) = (start_date, end_date) {
        if start > end {
            return Err(invalid("start_date", "start_date must not be after end_date"));
        }
    }
    Ok(())
}

/// An optional `YYYY-MM-DD` key of `[simulation]`; blank counts as absent.
pub fn parse_optional_date(
    config: &dyn ConfigPort,
    field: &str,
) -> Result<Option<NaiveDate>, BetbenchError> {
    match config
        .get_string("simulation", field)
        .filter(|s| !s.trim().is_empty())
    {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
            .map(Some)
            .map_err(|_| {
                invalid(
                    field,
                    &format!("invalid {} format, expected YYYY-MM-DD", field),
                )
            }),
    }
}

/// Comma-separated baseline names from `[simulation] baselines`.
pub fn parse_baselines(config: &dyn ConfigPort) -> Result<Vec<StrategyKind>, BetbenchError> {
    let Some(raw) = config.get_string("simulation", "baselines") else {
        return Ok(Vec::new());
    };
    let mut kinds = Vec::new();
    for token in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let kind: StrategyKind = token.parse().map_err(|e: String| invalid("baselines", &e))?;
        if kind == StrategyKind::Decisions {
            return Err(invalid(
                "baselines",
                "decisions is not a baseline strategy",
            ));
        }
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    Ok(kinds)
}

fn require_path(config: &dyn ConfigPort, section: &str, key: &str) -> Result<(), BetbenchError> {
    match config.get_string(section, key) {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(BetbenchError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }),
    }
}
