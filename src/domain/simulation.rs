//! End-to-end simulation: decision records and price data in, leaderboard out.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use std::collections::BTreeMap;
use tracing::{info, warn};

use super::decision::{ModelInfo, ModelInvestmentDecisions, select_latest_per_target_date};
use super::engine::StrategyEngine;
use super::error::BetbenchError;
use super::execution::ExecutionConfig;
use super::leaderboard::{Leaderboard, build_leaderboard};
use super::market::{MarketSeries, MarketSnapshot, PriceBook};
use super::portfolio::{Portfolio, Snapshot};
use super::returns::{Exclusion, ModelReturns, compute_model_returns};
use super::series::DataPointSeries;
use super::strategy::{
    AnyStrategy, DecisionAllocator, InvestmentStrategy, MarketContext, RandomBaseline,
    StrategyKind, VolumeWeighted,
};

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub initial_cash: f64,
    pub execution: ExecutionConfig,
    /// Inclusive window on `target_date`; `None` leaves that side open.
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub baselines: Vec<StrategyKind>,
    pub random_seed: u64,
    pub invest_fraction: f64,
    pub max_markets: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            initial_cash: 1.0,
            execution: ExecutionConfig::default(),
            start_date: None,
            end_date: None,
            baselines: Vec::new(),
            random_seed: 42,
            invest_fraction: 1.0,
            max_markets: 5,
        }
    }
}

impl SimulationConfig {
    fn in_window(&self, date: NaiveDate) -> bool {
        self.start_date.is_none_or(|s| date >= s) && self.end_date.is_none_or(|e| date <= e)
    }
}

#[derive(Debug, Clone)]
pub struct SimulationResult {
    pub histories: BTreeMap<String, Vec<Snapshot>>,
    pub returns: ModelReturns,
    pub leaderboard: Leaderboard,
}

pub fn baseline_model_id(kind: StrategyKind) -> String {
    format!("baseline-{kind}")
}

fn baseline_pretty_name(kind: StrategyKind) -> &'static str {
    match kind {
        StrategyKind::Decisions => "Recorded decisions",
        StrategyKind::VolumeWeighted => "Volume-weighted baseline",
        StrategyKind::Random => "Random baseline",
    }
}

/// Validate every record, keep those inside the date window and reduce them
/// to the latest record per model and target date.
///
/// The first invalid record fails the whole batch.
pub fn prepare_records(
    records: &[ModelInvestmentDecisions],
    config: &SimulationConfig,
) -> Result<Vec<ModelInvestmentDecisions>, BetbenchError> {
    for record in records {
        record.validate()?;
    }
    let windowed: Vec<ModelInvestmentDecisions> = records
        .iter()
        .filter(|r| config.in_window(r.target_date))
        .cloned()
        .collect();
    Ok(select_latest_per_target_date(&windowed))
}

/// Instant a record's step is committed at: its target date, at the time of
/// day it was decided. Snapshots are therefore valued on the target date.
pub fn step_instant(record: &ModelInvestmentDecisions) -> DateTime<Utc> {
    record
        .target_date
        .and_time(record.decision_datetime.time())
        .and_utc()
}

fn start_of(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Replay one model's records through a [`DecisionAllocator`].
///
/// `records` must belong to one model and be sorted by target date.
pub fn simulate_model(
    records: &[&ModelInvestmentDecisions],
    prices: &PriceBook,
    config: &SimulationConfig,
) -> Result<Vec<Snapshot>, BetbenchError> {
    let Some(first) = records.first() else {
        return Ok(Vec::new());
    };
    let seed = Snapshot::new(step_instant(first), Portfolio::seed(config.initial_cash)?);
    let strategy = DecisionAllocator::with_execution(config.execution.clone());
    let mut engine = StrategyEngine::new(strategy, seed);

    for record in records {
        let context = MarketContext::new(record.target_date, prices)
            .with_decision(record)
            .with_resolutions(prices.resolutions_at(record.target_date));
        engine.run(step_instant(record), &context)?;
    }
    Ok(engine.into_history())
}

/// Markets referenced on each target date, mapped to their event.
pub fn markets_by_date(
    records: &[ModelInvestmentDecisions],
) -> BTreeMap<NaiveDate, BTreeMap<String, String>> {
    let mut by_date: BTreeMap<NaiveDate, BTreeMap<String, String>> = BTreeMap::new();
    for record in records {
        let markets = by_date.entry(record.target_date).or_default();
        for event in &record.event_investment_decisions {
            for market in &event.market_investment_decisions {
                markets
                    .entry(market.market_id.clone())
                    .or_insert_with(|| event.event_id.clone());
            }
        }
    }
    by_date
}

fn market_snapshots(
    date: NaiveDate,
    markets: &BTreeMap<String, String>,
    prices: &PriceBook,
    volumes: &BTreeMap<String, DataPointSeries>,
) -> Vec<MarketSnapshot> {
    markets
        .iter()
        .filter_map(|(market_id, event_id)| {
            let price = prices.price_at(market_id, date).ok()?;
            let volume = volumes
                .get(market_id)
                .and_then(|v| v.value_at_or_before(date))
                .map_or(0.0, |p| p.value);
            Some(MarketSnapshot {
                event_id: event_id.clone(),
                market_id: market_id.clone(),
                price,
                volume,
            })
        })
        .collect()
}

pub fn baseline_strategy(kind: StrategyKind, config: &SimulationConfig) -> Option<AnyStrategy> {
    let execution = config.execution.clone();
    match kind {
        StrategyKind::Decisions => None,
        StrategyKind::VolumeWeighted => Some(AnyStrategy::VolumeWeighted(
            VolumeWeighted::new(config.invest_fraction, config.max_markets)
                .with_execution(execution),
        )),
        StrategyKind::Random => Some(AnyStrategy::Random(
            RandomBaseline::new(config.random_seed, config.invest_fraction)
                .with_execution(execution),
        )),
    }
}

/// Run a baseline strategy over every date on which any model decided,
/// trading the markets the models looked at that day.
pub fn simulate_baseline<S: InvestmentStrategy>(
    strategy: S,
    universe: &BTreeMap<NaiveDate, BTreeMap<String, String>>,
    prices: &PriceBook,
    volumes: &BTreeMap<String, DataPointSeries>,
    config: &SimulationConfig,
) -> Result<Vec<Snapshot>, BetbenchError> {
    let Some(first) = universe.keys().next() else {
        return Ok(Vec::new());
    };
    let seed = Snapshot::new(start_of(*first), Portfolio::seed(config.initial_cash)?);
    let mut engine = StrategyEngine::new(strategy, seed);

    for (date, markets) in universe {
        let context = MarketContext::new(*date, prices)
            .with_markets(market_snapshots(*date, markets, prices, volumes))
            .with_resolutions(prices.resolutions_at(*date));
        engine.run(start_of(*date), &context)?;
    }
    Ok(engine.into_history())
}

/// Simulate every model and configured baseline, then rank them.
///
/// Record validation errors abort the run. A model whose simulation fails
/// is excluded from the leaderboard with the reason; the others still rank.
pub fn run_simulation(
    records: &[ModelInvestmentDecisions],
    market_data: &[MarketSeries],
    config: &SimulationConfig,
) -> Result<SimulationResult, BetbenchError> {
    let records = prepare_records(records, config)?;
    let prices: PriceBook = market_data.iter().cloned().collect();
    let volumes: BTreeMap<String, DataPointSeries> = market_data
        .iter()
        .filter_map(|m| m.volumes.clone().map(|v| (m.market_id.clone(), v)))
        .collect();

    let mut by_model: BTreeMap<&str, Vec<&ModelInvestmentDecisions>> = BTreeMap::new();
    let mut infos: BTreeMap<String, ModelInfo> = BTreeMap::new();
    for record in &records {
        by_model.entry(record.model_id.as_str()).or_default().push(record);
        infos.insert(record.model_id.clone(), record.model_info.clone());
    }

    info!(
        models = by_model.len(),
        records = records.len(),
        markets = prices.len(),
        "starting simulation"
    );

    let mut histories = BTreeMap::new();
    let mut failures = BTreeMap::new();

    for (model_id, model_records) in &by_model {
        match simulate_model(model_records, &prices, config) {
            Ok(history) => {
                histories.insert(model_id.to_string(), history);
            }
            Err(e) => {
                warn!(model = %model_id, error = %e, "simulation failed, model excluded");
                failures.insert(model_id.to_string(), Exclusion::from_error(&e));
            }
        }
    }

    let universe = markets_by_date(&records);
    for kind in &config.baselines {
        let Some(strategy) = baseline_strategy(*kind, config) else {
            continue;
        };
        let model_id = baseline_model_id(*kind);
        infos.insert(
            model_id.clone(),
            ModelInfo::new(model_id.clone(), baseline_pretty_name(*kind)),
        );
        match simulate_baseline(strategy, &universe, &prices, &volumes, config) {
            Ok(history) => {
                histories.insert(model_id, history);
            }
            Err(e) => {
                warn!(model = %model_id, error = %e, "baseline failed, excluded");
                failures.insert(model_id, Exclusion::from_error(&e));
            }
        }
    }

    let mut returns = compute_model_returns(&histories, &prices);
    returns.excluded.extend(failures);
    let leaderboard = build_leaderboard(&returns, &infos);

    Ok(SimulationResult {
        histories,
        returns,
        leaderboard,
    })
}
