//! Ranking of models by final cumulative PnL.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

use super::decision::ModelInfo;
use super::metrics::ReturnStats;
use super::returns::{Exclusion, ModelReturns};
use super::series::DataPointSeries;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub model_id: String,
    pub model_pretty_name: String,
    pub final_cumulative_pnl: f64,
    pub max_drawdown: f64,
    pub volatility: f64,
    pub sharpe_ratio: f64,
    pub best_return: f64,
    pub worst_return: f64,
    pub observations: usize,
    pub returns: DataPointSeries,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcludedModel {
    pub model_id: String,
    #[serde(flatten)]
    pub reason: Exclusion,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Leaderboard {
    pub entries: Vec<LeaderboardEntry>,
    pub excluded: Vec<ExcludedModel>,
}

impl Leaderboard {
    pub fn entry(&self, model_id: &str) -> Option<&LeaderboardEntry> {
        self.entries.iter().find(|e| e.model_id == model_id)
    }

    pub fn is_excluded(&self, model_id: &str) -> bool {
        self.excluded.iter().any(|e| e.model_id == model_id)
    }
}

/// Rank models by the last finite value of their cumulative-return series.
///
/// Higher PnL ranks first; equal PnL falls back to ascending model id. Models
/// with an empty or all-NaN series are listed under `excluded` as
/// [`Exclusion::EmptySeries`]. Unknown models use their id as pretty name.
pub fn rank(
    returns: &BTreeMap<String, DataPointSeries>,
    infos: &BTreeMap<String, ModelInfo>,
) -> Leaderboard {
    let mut scored: Vec<(&String, ReturnStats, &DataPointSeries)> = Vec::new();
    let mut excluded = Vec::new();

    for (model_id, series) in returns {
        match ReturnStats::compute(series) {
            Some(stats) => scored.push((model_id, stats, series)),
            None => excluded.push(ExcludedModel {
                model_id: model_id.clone(),
                reason: Exclusion::EmptySeries,
            }),
        }
    }

    // + 0.0 folds -0.0 into 0.0 so zero-PnL ties fall through to the id
    scored.sort_by(|a, b| {
        (b.1.final_cumulative_pnl + 0.0)
            .total_cmp(&(a.1.final_cumulative_pnl + 0.0))
            .then_with(|| a.0.cmp(b.0))
    });

    let entries = scored
        .into_iter()
        .enumerate()
        .map(|(i, (model_id, stats, series))| LeaderboardEntry {
            rank: i + 1,
            model_id: model_id.clone(),
            model_pretty_name: infos
                .get(model_id)
                .map(|info| info.pretty_name.clone())
                .unwrap_or_else(|| model_id.clone()),
            final_cumulative_pnl: stats.final_cumulative_pnl,
            max_drawdown: stats.max_drawdown,
            volatility: stats.volatility,
            sharpe_ratio: stats.sharpe_ratio,
            best_return: stats.best_return,
            worst_return: stats.worst_return,
            observations: stats.observations,
            returns: series.clone(),
        })
        .collect();

    Leaderboard { entries, excluded }
}

/// Rank the models in `model_returns`, carrying its exclusions along.
pub fn build_leaderboard(
    model_returns: &ModelReturns,
    infos: &BTreeMap<String, ModelInfo>,
) -> Leaderboard {
    let mut board = rank(&model_returns.returns, infos);
    board
        .excluded
        .extend(model_returns.excluded.iter().map(|(id, reason)| ExcludedModel {
            model_id: id.clone(),
            reason: reason.clone(),
        }));
    board.excluded.sort_by(|a, b| a.model_id.cmp(&b.model_id));
    info!(
        ranked = board.entries.len(),
        excluded = board.excluded.len(),
        "leaderboard built"
    );
    board
}
