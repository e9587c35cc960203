//! Auxiliary performance statistics derived from a cumulative-return series.

use serde::{Deserialize, Serialize};

use super::series::{DataPoint, DataPointSeries};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReturnStats {
    pub final_cumulative_pnl: f64,
    pub max_drawdown: f64,
    pub max_drawdown_duration: usize,
    pub volatility: f64,
    pub sharpe_ratio: f64,
    pub best_return: f64,
    pub worst_return: f64,
    pub observations: usize,
}

impl ReturnStats {
    /// Statistics over the finite points of `returns`. `None` if there are none.
    ///
    /// Step returns are measured between consecutive observations, which are
    /// decision dates rather than calendar days, so the Sharpe ratio is left
    /// unannualized.
    pub fn compute(returns: &DataPointSeries) -> Option<Self> {
        let points: Vec<DataPoint> = returns
            .points()
            .iter()
            .copied()
            .filter(|p| p.value.is_finite())
            .collect();
        let last = points.last()?;

        let wealth: Vec<f64> = points.iter().map(|p| 1.0 + p.value).collect();
        let (max_drawdown, max_drawdown_duration) = compute_drawdown(&wealth);
        let step_returns = step_returns(&wealth);
        let (volatility, sharpe_ratio) = compute_risk_adjusted(&step_returns);

        let best_return = points.iter().map(|p| p.value).fold(f64::NEG_INFINITY, f64::max);
        let worst_return = points.iter().map(|p| p.value).fold(f64::INFINITY, f64::min);

        Some(ReturnStats {
            final_cumulative_pnl: last.value,
            max_drawdown,
            max_drawdown_duration,
            volatility,
            sharpe_ratio,
            best_return,
            worst_return,
            observations: points.len(),
        })
    }
}

fn compute_drawdown(wealth: &[f64]) -> (f64, usize) {
    let Some(&first) = wealth.first() else {
        return (0.0, 0);
    };

    let mut peak = first;
    let mut max_dd = 0.0_f64;
    let mut max_dd_duration = 0usize;
    let mut current_dd_duration = 0usize;

    for &w in wealth {
        if w > peak {
            peak = w;
            current_dd_duration = 0;
        } else if peak > 0.0 && w < peak {
            let dd = (peak - w) / peak;
            if dd > max_dd {
                max_dd = dd;
            }
            current_dd_duration += 1;
            if current_dd_duration > max_dd_duration {
                max_dd_duration = current_dd_duration;
            }
        }
    }

    (max_dd, max_dd_duration)
}

fn step_returns(wealth: &[f64]) -> Vec<f64> {
    wealth
        .windows(2)
        .map(|w| if w[0] > 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect()
}

fn compute_risk_adjusted(returns: &[f64]) -> (f64, f64) {
    if returns.is_empty() {
        return (0.0, 0.0);
    }

    let n = returns.len() as f64;
    let mean: f64 = returns.iter().sum::<f64>() / n;
    let variance: f64 = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();

    let sharpe = if stddev > 0.0 { mean / stddev } else { 0.0 };
    (stddev, sharpe)
}
