//! Decision source port trait.

use crate::domain::decision::ModelInvestmentDecisions;
use crate::domain::error::BetbenchError;

pub trait DecisionPort {
    /// Every decision record the source holds, unvalidated.
    fn load_decisions(&self) -> Result<Vec<ModelInvestmentDecisions>, BetbenchError>;
}
