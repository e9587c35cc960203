//! Report output port trait.

use crate::domain::error::BetbenchError;
use crate::domain::leaderboard::Leaderboard;

/// Port for publishing a ranked leaderboard.
pub trait ReportPort {
    fn write_leaderboard(
        &self,
        leaderboard: &Leaderboard,
        output_path: &str,
    ) -> Result<(), BetbenchError>;
}
