use std::collections::HashMap;

use log::debug;

use crate::model::ControlId;

use super::protocol::{ScoreStats, ScoreSubmission};

pub const DEFAULT_MAX_COMBO_FACTOR: u32 = 8;

/// Snapshot of the player's score against the fetched aggregates.
#[derive(Debug, Clone, PartialEq)]
pub struct Standing {
    pub score: u64,
    pub combo_factor: u32,
    /// High score to display: the player's own once it is beaten.
    pub high_score: i64,
    pub high_score_holder: Option<String>,
    pub beating_high_score: bool,
    pub average_score: i64,
    pub over_average: bool,
    pub most_failed: Option<ControlId>,
}

/// Score accumulation with a doubling combo multiplier.
#[derive(Debug, Clone)]
pub struct ComboLedger {
    score: u64,
    combo_factor: u32,
    max_combo_factor: u32,
    scoring: HashMap<ControlId, u32>,
    nickname: Option<String>,
    stats: Option<ScoreStats>,
}

impl ComboLedger {
    pub fn new(scoring: HashMap<ControlId, u32>, max_combo_factor: u32) -> Self {
        Self {
            score: 0,
            combo_factor: 1,
            max_combo_factor: max_combo_factor.max(1),
            scoring,
            nickname: None,
            stats: None,
        }
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn combo_factor(&self) -> u32 {
        self.combo_factor
    }

    pub fn max_combo_factor(&self) -> u32 {
        self.max_combo_factor
    }

    pub fn nickname(&self) -> Option<&str> {
        self.nickname.as_deref()
    }

    pub fn set_nickname(&mut self, nickname: impl Into<String>) {
        self.nickname = Some(nickname.into());
    }

    pub fn stats(&self) -> Option<&ScoreStats> {
        self.stats.as_ref()
    }

    /// Credit a hit. Returns the points added.
    pub fn success(&mut self, id: ControlId) -> u64 {
        let Some(&points) = self.scoring.get(&id) else {
            return 0;
        };
        let gained = u64::from(points) * u64::from(self.combo_factor);
        self.score += gained;
        debug!("+{} for {} (x{}), score {}", gained, id, self.combo_factor, self.score);
        gained
    }

    /// Close the run. Returns the report for the score sink, then resets.
    pub fn cancel(&mut self, id: ControlId) -> ScoreSubmission {
        let submission = ScoreSubmission {
            final_score: self.score,
            failed_at: id,
            nickname: self.nickname.clone(),
        };
        self.score = 0;
        self.combo_factor = 1;
        submission
    }

    /// Double the multiplier after a full pass, up to the cap.
    pub fn increase_combo(&mut self) -> u32 {
        self.combo_factor = self
            .combo_factor
            .saturating_mul(2)
            .min(self.max_combo_factor);
        self.combo_factor
    }

    pub fn apply_stats(&mut self, stats: ScoreStats) {
        self.stats = Some(stats);
    }

    pub fn standing(&self) -> Standing {
        let score = self.score as i64;
        match &self.stats {
            Some(stats) => {
                let high = stats.high_score_floor();
                let average = stats.average_score_floor();
                let beating = score > high;
                Standing {
                    score: self.score,
                    combo_factor: self.combo_factor,
                    high_score: if beating { score } else { high },
                    high_score_holder: if beating {
                        self.nickname.clone()
                    } else {
                        stats.high_score_holder.clone().filter(|h| !h.is_empty())
                    },
                    beating_high_score: beating,
                    average_score: average,
                    over_average: score > average,
                    most_failed: stats.most_failed_control(),
                }
            }
            None => Standing {
                score: self.score,
                combo_factor: self.combo_factor,
                high_score: score,
                high_score_holder: None,
                beating_high_score: false,
                average_score: 0,
                over_average: false,
                most_failed: None,
            },
        }
    }
}

impl Default for ComboLedger {
    fn default() -> Self {
        Self::new(HashMap::new(), DEFAULT_MAX_COMBO_FACTOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: ControlId = ControlId(1);
    const B: ControlId = ControlId(2);

    fn ledger() -> ComboLedger {
        ComboLedger::new(HashMap::from([(A, 10), (B, 5)]), DEFAULT_MAX_COMBO_FACTOR)
    }

    fn stats(high: f64, average: f64) -> ScoreStats {
        ScoreStats {
            high_score: high,
            average_score: average,
            most_failed: 2,
            high_score_holder: Some("marie".to_string()),
        }
    }

    #[test]
    fn success_multiplies_by_combo() {
        let mut ledger = ledger();
        ledger.increase_combo();
        assert_eq!(ledger.success(A), 20);
        assert_eq!(ledger.score(), 20);
    }

    #[test]
    fn unscored_control_adds_nothing() {
        let mut ledger = ledger();
        assert_eq!(ledger.success(ControlId(9)), 0);
        assert_eq!(ledger.score(), 0);
    }

    #[test]
    fn cancel_reports_then_resets() {
        let mut ledger = ledger();
        ledger.set_nickname("pierre");
        ledger.increase_combo();
        ledger.success(A);
        ledger.success(B);
        let report = ledger.cancel(B);
        assert_eq!(report.final_score, 30);
        assert_eq!(report.failed_at, B);
        assert_eq!(report.nickname.as_deref(), Some("pierre"));
        assert_eq!(ledger.score(), 0);
        assert_eq!(ledger.combo_factor(), 1);
    }

    #[test]
    fn combo_caps() {
        let mut ledger = ledger();
        let factors: Vec<u32> = (0..5).map(|_| ledger.increase_combo()).collect();
        assert_eq!(factors, vec![2, 4, 8, 8, 8]);
    }

    #[test]
    fn standing_without_stats() {
        let mut ledger = ledger();
        ledger.success(A);
        let standing = ledger.standing();
        assert_eq!(standing.score, 10);
        assert!(!standing.beating_high_score);
        assert!(!standing.over_average);
    }

    #[test]
    fn standing_beating_high_score() {
        let mut ledger = ledger();
        ledger.set_nickname("pierre");
        ledger.apply_stats(stats(15.0, 7.9));
        ledger.success(A);
        let standing = ledger.standing();
        assert!(!standing.beating_high_score);
        assert_eq!(standing.high_score, 15);
        assert_eq!(standing.high_score_holder.as_deref(), Some("marie"));
        assert!(standing.over_average);
        assert_eq!(standing.most_failed, Some(B));

        ledger.success(A);
        let standing = ledger.standing();
        assert!(standing.beating_high_score);
        assert_eq!(standing.high_score, 20);
        assert_eq!(standing.high_score_holder.as_deref(), Some("pierre"));
    }

    #[test]
    fn zero_cap_treated_as_one() {
        let mut ledger = ComboLedger::new(HashMap::new(), 0);
        assert_eq!(ledger.increase_combo(), 1);
    }
}
