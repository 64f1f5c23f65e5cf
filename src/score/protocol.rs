use serde::{Deserialize, Serialize};

use crate::model::ControlId;

/// Report posted when a run fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSubmission {
    pub final_score: u64,
    pub failed_at: ControlId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
}

/// Aggregates served by the score endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreStats {
    pub high_score: f64,
    pub average_score: f64,
    /// Control failed most often, or -1 when nobody failed yet.
    pub most_failed: i64,
    #[serde(default)]
    pub high_score_holder: Option<String>,
}

impl ScoreStats {
    pub fn high_score_floor(&self) -> i64 {
        self.high_score.floor() as i64
    }

    pub fn average_score_floor(&self) -> i64 {
        self.average_score.floor() as i64
    }

    pub fn most_failed_control(&self) -> Option<ControlId> {
        u32::try_from(self.most_failed).ok().map(ControlId)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submission_json_shape() {
        let submission = ScoreSubmission {
            final_score: 120,
            failed_at: ControlId(3),
            nickname: Some("pierre".to_string()),
        };
        let value = serde_json::to_value(&submission).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"final_score": 120, "failed_at": 3, "nickname": "pierre"})
        );
    }

    #[test]
    fn anonymous_submission_omits_nickname() {
        let submission = ScoreSubmission {
            final_score: 0,
            failed_at: ControlId(1),
            nickname: None,
        };
        let json = serde_json::to_string(&submission).unwrap();
        assert!(!json.contains("nickname"));
    }

    #[test]
    fn stats_from_server_json() {
        let json = r#"{"high_score": 340, "average_score": 87.6, "most_failed": 4}"#;
        let stats: ScoreStats = serde_json::from_str(json).unwrap();
        assert_eq!(stats.high_score_floor(), 340);
        assert_eq!(stats.average_score_floor(), 87);
        assert_eq!(stats.most_failed_control(), Some(ControlId(4)));
        assert_eq!(stats.high_score_holder, None);
    }

    #[test]
    fn no_failures_yet() {
        let json = r#"{"high_score": 0, "average_score": 0, "most_failed": -1, "high_score_holder": ""}"#;
        let stats: ScoreStats = serde_json::from_str(json).unwrap();
        assert_eq!(stats.most_failed_control(), None);
    }
}
