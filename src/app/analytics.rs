use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MemberMetrics {
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) instrument: String,
    #[serde(default)]
    pub(crate) competence: f64,
    #[serde(default)]
    pub(crate) commitment: f64,
    #[serde(default)]
    pub(crate) spiritual_maturity: f64,
    #[serde(default)]
    pub(crate) consistency: f64,
    #[serde(default)]
    pub(crate) trainability: f64,
    #[serde(default)]
    pub(crate) responsiveness_to_feedback: f64,
}

impl MemberMetrics {
    pub(crate) fn metrics(&self) -> [(&'static str, f64); 6] {
        [
            ("Competence", self.competence),
            ("Commitment", self.commitment),
            ("Spiritual Maturity", self.spiritual_maturity),
            ("Consistency", self.consistency),
            ("Trainability", self.trainability),
            ("Responsiveness to Feedback", self.responsiveness_to_feedback),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScoreBand {
    Excellent,
    Good,
    Fair,
    Low,
}

impl ScoreBand {
    pub(crate) fn label(self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Fair => "fair",
            Self::Low => "low",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct TeamStats {
    pub(crate) average_score: f64,
    pub(crate) total_members: usize,
}

/// Scores are shown with one decimal, so they are rounded the same way
/// before being compared or averaged.
fn round_one(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub(crate) fn overall_score(member: &MemberMetrics) -> f64 {
    let metrics = member.metrics();
    let sum: f64 = metrics.iter().map(|(_, score)| score).sum();
    round_one(sum / metrics.len() as f64)
}

pub(crate) fn score_band(score: f64) -> ScoreBand {
    if score >= 4.5 {
        ScoreBand::Excellent
    } else if score >= 4.0 {
        ScoreBand::Good
    } else if score >= 3.5 {
        ScoreBand::Fair
    } else {
        ScoreBand::Low
    }
}

pub(crate) fn team_stats(members: &[MemberMetrics]) -> Option<TeamStats> {
    if members.is_empty() {
        return None;
    }
    let sum: f64 = members.iter().map(overall_score).sum();
    Some(TeamStats {
        average_score: round_one(sum / members.len() as f64),
        total_members: members.len(),
    })
}

/// Shown while the analytics endpoint is unreachable and nothing is cached.
pub(crate) fn placeholder_members() -> Vec<MemberMetrics> {
    let member = |name: &str, instrument: &str, scores: [f64; 6]| MemberMetrics {
        name: name.to_string(),
        instrument: instrument.to_string(),
        competence: scores[0],
        commitment: scores[1],
        spiritual_maturity: scores[2],
        consistency: scores[3],
        trainability: scores[4],
        responsiveness_to_feedback: scores[5],
    };
    vec![
        member("John Smith", "Guitar", [4.5, 4.8, 4.2, 4.6, 4.7, 4.9]),
        member("Sarah Johnson", "Vocals", [4.8, 4.9, 4.7, 4.8, 4.6, 4.8]),
        member("Mike Wilson", "Drums", [4.2, 4.1, 3.9, 4.0, 4.3, 4.2]),
        member("Emily Davis", "Piano", [4.7, 4.6, 4.8, 4.5, 4.4, 4.7]),
        member("David Brown", "Bass", [4.1, 4.3, 4.1, 3.9, 4.5, 4.4]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overall_score_is_rounded_mean() {
        let members = placeholder_members();
        assert_eq!(overall_score(&members[0]), 4.6);
        assert_eq!(overall_score(&members[2]), 4.1);
    }

    #[test]
    fn team_stats_average_the_rounded_scores() {
        let stats = team_stats(&placeholder_members()).expect("team is not empty");
        assert_eq!(stats.total_members, 5);
        // 4.6 + 4.8 + 4.1 + 4.6 + 4.2 = 22.3
        assert_eq!(stats.average_score, 4.5);
        assert!(team_stats(&[]).is_none());
    }

    #[test]
    fn score_bands_follow_thresholds() {
        assert_eq!(score_band(4.5), ScoreBand::Excellent);
        assert_eq!(score_band(4.49), ScoreBand::Good);
        assert_eq!(score_band(3.5), ScoreBand::Fair);
        assert_eq!(score_band(3.4), ScoreBand::Low);
    }

    #[test]
    fn missing_metrics_default_to_zero() {
        let member: MemberMetrics =
            serde_json::from_str(r#"{"name":"New Member","competence":5}"#).expect("parse");
        assert_eq!(member.commitment, 0.0);
        assert_eq!(overall_score(&member), 0.8);
    }
}
