use serde::{Deserialize, Serialize};

/// Lowest and highest score a metric can take
pub const SCORE_MIN: f64 = 0.0;
pub const SCORE_MAX: f64 = 10.0;
/// Score used when the judge gives nothing usable
pub const SCORE_MIDPOINT: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Clarity,
    StructuralCorrectness,
    Consistency,
    Coverage,
    Hallucination,
    DecisionExpertise,
    Safety,
}

impl Metric {
    pub const ALL: [Metric; 7] = [
        Metric::Clarity,
        Metric::StructuralCorrectness,
        Metric::Consistency,
        Metric::Coverage,
        Metric::Hallucination,
        Metric::DecisionExpertise,
        Metric::Safety,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Clarity => "clarity",
            Metric::StructuralCorrectness => "structural_correctness",
            Metric::Consistency => "consistency",
            Metric::Coverage => "coverage",
            Metric::Hallucination => "hallucination",
            Metric::DecisionExpertise => "decision_expertise",
            Metric::Safety => "safety",
        }
    }

    /// Keys accepted for this metric in judge output
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Metric::Clarity => &["clarity"],
            Metric::StructuralCorrectness => &[
                "structural_correctness",
                "structuralCorrectness",
                "structure",
                "structural",
            ],
            Metric::Consistency => &["consistency"],
            Metric::Coverage => &["coverage"],
            Metric::Hallucination => &["hallucination", "hallucinations"],
            Metric::DecisionExpertise => &[
                "decision_expertise",
                "decisionExpertise",
                "expertise",
            ],
            Metric::Safety => &["safety"],
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricScore {
    pub score: f64,
    #[serde(default)]
    pub justification: String,
    #[serde(default)]
    pub evidence: Vec<String>,
}

impl MetricScore {
    pub fn new(score: f64) -> Self {
        Self {
            score,
            ..Self::default()
        }
    }
}

/// One score per metric
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricScores {
    pub clarity: MetricScore,
    pub structural_correctness: MetricScore,
    pub consistency: MetricScore,
    pub coverage: MetricScore,
    pub hallucination: MetricScore,
    pub decision_expertise: MetricScore,
    pub safety: MetricScore,
}

impl MetricScores {
    pub fn get(&self, metric: Metric) -> &MetricScore {
        match metric {
            Metric::Clarity => &self.clarity,
            Metric::StructuralCorrectness => &self.structural_correctness,
            Metric::Consistency => &self.consistency,
            Metric::Coverage => &self.coverage,
            Metric::Hallucination => &self.hallucination,
            Metric::DecisionExpertise => &self.decision_expertise,
            Metric::Safety => &self.safety,
        }
    }

    pub fn get_mut(&mut self, metric: Metric) -> &mut MetricScore {
        match metric {
            Metric::Clarity => &mut self.clarity,
            Metric::StructuralCorrectness => &mut self.structural_correctness,
            Metric::Consistency => &mut self.consistency,
            Metric::Coverage => &mut self.coverage,
            Metric::Hallucination => &mut self.hallucination,
            Metric::DecisionExpertise => &mut self.decision_expertise,
            Metric::Safety => &mut self.safety,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Metric, &MetricScore)> {
        Metric::ALL.into_iter().map(move |m| (m, self.get(m)))
    }
}

/// The judge's atomic-claim accounting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtomicClaims {
    /// Single-fact statements the user made in the transcript
    pub user_stated: u32,
    /// Of those, how many the profiles captured
    pub captured: u32,
    /// Profile claims with no support in the transcript
    pub unsupported: u32,
}

impl AtomicClaims {
    /// Share of user-stated claims captured, if any were stated
    pub fn coverage_ratio(&self) -> Option<f64> {
        (self.user_stated > 0).then(|| self.captured.min(self.user_stated) as f64 / self.user_stated as f64)
    }

    /// Share of profile claims that are unsupported
    pub fn hallucination_ratio(&self) -> Option<f64> {
        let profile_claims = self.captured + self.unsupported;
        (profile_claims > 0).then(|| self.unsupported as f64 / profile_claims as f64)
    }
}

/// A pinpointed problem in the transcript
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub quote: String,
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub fix: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JudgeReport {
    pub metrics: MetricScores,
    /// Weighted mean of the metric scores
    pub overall_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub atomic_claims: Option<AtomicClaims>,
    #[serde(default)]
    pub general_comments: Vec<String>,
    #[serde(default)]
    pub pros: Vec<String>,
    #[serde(default)]
    pub cons: Vec<String>,
    #[serde(default)]
    pub issues: Vec<Issue>,
    /// The judge output could not be parsed at all
    #[serde(default)]
    pub parse_failed: bool,
}

impl JudgeReport {
    /// All-zero report standing in for unparseable judge output
    pub fn parse_failure(reason: impl std::fmt::Display) -> Self {
        Self {
            general_comments: vec![format!("Judge response could not be parsed: {}", reason)],
            parse_failed: true,
            ..Self::default()
        }
    }
}
