use serde::{Deserialize, Serialize};

/// A synthetic persona brought to the coach
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub id: String,
    pub name: String,
    /// Who the persona is, in a few sentences
    pub persona: String,
    #[serde(default)]
    pub constraints: Vec<String>,
    #[serde(default)]
    pub goals: Vec<String>,
    #[serde(default)]
    pub conflicts: Vec<String>,
    /// Things the persona never says or agrees to
    #[serde(default)]
    pub red_lines: Vec<String>,
    /// Opening user turn of the discovery phase
    #[serde(default)]
    pub starter_context: String,
    /// Question brought to the decision consultation
    #[serde(default)]
    pub decision: Option<String>,
}

impl Scenario {
    /// Decision question, with a generic fallback when the scenario has none
    pub fn decision_question(&self) -> &str {
        self.decision
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or("I have a choice coming up and want to check it against what we found.")
    }
}
