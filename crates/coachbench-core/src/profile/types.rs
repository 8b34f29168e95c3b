use serde::{Deserialize, Serialize};

use crate::text::{dedupe_case_insensitive, distinct_count};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryProfile {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub patterns: Vec<String>,
    /// Single-sentence purpose statement
    #[serde(default)]
    pub purpose_statement: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub loves: Vec<String>,
    #[serde(default)]
    pub good_at: Vec<String>,
}

impl DiscoveryProfile {
    pub fn is_empty(&self) -> bool {
        self.summary.is_empty()
            && self.patterns.is_empty()
            && self.purpose_statement.is_empty()
            && self.explanation.is_empty()
            && self.loves.is_empty()
            && self.good_at.is_empty()
    }

    /// Items this profile can contribute to a bucket, if any
    pub fn items_for(&self, kind: BucketKind) -> &[String] {
        match kind {
            BucketKind::Love => &self.loves,
            BucketKind::GoodAt => &self.good_at,
            BucketKind::WorldNeeds | BucketKind::PaidFor => &[],
        }
    }
}

/// The four buckets, in build order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BucketKind {
    Love,
    GoodAt,
    WorldNeeds,
    PaidFor,
}

impl BucketKind {
    pub const ALL: [BucketKind; 4] = [
        BucketKind::Love,
        BucketKind::GoodAt,
        BucketKind::WorldNeeds,
        BucketKind::PaidFor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BucketKind::Love => "love",
            BucketKind::GoodAt => "good_at",
            BucketKind::WorldNeeds => "world_needs",
            BucketKind::PaidFor => "paid_for",
        }
    }

    /// Topic phrase used in prompts
    pub fn topic(&self) -> &'static str {
        match self {
            BucketKind::Love => "what you love doing",
            BucketKind::GoodAt => "what you are good at",
            BucketKind::WorldNeeds => "what the world needs from you",
            BucketKind::PaidFor => "what you could be paid for",
        }
    }

    /// Whether the discovery profile can auto-fill this bucket
    pub fn auto_fillable(&self) -> bool {
        matches!(self, BucketKind::Love | BucketKind::GoodAt)
    }
}

/// How a bucket got its items
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketSource {
    #[default]
    Pending,
    Dialogue,
    AutoFill,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    #[serde(default)]
    pub bullets: Vec<String>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub source: BucketSource,
    /// User answers collected by the bucket sub-dialogue
    #[serde(default)]
    pub answers: u32,
    /// The sub-dialogue stopped at the exchange cap before reaching the minimum
    #[serde(default)]
    pub cap_hit: bool,
    #[serde(default)]
    pub complete: bool,
}

impl Bucket {
    pub fn new(bullets: Vec<String>, summary: impl Into<String>) -> Self {
        Self {
            bullets: dedupe_case_insensitive(bullets),
            summary: summary.into(),
            ..Self::default()
        }
    }

    pub fn distinct_items(&self) -> usize {
        distinct_count(&self.bullets)
    }

    /// Mark complete when the bucket holds at least `min_items` distinct items
    pub fn finalize(&mut self, min_items: usize) {
        self.bullets = dedupe_case_insensitive(std::mem::take(&mut self.bullets));
        self.complete = self.bullets.len() >= min_items;
    }
}

/// A derived combination of two buckets
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverlapArea {
    #[serde(default)]
    pub bullets: Vec<String>,
    #[serde(default)]
    pub summary: String,
}

impl OverlapArea {
    pub fn is_empty(&self) -> bool {
        self.bullets.is_empty() && self.summary.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapKind {
    /// love + good at
    Passion,
    /// love + world needs
    Mission,
    /// good at + paid for
    Profession,
    /// world needs + paid for
    Vocation,
}

impl OverlapKind {
    pub const ALL: [OverlapKind; 4] = [
        OverlapKind::Passion,
        OverlapKind::Mission,
        OverlapKind::Profession,
        OverlapKind::Vocation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OverlapKind::Passion => "passion",
            OverlapKind::Mission => "mission",
            OverlapKind::Profession => "profession",
            OverlapKind::Vocation => "vocation",
        }
    }

    pub fn pair(&self) -> (BucketKind, BucketKind) {
        match self {
            OverlapKind::Passion => (BucketKind::Love, BucketKind::GoodAt),
            OverlapKind::Mission => (BucketKind::Love, BucketKind::WorldNeeds),
            OverlapKind::Profession => (BucketKind::GoodAt, BucketKind::PaidFor),
            OverlapKind::Vocation => (BucketKind::WorldNeeds, BucketKind::PaidFor),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Overlaps {
    #[serde(default)]
    pub passion: OverlapArea,
    #[serde(default)]
    pub mission: OverlapArea,
    #[serde(default)]
    pub profession: OverlapArea,
    #[serde(default)]
    pub vocation: OverlapArea,
}

impl Overlaps {
    pub fn get(&self, kind: OverlapKind) -> &OverlapArea {
        match kind {
            OverlapKind::Passion => &self.passion,
            OverlapKind::Mission => &self.mission,
            OverlapKind::Profession => &self.profession,
            OverlapKind::Vocation => &self.vocation,
        }
    }

    pub fn get_mut(&mut self, kind: OverlapKind) -> &mut OverlapArea {
        match kind {
            OverlapKind::Passion => &mut self.passion,
            OverlapKind::Mission => &mut self.mission,
            OverlapKind::Profession => &mut self.profession,
            OverlapKind::Vocation => &mut self.vocation,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketProfile {
    #[serde(default)]
    pub love: Bucket,
    #[serde(default)]
    pub good_at: Bucket,
    #[serde(default)]
    pub world_needs: Bucket,
    #[serde(default)]
    pub paid_for: Bucket,
    #[serde(default)]
    pub overlaps: Overlaps,
}

impl BucketProfile {
    pub fn get(&self, kind: BucketKind) -> &Bucket {
        match kind {
            BucketKind::Love => &self.love,
            BucketKind::GoodAt => &self.good_at,
            BucketKind::WorldNeeds => &self.world_needs,
            BucketKind::PaidFor => &self.paid_for,
        }
    }

    pub fn get_mut(&mut self, kind: BucketKind) -> &mut Bucket {
        match kind {
            BucketKind::Love => &mut self.love,
            BucketKind::GoodAt => &mut self.good_at,
            BucketKind::WorldNeeds => &mut self.world_needs,
            BucketKind::PaidFor => &mut self.paid_for,
        }
    }

    pub fn all_complete(&self) -> bool {
        BucketKind::ALL.iter().all(|k| self.get(*k).complete)
    }

    /// Compact text form used as context for later prompts
    pub fn render(&self) -> String {
        let mut out = String::new();
        for kind in BucketKind::ALL {
            let bucket = self.get(kind);
            out.push_str(&format!("## {}\n", kind.topic()));
            for bullet in &bucket.bullets {
                out.push_str(&format!("- {}\n", bullet));
            }
            if !bucket.summary.is_empty() {
                out.push_str(&format!("Summary: {}\n", bucket.summary));
            }
            out.push('\n');
        }
        for kind in OverlapKind::ALL {
            let area = self.overlaps.get(kind);
            if area.is_empty() {
                continue;
            }
            out.push_str(&format!("## {}\n", kind.as_str()));
            for bullet in &area.bullets {
                out.push_str(&format!("- {}\n", bullet));
            }
            if !area.summary.is_empty() {
                out.push_str(&format!("Summary: {}\n", area.summary));
            }
            out.push('\n');
        }
        out.trim_end().to_string()
    }
}
