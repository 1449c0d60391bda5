use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;
use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// One parsed survey row: the shared header list plus this row's values in
/// header order. Rows that came up short keep their missing trailing columns
/// implicit, `get` reads them as the empty string.
#[derive(Debug, Clone)]
pub struct RawRow {
    headers: Arc<[String]>,
    values: Vec<String>,
}

impl RawRow {
    pub fn new(headers: Arc<[String]>, values: Vec<String>) -> Self {
        Self { headers, values }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Cell value for a column, `""` when the column is unknown or the row
    /// has no value at that position.
    pub fn get(&self, column: &str) -> &str {
        self.headers
            .iter()
            .position(|h| h == column)
            .and_then(|idx| self.values.get(idx))
            .map(String::as_str)
            .unwrap_or("")
    }
}

impl Serialize for RawRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.headers.len()))?;
        for (idx, header) in self.headers.iter().enumerate() {
            let value = self.values.get(idx).map(String::as_str).unwrap_or("");
            map.serialize_entry(header, value)?;
        }
        map.end()
    }
}

/// The four recognized interest responses, highest to lowest. Anything else
/// in a survey cell is treated as absent and excluded from tallies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum InterestLevel {
    #[serde(rename = "strong")]
    StrongInterest,
    #[serde(rename = "reasonable")]
    ReasonableInterest,
    #[serde(rename = "vague")]
    VagueInterest,
    #[serde(rename = "nothing_heard")]
    NothingHeard,
}

impl InterestLevel {
    pub const ALL: [InterestLevel; 4] = [
        InterestLevel::StrongInterest,
        InterestLevel::ReasonableInterest,
        InterestLevel::VagueInterest,
        InterestLevel::NothingHeard,
    ];

    /// Maps a raw survey cell to a level. The literals are the exact Dutch
    /// answer options of the survey export.
    pub fn from_response(raw: &str) -> Option<Self> {
        match raw {
            "Sterke, concrete interesse" => Some(InterestLevel::StrongInterest),
            "Redelijke interesse" => Some(InterestLevel::ReasonableInterest),
            "Vage interesse" => Some(InterestLevel::VagueInterest),
            "Niets over gehoord" => Some(InterestLevel::NothingHeard),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            InterestLevel::StrongInterest => "Sterke, concrete interesse",
            InterestLevel::ReasonableInterest => "Redelijke interesse",
            InterestLevel::VagueInterest => "Vage interesse",
            InterestLevel::NothingHeard => "Niets over gehoord",
        }
    }

    /// Scoring weight used for the weighted average per topic.
    pub fn weight(&self) -> u32 {
        match self {
            InterestLevel::StrongInterest => 3,
            InterestLevel::ReasonableInterest => 2,
            InterestLevel::VagueInterest => 1,
            InterestLevel::NothingHeard => 0,
        }
    }
}

impl FromStr for InterestLevel {
    type Err = ();

    /// Accepts either the survey literal or the short name used in query
    /// parameters and JSON output.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(level) = InterestLevel::from_response(s) {
            return Ok(level);
        }
        match s {
            "strong" => Ok(InterestLevel::StrongInterest),
            "reasonable" => Ok(InterestLevel::ReasonableInterest),
            "vague" => Ok(InterestLevel::VagueInterest),
            "nothing_heard" => Ok(InterestLevel::NothingHeard),
            _ => Err(()),
        }
    }
}

/// Aggregated statistics for one topic column (a challenge, technology or
/// product). Counts always carry all four levels, zero-filled.
#[derive(Debug, Clone, Serialize)]
pub struct TopicStat {
    pub name: String,
    pub interest_counts: BTreeMap<InterestLevel, usize>,
    pub total_responses: usize,
    pub average_interest_score: f64,
    pub companies_with_interest: BTreeMap<InterestLevel, BTreeSet<String>>,
}

impl TopicStat {
    pub fn count(&self, level: InterestLevel) -> usize {
        self.interest_counts.get(&level).copied().unwrap_or(0)
    }
}

/// A free-text answer (new customer themes or emerging tech), attributed to
/// a company and respondent.
#[derive(Debug, Clone, Serialize)]
pub struct FreeTextItem {
    pub company: String,
    pub respondent: String,
    pub text: String,
    pub has_content: bool,
}

/// Earliest start and latest completion over all parseable row timestamps.
/// Both absent when no timestamp in the export parsed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SurveyPeriod {
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

/// The three topic groups of the survey.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TopicGroup {
    #[serde(rename = "challenges")]
    Challenges,
    #[serde(rename = "technologies")]
    Technologies,
    #[serde(rename = "products")]
    Products,
}

impl FromStr for TopicGroup {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "challenges" => Ok(TopicGroup::Challenges),
            "technologies" => Ok(TopicGroup::Technologies),
            "products" => Ok(TopicGroup::Products),
            _ => Err(()),
        }
    }
}

/// Everything the dashboard needs, derived once per load from the raw rows.
/// Downstream filters are read-side projections, never mutations of this
/// value.
#[derive(Debug, Serialize)]
pub struct ProcessedDataset {
    pub raw_data: Vec<RawRow>,
    pub survey_period: SurveyPeriod,
    pub companies: Vec<String>,
    pub total_responses: usize,
    pub challenges: Vec<TopicStat>,
    pub technologies: Vec<TopicStat>,
    pub products: Vec<TopicStat>,
    pub new_customer_themes: Vec<FreeTextItem>,
    pub emerging_tech_vendor_products: Vec<FreeTextItem>,
}

impl ProcessedDataset {
    pub fn topic_group(&self, group: TopicGroup) -> &[TopicStat] {
        match group {
            TopicGroup::Challenges => &self.challenges,
            TopicGroup::Technologies => &self.technologies,
            TopicGroup::Products => &self.products,
        }
    }
}
