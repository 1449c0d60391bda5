use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::models::{
    FreeTextItem, InterestLevel, ProcessedDataset, RawRow, SurveyPeriod, TopicStat,
};

// Column literals of the survey export. Topic columns are recognized by
// prefix; everything else is matched in full.
const COMPANY_COLUMN: &str = "Jouw bedrijf";
const RESPONDENT_COLUMNS: [&str; 2] = ["Jouw naam", "Name"];
const START_TIME_COLUMN: &str = "Start time";
const COMPLETION_TIME_COLUMN: &str = "Completion time";
const CHALLENGES_PREFIX: &str = "Wat zijn uitdagingen en thema's waar je klanten over hoort?";
const TECHNOLOGIES_PREFIX: &str = "TechAndConcepts";
const PRODUCTS_PREFIX: &str = "Wat zijn concrete producten en leveranciers waar je klanten over hoort?";
const NEW_CUSTOMER_THEMES_COLUMN: &str = "newCustomerThemes";
const EMERGING_TECH_COLUMN: &str = "emergingTechVendorProduct";

// Day-month-year with 24h minutes, e.g. "17-03-2025 09:41".
const TIMESTAMP_FORMAT: &str = "%d-%m-%Y %H:%M";

#[derive(Debug, Error)]
#[error("no survey rows to process")]
pub struct EmptyDatasetError;

/// Derives the full dashboard dataset from the parsed rows.
///
/// Malformed timestamps, unrecognized interest values and missing columns
/// are all tolerated by skipping or defaulting. The only hard error is an
/// empty row sequence.
pub fn process(rows: Vec<RawRow>) -> Result<ProcessedDataset, EmptyDatasetError> {
    if rows.is_empty() {
        return Err(EmptyDatasetError);
    }

    let survey_period = survey_period(&rows);
    let companies = unique_companies(&rows);
    let challenges = topic_stats(&rows, CHALLENGES_PREFIX);
    let technologies = topic_stats(&rows, TECHNOLOGIES_PREFIX);
    let products = topic_stats(&rows, PRODUCTS_PREFIX);
    let new_customer_themes = free_text_items(&rows, NEW_CUSTOMER_THEMES_COLUMN);
    let emerging_tech_vendor_products = free_text_items(&rows, EMERGING_TECH_COLUMN);

    let total_responses = rows.len();
    Ok(ProcessedDataset {
        raw_data: rows,
        survey_period,
        companies,
        total_responses,
        challenges,
        technologies,
        products,
        new_customer_themes,
        emerging_tech_vendor_products,
    })
}

/// Earliest parsed `Start time`, latest parsed `Completion time`. Cells that
/// do not parse are skipped, never an error.
fn survey_period(rows: &[RawRow]) -> SurveyPeriod {
    let mut period = SurveyPeriod::default();
    for row in rows {
        if let Some(start) = parse_timestamp(row.get(START_TIME_COLUMN)) {
            period.start = Some(match period.start {
                Some(current) => current.min(start),
                None => start,
            });
        }
        if let Some(end) = parse_timestamp(row.get(COMPLETION_TIME_COLUMN)) {
            period.end = Some(match period.end {
                Some(current) => current.max(end),
                None => end,
            });
        }
    }
    period
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT).ok()
}

/// Company names in order of first appearance, deduplicated, empties out.
fn unique_companies(rows: &[RawRow]) -> Vec<String> {
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    let mut companies = Vec::new();
    for row in rows {
        let company = row.get(COMPANY_COLUMN);
        if !company.is_empty() && seen.insert(company) {
            companies.push(company.to_string());
        }
    }
    companies
}

/// Builds the stats for every column carrying the given topic prefix, sorted
/// by average interest score descending. The sort is stable, ties keep the
/// column order of the export.
fn topic_stats(rows: &[RawRow], prefix: &str) -> Vec<TopicStat> {
    let columns: Vec<&String> = rows[0]
        .headers()
        .iter()
        .filter(|header| header.starts_with(prefix))
        .collect();

    let mut stats: Vec<TopicStat> = columns
        .into_iter()
        .map(|column| tally_topic(rows, column))
        .collect();
    stats.sort_by(|a, b| {
        b.average_interest_score
            .partial_cmp(&a.average_interest_score)
            .unwrap_or(Ordering::Equal)
    });
    stats
}

fn tally_topic(rows: &[RawRow], column: &str) -> TopicStat {
    let mut interest_counts: BTreeMap<InterestLevel, usize> =
        InterestLevel::ALL.iter().map(|level| (*level, 0)).collect();
    let mut companies_with_interest: BTreeMap<InterestLevel, BTreeSet<String>> = BTreeMap::new();

    for row in rows {
        let Some(level) = InterestLevel::from_response(row.get(column)) else {
            continue;
        };
        *interest_counts.entry(level).or_insert(0) += 1;

        let company = row.get(COMPANY_COLUMN);
        if !company.is_empty() {
            companies_with_interest
                .entry(level)
                .or_default()
                .insert(company.to_string());
        }
    }

    TopicStat {
        name: topic_name(column),
        average_interest_score: average_interest_score(&interest_counts),
        interest_counts,
        total_responses: rows.len(),
        companies_with_interest,
    }
}

/// The topic name is the segment between the first and second `.` of the
/// header, falling back to the whole header when there is none.
fn topic_name(column: &str) -> String {
    match column.splitn(3, '.').nth(1) {
        Some(segment) if !segment.is_empty() => segment.to_string(),
        _ => column.to_string(),
    }
}

/// Weighted average over the tallied responses only; 0 when nothing tallied.
fn average_interest_score(counts: &BTreeMap<InterestLevel, usize>) -> f64 {
    let mut weighted_sum = 0u64;
    let mut total = 0u64;
    for (level, count) in counts {
        weighted_sum += level.weight() as u64 * *count as u64;
        total += *count as u64;
    }
    if total > 0 {
        weighted_sum as f64 / total as f64
    } else {
        0.0
    }
}

/// One item per row with answer text in the column, attributed to the row's
/// company and respondent. Rows whose trimmed text is empty are left out.
fn free_text_items(rows: &[RawRow], column: &str) -> Vec<FreeTextItem> {
    rows.iter()
        .filter_map(|row| {
            let text = row.get(column);
            if text.trim().is_empty() {
                return None;
            }
            let company = row.get(COMPANY_COLUMN);
            Some(FreeTextItem {
                company: if company.is_empty() {
                    "Unknown".to_string()
                } else {
                    company.to_string()
                },
                respondent: respondent_name(row),
                text: text.to_string(),
                has_content: true,
            })
        })
        .collect()
}

fn respondent_name(row: &RawRow) -> String {
    for column in RESPONDENT_COLUMNS {
        let name = row.get(column);
        if !name.is_empty() {
            return name.to_string();
        }
    }
    "Anonymous".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::parser::parse_survey;

    fn fixture_rows() -> Vec<RawRow> {
        let text = concat!(
            "Start time;Completion time;Jouw naam;Name;Jouw bedrijf;",
            "Wat zijn uitdagingen en thema's waar je klanten over hoort?.Security;",
            "Wat zijn uitdagingen en thema's waar je klanten over hoort?.Cloud;",
            "TechAndConcepts.Rust;newCustomerThemes;emergingTechVendorProduct\n",
            "01-03-2025 09:00;01-03-2025 09:10;Ada;;X;Sterke, concrete interesse;Vage interesse;Redelijke interesse;observability;\n",
            "02-03-2025 08:30;02-03-2025 08:45;;Bob;Y;Redelijke interesse;Niets over gehoord;;;edge inference\n",
            "not a date;03-03-2025 11:00;;;X;Vage interesse;Niets over gehoord;Niets over gehoord;   ;\n",
            "28-02-2025 17:20;bad;;;;Niets over gehoord;;Niets over gehoord;platform teams;\n",
            "01-03-2025 12:00;01-03-2025 12:30;Eve;;Z;Niets over gehoord;Sterke, concrete interesse;;;\n",
        );
        parse_survey(text)
    }

    #[test]
    fn empty_input_is_a_hard_error() {
        assert!(process(Vec::new()).is_err());
    }

    #[test]
    fn survey_period_takes_min_start_and_max_completion() {
        let dataset = process(fixture_rows()).unwrap();
        let start = dataset.survey_period.start.unwrap();
        let end = dataset.survey_period.end.unwrap();
        assert_eq!(start, parse_timestamp("28-02-2025 17:20").unwrap());
        assert_eq!(end, parse_timestamp("03-03-2025 11:00").unwrap());
    }

    #[test]
    fn survey_period_absent_when_nothing_parses() {
        let rows = parse_survey("Start time;Completion time;Jouw bedrijf\nsoon;later;X\n");
        let dataset = process(rows).unwrap();
        assert!(dataset.survey_period.start.is_none());
        assert!(dataset.survey_period.end.is_none());
    }

    #[test]
    fn companies_deduplicated_in_first_appearance_order() {
        let dataset = process(fixture_rows()).unwrap();
        assert_eq!(dataset.companies, vec!["X", "Y", "Z"]);
    }

    #[test]
    fn tally_matches_worked_example() {
        // Column values: strong, reasonable, vague, nothing, nothing; the
        // first row's company is X.
        let dataset = process(fixture_rows()).unwrap();
        let security = &dataset
            .challenges
            .iter()
            .find(|t| t.name == "Security")
            .unwrap();
        assert_eq!(security.count(InterestLevel::StrongInterest), 1);
        assert_eq!(security.count(InterestLevel::ReasonableInterest), 1);
        assert_eq!(security.count(InterestLevel::VagueInterest), 1);
        assert_eq!(security.count(InterestLevel::NothingHeard), 2);
        assert_eq!(security.total_responses, 5);
        assert!((security.average_interest_score - 1.2).abs() < 1e-9);
        let strong = &security.companies_with_interest[&InterestLevel::StrongInterest];
        assert_eq!(strong.iter().collect::<Vec<_>>(), vec!["X"]);
    }

    #[test]
    fn tally_conservation_holds_with_blank_and_unrecognized_cells() {
        let dataset = process(fixture_rows()).unwrap();
        for stat in dataset.challenges.iter().chain(&dataset.technologies) {
            let tallied: usize = stat.interest_counts.values().sum();
            assert!(tallied <= stat.total_responses);
            assert_eq!(stat.total_responses, dataset.total_responses);
        }
        // The Rust column has two blank cells, so fewer tallies than rows.
        let rust = dataset.technologies.iter().find(|t| t.name == "Rust").unwrap();
        let tallied: usize = rust.interest_counts.values().sum();
        assert_eq!(tallied, 3);
    }

    #[test]
    fn companies_without_name_are_not_attributed() {
        // Row four has NothingHeard for Security but no company.
        let dataset = process(fixture_rows()).unwrap();
        let security = dataset
            .challenges
            .iter()
            .find(|t| t.name == "Security")
            .unwrap();
        let nothing = &security.companies_with_interest[&InterestLevel::NothingHeard];
        assert_eq!(nothing.iter().collect::<Vec<_>>(), vec!["Z"]);
    }

    #[test]
    fn topics_sorted_descending_by_score() {
        let dataset = process(fixture_rows()).unwrap();
        let scores: Vec<f64> = dataset
            .challenges
            .iter()
            .map(|t| t.average_interest_score)
            .collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));
        for stat in &dataset.challenges {
            assert!(stat.average_interest_score >= 0.0);
            assert!(stat.average_interest_score <= 3.0);
        }
    }

    #[test]
    fn equal_scores_keep_column_order() {
        let text = concat!(
            "Jouw bedrijf;TechAndConcepts.First;TechAndConcepts.Second;TechAndConcepts.Third\n",
            "X;Vage interesse;Vage interesse;Redelijke interesse\n",
        );
        let dataset = process(parse_survey(text)).unwrap();
        let names: Vec<&str> = dataset.technologies.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Third", "First", "Second"]);
    }

    #[test]
    fn untallied_topic_scores_zero() {
        let text = "Jouw bedrijf;TechAndConcepts.Ghost\nX;onbekend antwoord\n";
        let dataset = process(parse_survey(text)).unwrap();
        let ghost = &dataset.technologies[0];
        assert_eq!(ghost.average_interest_score, 0.0);
        let tallied: usize = ghost.interest_counts.values().sum();
        assert_eq!(tallied, 0);
        assert_eq!(ghost.interest_counts.len(), 4);
    }

    #[test]
    fn topic_name_uses_segment_after_first_dot() {
        assert_eq!(topic_name("TechAndConcepts.Rust"), "Rust");
        assert_eq!(topic_name("TechAndConcepts.Web 2.0"), "Web 2");
        assert_eq!(topic_name("TechAndConcepts"), "TechAndConcepts");
        assert_eq!(topic_name("TechAndConcepts."), "TechAndConcepts.");
    }

    #[test]
    fn free_text_items_filter_blank_and_fall_back_on_names() {
        let dataset = process(fixture_rows()).unwrap();
        let themes = &dataset.new_customer_themes;
        assert_eq!(themes.len(), 2);
        assert_eq!(themes[0].respondent, "Ada");
        assert_eq!(themes[0].company, "X");
        assert_eq!(themes[0].text, "observability");
        assert!(themes[0].has_content);
        // Row four has no name columns filled and no company.
        assert_eq!(themes[1].respondent, "Anonymous");
        assert_eq!(themes[1].company, "Unknown");

        let tech = &dataset.emerging_tech_vendor_products;
        assert_eq!(tech.len(), 1);
        assert_eq!(tech[0].respondent, "Bob");
        assert_eq!(tech[0].company, "Y");
    }
}
