//! Wire types of the scoring API.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// SUBMISSION
// =============================================================================

/// Salary data submitted by the public form (`POST /scores/analyze`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreInput {
    pub location: String,
    /// Gross yearly salary in euros.
    pub compensation: f64,
    /// Years of experience, all employers.
    pub total_xp: f64,
    pub email: String,
    /// Years at the current employer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_xp: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consent: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AnalyzeResponse {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
}

// =============================================================================
// SCORE BREAKDOWN
// =============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreOutput {
    pub diagnostic: Diagnostic,
    pub estimated_gap: EstimatedGap,
    pub salary_position: SalaryPosition,
    pub chart_data: ChartData,
    /// In `[0, 1]`.
    pub coherence_score: f64,
    pub mean_score: f64,
    pub std_score: f64,
    #[serde(default)]
    pub conseil: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Diagnostic {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EstimatedGap {
    pub predicted: f64,
    pub actual: f64,
    pub difference: f64,
    pub percentage: f64,
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalaryPosition {
    pub percentile: f64,
    pub rank_label: String,
    pub comparison: String,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartData {
    #[serde(default)]
    pub average_by_xp: Vec<AveragePoint>,
    #[serde(default)]
    pub median_by_xp: Vec<MedianPoint>,
    #[serde(default)]
    pub histogram: Vec<HistogramBin>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct AveragePoint {
    pub xp: f64,
    pub average: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct MedianPoint {
    pub xp: f64,
    pub median: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HistogramBin {
    /// Score range label such as `0.3–0.4`.
    pub range: String,
    pub count: u64,
}

/// `GET /scores/analyze/{id}` body.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreRecord {
    pub id: Option<String>,
    pub input: Option<ScoreInput>,
    pub output: ScoreOutput,
    pub created_at: Option<String>,
}

impl ScoreRecord {
    /// Normalize a record body: the breakdown lives under `output`, or older
    /// records put it at the top level.
    ///
    /// # Errors
    ///
    /// Returns an error if neither shape holds a valid breakdown.
    pub fn from_value(mut body: Value) -> Result<Self, serde_json::Error> {
        let id = body.get("id").and_then(value_as_string);
        let created_at = body
            .get("createdAt")
            .and_then(Value::as_str)
            .map(str::to_owned);
        let input = match body.get_mut("input").map(Value::take) {
            Some(Value::Null) | None => None,
            Some(input) => serde_json::from_value(input).ok(),
        };
        let output = match body.get_mut("output").map(Value::take) {
            Some(output) if !output.is_null() => serde_json::from_value(output)?,
            _ => serde_json::from_value(body)?,
        };
        Ok(Self { id, input, output, created_at })
    }
}

// =============================================================================
// ADMIN + LOOKUP
// =============================================================================

/// One row of `GET /scores/all`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub id: i64,
    pub compensation: f64,
    pub company_xp: Option<f64>,
    pub total_xp: f64,
    pub location: String,
    pub email: String,
    pub consent: bool,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

/// One row of `GET /scores/email`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EmailMatch {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    pub input: ScoreInput,
}

/// `GET /scores/stats`. Only the headline figures are typed; anything else
/// the API adds is kept in `extra`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    #[serde(default, alias = "totalScores", alias = "count")]
    pub total: Option<u64>,
    #[serde(default, alias = "uniqueEmails")]
    pub users: Option<u64>,
    #[serde(default, alias = "avgCompensation")]
    pub average_compensation: Option<f64>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Ids are strings on some endpoints and numbers on others.
fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    value_as_string(&value).ok_or_else(|| serde::de::Error::custom("id must be a string or a number"))
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
