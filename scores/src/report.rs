//! Score view model: everything a front-end needs to render a score, with
//! no markup.
//!
//! Scores arrive in `[0, 1]` and are displayed on a `[0, 10]` scale with
//! one decimal. Money and durations use French formatting, since the API's
//! own texts are French.

use std::cmp::Ordering;

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::types::{AveragePoint, HistogramBin, MedianPoint, ScoreOutput, Stats};

/// Samples on the density curve.
pub const CURVE_POINTS: u32 = 100;

const DASH: &str = "—";
/// `fr-FR` thousands separator (narrow no-break space).
const GROUP_SEPARATOR: char = '\u{202f}';
const MONTHS_FR: [&str; 12] =
    ["janv.", "févr.", "mars", "avr.", "mai", "juin", "juil.", "août", "sept.", "oct.", "nov.", "déc."];

// =============================================================================
// FORMATTING
// =============================================================================

/// `[0, 1]` score to `[0, 10]`, one decimal. Out-of-range input is clamped.
#[must_use]
pub fn to_score10(value: f64) -> f64 {
    ((value * 100.0).round() / 10.0).clamp(0.0, 10.0)
}

/// `47000.0` → `47 000` (narrow no-break space), at most three decimals.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn number_fr(value: f64) -> String {
    let milli = (value.abs() * 1000.0).round() as u64;
    let (int, frac) = (milli / 1000, milli % 1000);

    let digits = int.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(GROUP_SEPARATOR);
        }
        grouped.push(c);
    }

    let sign = if value < 0.0 && milli > 0 { "-" } else { "" };
    if frac == 0 {
        format!("{sign}{grouped}")
    } else {
        let frac = format!("{frac:03}");
        format!("{sign}{grouped},{}", frac.trim_end_matches('0'))
    }
}

#[must_use]
pub fn euro_fr(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{} €", number_fr(v)),
        _ => DASH.to_owned(),
    }
}

/// `1` → `1 an`, `3` → `3 ans`.
#[must_use]
pub fn years_fr(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => {
            let plural = if v > 1.0 { "s" } else { "" };
            format!("{} an{plural}", number_fr(v))
        }
        _ => DASH.to_owned(),
    }
}

/// RFC 3339 timestamp → `4 mars 2025 à 08:09` (UTC). Unparsable input is
/// returned as is.
#[must_use]
pub fn date_fr(raw: &str) -> String {
    let Ok(at) = OffsetDateTime::parse(raw, &Rfc3339) else {
        return raw.to_owned();
    };
    let at = at.to_offset(time::UtcOffset::UTC);
    let month = MONTHS_FR[usize::from(u8::from(at.month())) - 1];
    format!("{} {month} {} à {:02}:{:02}", at.day(), at.year(), at.hour(), at.minute())
}

// =============================================================================
// CHART SERIES
// =============================================================================

/// Normal density. A non-positive or non-finite `std` yields `0.0`.
#[must_use]
pub fn gaussian(x: f64, mean: f64, std: f64) -> f64 {
    if !std.is_finite() || std <= 0.0 {
        return 0.0;
    }
    let exponent = -((x - mean).powi(2)) / (2.0 * std.powi(2));
    (1.0 / (std * (2.0 * std::f64::consts::PI).sqrt())) * exponent.exp()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurvePoint {
    pub score: f64,
    pub density: f64,
}

/// [`CURVE_POINTS`] evenly spaced samples over `[0, 1]`, both ends included.
#[must_use]
pub fn gauss_curve(mean: f64, std: f64) -> Vec<CurvePoint> {
    let last = f64::from(CURVE_POINTS - 1);
    (0..CURVE_POINTS)
        .map(|i| {
            let score = f64::from(i) / last;
            CurvePoint { score, density: gaussian(score, mean, std) }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct XpRow {
    pub xp: f64,
    pub average: Option<f64>,
    pub median: Option<f64>,
}

/// Join the average and median series on `xp`, ascending.
#[must_use]
#[allow(clippy::float_cmp)]
pub fn merge_avg_med(average: &[AveragePoint], median: &[MedianPoint]) -> Vec<XpRow> {
    let mut rows: Vec<XpRow> = Vec::with_capacity(average.len().max(median.len()));
    for point in average {
        match rows.iter_mut().find(|row| row.xp == point.xp) {
            Some(row) => row.average = Some(point.average),
            None => rows.push(XpRow { xp: point.xp, average: Some(point.average), median: None }),
        }
    }
    for point in median {
        match rows.iter_mut().find(|row| row.xp == point.xp) {
            Some(row) => row.median = Some(point.median),
            None => rows.push(XpRow { xp: point.xp, average: None, median: Some(point.median) }),
        }
    }
    rows.sort_by(|a, b| a.xp.total_cmp(&b.xp));
    rows
}

/// Population represented by the histogram, saturating at `u64::MAX`.
#[must_use]
pub fn histogram_total(bins: &[HistogramBin]) -> u64 {
    bins.iter().map(|bin| bin.count).fold(0, u64::saturating_add)
}

/// `0.3–0.4` → `3-4` on the `[0, 10]` scale. Other labels pass through.
#[must_use]
pub fn histogram_label(range: &str) -> String {
    let bounds: Vec<f64> = range
        .split(['–', '-'])
        .filter_map(|part| part.trim().parse().ok())
        .collect();
    match bounds.as_slice() {
        [min, max] => format!("{}-{}", (min * 10.0).round(), (max * 10.0).round()),
        _ => range.to_owned(),
    }
}

// =============================================================================
// SCORE VIEW
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Above,
    Below,
    Even,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GapView {
    pub actual: String,
    pub predicted: String,
    /// Signed, e.g. `+2 000 €`.
    pub difference: String,
    pub percentage: f64,
    pub comment: String,
    pub trend: Trend,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistogramBar {
    pub label: String,
    pub count: u64,
}

/// Render-ready projection of a [`ScoreOutput`].
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreView {
    pub title: String,
    pub description: String,
    pub user_score10: f64,
    pub mean_score10: f64,
    pub gap: GapView,
    pub percentile: f64,
    pub rank_label: String,
    pub comparison: String,
    pub advice: Option<String>,
    pub histogram: Vec<HistogramBar>,
    pub population: u64,
    pub curve: Vec<CurvePoint>,
    pub user_point: CurvePoint,
    pub by_xp: Vec<XpRow>,
}

impl ScoreView {
    #[must_use]
    pub fn from_output(output: &ScoreOutput) -> Self {
        let gap = &output.estimated_gap;
        let trend = match gap.difference.partial_cmp(&0.0) {
            Some(Ordering::Greater) => Trend::Above,
            Some(Ordering::Less) => Trend::Below,
            _ => Trend::Even,
        };
        let sign = if trend == Trend::Above { "+" } else { "" };
        let chart = &output.chart_data;

        Self {
            title: output.diagnostic.title.clone(),
            description: output.diagnostic.description.clone(),
            user_score10: to_score10(output.coherence_score),
            mean_score10: to_score10(output.mean_score),
            gap: GapView {
                actual: euro_fr(Some(gap.actual)),
                predicted: euro_fr(Some(gap.predicted)),
                difference: format!("{sign}{}", euro_fr(Some(gap.difference))),
                percentage: gap.percentage,
                comment: gap.comment.clone(),
                trend,
            },
            percentile: output.salary_position.percentile,
            rank_label: output.salary_position.rank_label.clone(),
            comparison: output.salary_position.comparison.clone(),
            advice: output.conseil.clone().filter(|text| !text.trim().is_empty()),
            histogram: chart
                .histogram
                .iter()
                .map(|bin| HistogramBar { label: histogram_label(&bin.range), count: bin.count })
                .collect(),
            population: histogram_total(&chart.histogram),
            curve: gauss_curve(output.mean_score, output.std_score),
            user_point: CurvePoint {
                score: output.coherence_score,
                density: gaussian(output.coherence_score, output.mean_score, output.std_score),
            },
            by_xp: merge_avg_med(&chart.average_by_xp, &chart.median_by_xp),
        }
    }
}

// =============================================================================
// ADMIN CARDS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatCard {
    pub title: String,
    pub value: String,
}

/// Headline cards first, then any other numeric figure the API reported.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn stat_cards(stats: &Stats) -> Vec<StatCard> {
    let mut cards = Vec::new();
    if let Some(total) = stats.total {
        cards.push(StatCard { title: "Analyses".into(), value: number_fr(total as f64) });
    }
    if let Some(users) = stats.users {
        cards.push(StatCard { title: "Users".into(), value: number_fr(users as f64) });
    }
    if let Some(average) = stats.average_compensation {
        cards.push(StatCard { title: "Average salary".into(), value: euro_fr(Some(average)) });
    }
    for (key, value) in &stats.extra {
        if let Some(number) = value.as_f64() {
            cards.push(StatCard { title: key.clone(), value: number_fr(number) });
        }
    }
    cards
}

#[cfg(test)]
#[path = "report_test.rs"]
mod tests;
