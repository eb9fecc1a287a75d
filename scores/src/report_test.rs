use super::*;
use crate::test_helpers::sample_output;
use crate::types::ScoreRecord;

const NNBSP: char = '\u{202f}';

fn output() -> ScoreOutput {
    ScoreRecord::from_value(sample_output()).unwrap().output
}

// =============================================================================
// formatting
// =============================================================================

#[test]
fn score10_keeps_one_decimal() {
    assert!((to_score10(0.73) - 7.3).abs() < 1e-9);
    assert!((to_score10(1.0) - 10.0).abs() < 1e-9);
    assert!((to_score10(0.0)).abs() < 1e-9);
    assert!((to_score10(0.456) - 4.6).abs() < 1e-9);
}

#[test]
fn score10_clamps_out_of_range_scores() {
    assert!((to_score10(1.37) - 10.0).abs() < 1e-9);
    assert!(to_score10(-0.2).abs() < 1e-9);
}

#[test]
fn numbers_group_thousands_french_style() {
    assert_eq!(number_fr(47000.0), format!("47{NNBSP}000"));
    assert_eq!(number_fr(1_234_567.5), format!("1{NNBSP}234{NNBSP}567,5"));
    assert_eq!(number_fr(999.0), "999");
    assert_eq!(number_fr(-2000.0), format!("-2{NNBSP}000"));
    assert_eq!(number_fr(0.125), "0,125");
}

#[test]
fn euro_and_years_fall_back_to_dash() {
    assert_eq!(euro_fr(Some(52400.0)), format!("52{NNBSP}400 €"));
    assert_eq!(euro_fr(None), "—");
    assert_eq!(euro_fr(Some(f64::NAN)), "—");
    assert_eq!(years_fr(Some(1.0)), "1 an");
    assert_eq!(years_fr(Some(3.0)), "3 ans");
    assert_eq!(years_fr(None), "—");
}

#[test]
fn dates_render_in_french() {
    assert_eq!(date_fr("2025-03-04T08:09:00Z"), "4 mars 2025 à 08:09");
    assert_eq!(date_fr("2025-12-31T23:30:00+01:00"), "31 déc. 2025 à 22:30");
    assert_eq!(date_fr("yesterday"), "yesterday");
}

// =============================================================================
// chart series
// =============================================================================

#[test]
fn gauss_curve_spans_unit_interval() {
    let curve = gauss_curve(0.5, 0.1);
    assert_eq!(curve.len(), 100);
    assert!(curve[0].score.abs() < f64::EPSILON);
    assert!((curve[99].score - 1.0).abs() < f64::EPSILON);
    let peak = curve
        .iter()
        .max_by(|a, b| a.density.total_cmp(&b.density))
        .unwrap();
    assert!((peak.score - 0.5).abs() < 0.011);
}

#[test]
fn gaussian_peak_matches_closed_form() {
    let std = 0.2;
    let expected = 1.0 / (std * (2.0 * std::f64::consts::PI).sqrt());
    assert!((gaussian(0.4, 0.4, std) - expected).abs() < 1e-12);
    assert!(gaussian(0.4, 0.4, 0.0).abs() < f64::EPSILON);
}

#[test]
fn merge_joins_on_xp_and_sorts() {
    let average = [AveragePoint { xp: 5.0, average: 50.0 }, AveragePoint { xp: 1.0, average: 30.0 }];
    let median = [MedianPoint { xp: 5.0, median: 48.0 }, MedianPoint { xp: 3.0, median: 40.0 }];
    let rows = merge_avg_med(&average, &median);
    assert_eq!(
        rows,
        vec![
            XpRow { xp: 1.0, average: Some(30.0), median: None },
            XpRow { xp: 3.0, average: None, median: Some(40.0) },
            XpRow { xp: 5.0, average: Some(50.0), median: Some(48.0) },
        ]
    );
}

#[test]
fn histogram_total_saturates() {
    let bin = |count| HistogramBin { range: "0.0–0.1".into(), count };
    assert_eq!(histogram_total(&[bin(2), bin(5)]), 7);
    assert_eq!(histogram_total(&[bin(u64::MAX), bin(3)]), u64::MAX);
    assert_eq!(histogram_total(&[]), 0);
}

#[test]
fn histogram_labels_move_to_ten_scale() {
    assert_eq!(histogram_label("0.3–0.4"), "3-4");
    assert_eq!(histogram_label("0.9-1.0"), "9-10");
    assert_eq!(histogram_label("top"), "top");
}

// =============================================================================
// score view
// =============================================================================

#[test]
fn view_has_gauges_in_range_and_population_total() {
    let view = ScoreView::from_output(&output());

    assert_eq!(view.title, "Salaire cohérent");
    assert!((0.0..=10.0).contains(&view.user_score10));
    assert!((0.0..=10.0).contains(&view.mean_score10));
    assert!((view.user_score10 - 7.3).abs() < 1e-9);
    assert!((view.mean_score10 - 6.1).abs() < 1e-9);
    assert_eq!(view.population, 7);
    assert_eq!(view.histogram.iter().map(|bar| bar.count).sum::<u64>(), view.population);
    assert_eq!(view.histogram[0].label, "0-1");
    assert_eq!(view.curve.len(), 100);
}

#[test]
fn view_signs_a_positive_gap() {
    let view = ScoreView::from_output(&output());
    assert_eq!(view.gap.trend, Trend::Above);
    assert_eq!(view.gap.difference, format!("+2{NNBSP}000 €"));

    let mut below = output();
    below.estimated_gap.difference = -1500.0;
    let view = ScoreView::from_output(&below);
    assert_eq!(view.gap.trend, Trend::Below);
    assert_eq!(view.gap.difference, format!("-1{NNBSP}500 €"));
}

#[test]
fn blank_advice_is_dropped() {
    let mut out = output();
    out.conseil = Some("   ".into());
    assert_eq!(ScoreView::from_output(&out).advice, None);
    out.conseil = Some("Négocie !".into());
    assert_eq!(ScoreView::from_output(&out).advice.as_deref(), Some("Négocie !"));
}

#[test]
fn stat_cards_list_headlines_then_extras() {
    let mut stats = Stats { total: Some(1247), users: None, average_compensation: Some(52400.0), ..Stats::default() };
    stats.extra.insert("medianCompensation".into(), serde_json::json!(50000));
    stats.extra.insert("label".into(), serde_json::json!("ignored"));

    let cards = stat_cards(&stats);

    let titles: Vec<&str> = cards.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(titles, vec!["Analyses", "Average salary", "medianCompensation"]);
    assert_eq!(cards[0].value, format!("1{NNBSP}247"));
}
