use super::*;
use crate::types::ScoreInput;

fn score(id: i64, compensation: f64, company_xp: Option<f64>, created_at: &str) -> Score {
    Score {
        id,
        compensation,
        company_xp,
        total_xp: 4.0,
        location: "Lyon".into(),
        email: format!("user{id}@example.fr"),
        consent: id % 2 == 0,
        created_at: created_at.into(),
    }
}

fn ids(scores: &[Score]) -> Vec<i64> {
    scores.iter().map(|s| s.id).collect()
}

fn rows() -> Vec<Score> {
    vec![
        score(1, 40000.0, Some(2.0), "2025-01-01T09:00:00Z"),
        score(2, 55000.0, None, "2025-03-01T09:00:00Z"),
        score(3, 47000.0, Some(1.0), "2025-02-01T09:00:00Z"),
    ]
}

// =============================================================================
// sort
// =============================================================================

#[test]
fn default_sort_is_newest_first() {
    let mut scores = rows();
    sort_scores(&mut scores, TableSort::default());
    assert_eq!(ids(&scores), vec![2, 3, 1]);
}

#[test]
fn numeric_sort_both_ways() {
    let mut scores = rows();
    let asc = TableSort { field: SortField::Compensation, direction: SortDirection::Asc };
    sort_scores(&mut scores, asc);
    assert_eq!(ids(&scores), vec![1, 3, 2]);
    sort_scores(&mut scores, asc.toggle(SortField::Compensation));
    assert_eq!(ids(&scores), vec![2, 3, 1]);
}

#[test]
fn missing_values_first_ascending_last_descending() {
    let mut scores = rows();
    sort_scores(&mut scores, TableSort { field: SortField::CompanyXp, direction: SortDirection::Asc });
    assert_eq!(ids(&scores), vec![2, 3, 1]);
    sort_scores(&mut scores, TableSort { field: SortField::CompanyXp, direction: SortDirection::Desc });
    assert_eq!(ids(&scores), vec![1, 3, 2]);
}

#[test]
fn toggle_flips_active_column_and_resets_others() {
    let sort = TableSort::default();
    assert_eq!(sort.toggle(SortField::CreatedAt).direction, SortDirection::Asc);
    let other = sort.toggle(SortField::Email);
    assert_eq!(other, TableSort { field: SortField::Email, direction: SortDirection::Desc });
}

#[test]
fn sort_names_round_trip_through_from_str() {
    for field in SortField::ALL {
        assert_eq!(field.as_str().parse::<SortField>(), Ok(field));
    }
    assert!("salary".parse::<SortField>().is_err());
    assert_eq!("asc".parse::<SortDirection>(), Ok(SortDirection::Asc));
    assert!("up".parse::<SortDirection>().is_err());
}

#[test]
fn email_matches_rank_by_salary_then_experience() {
    let entry = |id: &str, compensation: f64, total_xp: f64| EmailMatch {
        id: id.into(),
        input: ScoreInput {
            location: "Paris".into(),
            compensation,
            total_xp,
            email: "a@b.fr".into(),
            company_xp: None,
            consent: None,
        },
    };
    let mut matches = vec![entry("a", 40000.0, 9.0), entry("b", 50000.0, 2.0), entry("c", 50000.0, 6.0)];
    sort_email_matches(&mut matches);
    let order: Vec<&str> = matches.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(order, vec!["c", "b", "a"]);
}

// =============================================================================
// csv
// =============================================================================

#[test]
fn csv_has_header_and_formatted_rows() {
    let csv = scores_csv(&rows()[..2]);
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "ID,Salaire,Exp. Entreprise,Exp. Totale,Localisation,Email,Consentement,Date de création");
    assert_eq!(lines[1], "1,40000,2,4,\"Lyon\",\"user1@example.fr\",Non,\"1 janv. 2025 à 09:00\"");
    assert_eq!(lines[2], "2,55000,N/A,4,\"Lyon\",\"user2@example.fr\",Oui,\"1 mars 2025 à 09:00\"");
    assert_eq!(lines.len(), 3);
}

#[test]
fn csv_escapes_embedded_quotes() {
    let mut row = score(9, 1.0, None, "bad date");
    row.location = "Saint \"Malo\"".into();
    let csv = scores_csv(&[row]);
    assert!(csv.ends_with(",\"Saint \"\"Malo\"\"\",\"user9@example.fr\",Non,\"bad date\""));
}

#[test]
fn empty_export_is_header_only() {
    assert_eq!(scores_csv(&[]), CSV_HEADERS.join(","));
}

#[test]
fn filename_carries_the_day() {
    let day = time::Date::from_calendar_date(2025, time::Month::March, 4).unwrap();
    assert_eq!(csv_filename(day), "scores_2025-03-04.csv");
}
