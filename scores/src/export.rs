//! Admin table ordering and CSV export, plus the email lookup ordering.

use std::cmp::Ordering;
use std::fmt::Write as _;
use std::str::FromStr;

use crate::report::date_fr;
use crate::types::{EmailMatch, Score};

pub const CSV_HEADERS: [&str; 8] = [
    "ID",
    "Salaire",
    "Exp. Entreprise",
    "Exp. Totale",
    "Localisation",
    "Email",
    "Consentement",
    "Date de création",
];

// =============================================================================
// SORT
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Id,
    Compensation,
    CompanyXp,
    TotalXp,
    Location,
    Email,
    Consent,
    CreatedAt,
}

impl SortField {
    pub const ALL: [Self; 8] = [
        Self::Id,
        Self::Compensation,
        Self::CompanyXp,
        Self::TotalXp,
        Self::Location,
        Self::Email,
        Self::Consent,
        Self::CreatedAt,
    ];

    /// Wire name, matching the JSON field.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Compensation => "compensation",
            Self::CompanyXp => "company_xp",
            Self::TotalXp => "total_xp",
            Self::Location => "location",
            Self::Email => "email",
            Self::Consent => "consent",
            Self::CreatedAt => "createdAt",
        }
    }
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| format!("unknown sort field: {s}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    #[must_use]
    pub fn flipped(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(format!("unknown sort direction: {other}")),
        }
    }
}

/// Newest first unless told otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSort {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Default for TableSort {
    fn default() -> Self {
        Self { field: SortField::CreatedAt, direction: SortDirection::Desc }
    }
}

impl TableSort {
    /// Sort after a click on `field`'s header: the active column flips,
    /// another column starts descending.
    #[must_use]
    pub fn toggle(self, field: SortField) -> Self {
        if self.field == field {
            Self { field, direction: self.direction.flipped() }
        } else {
            Self { field, direction: SortDirection::Desc }
        }
    }
}

/// Stable sort. Missing values come first ascending, last descending.
pub fn sort_scores(scores: &mut [Score], sort: TableSort) {
    scores.sort_by(|a, b| {
        let ordering = match sort.field {
            SortField::Id => Some(a.id.cmp(&b.id)),
            SortField::Compensation => Some(a.compensation.total_cmp(&b.compensation)),
            SortField::CompanyXp => match (a.company_xp, b.company_xp) {
                (Some(x), Some(y)) => Some(x.total_cmp(&y)),
                (None, None) => return Ordering::Equal,
                (None, Some(_)) => None,
                (Some(_), None) => return nulls(sort.direction).reverse(),
            },
            SortField::TotalXp => Some(a.total_xp.total_cmp(&b.total_xp)),
            SortField::Location => Some(a.location.cmp(&b.location)),
            SortField::Email => Some(a.email.cmp(&b.email)),
            SortField::Consent => Some(a.consent.cmp(&b.consent)),
            SortField::CreatedAt => Some(a.created_at.cmp(&b.created_at)),
        };
        match (ordering, sort.direction) {
            (None, direction) => nulls(direction),
            (Some(ordering), SortDirection::Asc) => ordering,
            (Some(ordering), SortDirection::Desc) => ordering.reverse(),
        }
    });
}

/// Where a missing left-hand value goes relative to a present one.
fn nulls(direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Asc => Ordering::Less,
        SortDirection::Desc => Ordering::Greater,
    }
}

/// Highest salary first, then most experience.
pub fn sort_email_matches(matches: &mut [EmailMatch]) {
    matches.sort_by(|a, b| {
        b.input
            .compensation
            .total_cmp(&a.input.compensation)
            .then_with(|| b.input.total_xp.total_cmp(&a.input.total_xp))
    });
}

// =============================================================================
// CSV
// =============================================================================

/// Admin export: header line, one line per score, `\n` separated.
#[must_use]
pub fn scores_csv(scores: &[Score]) -> String {
    let mut out = CSV_HEADERS.join(",");
    for score in scores {
        let company_xp = score.company_xp.map_or_else(|| "N/A".to_owned(), |xp| xp.to_string());
        let consent = if score.consent { "Oui" } else { "Non" };
        let _ = write!(
            out,
            "\n{},{},{},{},{},{},{},{}",
            score.id,
            score.compensation,
            company_xp,
            score.total_xp,
            quoted(&score.location),
            quoted(&score.email),
            consent,
            quoted(&date_fr(&score.created_at)),
        );
    }
    out
}

/// `scores_2025-03-04.csv`.
#[must_use]
pub fn csv_filename(day: time::Date) -> String {
    format!("scores_{day}.csv")
}

fn quoted(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

#[cfg(test)]
#[path = "export_test.rs"]
mod tests;
