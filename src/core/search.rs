//! Structured search queries
//!
//! A search combines up to three predicates with AND semantics: a name
//! wildcard ("contains"), an exact vacation-flag match and a creation date
//! range. [`build_search_query`] produces the query; index implementations
//! execute it, the in-memory one through [`SearchQuery::compile`].

use crate::core::error::ValidationError;
use crate::core::model::Shop;
use crate::core::validation::parse_optional_date;
use chrono::NaiveDate;
use regex::Regex;
use serde::Deserialize;

/// Raw search parameters, as received on the query string
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub name: Option<String>,
    pub in_vacations: Option<bool>,
    /// `YYYY-MM-DD`, inclusive
    pub start_date: Option<String>,
    /// `YYYY-MM-DD`, inclusive
    pub end_date: Option<String>,
}

/// Parsed search inputs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchCriteria {
    pub in_vacations: Option<bool>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub name: Option<String>,
}

impl SearchParams {
    pub fn into_criteria(self) -> Result<SearchCriteria, ValidationError> {
        Ok(SearchCriteria {
            in_vacations: self.in_vacations,
            start_date: parse_optional_date("startDate", self.start_date.as_deref())?,
            end_date: parse_optional_date("endDate", self.end_date.as_deref())?,
            name: self.name,
        })
    }
}

/// Indexed shop fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    Name,
    InVacations,
    CreatedAt,
}

impl SearchField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchField::Name => "name",
            SearchField::InVacations => "inVacations",
            SearchField::CreatedAt => "createdAt",
        }
    }
}

/// Date bounds, inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateRange {
    Between(NaiveDate, NaiveDate),
    AtLeast(NaiveDate),
    AtMost(NaiveDate),
}

impl DateRange {
    /// At most one range from two optional bounds
    pub fn from_bounds(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Option<Self> {
        match (start, end) {
            (Some(start), Some(end)) => Some(DateRange::Between(start, end)),
            (Some(start), None) => Some(DateRange::AtLeast(start)),
            (None, Some(end)) => Some(DateRange::AtMost(end)),
            (None, None) => None,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        match *self {
            DateRange::Between(start, end) => date >= start && date <= end,
            DateRange::AtLeast(start) => date >= start,
            DateRange::AtMost(end) => date <= end,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchPredicate {
    /// `*` matches any run of characters, `?` a single one
    Wildcard { field: SearchField, pattern: String },
    Match { field: SearchField, value: bool },
    Range { field: SearchField, range: DateRange },
}

/// A conjunction of predicates with a hit cap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub must: Vec<SearchPredicate>,
    pub max_hits: usize,
}

/// Build the index query for `criteria`
///
/// An empty or absent name adds no predicate, so a search without any
/// criteria returns the first `max_hits` shops.
pub fn build_search_query(criteria: &SearchCriteria, max_hits: usize) -> SearchQuery {
    let mut must = Vec::new();

    if let Some(name) = criteria.name.as_deref().filter(|n| !n.is_empty()) {
        must.push(SearchPredicate::Wildcard {
            field: SearchField::Name,
            pattern: format!("*{}*", name),
        });
    }

    if let Some(value) = criteria.in_vacations {
        must.push(SearchPredicate::Match {
            field: SearchField::InVacations,
            value,
        });
    }

    if let Some(range) = DateRange::from_bounds(criteria.start_date, criteria.end_date) {
        must.push(SearchPredicate::Range {
            field: SearchField::CreatedAt,
            range,
        });
    }

    SearchQuery { must, max_hits }
}

/// Translate a wildcard pattern into an anchored regex
pub fn wildcard_regex(pattern: &str) -> Result<Regex, regex::Error> {
    let mut re = String::with_capacity(pattern.len() + 8);
    re.push_str("(?s)^");
    for c in pattern.chars() {
        match c {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            other => re.push_str(&regex::escape(other.encode_utf8(&mut [0u8; 4]))),
        }
    }
    re.push('$');
    Regex::new(&re)
}

enum CompiledPredicate {
    Name(Regex),
    InVacations(bool),
    CreatedAt(DateRange),
}

/// A query ready to be evaluated against shops in memory
pub struct ShopMatcher {
    predicates: Vec<CompiledPredicate>,
}

impl ShopMatcher {
    pub fn matches(&self, shop: &Shop) -> bool {
        self.predicates.iter().all(|p| match p {
            CompiledPredicate::Name(re) => re.is_match(&shop.name),
            CompiledPredicate::InVacations(v) => shop.in_vacations == *v,
            CompiledPredicate::CreatedAt(range) => range.contains(shop.created_at),
        })
    }
}

impl SearchQuery {
    pub fn compile(&self) -> anyhow::Result<ShopMatcher> {
        let predicates = self
            .must
            .iter()
            .map(|p| match p {
                SearchPredicate::Wildcard {
                    field: SearchField::Name,
                    pattern,
                } => Ok(CompiledPredicate::Name(wildcard_regex(pattern)?)),
                SearchPredicate::Match {
                    field: SearchField::InVacations,
                    value,
                } => Ok(CompiledPredicate::InVacations(*value)),
                SearchPredicate::Range {
                    field: SearchField::CreatedAt,
                    range,
                } => Ok(CompiledPredicate::CreatedAt(*range)),
                other => Err(anyhow::anyhow!("Unsupported predicate: {:?}", other)),
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(ShopMatcher { predicates })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn shop(name: &str, in_vacations: bool, created: &str) -> Shop {
        Shop {
            id: 1,
            name: name.to_string(),
            in_vacations,
            created_at: d(created),
            opening_hours: Vec::new(),
            nb_products: 0,
        }
    }

    #[test]
    fn test_empty_criteria_builds_empty_conjunction() {
        let q = build_search_query(&SearchCriteria::default(), 1000);
        assert!(q.must.is_empty());
        assert_eq!(q.max_hits, 1000);

        let blank_name = SearchCriteria {
            name: Some(String::new()),
            ..Default::default()
        };
        assert!(build_search_query(&blank_name, 1000).must.is_empty());
    }

    #[test]
    fn test_full_criteria_builds_three_predicates() {
        let criteria = SearchCriteria {
            in_vacations: Some(false),
            start_date: Some(d("2024-01-01")),
            end_date: Some(d("2024-12-31")),
            name: Some("bak".to_string()),
        };
        let q = build_search_query(&criteria, 1000);
        assert_eq!(
            q.must,
            vec![
                SearchPredicate::Wildcard {
                    field: SearchField::Name,
                    pattern: "*bak*".to_string(),
                },
                SearchPredicate::Match {
                    field: SearchField::InVacations,
                    value: false,
                },
                SearchPredicate::Range {
                    field: SearchField::CreatedAt,
                    range: DateRange::Between(d("2024-01-01"), d("2024-12-31")),
                },
            ]
        );
    }

    #[test]
    fn test_single_bounds_choose_one_range() {
        assert_eq!(
            DateRange::from_bounds(Some(d("2024-01-01")), None),
            Some(DateRange::AtLeast(d("2024-01-01")))
        );
        assert_eq!(
            DateRange::from_bounds(None, Some(d("2024-01-01"))),
            Some(DateRange::AtMost(d("2024-01-01")))
        );
        assert_eq!(DateRange::from_bounds(None, None), None);
    }

    #[test]
    fn test_range_bounds_are_inclusive() {
        let r = DateRange::Between(d("2024-01-01"), d("2024-01-31"));
        assert!(r.contains(d("2024-01-01")));
        assert!(r.contains(d("2024-01-31")));
        assert!(!r.contains(d("2024-02-01")));
    }

    #[test]
    fn test_wildcard_is_substring_and_escapes_regex() {
        let re = wildcard_regex("*a.b*").unwrap();
        assert!(re.is_match("xxa.byy"));
        assert!(!re.is_match("xxaXbyy"));

        let re = wildcard_regex("*Bak*").unwrap();
        assert!(re.is_match("The Bakery"));
        assert!(!re.is_match("the bakery"));
    }

    #[test]
    fn test_compiled_query_is_conjunctive() {
        let criteria = SearchCriteria {
            in_vacations: Some(true),
            start_date: Some(d("2024-01-01")),
            end_date: None,
            name: Some("Shop".to_string()),
        };
        let matcher = build_search_query(&criteria, 10).compile().unwrap();

        assert!(matcher.matches(&shop("My Shop", true, "2024-05-01")));
        assert!(!matcher.matches(&shop("My Shop", false, "2024-05-01")));
        assert!(!matcher.matches(&shop("My Shop", true, "2023-05-01")));
        assert!(!matcher.matches(&shop("My Store", true, "2024-05-01")));
    }

    #[test]
    fn test_params_with_bad_date_rejected() {
        let params = SearchParams {
            start_date: Some("2024-1-1x".to_string()),
            ..Default::default()
        };
        assert!(params.into_criteria().is_err());
    }
}
