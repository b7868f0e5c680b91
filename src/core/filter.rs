//! Listing query resolution
//!
//! The listing endpoint accepts a sort key and three optional filters. They
//! are not combinable: a sort key wins over every filter, and the filters
//! select exactly one of seven fixed range/flag queries. [`resolve_shop_query`]
//! turns the raw parameters into the [`ShopQuery`] the store executes.

use crate::core::error::ValidationError;
use crate::core::model::Shop;
use crate::core::query::ShopListParams;
use crate::core::validation::parse_optional_date;
use chrono::NaiveDate;
use std::cmp::Ordering;

/// Ordering variants of the listing, all ascending with id as tie-breaker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShopOrder {
    Id,
    Name,
    CreatedAt,
    ProductCount,
}

impl ShopOrder {
    /// Map a `sortBy` value; unknown keys sort by product count
    pub fn from_sort_key(key: &str) -> Self {
        match key {
            "name" => ShopOrder::Name,
            "createdAt" => ShopOrder::CreatedAt,
            _ => ShopOrder::ProductCount,
        }
    }

    pub fn compare(&self, a: &Shop, b: &Shop) -> Ordering {
        let primary = match self {
            ShopOrder::Id => Ordering::Equal,
            ShopOrder::Name => a.name.cmp(&b.name),
            ShopOrder::CreatedAt => a.created_at.cmp(&b.created_at),
            ShopOrder::ProductCount => a.nb_products.cmp(&b.nb_products),
        };
        primary.then(a.id.cmp(&b.id))
    }
}

/// The seven filter queries of the listing
///
/// `before`/`after` bounds are exclusive, except [`ShopFilter::CreatedBetween`]
/// which is inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShopFilter {
    VacationsCreatedWithin {
        in_vacations: bool,
        after: NaiveDate,
        before: NaiveDate,
    },
    VacationsCreatedBefore {
        in_vacations: bool,
        before: NaiveDate,
    },
    VacationsCreatedAfter {
        in_vacations: bool,
        after: NaiveDate,
    },
    Vacations {
        in_vacations: bool,
    },
    CreatedBetween {
        after: NaiveDate,
        before: NaiveDate,
    },
    CreatedBefore {
        before: NaiveDate,
    },
    CreatedAfter {
        after: NaiveDate,
    },
}

impl ShopFilter {
    /// Evaluate the filter against one shop
    pub fn matches(&self, shop: &Shop) -> bool {
        let created = shop.created_at;
        match *self {
            ShopFilter::VacationsCreatedWithin {
                in_vacations,
                after,
                before,
            } => shop.in_vacations == in_vacations && created > after && created < before,
            ShopFilter::VacationsCreatedBefore {
                in_vacations,
                before,
            } => shop.in_vacations == in_vacations && created < before,
            ShopFilter::VacationsCreatedAfter {
                in_vacations,
                after,
            } => shop.in_vacations == in_vacations && created > after,
            ShopFilter::Vacations { in_vacations } => shop.in_vacations == in_vacations,
            ShopFilter::CreatedBetween { after, before } => created >= after && created <= before,
            ShopFilter::CreatedBefore { before } => created < before,
            ShopFilter::CreatedAfter { after } => created > after,
        }
    }

    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            ShopFilter::VacationsCreatedWithin { .. } => "vacations_created_within",
            ShopFilter::VacationsCreatedBefore { .. } => "vacations_created_before",
            ShopFilter::VacationsCreatedAfter { .. } => "vacations_created_after",
            ShopFilter::Vacations { .. } => "vacations",
            ShopFilter::CreatedBetween { .. } => "created_between",
            ShopFilter::CreatedBefore { .. } => "created_before",
            ShopFilter::CreatedAfter { .. } => "created_after",
        }
    }
}

/// What the store is asked to run for one listing call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShopQuery {
    /// Every shop, in the given order
    Ordered(ShopOrder),
    /// Shops matching the filter, ordered by id
    Filtered(ShopFilter),
}

/// Resolve listing parameters into a store query
///
/// 1. A sort key ignores every filter (dates are not even parsed).
/// 2. Otherwise the first matching filter combination is used.
/// 3. With neither, every shop ordered by id.
pub fn resolve_shop_query(params: &ShopListParams) -> Result<ShopQuery, ValidationError> {
    if let Some(key) = params.sort_by.as_deref() {
        return Ok(ShopQuery::Ordered(ShopOrder::from_sort_key(key)));
    }

    let before = parse_optional_date("createdBefore", params.created_before.as_deref())?;
    let after = parse_optional_date("createdAfter", params.created_after.as_deref())?;

    let filter = match (params.in_vacations, before, after) {
        (Some(in_vacations), Some(before), Some(after)) => {
            Some(ShopFilter::VacationsCreatedWithin {
                in_vacations,
                after,
                before,
            })
        }
        (Some(in_vacations), Some(before), None) => Some(ShopFilter::VacationsCreatedBefore {
            in_vacations,
            before,
        }),
        (Some(in_vacations), None, Some(after)) => Some(ShopFilter::VacationsCreatedAfter {
            in_vacations,
            after,
        }),
        (Some(in_vacations), None, None) => Some(ShopFilter::Vacations { in_vacations }),
        (None, Some(before), Some(after)) => Some(ShopFilter::CreatedBetween { after, before }),
        (None, Some(before), None) => Some(ShopFilter::CreatedBefore { before }),
        (None, None, Some(after)) => Some(ShopFilter::CreatedAfter { after }),
        (None, None, None) => None,
    };

    Ok(filter.map_or(ShopQuery::Ordered(ShopOrder::Id), ShopQuery::Filtered))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn params(
        in_vacations: Option<bool>,
        before: Option<&str>,
        after: Option<&str>,
    ) -> ShopListParams {
        ShopListParams {
            in_vacations,
            created_before: before.map(String::from),
            created_after: after.map(String::from),
            ..Default::default()
        }
    }

    fn shop(id: i64, name: &str, in_vacations: bool, created: &str, nb: i64) -> Shop {
        Shop {
            id,
            name: name.to_string(),
            in_vacations,
            created_at: d(created),
            opening_hours: Vec::new(),
            nb_products: nb,
        }
    }

    #[test]
    fn test_all_seven_combinations_route_to_their_variant() {
        let before = "2024-06-01";
        let after = "2024-01-01";

        assert_eq!(
            resolve_shop_query(&params(Some(true), Some(before), Some(after))).unwrap(),
            ShopQuery::Filtered(ShopFilter::VacationsCreatedWithin {
                in_vacations: true,
                after: d(after),
                before: d(before),
            })
        );
        assert_eq!(
            resolve_shop_query(&params(Some(false), Some(before), None)).unwrap(),
            ShopQuery::Filtered(ShopFilter::VacationsCreatedBefore {
                in_vacations: false,
                before: d(before),
            })
        );
        assert_eq!(
            resolve_shop_query(&params(Some(true), None, Some(after))).unwrap(),
            ShopQuery::Filtered(ShopFilter::VacationsCreatedAfter {
                in_vacations: true,
                after: d(after),
            })
        );
        assert_eq!(
            resolve_shop_query(&params(Some(true), None, None)).unwrap(),
            ShopQuery::Filtered(ShopFilter::Vacations { in_vacations: true })
        );
        assert_eq!(
            resolve_shop_query(&params(None, Some(before), Some(after))).unwrap(),
            ShopQuery::Filtered(ShopFilter::CreatedBetween {
                after: d(after),
                before: d(before),
            })
        );
        assert_eq!(
            resolve_shop_query(&params(None, Some(before), None)).unwrap(),
            ShopQuery::Filtered(ShopFilter::CreatedBefore { before: d(before) })
        );
        assert_eq!(
            resolve_shop_query(&params(None, None, Some(after))).unwrap(),
            ShopQuery::Filtered(ShopFilter::CreatedAfter { after: d(after) })
        );
    }

    #[test]
    fn test_no_parameters_orders_by_id() {
        assert_eq!(
            resolve_shop_query(&ShopListParams::default()).unwrap(),
            ShopQuery::Ordered(ShopOrder::Id)
        );
    }

    #[test]
    fn test_sort_key_wins_over_filters() {
        let mut p = params(Some(true), Some("2024-06-01"), Some("2024-01-01"));
        p.sort_by = Some("name".to_string());
        assert_eq!(
            resolve_shop_query(&p).unwrap(),
            ShopQuery::Ordered(ShopOrder::Name)
        );
    }

    #[test]
    fn test_sort_key_skips_date_parsing() {
        let mut p = params(None, Some("not-a-date"), None);
        p.sort_by = Some("createdAt".to_string());
        assert_eq!(
            resolve_shop_query(&p).unwrap(),
            ShopQuery::Ordered(ShopOrder::CreatedAt)
        );
    }

    #[test]
    fn test_unknown_sort_key_sorts_by_product_count() {
        let p = ShopListParams {
            sort_by: Some("nbProducts".to_string()),
            ..Default::default()
        };
        assert_eq!(
            resolve_shop_query(&p).unwrap(),
            ShopQuery::Ordered(ShopOrder::ProductCount)
        );
    }

    #[test]
    fn test_malformed_date_is_rejected() {
        let err = resolve_shop_query(&params(None, None, Some("2024-13-01"))).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::InvalidDate { ref parameter, .. } if parameter == "createdAfter"
        ));
    }

    #[test]
    fn test_bounds_are_exclusive_except_between() {
        let on_edge = shop(1, "Edge", false, "2024-01-01", 0);

        assert!(!ShopFilter::CreatedAfter { after: d("2024-01-01") }.matches(&on_edge));
        assert!(!ShopFilter::CreatedBefore { before: d("2024-01-01") }.matches(&on_edge));
        assert!(
            ShopFilter::CreatedBetween {
                after: d("2024-01-01"),
                before: d("2024-01-01"),
            }
            .matches(&on_edge)
        );
        assert!(
            !ShopFilter::VacationsCreatedWithin {
                in_vacations: false,
                after: d("2024-01-01"),
                before: d("2024-02-01"),
            }
            .matches(&on_edge)
        );
    }

    #[test]
    fn test_vacation_flag_must_match() {
        let open = shop(1, "Open", false, "2024-03-01", 0);
        let closed = shop(2, "Closed", true, "2024-03-01", 0);
        let filter = ShopFilter::VacationsCreatedAfter {
            in_vacations: true,
            after: d("2024-01-01"),
        };
        assert!(!filter.matches(&open));
        assert!(filter.matches(&closed));
    }

    #[test]
    fn test_order_ties_broken_by_id() {
        let a = shop(2, "Same", false, "2024-01-01", 1);
        let b = shop(1, "Same", false, "2024-01-01", 1);
        assert_eq!(ShopOrder::Name.compare(&a, &b), Ordering::Greater);
        assert_eq!(ShopOrder::ProductCount.compare(&b, &a), Ordering::Less);
    }
}
