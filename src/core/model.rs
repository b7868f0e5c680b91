//! Shop domain records
//!
//! [`Shop`] is what the store hands back (with generated and derived fields
//! materialized), [`ShopInput`] is what callers send to create or overwrite one.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// One open/close interval of a shop on a given day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpeningHoursShop {
    /// Day-of-week code (1 = Monday by convention)
    pub day: i64,
    pub open_at: NaiveTime,
    pub close_at: NaiveTime,
}

impl OpeningHoursShop {
    pub fn new(day: i64, open_at: NaiveTime, close_at: NaiveTime) -> Self {
        Self {
            day,
            open_at,
            close_at,
        }
    }
}

/// A persisted shop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shop {
    pub id: i64,
    pub name: String,
    pub in_vacations: bool,
    pub created_at: NaiveDate,
    #[serde(default)]
    pub opening_hours: Vec<OpeningHoursShop>,
    /// Number of products attached to the shop, computed by the store
    #[serde(default)]
    pub nb_products: i64,
}

/// Payload for creating or overwriting a shop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ShopInput {
    /// Absent on create, required on update
    #[serde(default)]
    pub id: Option<i64>,

    #[validate(length(min = 1, max = 255, message = "name must be 1 to 255 characters"))]
    pub name: String,

    #[serde(default)]
    pub in_vacations: bool,

    /// Defaults to the current date on first insert
    #[serde(default)]
    pub created_at: Option<NaiveDate>,

    #[serde(default)]
    pub opening_hours: Vec<OpeningHoursShop>,
}

impl ShopInput {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            in_vacations: false,
            created_at: None,
            opening_hours: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn in_vacations(mut self, in_vacations: bool) -> Self {
        self.in_vacations = in_vacations;
        self
    }

    pub fn created_at(mut self, date: NaiveDate) -> Self {
        self.created_at = Some(date);
        self
    }

    pub fn with_hours(mut self, hours: OpeningHoursShop) -> Self {
        self.opening_hours.push(hours);
        self
    }
}

impl From<&Shop> for ShopInput {
    fn from(shop: &Shop) -> Self {
        Self {
            id: Some(shop.id),
            name: shop.name.clone(),
            in_vacations: shop.in_vacations,
            created_at: Some(shop.created_at),
            opening_hours: shop.opening_hours.clone(),
        }
    }
}

/// A product owned by a shop; detached (not deleted) when its shop goes away
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub shop_id: Option<i64>,
}
