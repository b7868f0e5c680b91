//! Core module containing the shop domain, query logic and collaborator traits

pub mod error;
pub mod filter;
pub mod model;
pub mod query;
pub mod search;
pub mod service;
pub mod validation;

pub use error::{ShopAppError, ShopAppResult};
pub use filter::{ShopFilter, ShopOrder, ShopQuery, resolve_shop_query};
pub use model::{OpeningHoursShop, Product, Shop, ShopInput};
pub use query::{Page, PageRequest, PaginatedResponse, PaginationMeta, ShopListParams};
pub use search::{SearchCriteria, SearchParams, SearchQuery, build_search_query};
pub use service::{ProductRepository, SearchBackend, ShopIndex, ShopRepository, ShopSearchFunction};
