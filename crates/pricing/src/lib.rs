//! `backoffice-pricing` — price lists and the price resolution engine.
//!
//! A tenant's catalog is a set of overlapping, prioritized, time-windowed
//! price lists. Each [`PriceList`] aggregate owns its per-product price items
//! (valid over inclusive quantity brackets) and its customer assignments, and
//! may fall back to a base list adjusted by a percentage when it has no direct
//! item for a product. [`resolve_price`] turns a (customer, product, quantity,
//! date) query over a loaded catalog into a single effective unit price.
//!
//! Resolution is a pure read over the catalog snapshot; mutation goes through
//! the aggregate's command/event cycle and is guarded by optimistic
//! concurrency at the store boundary.

pub mod money;
pub mod price_list;
pub mod resolve;
pub mod validity;

pub use money::{CurrencyCode, Money};
pub use price_list::{
    AssignmentId, CustomerId, PriceList, PriceListCommand, PriceListCustomer, PriceListEvent,
    PriceListId, PriceListItem, PriceListItemId, PriceListType, ProductId,
};
pub use resolve::{resolve_price, PriceQuery, ResolvedPrice, MAX_CHAIN_DEPTH};
pub use validity::ValidityWindow;
