//! Catalog-level price resolution.
//!
//! Given a tenant's loaded catalog and a query, pick the single winning list
//! and compute the effective unit price, walking the winner's base-list chain
//! when it has no direct item. Resolution is a pure read: the catalog snapshot
//! is never mutated and concurrent resolutions against the same snapshot are
//! safe.
//!
//! Selection rules:
//! 1. Candidates: active lists whose own window contains the query date and,
//!    when a customer is given, that are either public (no assignment rows)
//!    or carry an active, in-window assignment for that customer.
//! 2. Order: `priority` ascending (lower wins); ties broken by
//!    customer-assigned over public, then newest `created_at`, then `code`.
//! 3. Only the top candidate is consulted. Its own base lineage is walked,
//!    compounding each hop's adjustment percentage; sibling candidates are
//!    never fallen through to — an applicable top-priority list is
//!    authoritative for the product, and a miss is a miss.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use backoffice_core::{DomainError, DomainResult};

use crate::money::{CurrencyCode, Money};
use crate::price_list::{CustomerId, PriceList, PriceListId, ProductId};

/// Upper bound on base-list hops for one resolution.
///
/// Any well-formed catalog stays far below this; exceeding it means the
/// base-list graph is corrupt.
pub const MAX_CHAIN_DEPTH: u32 = 20;

/// One price question: who buys what, how much, when, in which currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuery {
    pub customer_id: Option<CustomerId>,
    pub product_id: ProductId,
    pub quantity: Decimal,
    pub as_of: DateTime<Utc>,
    /// Expected currency; a differing resolved currency is flagged, never converted.
    pub currency: CurrencyCode,
}

/// The effective unit price and where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPrice {
    pub product_id: ProductId,
    pub unit_price: Money,
    pub source_price_list_id: PriceListId,
    pub source_price_list_code: String,
    /// Base-list hops taken: 0 = direct hit on the winning list.
    pub path_len: u32,
    /// True when the resolved currency differs from the requested one.
    pub currency_mismatch: bool,
}

/// Resolve the effective unit price for `query` against `catalog`.
///
/// `catalog` must be the full set of price lists visible to one tenant;
/// base-list references are resolved against it, and a reference that points
/// outside it is treated as a broken graph, not a missing price.
pub fn resolve_price(catalog: &[PriceList], query: &PriceQuery) -> DomainResult<ResolvedPrice> {
    let mut candidates: Vec<&PriceList> = catalog
        .iter()
        .filter(|list| is_candidate(list, query))
        .collect();

    if candidates.is_empty() {
        trace!(product = %query.product_id, "no candidate price lists");
        return Err(DomainError::NotFound);
    }

    candidates.sort_by(|a, b| {
        a.priority()
            .cmp(&b.priority())
            .then_with(|| assigned_to(b, query).cmp(&assigned_to(a, query)))
            .then_with(|| b.created_at().cmp(&a.created_at()))
            .then_with(|| a.code().cmp(b.code()))
    });

    let winner = candidates[0];
    debug!(
        list = %winner.code(),
        priority = winner.priority(),
        candidates = candidates.len(),
        "selected price list"
    );

    resolve_through_chain(catalog, winner, query)
}

fn is_candidate(list: &PriceList, query: &PriceQuery) -> bool {
    if !list.is_active() || !list.is_valid_at(query.as_of) {
        return false;
    }
    match query.customer_id {
        None => true,
        Some(customer_id) => list.applies_to_customer(customer_id, query.as_of),
    }
}

fn assigned_to(list: &PriceList, query: &PriceQuery) -> bool {
    query
        .customer_id
        .is_some_and(|c| list.has_active_assignment_for(c, query.as_of))
}

/// Walk the winner's base lineage until a direct item is found.
///
/// Each referring list's adjustment percentage applies to its base's resolved
/// price, so adjustments are applied innermost-first on the way back out,
/// rounding at every application.
fn resolve_through_chain(
    catalog: &[PriceList],
    winner: &PriceList,
    query: &PriceQuery,
) -> DomainResult<ResolvedPrice> {
    let mut current = winner;
    let mut visited: Vec<PriceListId> = vec![winner.id_typed()];
    let mut adjustments: Vec<Decimal> = Vec::new();

    loop {
        match current.product_price(query.product_id, query.quantity) {
            Ok(item) => {
                let mut price = item.unit_price.clone();
                for pct in adjustments.iter().rev() {
                    price = price.apply_percentage(*pct).map_err(|_| {
                        DomainError::configuration(format!(
                            "base list adjustment of {pct}% overflows the resolved price"
                        ))
                    })?;
                }

                let currency_mismatch = price.currency() != &query.currency;
                if currency_mismatch {
                    debug!(
                        list = %current.code(),
                        resolved = %price.currency(),
                        requested = %query.currency,
                        "resolved price currency differs from requested"
                    );
                }

                return Ok(ResolvedPrice {
                    product_id: query.product_id,
                    unit_price: price,
                    source_price_list_id: winner.id_typed(),
                    source_price_list_code: winner.code().to_string(),
                    path_len: adjustments.len() as u32,
                    currency_mismatch,
                });
            }
            Err(DomainError::NotFound) => {
                let Some(base_id) = current.base_price_list_id() else {
                    trace!(list = %current.code(), "chain exhausted without a direct item");
                    return Err(DomainError::NotFound);
                };

                if visited.contains(&base_id) {
                    warn!(list = %current.code(), base = %base_id, "base price list cycle");
                    return Err(DomainError::configuration(format!(
                        "base price list cycle detected at list {base_id}"
                    )));
                }
                if adjustments.len() as u32 >= MAX_CHAIN_DEPTH {
                    warn!(list = %winner.code(), "base price list chain exceeds hop bound");
                    return Err(DomainError::configuration(format!(
                        "base price list chain exceeds {MAX_CHAIN_DEPTH} hops"
                    )));
                }

                let base = catalog
                    .iter()
                    .find(|l| l.id_typed() == base_id)
                    .ok_or_else(|| {
                        DomainError::configuration(format!(
                            "base price list {base_id} is not part of the catalog"
                        ))
                    })?;

                trace!(from = %current.code(), to = %base.code(), "following base price list");
                adjustments.push(current.base_adjustment_percentage().unwrap_or(Decimal::ZERO));
                visited.push(base_id);
                current = base;
            }
            Err(other) => return Err(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    use backoffice_core::{Aggregate, AggregateId, TenantId};
    use crate::price_list::{
        AddItem, AssignCustomer, AssignmentId, PriceListCommand, PriceListItemId, PriceListType,
        SetBasePriceList,
    };
    use crate::price_list::CreatePriceList;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn lira(amount: Decimal) -> Money {
        Money::new(amount, CurrencyCode::new("TRY").unwrap())
    }

    fn drive(list: &mut PriceList, cmd: PriceListCommand) {
        let events = list.handle(&cmd).unwrap();
        for e in &events {
            list.apply(e);
        }
    }

    struct CatalogBuilder {
        tenant_id: TenantId,
        lists: Vec<PriceList>,
    }

    impl CatalogBuilder {
        fn new() -> Self {
            Self {
                tenant_id: TenantId::new(),
                lists: Vec::new(),
            }
        }

        fn list(&mut self, code: &str, priority: i32) -> &mut PriceList {
            self.list_created_at(code, priority, t0())
        }

        fn list_created_at(
            &mut self,
            code: &str,
            priority: i32,
            created_at: DateTime<Utc>,
        ) -> &mut PriceList {
            let id = PriceListId::new(AggregateId::new());
            let mut list = PriceList::empty(id);
            drive(
                &mut list,
                PriceListCommand::CreatePriceList(CreatePriceList {
                    tenant_id: self.tenant_id,
                    price_list_id: id,
                    code: code.to_string(),
                    name: format!("{code} list"),
                    description: None,
                    list_type: PriceListType::Standard,
                    currency: CurrencyCode::new("TRY").unwrap(),
                    valid_from: t0() - chrono::Duration::days(30),
                    valid_to: None,
                    is_tax_included: false,
                    priority,
                    minimum_order_amount: None,
                    sales_territory_id: None,
                    customer_segment: None,
                    activate_immediately: true,
                    occurred_at: created_at,
                }),
            );
            self.lists.push(list);
            self.lists.last_mut().unwrap()
        }

        fn find(&mut self, code: &str) -> &mut PriceList {
            self.lists
                .iter_mut()
                .find(|l| l.code() == code)
                .expect("unknown list code")
        }

        fn add_item(&mut self, code: &str, product: ProductId, price: Money, min: Decimal, max: Option<Decimal>) {
            let tenant_id = self.tenant_id;
            let list = self.find(code);
            let id = list.id_typed();
            drive(
                list,
                PriceListCommand::AddItem(AddItem {
                    tenant_id,
                    price_list_id: id,
                    item_id: PriceListItemId::new(),
                    product_id: product,
                    product_code: "P".to_string(),
                    product_name: "Product".to_string(),
                    unit_price: price,
                    unit_of_measure: "pcs".to_string(),
                    min_quantity: min,
                    max_quantity: max,
                    discount_percentage: None,
                    occurred_at: t0(),
                }),
            );
        }

        fn assign(&mut self, code: &str, customer: CustomerId) {
            let tenant_id = self.tenant_id;
            let list = self.find(code);
            let id = list.id_typed();
            drive(
                list,
                PriceListCommand::AssignCustomer(AssignCustomer {
                    tenant_id,
                    price_list_id: id,
                    assignment_id: AssignmentId::new(),
                    customer_id: customer,
                    customer_name: "Customer".to_string(),
                    valid_from: t0() - chrono::Duration::days(30),
                    valid_to: None,
                    occurred_at: t0(),
                }),
            );
        }

        fn base(&mut self, code: &str, base_code: &str, pct: Decimal) {
            let base_id = self.find(base_code).id_typed();
            self.base_id(code, base_id, pct);
        }

        fn base_id(&mut self, code: &str, base_id: PriceListId, pct: Decimal) {
            let tenant_id = self.tenant_id;
            let list = self.find(code);
            let id = list.id_typed();
            drive(
                list,
                PriceListCommand::SetBasePriceList(SetBasePriceList {
                    tenant_id,
                    price_list_id: id,
                    base_price_list_id: base_id,
                    adjustment_percentage: pct,
                    occurred_at: t0(),
                }),
            );
        }

        fn catalog(&self) -> &[PriceList] {
            &self.lists
        }
    }

    fn product() -> ProductId {
        ProductId::new(AggregateId::new())
    }

    fn customer() -> CustomerId {
        CustomerId::new(AggregateId::new())
    }

    fn query(product_id: ProductId, qty: Decimal, customer_id: Option<CustomerId>) -> PriceQuery {
        PriceQuery {
            customer_id,
            product_id,
            quantity: qty,
            as_of: t0(),
            currency: CurrencyCode::new("TRY").unwrap(),
        }
    }

    #[test]
    fn direct_hit_on_a_public_list() {
        let mut b = CatalogBuilder::new();
        let p = product();
        b.list("STANDARD", 10);
        b.add_item("STANDARD", p, lira(dec!(100.00)), dec!(1), None);

        let resolved = resolve_price(b.catalog(), &query(p, dec!(5), None)).unwrap();
        assert_eq!(resolved.unit_price, lira(dec!(100.00)));
        assert_eq!(resolved.source_price_list_code, "STANDARD");
        assert_eq!(resolved.path_len, 0);
        assert!(!resolved.currency_mismatch);
    }

    #[test]
    fn base_fallback_applies_the_adjustment() {
        let mut b = CatalogBuilder::new();
        let p = product();
        let c = customer();
        b.list("STANDARD", 10);
        b.add_item("STANDARD", p, lira(dec!(100.00)), dec!(1), None);
        b.list("VIP-A", 1);
        b.assign("VIP-A", c);
        b.base("VIP-A", "STANDARD", dec!(-10));

        let resolved = resolve_price(b.catalog(), &query(p, dec!(5), Some(c))).unwrap();
        assert_eq!(resolved.unit_price, lira(dec!(90.00)));
        assert_eq!(resolved.source_price_list_code, "VIP-A");
        assert_eq!(resolved.path_len, 1);
    }

    #[test]
    fn customer_scoping_excludes_other_customers() {
        let mut b = CatalogBuilder::new();
        let p = product();
        let assigned = customer();
        let stranger = customer();
        b.list("STANDARD", 10);
        b.add_item("STANDARD", p, lira(dec!(100.00)), dec!(1), None);
        b.list("VIP-A", 1);
        b.assign("VIP-A", assigned);
        b.base("VIP-A", "STANDARD", dec!(-10));

        let resolved = resolve_price(b.catalog(), &query(p, dec!(5), Some(stranger))).unwrap();
        assert_eq!(resolved.unit_price, lira(dec!(100.00)));
        assert_eq!(resolved.source_price_list_code, "STANDARD");
    }

    #[test]
    fn quantity_brackets_select_the_tier() {
        let mut b = CatalogBuilder::new();
        let p = product();
        b.list("STANDARD", 10);
        b.add_item("STANDARD", p, lira(dec!(100.00)), dec!(1), Some(dec!(9)));
        b.add_item("STANDARD", p, lira(dec!(90.00)), dec!(10), None);

        let resolved = resolve_price(b.catalog(), &query(p, dec!(10), None)).unwrap();
        assert_eq!(resolved.unit_price, lira(dec!(90.00)));
    }

    #[test]
    fn self_referential_base_is_a_configuration_error() {
        let mut b = CatalogBuilder::new();
        let p = product();
        let c = customer();
        b.list("VIP-A", 1);
        b.assign("VIP-A", c);
        // SetBasePriceList refuses the trivial self-cycle, so rehydrate the
        // misconfigured state straight from events.
        {
            use crate::price_list::{BasePriceListSet, PriceListEvent};
            let tenant_id = b.tenant_id;
            let list = b.find("VIP-A");
            let own_id = list.id_typed();
            list.apply(&PriceListEvent::BasePriceListSet(BasePriceListSet {
                tenant_id,
                price_list_id: own_id,
                base_price_list_id: own_id,
                adjustment_percentage: dec!(-10),
                occurred_at: t0(),
            }));
        }

        let err = resolve_price(b.catalog(), &query(p, dec!(5), Some(c))).unwrap_err();
        assert!(matches!(err, DomainError::Configuration(_)));
    }

    #[test]
    fn two_list_cycle_is_a_configuration_error() {
        let mut b = CatalogBuilder::new();
        let p = product();
        b.list("A", 1);
        b.list("B", 2);
        b.base("A", "B", dec!(5));
        b.base("B", "A", dec!(5));

        let err = resolve_price(b.catalog(), &query(p, dec!(1), None)).unwrap_err();
        assert!(matches!(err, DomainError::Configuration(_)));
    }

    #[test]
    fn over_deep_chain_is_a_configuration_error() {
        let mut b = CatalogBuilder::new();
        let p = product();
        let depth = MAX_CHAIN_DEPTH + 5;
        for i in 0..=depth {
            b.list(&format!("L{i:02}"), i as i32);
        }
        for i in 0..depth {
            b.base(&format!("L{i:02}"), &format!("L{:02}", i + 1), dec!(1));
        }
        // Only the far end has a price, beyond the hop bound.
        b.add_item(&format!("L{depth:02}"), p, lira(dec!(10.00)), dec!(1), None);

        let err = resolve_price(b.catalog(), &query(p, dec!(1), None)).unwrap_err();
        assert!(matches!(err, DomainError::Configuration(_)));
    }

    #[test]
    fn chain_within_the_bound_resolves_and_compounds() {
        let mut b = CatalogBuilder::new();
        let p = product();
        b.list("A", 1);
        b.list("B", 2);
        b.list("C", 3);
        b.base("A", "B", dec!(10));
        b.base("B", "C", dec!(10));
        b.add_item("C", p, lira(dec!(100.00)), dec!(1), None);

        // A resolves C's price through B: 100 * 1.10 * 1.10 = 121.00.
        let resolved = resolve_price(b.catalog(), &query(p, dec!(1), None)).unwrap();
        assert_eq!(resolved.unit_price, lira(dec!(121.00)));
        assert_eq!(resolved.path_len, 2);
        assert_eq!(resolved.source_price_list_code, "A");
    }

    #[test]
    fn chain_adjustment_overflow_is_a_configuration_error() {
        let mut b = CatalogBuilder::new();
        let p = product();
        b.list("A", 1);
        b.list("B", 2);
        b.base("A", "B", Decimal::MAX);
        b.add_item("B", p, lira(dec!(10_000_000_000)), dec!(1), None);

        let err = resolve_price(b.catalog(), &query(p, dec!(1), None)).unwrap_err();
        assert!(matches!(err, DomainError::Configuration(_)));
    }

    #[test]
    fn dangling_base_reference_is_a_configuration_error() {
        let mut b = CatalogBuilder::new();
        let p = product();
        b.list("A", 1);
        b.base_id("A", PriceListId::new(AggregateId::new()), dec!(0));

        let err = resolve_price(b.catalog(), &query(p, dec!(1), None)).unwrap_err();
        assert!(matches!(err, DomainError::Configuration(_)));
    }

    #[test]
    fn top_candidate_miss_does_not_fall_through_to_siblings() {
        let mut b = CatalogBuilder::new();
        let p = product();
        b.list("TOP", 1);
        b.list("STANDARD", 10);
        b.add_item("STANDARD", p, lira(dec!(100.00)), dec!(1), None);

        // TOP has no item and no base; STANDARD would match, but the
        // top-priority list is authoritative.
        let err = resolve_price(b.catalog(), &query(p, dec!(1), None)).unwrap_err();
        assert!(matches!(err, DomainError::NotFound));
    }

    #[test]
    fn inactive_and_out_of_window_lists_are_not_candidates() {
        let mut b = CatalogBuilder::new();
        let p = product();
        b.list("EXPIRED", 1);
        b.add_item("EXPIRED", p, lira(dec!(50.00)), dec!(1), None);
        {
            use crate::price_list::{PriceListCommand, UpdateValidityPeriod};
            let tenant_id = b.tenant_id;
            let list = b.find("EXPIRED");
            let id = list.id_typed();
            drive(
                list,
                PriceListCommand::UpdateValidityPeriod(UpdateValidityPeriod {
                    tenant_id,
                    price_list_id: id,
                    valid_from: t0() - chrono::Duration::days(60),
                    valid_to: Some(t0() - chrono::Duration::days(40)),
                    occurred_at: t0(),
                }),
            );
        }
        b.list("STANDARD", 10);
        b.add_item("STANDARD", p, lira(dec!(100.00)), dec!(1), None);

        let resolved = resolve_price(b.catalog(), &query(p, dec!(1), None)).unwrap();
        assert_eq!(resolved.source_price_list_code, "STANDARD");
    }

    #[test]
    fn priority_ties_prefer_the_customer_assigned_list() {
        let mut b = CatalogBuilder::new();
        let p = product();
        let c = customer();
        b.list("PUBLIC", 5);
        b.add_item("PUBLIC", p, lira(dec!(100.00)), dec!(1), None);
        b.list("ASSIGNED", 5);
        b.assign("ASSIGNED", c);
        b.add_item("ASSIGNED", p, lira(dec!(80.00)), dec!(1), None);

        let resolved = resolve_price(b.catalog(), &query(p, dec!(1), Some(c))).unwrap();
        assert_eq!(resolved.source_price_list_code, "ASSIGNED");
    }

    #[test]
    fn remaining_ties_break_by_creation_time_then_code() {
        let mut b = CatalogBuilder::new();
        let p = product();
        b.list_created_at("OLDER", 5, t0() - chrono::Duration::days(10));
        b.add_item("OLDER", p, lira(dec!(100.00)), dec!(1), None);
        b.list_created_at("NEWER", 5, t0() - chrono::Duration::days(1));
        b.add_item("NEWER", p, lira(dec!(95.00)), dec!(1), None);

        let resolved = resolve_price(b.catalog(), &query(p, dec!(1), None)).unwrap();
        assert_eq!(resolved.source_price_list_code, "NEWER");

        let mut b = CatalogBuilder::new();
        b.list_created_at("BETA", 5, t0());
        b.add_item("BETA", p, lira(dec!(100.00)), dec!(1), None);
        b.list_created_at("ALPHA", 5, t0());
        b.add_item("ALPHA", p, lira(dec!(95.00)), dec!(1), None);

        let resolved = resolve_price(b.catalog(), &query(p, dec!(1), None)).unwrap();
        assert_eq!(resolved.source_price_list_code, "ALPHA");
    }

    #[test]
    fn currency_mismatch_is_flagged_not_converted() {
        let mut b = CatalogBuilder::new();
        let p = product();
        b.list("STANDARD", 10);
        b.add_item("STANDARD", p, lira(dec!(100.00)), dec!(1), None);

        let mut q = query(p, dec!(1), None);
        q.currency = CurrencyCode::new("USD").unwrap();

        let resolved = resolve_price(b.catalog(), &q).unwrap();
        assert!(resolved.currency_mismatch);
        assert_eq!(resolved.unit_price, lira(dec!(100.00)));
    }

    #[test]
    fn empty_catalog_is_not_found() {
        let p = product();
        let err = resolve_price(&[], &query(p, dec!(1), None)).unwrap_err();
        assert!(matches!(err, DomainError::NotFound));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 200,
                ..ProptestConfig::default()
            })]

            /// The winner is independent of catalog iteration order.
            #[test]
            fn resolution_is_shuffle_invariant(
                priorities in proptest::collection::vec(0i32..50, 2..8),
                rotation in 0usize..8,
            ) {
                let mut b = CatalogBuilder::new();
                let p = product();
                for (i, priority) in priorities.iter().enumerate() {
                    let code = format!("L{i:02}");
                    b.list(&code, *priority);
                    b.add_item(&code, p, lira(Decimal::from(100 + i as i64)), dec!(1), None);
                }

                let q = query(p, dec!(1), None);
                let baseline = resolve_price(b.catalog(), &q).unwrap();

                let mut rotated = b.catalog().to_vec();
                let steps = rotation % rotated.len();
                rotated.rotate_left(steps);
                let shuffled = resolve_price(&rotated, &q).unwrap();

                prop_assert_eq!(baseline, shuffled);
            }

            /// Repeated resolution over an unchanged catalog is deterministic.
            #[test]
            fn resolution_is_deterministic(qty_units in 1i64..1000) {
                let mut b = CatalogBuilder::new();
                let p = product();
                let c = customer();
                b.list("STANDARD", 10);
                b.add_item("STANDARD", p, lira(dec!(100.00)), dec!(1), Some(dec!(99)));
                b.add_item("STANDARD", p, lira(dec!(90.00)), dec!(100), None);
                b.list("VIP", 1);
                b.assign("VIP", c);
                b.base("VIP", "STANDARD", dec!(-12.5));

                let q = query(p, Decimal::from(qty_units), Some(c));
                let first = resolve_price(b.catalog(), &q);
                let second = resolve_price(b.catalog(), &q);
                prop_assert_eq!(first, second);
            }
        }
    }
}
