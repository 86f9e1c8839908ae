//! The `PriceList` aggregate: per-product price items over quantity brackets,
//! customer assignments, base-list fallback configuration, bulk repricing and
//! lifecycle. Tenant-scoped; all mutation goes through commands and events.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use backoffice_core::{Aggregate, AggregateId, AggregateRoot, DomainError, DomainResult, Entity, TenantId};
use backoffice_events::Event;

use crate::money::{CurrencyCode, Money};
use crate::validity::ValidityWindow;

/// Price list identifier (tenant-scoped via `tenant_id` fields in events/commands).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriceListId(pub AggregateId);

/// Product identifier (owned by the catalog module; opaque here).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub AggregateId);

/// Customer identifier (owned by the parties module; opaque here).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(pub AggregateId);

macro_rules! impl_aggregate_scoped_id {
    ($t:ty) => {
        impl $t {
            pub fn new(id: AggregateId) -> Self {
                Self(id)
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

impl_aggregate_scoped_id!(PriceListId);
impl_aggregate_scoped_id!(ProductId);
impl_aggregate_scoped_id!(CustomerId);

/// Identifier of one price row inside a list.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriceListItemId(pub Uuid);

/// Identifier of one customer assignment row inside a list.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssignmentId(pub Uuid);

impl PriceListItemId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for PriceListItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl AssignmentId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for AssignmentId {
    fn default() -> Self {
        Self::new()
    }
}

/// Kind of price list. Closed set; resolution does not branch on it today,
/// but keeping it a tagged variant stops behavior from widening silently
/// through string comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceListType {
    Standard,
    Customer,
    Promotional,
    Contract,
}

/// One per-product price row, valid over an inclusive quantity bracket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceListItem {
    pub id: PriceListItemId,
    pub product_id: ProductId,
    /// Display-only denormalized product data; not authoritative.
    pub product_code: String,
    pub product_name: String,
    pub unit_price: Money,
    pub unit_of_measure: String,
    /// Inclusive lower bound of the quantity bracket (>= 1).
    pub min_quantity: Decimal,
    /// Inclusive upper bound; unbounded when absent.
    pub max_quantity: Option<Decimal>,
    /// Informational only; the stored `unit_price` is already effective.
    pub discount_percentage: Option<Decimal>,
    pub previous_price: Option<Money>,
    pub last_price_update: DateTime<Utc>,
    pub is_active: bool,
}

impl PriceListItem {
    /// Inclusive bracket containment: `min <= qty <= (max ?? ∞)`.
    pub fn bracket_contains(&self, quantity: Decimal) -> bool {
        self.min_quantity <= quantity && self.max_quantity.is_none_or(|max| quantity <= max)
    }
}

impl Entity for PriceListItem {
    type Id = PriceListItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// One customer's grant of access to a list, with its own validity window
/// independent of the list's.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceListCustomer {
    pub id: AssignmentId,
    pub customer_id: CustomerId,
    /// Display-only denormalized customer name.
    pub customer_name: String,
    pub window: ValidityWindow,
    pub is_active: bool,
}

impl PriceListCustomer {
    pub fn applies_at(&self, at: DateTime<Utc>) -> bool {
        self.is_active && self.window.contains(at)
    }
}

impl Entity for PriceListCustomer {
    type Id = AssignmentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Aggregate root: PriceList.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceList {
    id: PriceListId,
    tenant_id: Option<TenantId>,
    code: String,
    name: String,
    description: Option<String>,
    list_type: PriceListType,
    currency: Option<CurrencyCode>,
    window: Option<ValidityWindow>,
    is_tax_included: bool,
    /// Lower value = higher precedence during resolution. Ties are allowed.
    priority: i32,
    /// Advisory only; not enforced by the resolution engine.
    minimum_order_amount: Option<Money>,
    base_price_list_id: Option<PriceListId>,
    base_adjustment_percentage: Option<Decimal>,
    sales_territory_id: Option<Uuid>,
    customer_segment: Option<String>,
    is_active: bool,
    created_at: Option<DateTime<Utc>>,
    items: Vec<PriceListItem>,
    assignments: Vec<PriceListCustomer>,
    version: u64,
    created: bool,
}

impl PriceList {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: PriceListId) -> Self {
        Self {
            id,
            tenant_id: None,
            code: String::new(),
            name: String::new(),
            description: None,
            list_type: PriceListType::Standard,
            currency: None,
            window: None,
            is_tax_included: false,
            priority: 0,
            minimum_order_amount: None,
            base_price_list_id: None,
            base_adjustment_percentage: None,
            sales_territory_id: None,
            customer_segment: None,
            is_active: false,
            created_at: None,
            items: Vec::new(),
            assignments: Vec::new(),
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> PriceListId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn list_type(&self) -> PriceListType {
        self.list_type
    }

    pub fn currency(&self) -> Option<&CurrencyCode> {
        self.currency.as_ref()
    }

    pub fn window(&self) -> Option<ValidityWindow> {
        self.window
    }

    pub fn is_tax_included(&self) -> bool {
        self.is_tax_included
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn minimum_order_amount(&self) -> Option<&Money> {
        self.minimum_order_amount.as_ref()
    }

    pub fn base_price_list_id(&self) -> Option<PriceListId> {
        self.base_price_list_id
    }

    pub fn base_adjustment_percentage(&self) -> Option<Decimal> {
        self.base_adjustment_percentage
    }

    pub fn sales_territory_id(&self) -> Option<Uuid> {
        self.sales_territory_id
    }

    pub fn customer_segment(&self) -> Option<&str> {
        self.customer_segment.as_deref()
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn items(&self) -> &[PriceListItem] {
        &self.items
    }

    pub fn assignments(&self) -> &[PriceListCustomer] {
        &self.assignments
    }

    /// Whether the list's own window contains `at` (false before creation).
    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        self.created && self.window.is_some_and(|w| w.contains(at))
    }

    /// A list with no assignment rows at all is public; otherwise the customer
    /// needs an active, in-window assignment.
    pub fn applies_to_customer(&self, customer_id: CustomerId, at: DateTime<Utc>) -> bool {
        self.assignments.is_empty() || self.has_active_assignment_for(customer_id, at)
    }

    pub fn has_active_assignment_for(&self, customer_id: CustomerId, at: DateTime<Utc>) -> bool {
        self.assignments
            .iter()
            .any(|a| a.customer_id == customer_id && a.applies_at(at))
    }

    /// Single-list lookup: the active item for `product_id` whose bracket
    /// contains `quantity`.
    ///
    /// Never follows the base-list chain; the resolution engine owns chain
    /// traversal across the catalog.
    pub fn product_price(
        &self,
        product_id: ProductId,
        quantity: Decimal,
    ) -> DomainResult<&PriceListItem> {
        self.items
            .iter()
            .find(|i| i.is_active && i.product_id == product_id && i.bracket_contains(quantity))
            .ok_or(DomainError::NotFound)
    }
}

impl AggregateRoot for PriceList {
    type Id = PriceListId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreatePriceList.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePriceList {
    pub tenant_id: TenantId,
    pub price_list_id: PriceListId,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub list_type: PriceListType,
    pub currency: CurrencyCode,
    pub valid_from: DateTime<Utc>,
    pub valid_to: Option<DateTime<Utc>>,
    pub is_tax_included: bool,
    pub priority: i32,
    pub minimum_order_amount: Option<Money>,
    pub sales_territory_id: Option<Uuid>,
    pub customer_segment: Option<String>,
    /// Lists are inactive by construction unless the caller opts in.
    pub activate_immediately: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddItem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddItem {
    pub tenant_id: TenantId,
    pub price_list_id: PriceListId,
    pub item_id: PriceListItemId,
    pub product_id: ProductId,
    pub product_code: String,
    pub product_name: String,
    pub unit_price: Money,
    pub unit_of_measure: String,
    pub min_quantity: Decimal,
    pub max_quantity: Option<Decimal>,
    pub discount_percentage: Option<Decimal>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateItemPrice (all brackets of the product).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateItemPrice {
    pub tenant_id: TenantId,
    pub price_list_id: PriceListId,
    pub product_id: ProductId,
    pub new_price: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RemoveItem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveItem {
    pub tenant_id: TenantId,
    pub price_list_id: PriceListId,
    pub item_id: PriceListItemId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AssignCustomer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignCustomer {
    pub tenant_id: TenantId,
    pub price_list_id: PriceListId,
    pub assignment_id: AssignmentId,
    pub customer_id: CustomerId,
    pub customer_name: String,
    pub valid_from: DateTime<Utc>,
    pub valid_to: Option<DateTime<Utc>>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RemoveCustomerAssignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveCustomerAssignment {
    pub tenant_id: TenantId,
    pub price_list_id: PriceListId,
    pub customer_id: CustomerId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ApplyBulkAdjustment (repricing campaign).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyBulkAdjustment {
    pub tenant_id: TenantId,
    pub price_list_id: PriceListId,
    /// Percentage change; `+15` raises every active item by 15%.
    pub percentage_change: Decimal,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ActivatePriceList.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivatePriceList {
    pub tenant_id: TenantId,
    pub price_list_id: PriceListId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DeactivatePriceList.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeactivatePriceList {
    pub tenant_id: TenantId,
    pub price_list_id: PriceListId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateValidityPeriod.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateValidityPeriod {
    pub tenant_id: TenantId,
    pub price_list_id: PriceListId,
    pub valid_from: DateTime<Utc>,
    pub valid_to: Option<DateTime<Utc>>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SetBasePriceList (fallback configuration).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetBasePriceList {
    pub tenant_id: TenantId,
    pub price_list_id: PriceListId,
    pub base_price_list_id: PriceListId,
    /// Applied to the base list's resolved price, compounding per hop.
    pub adjustment_percentage: Decimal,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceListCommand {
    CreatePriceList(CreatePriceList),
    AddItem(AddItem),
    UpdateItemPrice(UpdateItemPrice),
    RemoveItem(RemoveItem),
    AssignCustomer(AssignCustomer),
    RemoveCustomerAssignment(RemoveCustomerAssignment),
    ApplyBulkAdjustment(ApplyBulkAdjustment),
    ActivatePriceList(ActivatePriceList),
    DeactivatePriceList(DeactivatePriceList),
    UpdateValidityPeriod(UpdateValidityPeriod),
    SetBasePriceList(SetBasePriceList),
}

/// Event: PriceListCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceListCreated {
    pub tenant_id: TenantId,
    pub price_list_id: PriceListId,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub list_type: PriceListType,
    pub currency: CurrencyCode,
    pub window: ValidityWindow,
    pub is_tax_included: bool,
    pub priority: i32,
    pub minimum_order_amount: Option<Money>,
    pub sales_territory_id: Option<Uuid>,
    pub customer_segment: Option<String>,
    pub is_active: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ItemAdded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemAdded {
    pub tenant_id: TenantId,
    pub price_list_id: PriceListId,
    pub item_id: PriceListItemId,
    pub product_id: ProductId,
    pub product_code: String,
    pub product_name: String,
    pub unit_price: Money,
    pub unit_of_measure: String,
    pub min_quantity: Decimal,
    pub max_quantity: Option<Decimal>,
    pub discount_percentage: Option<Decimal>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ItemPriceUpdated (touches every active bracket of the product).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemPriceUpdated {
    pub tenant_id: TenantId,
    pub price_list_id: PriceListId,
    pub product_id: ProductId,
    pub new_price: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ItemRemoved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRemoved {
    pub tenant_id: TenantId,
    pub price_list_id: PriceListId,
    pub item_id: PriceListItemId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: CustomerAssigned (supersedes any prior active row for the customer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerAssigned {
    pub tenant_id: TenantId,
    pub price_list_id: PriceListId,
    pub assignment_id: AssignmentId,
    pub customer_id: CustomerId,
    pub customer_name: String,
    pub window: ValidityWindow,
    pub occurred_at: DateTime<Utc>,
}

/// Event: CustomerAssignmentRemoved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerAssignmentRemoved {
    pub tenant_id: TenantId,
    pub price_list_id: PriceListId,
    pub customer_id: CustomerId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: BulkAdjustmentApplied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkAdjustmentApplied {
    pub tenant_id: TenantId,
    pub price_list_id: PriceListId,
    pub percentage_change: Decimal,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PriceListActivated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceListActivated {
    pub tenant_id: TenantId,
    pub price_list_id: PriceListId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PriceListDeactivated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceListDeactivated {
    pub tenant_id: TenantId,
    pub price_list_id: PriceListId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ValidityPeriodUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidityPeriodUpdated {
    pub tenant_id: TenantId,
    pub price_list_id: PriceListId,
    pub window: ValidityWindow,
    pub occurred_at: DateTime<Utc>,
}

/// Event: BasePriceListSet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasePriceListSet {
    pub tenant_id: TenantId,
    pub price_list_id: PriceListId,
    pub base_price_list_id: PriceListId,
    pub adjustment_percentage: Decimal,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceListEvent {
    PriceListCreated(PriceListCreated),
    ItemAdded(ItemAdded),
    ItemPriceUpdated(ItemPriceUpdated),
    ItemRemoved(ItemRemoved),
    CustomerAssigned(CustomerAssigned),
    CustomerAssignmentRemoved(CustomerAssignmentRemoved),
    BulkAdjustmentApplied(BulkAdjustmentApplied),
    PriceListActivated(PriceListActivated),
    PriceListDeactivated(PriceListDeactivated),
    ValidityPeriodUpdated(ValidityPeriodUpdated),
    BasePriceListSet(BasePriceListSet),
}

impl Event for PriceListEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PriceListEvent::PriceListCreated(_) => "sales.price_list.created",
            PriceListEvent::ItemAdded(_) => "sales.price_list.item_added",
            PriceListEvent::ItemPriceUpdated(_) => "sales.price_list.item_price_updated",
            PriceListEvent::ItemRemoved(_) => "sales.price_list.item_removed",
            PriceListEvent::CustomerAssigned(_) => "sales.price_list.customer_assigned",
            PriceListEvent::CustomerAssignmentRemoved(_) => {
                "sales.price_list.customer_assignment_removed"
            }
            PriceListEvent::BulkAdjustmentApplied(_) => "sales.price_list.bulk_adjustment_applied",
            PriceListEvent::PriceListActivated(_) => "sales.price_list.activated",
            PriceListEvent::PriceListDeactivated(_) => "sales.price_list.deactivated",
            PriceListEvent::ValidityPeriodUpdated(_) => "sales.price_list.validity_updated",
            PriceListEvent::BasePriceListSet(_) => "sales.price_list.base_list_set",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            PriceListEvent::PriceListCreated(e) => e.occurred_at,
            PriceListEvent::ItemAdded(e) => e.occurred_at,
            PriceListEvent::ItemPriceUpdated(e) => e.occurred_at,
            PriceListEvent::ItemRemoved(e) => e.occurred_at,
            PriceListEvent::CustomerAssigned(e) => e.occurred_at,
            PriceListEvent::CustomerAssignmentRemoved(e) => e.occurred_at,
            PriceListEvent::BulkAdjustmentApplied(e) => e.occurred_at,
            PriceListEvent::PriceListActivated(e) => e.occurred_at,
            PriceListEvent::PriceListDeactivated(e) => e.occurred_at,
            PriceListEvent::ValidityPeriodUpdated(e) => e.occurred_at,
            PriceListEvent::BasePriceListSet(e) => e.occurred_at,
        }
    }
}

impl Aggregate for PriceList {
    type Command = PriceListCommand;
    type Event = PriceListEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            PriceListEvent::PriceListCreated(e) => {
                self.id = e.price_list_id;
                self.tenant_id = Some(e.tenant_id);
                self.code = e.code.clone();
                self.name = e.name.clone();
                self.description = e.description.clone();
                self.list_type = e.list_type;
                self.currency = Some(e.currency.clone());
                self.window = Some(e.window);
                self.is_tax_included = e.is_tax_included;
                self.priority = e.priority;
                self.minimum_order_amount = e.minimum_order_amount.clone();
                self.sales_territory_id = e.sales_territory_id;
                self.customer_segment = e.customer_segment.clone();
                self.is_active = e.is_active;
                self.created_at = Some(e.occurred_at);
                self.created = true;
            }
            PriceListEvent::ItemAdded(e) => {
                self.items.push(PriceListItem {
                    id: e.item_id,
                    product_id: e.product_id,
                    product_code: e.product_code.clone(),
                    product_name: e.product_name.clone(),
                    unit_price: e.unit_price.clone(),
                    unit_of_measure: e.unit_of_measure.clone(),
                    min_quantity: e.min_quantity,
                    max_quantity: e.max_quantity,
                    discount_percentage: e.discount_percentage,
                    previous_price: None,
                    last_price_update: e.occurred_at,
                    is_active: true,
                });
            }
            PriceListEvent::ItemPriceUpdated(e) => {
                for item in self
                    .items
                    .iter_mut()
                    .filter(|i| i.is_active && i.product_id == e.product_id)
                {
                    item.previous_price = Some(item.unit_price.clone());
                    item.unit_price = e.new_price.clone();
                    item.last_price_update = e.occurred_at;
                }
            }
            PriceListEvent::ItemRemoved(e) => {
                self.items.retain(|i| i.id != e.item_id);
            }
            PriceListEvent::CustomerAssigned(e) => {
                // Never two simultaneously active rows per customer.
                for a in self
                    .assignments
                    .iter_mut()
                    .filter(|a| a.customer_id == e.customer_id && a.is_active)
                {
                    a.is_active = false;
                }
                self.assignments.push(PriceListCustomer {
                    id: e.assignment_id,
                    customer_id: e.customer_id,
                    customer_name: e.customer_name.clone(),
                    window: e.window,
                    is_active: true,
                });
            }
            PriceListEvent::CustomerAssignmentRemoved(e) => {
                for a in self
                    .assignments
                    .iter_mut()
                    .filter(|a| a.customer_id == e.customer_id && a.is_active)
                {
                    a.is_active = false;
                }
            }
            PriceListEvent::BulkAdjustmentApplied(e) => {
                for item in self.items.iter_mut().filter(|i| i.is_active) {
                    // handle refuses adjustments that overflow any row; a row
                    // that still cannot be repriced is left untouched.
                    if let Ok(next) = item.unit_price.apply_percentage(e.percentage_change) {
                        item.previous_price = Some(item.unit_price.clone());
                        item.unit_price = next;
                        item.last_price_update = e.occurred_at;
                    }
                }
            }
            PriceListEvent::PriceListActivated(_) => {
                self.is_active = true;
            }
            PriceListEvent::PriceListDeactivated(_) => {
                self.is_active = false;
            }
            PriceListEvent::ValidityPeriodUpdated(e) => {
                self.window = Some(e.window);
            }
            PriceListEvent::BasePriceListSet(e) => {
                self.base_price_list_id = Some(e.base_price_list_id);
                self.base_adjustment_percentage = Some(e.adjustment_percentage);
            }
        }

        // Deterministic revision tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            PriceListCommand::CreatePriceList(cmd) => self.handle_create(cmd),
            PriceListCommand::AddItem(cmd) => self.handle_add_item(cmd),
            PriceListCommand::UpdateItemPrice(cmd) => self.handle_update_item_price(cmd),
            PriceListCommand::RemoveItem(cmd) => self.handle_remove_item(cmd),
            PriceListCommand::AssignCustomer(cmd) => self.handle_assign_customer(cmd),
            PriceListCommand::RemoveCustomerAssignment(cmd) => {
                self.handle_remove_customer_assignment(cmd)
            }
            PriceListCommand::ApplyBulkAdjustment(cmd) => self.handle_bulk_adjustment(cmd),
            PriceListCommand::ActivatePriceList(cmd) => self.handle_activate(cmd),
            PriceListCommand::DeactivatePriceList(cmd) => self.handle_deactivate(cmd),
            PriceListCommand::UpdateValidityPeriod(cmd) => self.handle_update_validity(cmd),
            PriceListCommand::SetBasePriceList(cmd) => self.handle_set_base(cmd),
        }
    }
}

impl PriceList {
    fn ensure_mutable(&self, tenant_id: TenantId, price_list_id: PriceListId) -> DomainResult<()> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        if self.id != price_list_id {
            return Err(DomainError::invariant("price_list_id mismatch"));
        }
        Ok(())
    }

    fn ensure_list_currency(&self, money: &Money) -> DomainResult<()> {
        match &self.currency {
            Some(currency) if money.currency() == currency => Ok(()),
            Some(currency) => Err(DomainError::validation(format!(
                "price currency {} does not match list currency {}",
                money.currency(),
                currency
            ))),
            None => Err(DomainError::invariant("list has no currency")),
        }
    }

    fn handle_create(&self, cmd: &CreatePriceList) -> DomainResult<Vec<PriceListEvent>> {
        if self.created {
            return Err(DomainError::conflict("price list already exists"));
        }
        if cmd.code.trim().is_empty() {
            return Err(DomainError::validation("code cannot be empty"));
        }
        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }

        let window = ValidityWindow::new(cmd.valid_from, cmd.valid_to)?;

        if let Some(minimum) = &cmd.minimum_order_amount {
            if minimum.currency() != &cmd.currency {
                return Err(DomainError::validation(format!(
                    "minimum order amount currency {} does not match list currency {}",
                    minimum.currency(),
                    cmd.currency
                )));
            }
        }

        // Note: code uniqueness per tenant requires infrastructure support
        // (a read model across lists); the aggregate can only enforce shape.

        Ok(vec![PriceListEvent::PriceListCreated(PriceListCreated {
            tenant_id: cmd.tenant_id,
            price_list_id: cmd.price_list_id,
            code: cmd.code.clone(),
            name: cmd.name.clone(),
            description: cmd.description.clone(),
            list_type: cmd.list_type,
            currency: cmd.currency.clone(),
            window,
            is_tax_included: cmd.is_tax_included,
            priority: cmd.priority,
            minimum_order_amount: cmd.minimum_order_amount.clone(),
            sales_territory_id: cmd.sales_territory_id,
            customer_segment: cmd.customer_segment.clone(),
            is_active: cmd.activate_immediately,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_add_item(&self, cmd: &AddItem) -> DomainResult<Vec<PriceListEvent>> {
        self.ensure_mutable(cmd.tenant_id, cmd.price_list_id)?;
        self.ensure_list_currency(&cmd.unit_price)?;

        if !cmd.unit_price.is_positive() {
            return Err(DomainError::validation("unit price must be positive"));
        }
        if cmd.min_quantity < Decimal::ONE {
            return Err(DomainError::validation("minimum quantity must be at least 1"));
        }
        if let Some(max) = cmd.max_quantity {
            if max < cmd.min_quantity {
                return Err(DomainError::validation(
                    "maximum quantity cannot be below minimum quantity",
                ));
            }
        }

        let overlapping = self.items.iter().any(|i| {
            i.is_active
                && i.product_id == cmd.product_id
                && brackets_overlap(
                    i.min_quantity,
                    i.max_quantity,
                    cmd.min_quantity,
                    cmd.max_quantity,
                )
        });
        if overlapping {
            return Err(DomainError::validation(format!(
                "quantity bracket overlaps an existing bracket for product {}",
                cmd.product_id
            )));
        }

        Ok(vec![PriceListEvent::ItemAdded(ItemAdded {
            tenant_id: cmd.tenant_id,
            price_list_id: cmd.price_list_id,
            item_id: cmd.item_id,
            product_id: cmd.product_id,
            product_code: cmd.product_code.clone(),
            product_name: cmd.product_name.clone(),
            unit_price: cmd.unit_price.rounded(),
            unit_of_measure: cmd.unit_of_measure.clone(),
            min_quantity: cmd.min_quantity,
            max_quantity: cmd.max_quantity,
            discount_percentage: cmd.discount_percentage,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_item_price(&self, cmd: &UpdateItemPrice) -> DomainResult<Vec<PriceListEvent>> {
        self.ensure_mutable(cmd.tenant_id, cmd.price_list_id)?;
        self.ensure_list_currency(&cmd.new_price)?;

        if !cmd.new_price.is_positive() {
            return Err(DomainError::validation("unit price must be positive"));
        }
        if !self
            .items
            .iter()
            .any(|i| i.is_active && i.product_id == cmd.product_id)
        {
            return Err(DomainError::not_found());
        }

        Ok(vec![PriceListEvent::ItemPriceUpdated(ItemPriceUpdated {
            tenant_id: cmd.tenant_id,
            price_list_id: cmd.price_list_id,
            product_id: cmd.product_id,
            new_price: cmd.new_price.rounded(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_remove_item(&self, cmd: &RemoveItem) -> DomainResult<Vec<PriceListEvent>> {
        self.ensure_mutable(cmd.tenant_id, cmd.price_list_id)?;

        if !self.items.iter().any(|i| i.id == cmd.item_id) {
            return Err(DomainError::not_found());
        }

        Ok(vec![PriceListEvent::ItemRemoved(ItemRemoved {
            tenant_id: cmd.tenant_id,
            price_list_id: cmd.price_list_id,
            item_id: cmd.item_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_assign_customer(&self, cmd: &AssignCustomer) -> DomainResult<Vec<PriceListEvent>> {
        self.ensure_mutable(cmd.tenant_id, cmd.price_list_id)?;

        if cmd.customer_name.trim().is_empty() {
            return Err(DomainError::validation("customer name cannot be empty"));
        }
        let window = ValidityWindow::new(cmd.valid_from, cmd.valid_to)?;

        Ok(vec![PriceListEvent::CustomerAssigned(CustomerAssigned {
            tenant_id: cmd.tenant_id,
            price_list_id: cmd.price_list_id,
            assignment_id: cmd.assignment_id,
            customer_id: cmd.customer_id,
            customer_name: cmd.customer_name.clone(),
            window,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_remove_customer_assignment(
        &self,
        cmd: &RemoveCustomerAssignment,
    ) -> DomainResult<Vec<PriceListEvent>> {
        self.ensure_mutable(cmd.tenant_id, cmd.price_list_id)?;

        if !self
            .assignments
            .iter()
            .any(|a| a.customer_id == cmd.customer_id && a.is_active)
        {
            return Err(DomainError::not_found());
        }

        Ok(vec![PriceListEvent::CustomerAssignmentRemoved(
            CustomerAssignmentRemoved {
                tenant_id: cmd.tenant_id,
                price_list_id: cmd.price_list_id,
                customer_id: cmd.customer_id,
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_bulk_adjustment(&self, cmd: &ApplyBulkAdjustment) -> DomainResult<Vec<PriceListEvent>> {
        self.ensure_mutable(cmd.tenant_id, cmd.price_list_id)?;

        // A change of -100% or below would produce non-positive prices.
        if cmd.percentage_change <= -Decimal::ONE_HUNDRED {
            return Err(DomainError::validation(
                "percentage change must be greater than -100",
            ));
        }

        // Every active row must survive the repricing.
        for item in self.items.iter().filter(|i| i.is_active) {
            item.unit_price.apply_percentage(cmd.percentage_change)?;
        }

        Ok(vec![PriceListEvent::BulkAdjustmentApplied(
            BulkAdjustmentApplied {
                tenant_id: cmd.tenant_id,
                price_list_id: cmd.price_list_id,
                percentage_change: cmd.percentage_change,
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_activate(&self, cmd: &ActivatePriceList) -> DomainResult<Vec<PriceListEvent>> {
        self.ensure_mutable(cmd.tenant_id, cmd.price_list_id)?;

        if self.is_active {
            return Err(DomainError::conflict("price list is already active"));
        }

        Ok(vec![PriceListEvent::PriceListActivated(PriceListActivated {
            tenant_id: cmd.tenant_id,
            price_list_id: cmd.price_list_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_deactivate(&self, cmd: &DeactivatePriceList) -> DomainResult<Vec<PriceListEvent>> {
        self.ensure_mutable(cmd.tenant_id, cmd.price_list_id)?;

        if !self.is_active {
            return Err(DomainError::conflict("price list is already inactive"));
        }

        Ok(vec![PriceListEvent::PriceListDeactivated(
            PriceListDeactivated {
                tenant_id: cmd.tenant_id,
                price_list_id: cmd.price_list_id,
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_update_validity(&self, cmd: &UpdateValidityPeriod) -> DomainResult<Vec<PriceListEvent>> {
        self.ensure_mutable(cmd.tenant_id, cmd.price_list_id)?;

        let window = ValidityWindow::new(cmd.valid_from, cmd.valid_to)?;

        Ok(vec![PriceListEvent::ValidityPeriodUpdated(
            ValidityPeriodUpdated {
                tenant_id: cmd.tenant_id,
                price_list_id: cmd.price_list_id,
                window,
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_set_base(&self, cmd: &SetBasePriceList) -> DomainResult<Vec<PriceListEvent>> {
        self.ensure_mutable(cmd.tenant_id, cmd.price_list_id)?;

        // Only the trivial self-cycle is visible from inside one aggregate;
        // multi-hop cycles are caught at resolution time.
        if cmd.base_price_list_id == self.id {
            return Err(DomainError::validation(
                "a price list cannot be its own base",
            ));
        }
        if cmd.adjustment_percentage <= -Decimal::ONE_HUNDRED {
            return Err(DomainError::validation(
                "adjustment percentage must be greater than -100",
            ));
        }

        Ok(vec![PriceListEvent::BasePriceListSet(BasePriceListSet {
            tenant_id: cmd.tenant_id,
            price_list_id: cmd.price_list_id,
            base_price_list_id: cmd.base_price_list_id,
            adjustment_percentage: cmd.adjustment_percentage,
            occurred_at: cmd.occurred_at,
        })])
    }
}

/// Inclusive interval overlap against `[min, max ?? ∞]`.
fn brackets_overlap(
    a_min: Decimal,
    a_max: Option<Decimal>,
    b_min: Decimal,
    b_max: Option<Decimal>,
) -> bool {
    let a_max = a_max.unwrap_or(Decimal::MAX);
    let b_max = b_max.unwrap_or(Decimal::MAX);
    a_min <= b_max && b_min <= a_max
}
