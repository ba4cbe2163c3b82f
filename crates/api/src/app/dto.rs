use serde::Deserialize;
use serde_json::{json, Value};

use fairmart_core::{CustomerId, ItemId, Money, ShopId};
use fairmart_infra::store::{CatalogEntry, InventoryView, OrderPage, OrderView};
use fairmart_infra::{MarketError, OrderDetail};
use fairmart_inventory::{InventoryAdjustment, InventoryRecord, StockMode, StockUpsert};
use fairmart_orders::{NewOrder, OrderStats, OrderStatus, OrderStatusEvent};

// -------------------------
// Request DTOs
// -------------------------

/// Numeric fields are signed so a negative value is reported as an invalid
/// request instead of a deserialization failure. Prices are taka with up to
/// two decimals, sent as a JSON number or string, and become paisa here.
#[derive(Debug, Deserialize)]
pub struct UpsertStockRequest {
    pub shop_id: Option<String>,
    pub item_id: Option<String>,
    pub quantity: Option<i64>,
    pub unit_price: Option<Value>,
    pub low_stock_threshold: Option<i64>,
    #[serde(default)]
    pub mode: StockMode,
}

impl UpsertStockRequest {
    pub fn into_upsert(self) -> Result<(ItemId, StockUpsert), MarketError> {
        let item_id = parse_id::<ItemId>("item_id", self.item_id.as_deref())?;
        let upsert = StockUpsert {
            quantity: non_negative("quantity", required("quantity", self.quantity)?)?,
            unit_price: price(&required("unit_price", self.unit_price)?)?,
            low_stock_threshold: self
                .low_stock_threshold
                .map(|t| non_negative("low_stock_threshold", t))
                .transpose()?,
            mode: self.mode,
        };
        Ok((item_id, upsert))
    }
}

#[derive(Debug, Deserialize)]
pub struct AdjustInventoryRequest {
    pub quantity: Option<i64>,
    pub unit_price: Option<Value>,
    pub low_stock_threshold: Option<i64>,
    pub is_active: Option<bool>,
}

impl AdjustInventoryRequest {
    pub fn into_adjustment(self) -> Result<InventoryAdjustment, MarketError> {
        Ok(InventoryAdjustment {
            quantity: self
                .quantity
                .map(|q| non_negative("quantity", q))
                .transpose()?,
            unit_price: self.unit_price.as_ref().map(price).transpose()?,
            low_stock_threshold: self
                .low_stock_threshold
                .map(|t| non_negative("low_stock_threshold", t))
                .transpose()?,
            is_active: self.is_active,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    pub shop_id: Option<String>,
    pub item_id: Option<String>,
    pub quantity: Option<i64>,
    pub delivery_address: Option<String>,
    pub delivery_phone: Option<String>,
    pub notes: Option<String>,
}

impl PlaceOrderRequest {
    pub fn into_new_order(self, customer_id: CustomerId) -> Result<NewOrder, MarketError> {
        let quantity = required("quantity", self.quantity)?;
        if quantity <= 0 {
            return Err(MarketError::invalid("quantity must be greater than zero"));
        }
        Ok(NewOrder {
            customer_id,
            shop_id: parse_id::<ShopId>("shop_id", self.shop_id.as_deref())?,
            item_id: parse_id::<ItemId>("item_id", self.item_id.as_deref())?,
            quantity: non_negative("quantity", quantity)?,
            delivery_address: required("delivery_address", self.delivery_address)?,
            delivery_phone: required("delivery_phone", self.delivery_phone)?,
            notes: self.notes.filter(|n| !n.trim().is_empty()),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelOrderRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub new_status: Option<String>,
    pub notes: Option<String>,
}

impl UpdateStatusRequest {
    pub fn status(&self) -> Result<OrderStatus, MarketError> {
        let raw = required("new_status", self.new_status.as_deref())?;
        Ok(raw.parse()?)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct InventoryQuery {
    pub low_stock: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListOrdersQuery {
    pub status: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ListOrdersQuery {
    pub fn status(&self) -> Result<Option<OrderStatus>, MarketError> {
        match self.status.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => Ok(Some(raw.parse()?)),
        }
    }
}

fn required<T>(field: &str, value: Option<T>) -> Result<T, MarketError> {
    value.ok_or_else(|| MarketError::invalid(format!("{field} is required")))
}

fn parse_id<T: core::str::FromStr>(field: &str, raw: Option<&str>) -> Result<T, MarketError> {
    required(field, raw)?
        .parse()
        .map_err(|_| MarketError::invalid(format!("{field} is not a valid id")))
}

fn non_negative(field: &str, value: i64) -> Result<u32, MarketError> {
    u32::try_from(value).map_err(|_| MarketError::invalid(format!("{field} must be between 0 and {}", u32::MAX)))
}

fn price(value: &Value) -> Result<Money, MarketError> {
    let raw = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        _ => return Err(MarketError::invalid("unit_price must be a number")),
    };
    let amount = Money::parse_decimal(&raw)
        .map_err(|_| MarketError::invalid("unit_price must be a positive amount with at most 2 decimals"))?;
    if amount.is_zero() {
        return Err(MarketError::invalid("unit_price must be positive"));
    }
    Ok(amount)
}

fn taka(amount: Money) -> Value {
    json!(amount.as_decimal())
}

// -------------------------
// Response mapping
// -------------------------

pub fn catalog_entry_to_json(entry: &CatalogEntry) -> Value {
    json!({
        "id": entry.item.id.to_string(),
        "category_id": entry.item.category_id.to_string(),
        "category_name": entry.category_name,
        "name": entry.item.name,
        "unit": entry.item.unit,
        "min_price": entry.item.band.min_price.map(taka),
        "max_price": entry.item.band.max_price.map(taka),
    })
}

pub fn record_to_json(record: &InventoryRecord) -> Value {
    json!({
        "shop_id": record.shop_id().to_string(),
        "item_id": record.item_id().to_string(),
        "quantity": record.quantity(),
        "unit_price": taka(record.unit_price()),
        "low_stock_threshold": record.low_stock_threshold(),
        "is_active": record.is_active(),
        "is_low_stock": record.is_low_stock(),
        "created_at": record.created_at().to_rfc3339(),
        "updated_at": record.updated_at().to_rfc3339(),
    })
}

pub fn inventory_view_to_json(view: &InventoryView) -> Value {
    let mut out = record_to_json(&view.record);
    out["item_name"] = json!(view.item_name);
    out["unit"] = json!(view.unit);
    out["category_name"] = json!(view.category_name);
    out
}

pub fn order_view_to_json(view: &OrderView) -> Value {
    let order = &view.order;
    json!({
        "id": order.id().to_string(),
        "order_number": order.order_number().to_string(),
        "customer_id": order.customer_id().to_string(),
        "shop_id": order.shop_id().to_string(),
        "item_id": order.item_id().to_string(),
        "quantity": order.quantity(),
        "unit_price": taka(order.unit_price()),
        "total_amount": taka(order.total_amount()),
        "delivery_address": order.delivery_address(),
        "delivery_phone": order.delivery_phone(),
        "notes": order.notes(),
        "status": order.status().as_str(),
        "cancellation_reason": order.cancellation_reason(),
        "estimated_delivery": order.estimated_delivery().to_rfc3339(),
        "created_at": order.created_at().to_rfc3339(),
        "updated_at": order.updated_at().to_rfc3339(),
        "item_name": view.item_name,
        "unit": view.unit,
        "shop": view.shop,
        "customer": view.customer,
    })
}

pub fn event_to_json(event: &OrderStatusEvent) -> Value {
    json!({
        "old_status": event.old_status.map(|s| s.as_str()),
        "new_status": event.new_status.as_str(),
        "changed_by": event.changed_by.as_str(),
        "notes": event.notes,
        "created_at": event.created_at.to_rfc3339(),
    })
}

pub fn order_detail_to_json(detail: &OrderDetail) -> Value {
    let mut out = order_view_to_json(&detail.view);
    out["history"] = Value::Array(detail.history.iter().map(event_to_json).collect());
    out
}

pub fn order_page_to_json(page: &OrderPage) -> Value {
    json!({
        "items": page.items.iter().map(order_view_to_json).collect::<Vec<_>>(),
        "page": page.page.page,
        "limit": page.page.limit,
        "total": page.total,
        "has_more": page.has_more,
    })
}

pub fn order_stats_to_json(stats: &OrderStats) -> Value {
    json!({
        "total_orders": stats.total_orders,
        "by_status": stats.by_status,
        "total_spent": taka(stats.total_spent),
        "average_order_value": taka(stats.average_order_value),
        "recent_orders": stats.recent_orders,
        "recent_delivered": stats.recent_delivered,
    })
}
