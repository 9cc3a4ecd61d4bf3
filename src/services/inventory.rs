//! Inventory service: consumables, central storage, purchase orders, F&B
//! counter stock, and gift shop retail.
//!
//! DESIGN
//! ======
//! Counters are plain maps keyed by item name. Quantities never go below
//! zero; decrements clamp. The only cross-entity rule lives in
//! `record_sale`: a sale that leaves F&B stock under the low-stock threshold
//! files one urgent restock request, and no further request for that item
//! until the open one completes.

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::frame::ErrorCode;
use crate::services::restock::{NewRestock, RestockBoard, RestockError, RestockTask};

/// Stock at or below this fraction of par counts as low.
const RETAIL_LOW_FRACTION: f64 = 0.3;

/// Units added to every retail line when a shipment is received.
const SHIPMENT_UNITS_PER_ITEM: u32 = 20;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PoStatus {
    Pending,
    Reconciled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoLine {
    pub item: String,
    pub expected: u32,
    pub received: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseOrder {
    pub id: String,
    pub items: Vec<PoLine>,
    pub status: PoStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetailItem {
    pub id: String,
    pub name: String,
    pub stock: u32,
    pub par: u32,
    pub price: f64,
    pub is_high_value: bool,
}

impl RetailItem {
    #[must_use]
    pub fn is_below_par(&self) -> bool {
        f64::from(self.stock) <= f64::from(self.par) * RETAIL_LOW_FRACTION
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShipmentStatus {
    Pending,
    Received,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shipment {
    pub id: String,
    pub manifest: String,
    pub expected_items: u32,
    pub status: ShipmentStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReturnAction {
    BackToShelf,
    Damaged,
    ReturnToVendor,
}

/// Result of one F&B counter sale.
#[derive(Debug, Clone, Serialize)]
pub struct SaleOutcome {
    pub item: String,
    pub stock: u32,
    /// Restock filed by this sale, if it crossed the threshold.
    pub restock: Option<RestockTask>,
}

#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    #[error("unknown item: {0}")]
    UnknownItem(String),
    #[error("purchase order not found: {0}")]
    PoNotFound(String),
    #[error("{item} is not on purchase order {po}")]
    NotOnPo { po: String, item: String },
    #[error("shipment not found: {0}")]
    ShipmentNotFound(String),
    #[error("shipment {0} already received")]
    ShipmentReceived(String),
    #[error("quantity must be positive")]
    InvalidQuantity,
    #[error("return reason required")]
    MissingReason,
    #[error(transparent)]
    Restock(#[from] RestockError),
}

impl ErrorCode for InventoryError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownItem(_) => "E_UNKNOWN_ITEM",
            Self::PoNotFound(_) => "E_PO_NOT_FOUND",
            Self::NotOnPo { .. } => "E_NOT_ON_PO",
            Self::ShipmentNotFound(_) => "E_SHIPMENT_NOT_FOUND",
            Self::ShipmentReceived(_) => "E_SHIPMENT_RECEIVED",
            Self::InvalidQuantity => "E_INVALID_QUANTITY",
            Self::MissingReason => "E_RETURN_REASON",
            Self::Restock(e) => e.error_code(),
        }
    }
}

// =============================================================================
// STORE
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct Inventory {
    consumables: BTreeMap<String, u32>,
    central_storage: BTreeMap<String, u32>,
    purchase_orders: Vec<PurchaseOrder>,
    fnb_stock: BTreeMap<String, u32>,
    retail: Vec<RetailItem>,
    shipments: Vec<Shipment>,
    shrinkage_alerts: Vec<String>,
}

fn counters(seed: &[(&str, u32)]) -> BTreeMap<String, u32> {
    seed.iter().map(|(name, qty)| ((*name).to_owned(), *qty)).collect()
}

fn retail_item(id: &str, name: &str, stock: u32, par: u32, price: f64, is_high_value: bool) -> RetailItem {
    RetailItem { id: id.to_owned(), name: name.to_owned(), stock, par, price, is_high_value }
}

impl Default for Inventory {
    fn default() -> Self {
        Self {
            consumables: counters(&[("Bandages", 100), ("Ice Packs", 50), ("Antiseptic", 30)]),
            central_storage: counters(&[("Napkins", 1000), ("Bottled Water", 500)]),
            purchase_orders: vec![PurchaseOrder {
                id: "PO-1001".into(),
                items: vec![
                    PoLine { item: "Napkins".into(), expected: 500, received: 0 },
                    PoLine { item: "Bottled Water".into(), expected: 200, received: 0 },
                ],
                status: PoStatus::Pending,
            }],
            fnb_stock: counters(&[("Bottled Water", 100), ("Pre-packaged Meals", 45), ("Energy Snacks", 15)]),
            retail: vec![
                retail_item("GS-01", "Leviathan Plushie", 12, 50, 35.0, false),
                retail_item("GS-02", "Aether Crystal Replica", 4, 20, 150.0, true),
                retail_item("GS-03", "Zone 4 T-Shirt (L)", 45, 60, 25.0, false),
                retail_item("GS-04", "Bioluminescent Lantern", 8, 15, 85.0, true),
            ],
            shipments: vec![Shipment {
                id: "SHP-101".into(),
                manifest: "Daily Replenishment - AM".into(),
                expected_items: 120,
                status: ShipmentStatus::Pending,
            }],
            shrinkage_alerts: Vec::new(),
        }
    }
}

impl Inventory {
    // -------------------------------------------------------------------------
    // Consumables (medical supplies)
    // -------------------------------------------------------------------------

    /// Draw down a consumable, clamping at zero. Returns the new count.
    /// Untracked items start a counter at zero.
    pub fn use_consumable(&mut self, item: &str, amount: u32) -> u32 {
        let count = self.consumables.entry(item.to_owned()).or_insert(0);
        *count = count.saturating_sub(amount);
        *count
    }

    /// Add stock to a consumable. Unknown items start a new counter.
    ///
    /// # Errors
    ///
    /// `InvalidQuantity` for zero amounts.
    pub fn restock_consumable(&mut self, item: &str, amount: u32) -> Result<u32, InventoryError> {
        if amount == 0 {
            return Err(InventoryError::InvalidQuantity);
        }
        let count = self.consumables.entry(item.to_owned()).or_insert(0);
        *count = count.saturating_add(amount);
        Ok(*count)
    }

    #[must_use]
    pub fn consumables(&self) -> &BTreeMap<String, u32> {
        &self.consumables
    }

    // -------------------------------------------------------------------------
    // Central storage + purchase orders
    // -------------------------------------------------------------------------

    /// Receive `quantity` of `item` against a purchase order. Bumps the
    /// received count, marks the PO reconciled, and credits central storage.
    ///
    /// # Errors
    ///
    /// `PoNotFound`, `NotOnPo`, or `InvalidQuantity`.
    pub fn intake(&mut self, po_id: &str, item: &str, quantity: u32) -> Result<PurchaseOrder, InventoryError> {
        if quantity == 0 {
            return Err(InventoryError::InvalidQuantity);
        }
        let po = self
            .purchase_orders
            .iter_mut()
            .find(|po| po.id == po_id)
            .ok_or_else(|| InventoryError::PoNotFound(po_id.to_owned()))?;
        let line = po
            .items
            .iter_mut()
            .find(|line| line.item == item)
            .ok_or_else(|| InventoryError::NotOnPo { po: po_id.to_owned(), item: item.to_owned() })?;
        line.received = line.received.saturating_add(quantity);
        po.status = PoStatus::Reconciled;
        let po = po.clone();

        let stored = self.central_storage.entry(item.to_owned()).or_insert(0);
        *stored = stored.saturating_add(quantity);
        Ok(po)
    }

    #[must_use]
    pub fn central_storage(&self) -> &BTreeMap<String, u32> {
        &self.central_storage
    }

    #[must_use]
    pub fn purchase_orders(&self) -> &[PurchaseOrder] {
        &self.purchase_orders
    }

    // -------------------------------------------------------------------------
    // F&B counter
    // -------------------------------------------------------------------------

    /// Sell one unit at the F&B counter.
    ///
    /// When the remaining stock is under `threshold` and no request for the
    /// item is open, one urgent restock of `restock_quantity` is filed.
    ///
    /// # Errors
    ///
    /// `UnknownItem` for items not sold at the counter.
    pub fn record_sale(
        &mut self,
        item: &str,
        threshold: u32,
        restock_quantity: u32,
        requested_by: &str,
        restock: &mut RestockBoard,
    ) -> Result<SaleOutcome, InventoryError> {
        let stock = self
            .fnb_stock
            .get_mut(item)
            .ok_or_else(|| InventoryError::UnknownItem(item.to_owned()))?;
        *stock = stock.saturating_sub(1);
        let remaining = *stock;

        let filed = if remaining < threshold && !restock.has_open_request(item) {
            Some(restock.request(NewRestock {
                item: item.to_owned(),
                quantity: restock_quantity,
                is_urgent: true,
                status_details: Some(format!("Below Par: {remaining} units")),
                requested_by: requested_by.to_owned(),
            })?)
        } else {
            None
        };

        Ok(SaleOutcome { item: item.to_owned(), stock: remaining, restock: filed })
    }

    #[must_use]
    pub fn fnb_stock(&self) -> &BTreeMap<String, u32> {
        &self.fnb_stock
    }

    // -------------------------------------------------------------------------
    // Retail
    // -------------------------------------------------------------------------

    /// Receive a pending shipment: every retail line gains 20 units.
    ///
    /// # Errors
    ///
    /// `ShipmentNotFound`, or `ShipmentReceived` when already received.
    pub fn receive_shipment(&mut self, shipment_id: &str) -> Result<Shipment, InventoryError> {
        let shipment = self
            .shipments
            .iter_mut()
            .find(|s| s.id == shipment_id)
            .ok_or_else(|| InventoryError::ShipmentNotFound(shipment_id.to_owned()))?;
        if shipment.status == ShipmentStatus::Received {
            return Err(InventoryError::ShipmentReceived(shipment_id.to_owned()));
        }
        shipment.status = ShipmentStatus::Received;
        let shipment = shipment.clone();

        for item in &mut self.retail {
            item.stock = item.stock.saturating_add(SHIPMENT_UNITS_PER_ITEM);
        }
        Ok(shipment)
    }

    /// Write off one damaged unit, if any are on hand.
    ///
    /// # Errors
    ///
    /// `UnknownItem` when no retail line has that name.
    pub fn report_damage(&mut self, name: &str) -> Result<RetailItem, InventoryError> {
        let item = self.retail_mut(name)?;
        item.stock = item.stock.saturating_sub(1);
        Ok(item.clone())
    }

    /// Process a guest return. Only `BackToShelf` puts the unit back.
    ///
    /// # Errors
    ///
    /// `MissingReason` for blank reasons, `UnknownItem` for unknown names.
    pub fn process_return(
        &mut self,
        name: &str,
        reason: &str,
        action: ReturnAction,
    ) -> Result<RetailItem, InventoryError> {
        if reason.trim().is_empty() {
            return Err(InventoryError::MissingReason);
        }
        let item = self.retail_mut(name)?;
        if action == ReturnAction::BackToShelf {
            item.stock = item.stock.saturating_add(1);
        }
        Ok(item.clone())
    }

    /// Compare a physical count with the system count. A mismatch records and
    /// returns a shrinkage alert.
    ///
    /// # Errors
    ///
    /// `UnknownItem` when no retail line has that ID.
    pub fn cycle_count(&mut self, item_id: &str, physical: u32) -> Result<Option<String>, InventoryError> {
        let item = self
            .retail
            .iter()
            .find(|i| i.id == item_id)
            .ok_or_else(|| InventoryError::UnknownItem(item_id.to_owned()))?;
        if item.stock == physical {
            return Ok(None);
        }
        let alert = format!("Discrepancy found: {}. System: {}, Physical: {physical}", item.name, item.stock);
        self.shrinkage_alerts.insert(0, alert.clone());
        Ok(Some(alert))
    }

    /// File a restock for a retail line. Urgent when below par.
    ///
    /// # Errors
    ///
    /// `UnknownItem`, or the restock board's validation errors.
    pub fn request_retail_restock(
        &self,
        item_id: &str,
        requested_by: &str,
        restock: &mut RestockBoard,
    ) -> Result<RestockTask, InventoryError> {
        let item = self
            .retail
            .iter()
            .find(|i| i.id == item_id)
            .ok_or_else(|| InventoryError::UnknownItem(item_id.to_owned()))?;
        let task = restock.request(NewRestock {
            item: item.name.clone(),
            quantity: item.par.saturating_sub(item.stock).max(1),
            is_urgent: item.is_below_par(),
            status_details: Some(format!("Below Par: {} units", item.stock)),
            requested_by: requested_by.to_owned(),
        })?;
        Ok(task)
    }

    #[must_use]
    pub fn retail(&self) -> &[RetailItem] {
        &self.retail
    }

    #[must_use]
    pub fn shipments(&self) -> &[Shipment] {
        &self.shipments
    }

    #[must_use]
    pub fn shrinkage_alerts(&self) -> &[String] {
        &self.shrinkage_alerts
    }

    fn retail_mut(&mut self, name: &str) -> Result<&mut RetailItem, InventoryError> {
        self.retail
            .iter_mut()
            .find(|i| i.name == name)
            .ok_or_else(|| InventoryError::UnknownItem(name.to_owned()))
    }
}

/// Simulated supply-room count: a random multiple of 10 below 500.
#[must_use]
pub fn simulated_supply_count() -> u32 {
    rand::rng().random_range(0..50u32) * 10
}

#[cfg(test)]
#[path = "inventory_test.rs"]
mod tests;
