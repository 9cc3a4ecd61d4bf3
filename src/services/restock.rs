//! Restock service: dispatch queue between crew dashboards and runners.
//!
//! DESIGN
//! ======
//! Any crew dashboard files a request; the runner picks it up and delivers
//! it. Tasks move strictly PENDING -> IN_TRANSIT -> COMPLETED. The queue has
//! no priority algorithm beyond an urgency sort, and completed tasks stay in
//! the board for the rest of the session.

use serde::{Deserialize, Serialize};

use crate::frame::{ErrorCode, now_ms};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RestockStatus {
    Pending,
    InTransit,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestockTask {
    pub id: String,
    pub item: String,
    pub quantity: u32,
    pub status: RestockStatus,
    pub is_urgent: bool,
    pub status_details: Option<String>,
    pub requested_by: String,
    pub picked_up_quantity: Option<u32>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Fields supplied by the requesting dashboard.
#[derive(Debug, Clone)]
pub struct NewRestock {
    pub item: String,
    pub quantity: u32,
    pub is_urgent: bool,
    pub status_details: Option<String>,
    pub requested_by: String,
}

#[derive(Debug, thiserror::Error)]
pub enum RestockError {
    #[error("restock task not found: {0}")]
    NotFound(String),
    #[error("restock task {id} is {from:?}, expected {expected:?}")]
    InvalidTransition { id: String, from: RestockStatus, expected: RestockStatus },
    #[error("item name required")]
    EmptyItem,
    #[error("quantity must be positive")]
    InvalidQuantity,
}

impl ErrorCode for RestockError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E_RESTOCK_NOT_FOUND",
            Self::InvalidTransition { .. } => "E_RESTOCK_TRANSITION",
            Self::EmptyItem => "E_RESTOCK_ITEM",
            Self::InvalidQuantity => "E_RESTOCK_QUANTITY",
        }
    }
}

// =============================================================================
// BOARD
// =============================================================================

#[derive(Debug, Default)]
pub struct RestockBoard {
    tasks: Vec<RestockTask>,
    next_seq: u32,
}

impl RestockBoard {
    /// File a new PENDING request.
    ///
    /// # Errors
    ///
    /// Rejects blank item names and zero quantities.
    pub fn request(&mut self, new: NewRestock) -> Result<RestockTask, RestockError> {
        let item = new.item.trim();
        if item.is_empty() {
            return Err(RestockError::EmptyItem);
        }
        if new.quantity == 0 {
            return Err(RestockError::InvalidQuantity);
        }

        self.next_seq += 1;
        let now = now_ms();
        let task = RestockTask {
            id: format!("RS-{:04}", self.next_seq),
            item: item.to_owned(),
            quantity: new.quantity,
            status: RestockStatus::Pending,
            is_urgent: new.is_urgent,
            status_details: new.status_details,
            requested_by: new.requested_by,
            picked_up_quantity: None,
            created_at: now,
            updated_at: now,
        };
        self.tasks.push(task.clone());
        Ok(task)
    }

    /// Runner confirms pickup of `quantity` units. PENDING -> IN_TRANSIT.
    ///
    /// # Errors
    ///
    /// `NotFound`, `InvalidQuantity`, or `InvalidTransition` when the task is
    /// not pending.
    pub fn pickup(&mut self, id: &str, quantity: u32) -> Result<RestockTask, RestockError> {
        if quantity == 0 {
            return Err(RestockError::InvalidQuantity);
        }
        let task = self.expect_status(id, RestockStatus::Pending)?;
        task.status = RestockStatus::InTransit;
        task.picked_up_quantity = Some(quantity);
        task.updated_at = now_ms();
        Ok(task.clone())
    }

    /// Check that a delivery scan may start for this task.
    ///
    /// # Errors
    ///
    /// `NotFound` or `InvalidTransition` when the task is not in transit.
    pub fn ensure_in_transit(&self, id: &str) -> Result<(), RestockError> {
        let task = self.get(id).ok_or_else(|| RestockError::NotFound(id.to_owned()))?;
        if task.status != RestockStatus::InTransit {
            return Err(RestockError::InvalidTransition {
                id: id.to_owned(),
                from: task.status,
                expected: RestockStatus::InTransit,
            });
        }
        Ok(())
    }

    /// Delivery confirmed. IN_TRANSIT -> COMPLETED.
    ///
    /// # Errors
    ///
    /// `NotFound` or `InvalidTransition` when the task is not in transit.
    pub fn complete(&mut self, id: &str) -> Result<RestockTask, RestockError> {
        let task = self.expect_status(id, RestockStatus::InTransit)?;
        task.status = RestockStatus::Completed;
        task.updated_at = now_ms();
        Ok(task.clone())
    }

    /// Whether a not-yet-completed request exists for `item`.
    #[must_use]
    pub fn has_open_request(&self, item: &str) -> bool {
        self.tasks
            .iter()
            .any(|t| t.item == item && t.status != RestockStatus::Completed)
    }

    /// Pending tasks with priority tasks first. Order is otherwise stable.
    #[must_use]
    pub fn pending_by_urgency(&self) -> Vec<&RestockTask> {
        let mut pending: Vec<&RestockTask> = self
            .tasks
            .iter()
            .filter(|t| t.status == RestockStatus::Pending)
            .collect();
        pending.sort_by_key(|t| !is_priority(t));
        pending
    }

    #[must_use]
    pub fn in_transit(&self) -> Vec<&RestockTask> {
        self.tasks
            .iter()
            .filter(|t| t.status == RestockStatus::InTransit)
            .collect()
    }

    #[must_use]
    pub fn all(&self) -> &[RestockTask] {
        &self.tasks
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&RestockTask> {
        self.tasks.iter().find(|t| t.id == id)
    }

    fn expect_status(&mut self, id: &str, expected: RestockStatus) -> Result<&mut RestockTask, RestockError> {
        let task = self
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| RestockError::NotFound(id.to_owned()))?;
        if task.status != expected {
            return Err(RestockError::InvalidTransition { id: id.to_owned(), from: task.status, expected });
        }
        Ok(task)
    }
}

// =============================================================================
// PRIORITY
// =============================================================================

/// Units below which a "Below Par" report counts as urgent.
const BELOW_PAR_URGENT_UNITS: u32 = 10;

/// Urgent flag, or a "Below Par" report whose first number is under 10.
#[must_use]
pub fn is_priority(task: &RestockTask) -> bool {
    if task.is_urgent {
        return true;
    }
    task.status_details
        .as_deref()
        .filter(|details| details.contains("Below Par"))
        .is_some_and(|details| first_number(details).unwrap_or(100) < BELOW_PAR_URGENT_UNITS)
}

fn first_number(text: &str) -> Option<u32> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let digits: String = text[start..].chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

#[cfg(test)]
#[path = "restock_test.rs"]
mod tests;
