//! Domain services used by websocket and HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Each operational area owns its records and rules as a plain struct held
//! by the shared `OpsStore`. Route handlers stay focused on protocol
//! translation, authorization, and fan-out; the scan engine and telemetry
//! task are the only pieces that mutate the store on a timer.

pub mod alerts;
pub mod auth_api;
pub mod checklist;
pub mod cleaning;
pub mod hub;
pub mod incident;
pub mod inventory;
pub mod logs;
pub mod maintenance;
pub mod restock;
pub mod scan;
pub mod service;
pub mod session;
pub mod shift;
pub mod surveillance;
pub mod telemetry;
