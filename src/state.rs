//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the one operations store every dashboard reads and mutates,
//! the staff sessions, the connected websocket clients, and the running
//! scans. Every store mutation happens under the store's write lock, so
//! there is a single writer at a time.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;
use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use crate::config::Config;
use crate::frame::Frame;
use crate::services::alerts::{AlertBoard, AlertSeverity, NewAlert};
use crate::services::auth_api::AuthApi;
use crate::services::cleaning::CleaningTimers;
use crate::services::incident::IncidentLog;
use crate::services::inventory::Inventory;
use crate::services::logs::ComplianceLogs;
use crate::services::maintenance::{HYDRAULICS_ZONE, Maintenance};
use crate::services::restock::RestockBoard;
use crate::services::scan::ActiveScan;
use crate::services::service::GuestFlow;
use crate::services::session::SessionStore;
use crate::services::shift::CheckInLog;
use crate::services::surveillance::Surveillance;

// =============================================================================
// OPERATIONS STORE
// =============================================================================

/// The shared operational records. Resets on restart.
#[derive(Debug)]
pub struct OpsStore {
    pub restock: RestockBoard,
    pub incidents: IncidentLog,
    pub cleaning: CleaningTimers,
    pub inventory: Inventory,
    pub logs: ComplianceLogs,
    pub guests: GuestFlow,
    pub maintenance: Maintenance,
    pub alerts: AlertBoard,
    pub check_ins: CheckInLog,
    pub surveillance: Surveillance,
}

impl OpsStore {
    /// Seeded store. The hydraulics failure alert starts active so the
    /// maintenance fleet opens with Leviathan-03 down.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        let mut store = Self {
            restock: RestockBoard::default(),
            incidents: IncidentLog::default(),
            cleaning: CleaningTimers::default(),
            inventory: Inventory::default(),
            logs: ComplianceLogs::default(),
            guests: GuestFlow::default(),
            maintenance: Maintenance::new(config.vendor_time_limit),
            alerts: AlertBoard::default(),
            check_ins: CheckInLog::default(),
            surveillance: Surveillance::default(),
        };
        let _ = store.alerts.raise(NewAlert {
            title: "Leviathan-03 Hydraulic Failure".to_owned(),
            message: "Hydraulic pressure lost on Leviathan-03. Physical repair required.".to_owned(),
            severity: AlertSeverity::Critical,
            alert_type: "hardware".to_owned(),
            zone_id: Some(HYDRAULICS_ZONE.to_owned()),
        });
        store.maintenance.sync_with_alerts(&store.alerts);
        store
    }

    /// Read-only view of everything a dashboard renders on load.
    #[must_use]
    pub fn snapshot(&self) -> serde_json::Value {
        json!({
            "restock_tasks": self.restock.all(),
            "incidents": self.incidents.all(),
            "cleaning_timers": self.cleaning.timers(),
            "consumables": self.inventory.consumables(),
            "central_storage": self.inventory.central_storage(),
            "purchase_orders": self.inventory.purchase_orders(),
            "fnb_stock": self.inventory.fnb_stock(),
            "retail": self.inventory.retail(),
            "shipments": self.inventory.shipments(),
            "shrinkage_alerts": self.inventory.shrinkage_alerts(),
            "logs": &self.logs,
            "guests": &self.guests,
            "hardware": self.maintenance.hardware(),
            "system_health": self.maintenance.system_health(),
            "red_alerts": self.alerts.red_alerts(),
            "announcements": self.alerts.announcements(),
            "check_ins": self.check_ins.all(),
            "surveillance": &self.surveillance,
        })
    }
}

// =============================================================================
// CONNECTED CLIENTS
// =============================================================================

/// One websocket connection, bound to the session that opened it.
#[derive(Debug, Clone)]
pub struct ConnectedClient {
    pub tx: mpsc::Sender<Frame>,
    pub session_key: String,
    pub staff_id: String,
}

// =============================================================================
// APP STATE
// =============================================================================

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<RwLock<OpsStore>>,
    pub sessions: Arc<RwLock<SessionStore>>,
    /// Connected clients: `client_id` -> connection.
    pub clients: Arc<RwLock<HashMap<Uuid, ConnectedClient>>>,
    /// Running scans: `scan_id` -> task.
    pub scans: Arc<RwLock<HashMap<Uuid, ActiveScan>>>,
    pub auth_api: Arc<dyn AuthApi>,
}

impl AppState {
    #[must_use]
    pub fn new(config: Config, auth_api: Arc<dyn AuthApi>) -> Self {
        let store = OpsStore::new(&config);
        let sessions = SessionStore::new(config.session_ttl, config.ws_ticket_ttl);
        Self {
            config: Arc::new(config),
            store: Arc::new(RwLock::new(store)),
            sessions: Arc::new(RwLock::new(sessions)),
            clients: Arc::new(RwLock::new(HashMap::new())),
            scans: Arc::new(RwLock::new(HashMap::new())),
            auth_api,
        }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
pub mod test_helpers {
    use super::*;
    use crate::roles::AppMode;
    use crate::services::auth_api::{AuthApiError, check_passwords};
    use crate::services::session::{StaffMember, hash_token};

    /// Auth API double: accepts any password equal to "secret" and derives
    /// the role from the staff ID prefix.
    pub struct MockAuthApi;

    #[async_trait::async_trait]
    impl AuthApi for MockAuthApi {
        async fn login(&self, staff_id: &str, password: &str) -> Result<StaffMember, AuthApiError> {
            if staff_id == "LOCKED-01" {
                return Err(AuthApiError::AccountLocked { locked_until: "2026-01-01T10:00:00Z".into() });
            }
            if password != "secret" {
                return Err(AuthApiError::Rejected { status: 401, message: "Invalid credentials".into() });
            }
            let role = match staff_id.split('-').next().unwrap_or_default() {
                "EXT" => "EXTERNAL_MAINTENANCE",
                "SEC" => "SECURITY_CREW",
                "FNB" => "FNB",
                "RUN" => "RUNNER",
                _ => "INTERNAL_MAINTENANCE",
            };
            Ok(StaffMember {
                staff_id: staff_id.into(),
                name: format!("Staff {staff_id}"),
                role: role.into(),
                current_zone_id: None,
            })
        }

        async fn request_password_reset(&self, _phone_number: &str) -> Result<(), AuthApiError> {
            Ok(())
        }

        async fn verify_otp(&self, _phone_number: &str, otp: &str) -> Result<String, AuthApiError> {
            if otp == "123456" {
                Ok("reset-token".into())
            } else {
                Err(AuthApiError::Rejected { status: 400, message: "Verification failed".into() })
            }
        }

        async fn reset_password(&self, reset_token: &str, new_password: &str) -> Result<(), AuthApiError> {
            check_passwords(new_password, new_password)?;
            if reset_token == "reset-token" {
                Ok(())
            } else {
                Err(AuthApiError::Rejected { status: 400, message: "Reset failed".into() })
            }
        }
    }

    /// Config with scans sped up so timer-driven tests finish quickly.
    #[must_use]
    pub fn test_config() -> Config {
        Config { scan_speed_factor: 0.01, ..Config::default() }
    }

    #[must_use]
    pub fn test_app_state() -> AppState {
        AppState::new(test_config(), Arc::new(MockAuthApi))
    }

    /// Create a session directly and return `(token, session_key)`.
    pub async fn seed_session(state: &AppState, staff_id: &str, mode: AppMode) -> (String, String) {
        let staff = StaffMember {
            staff_id: staff_id.into(),
            name: format!("Staff {staff_id}"),
            role: format!("{mode:?}"),
            current_zone_id: None,
        };
        let token = state.sessions.write().await.create(staff, mode);
        let key = hash_token(&token);
        (token, key)
    }

    /// Put a seeded session on shift.
    pub async fn set_on_shift(state: &AppState, session_key: &str) {
        if let Some(session) = state.sessions.write().await.get_mut(session_key) {
            session.on_shift = true;
        }
    }

    /// Register a connected client for a session and return its ID and
    /// receiver.
    pub async fn connect_client(
        state: &AppState,
        session_key: &str,
        staff_id: &str,
    ) -> (Uuid, mpsc::Receiver<Frame>) {
        let client_id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(256);
        state.clients.write().await.insert(
            client_id,
            ConnectedClient { tx, session_key: session_key.into(), staff_id: staff_id.into() },
        );
        (client_id, rx)
    }
}

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
