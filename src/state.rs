use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{broadcast, Mutex};
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::models::assignment::AssignmentEvent;
use crate::observability::metrics::Metrics;
use crate::repository::{
    AssignmentRepository, DriverRepository, MemoryStore, ReportRepository, VehicleRepository,
};

pub const DEFAULT_PAGE_SIZE: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: Uuid,
    pub company_id: Option<Uuid>,
}

pub struct AppState {
    pub assignments: Arc<dyn AssignmentRepository>,
    pub drivers: Arc<dyn DriverRepository>,
    pub vehicles: Arc<dyn VehicleRepository>,
    pub reports: Arc<dyn ReportRepository>,
    pub sessions: DashMap<String, Session>,
    pub assignment_events_tx: broadcast::Sender<AssignmentEvent>,
    pub clock: Arc<dyn Clock>,
    pub metrics: Metrics,
    pub default_page_size: usize,
    write_locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl AppState {
    pub fn new(event_buffer_size: usize) -> Self {
        let store = Arc::new(MemoryStore::new());
        let (assignment_events_tx, _unused_rx) = broadcast::channel(event_buffer_size);

        Self {
            assignments: store.clone(),
            drivers: store.clone(),
            vehicles: store.clone(),
            reports: store,
            sessions: DashMap::new(),
            assignment_events_tx,
            clock: Arc::new(SystemClock),
            metrics: Metrics::new(),
            default_page_size: DEFAULT_PAGE_SIZE,
            write_locks: DashMap::new(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_assignment_repository(mut self, repo: Arc<dyn AssignmentRepository>) -> Self {
        self.assignments = repo;
        self
    }

    pub fn with_vehicle_repository(mut self, repo: Arc<dyn VehicleRepository>) -> Self {
        self.vehicles = repo;
        self
    }

    pub fn with_default_page_size(mut self, page_size: usize) -> Self {
        self.default_page_size = page_size;
        self
    }

    pub fn insert_session(&self, token: impl Into<String>, session: Session) {
        self.sessions.insert(token.into(), session);
    }

    /// Writes that check-then-insert within one company (assignment overlap,
    /// one report per driver per day) hold this lock across check and write.
    pub fn company_write_lock(&self, company_id: Uuid) -> Arc<Mutex<()>> {
        self.write_locks
            .entry(company_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone()
    }
}
