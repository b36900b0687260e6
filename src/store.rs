use crate::gateway::{Gateway, GatewayError};
use crate::model::Snapshot;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Applied,
    /// A newer refresh was issued while this one was in flight.
    Superseded,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoreView {
    #[serde(flatten)]
    pub snapshot: Arc<Snapshot>,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Default)]
struct StoreState {
    snapshot: Arc<Snapshot>,
    loading: bool,
    error: Option<String>,
    issued: u64,
}

/// Client-side cache of the backend. Only `refresh` writes to it, and each
/// refresh replaces the whole snapshot in one assignment.
#[derive(Default)]
pub struct Store {
    state: Mutex<StoreState>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.lock().snapshot.clone()
    }

    pub fn loading(&self) -> bool {
        self.lock().loading
    }

    pub fn error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    pub fn view(&self) -> StoreView {
        let st = self.lock();
        StoreView {
            snapshot: st.snapshot.clone(),
            loading: st.loading,
            error: st.error.clone(),
        }
    }

    pub fn refresh(&self, gateway: &Gateway) -> Result<RefreshOutcome, GatewayError> {
        let token = self.begin_refresh();
        let result = gateway.get_initial_data();
        self.finish_refresh(token, result)
    }

    /// Issues the next sequence token and marks the store as loading.
    pub fn begin_refresh(&self) -> u64 {
        let mut st = self.lock();
        st.issued += 1;
        st.loading = true;
        st.error = None;
        st.issued
    }

    /// Applies a fetched snapshot if `token` is still the latest one issued.
    /// Stale results, successful or not, are dropped without touching state.
    pub fn finish_refresh(
        &self,
        token: u64,
        result: Result<Snapshot, GatewayError>,
    ) -> Result<RefreshOutcome, GatewayError> {
        let mut st = self.lock();
        if token != st.issued {
            tracing::debug!(token, latest = st.issued, "discarding superseded refresh");
            return Ok(RefreshOutcome::Superseded);
        }
        st.loading = false;
        match result {
            Ok(snapshot) => {
                tracing::info!(
                    students = snapshot.students.len(),
                    attendance_days = snapshot.attendance.len(),
                    payment_days = snapshot.payments.len(),
                    "cache refreshed"
                );
                st.snapshot = Arc::new(snapshot);
                st.error = None;
                Ok(RefreshOutcome::Applied)
            }
            Err(e) => {
                tracing::warn!(error = %e, "refresh failed; keeping previous cache");
                st.error = Some(e.to_string());
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::fake::FakeSheet;
    use serde_json::json;

    fn sheet_gateway() -> (Gateway, FakeSheet) {
        let sheet = FakeSheet::new();
        let gw = Gateway::new(Some("http://sheet.test/exec".into()), Box::new(sheet.clone()));
        (gw, sheet)
    }

    #[test]
    fn refresh_replaces_cache_and_clears_flags() {
        let (gw, sheet) = sheet_gateway();
        sheet.seed_student("S1", "Ayesha", 200.0);
        sheet.seed_attendance("2024-01-01", json!([{ "studentId": "S1", "status": "P" }]));

        let store = Store::new();
        assert_eq!(store.refresh(&gw), Ok(RefreshOutcome::Applied));
        let view = store.view();
        assert!(!view.loading);
        assert_eq!(view.error, None);
        assert_eq!(view.snapshot.students.len(), 1);
        assert_eq!(view.snapshot.students[0].tuition_fee, 200.0);
        assert_eq!(view.snapshot.attendance.len(), 1);
    }

    #[test]
    fn failed_refresh_keeps_previous_cache() {
        let (gw, sheet) = sheet_gateway();
        sheet.seed_student("S1", "Ayesha", 0.0);
        let store = Store::new();
        store.refresh(&gw).expect("first refresh");
        let before = store.snapshot();

        sheet.set_offline(true);
        let e = store.refresh(&gw).expect_err("offline refresh fails");
        assert_eq!(e.code(), "transport_failed");
        assert!(!store.loading());
        assert_eq!(store.error().as_deref(), Some("connection refused"));
        assert_eq!(*store.snapshot(), *before);

        sheet.set_offline(false);
        store.refresh(&gw).expect("recovered refresh");
        assert_eq!(store.error(), None);
    }

    #[test]
    fn refresh_twice_yields_identical_snapshots() {
        let (gw, sheet) = sheet_gateway();
        sheet.seed_student("S1", "Ayesha", 100.0);
        sheet.seed_student("S2", "Babul", 150.0);
        sheet.seed_payments("2024-01-05", json!([{ "studentId": "S2", "amount": 40 }]));

        let store = Store::new();
        store.refresh(&gw).expect("refresh");
        let first = store.snapshot();
        store.refresh(&gw).expect("refresh");
        assert_eq!(*store.snapshot(), *first);
    }

    #[test]
    fn superseded_refresh_is_not_applied() {
        let store = Store::new();
        let older = store.begin_refresh();
        let newer = store.begin_refresh();

        let stale = Snapshot {
            students: Vec::new(),
            attendance: [("2023-12-31".to_string(), Vec::new())].into_iter().collect(),
            payments: Default::default(),
        };
        assert_eq!(
            store.finish_refresh(older, Ok(stale)),
            Ok(RefreshOutcome::Superseded)
        );
        assert!(store.loading(), "newer refresh still in flight");
        assert!(store.snapshot().attendance.is_empty());

        assert_eq!(
            store.finish_refresh(newer, Ok(Snapshot::default())),
            Ok(RefreshOutcome::Applied)
        );
        assert!(!store.loading());
    }

    #[test]
    fn stale_failure_does_not_set_error() {
        let store = Store::new();
        let older = store.begin_refresh();
        let newer = store.begin_refresh();
        store
            .finish_refresh(newer, Ok(Snapshot::default()))
            .expect("apply newer");
        let outcome = store.finish_refresh(older, Err(GatewayError::Transport("timeout".into())));
        assert_eq!(outcome, Ok(RefreshOutcome::Superseded));
        assert_eq!(store.error(), None);
    }
}
