use crate::config::Config;
use crate::flows::{AttendanceSheet, FlowEnv, PaymentSheet, StudentListPage, Toast};
use crate::gateway::Gateway;
use crate::model::Snapshot;
use crate::store::Store;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

#[derive(Debug, Default)]
pub struct Pages {
    pub students: StudentListPage,
    pub attendance: AttendanceSheet,
    pub payments: PaymentSheet,
}

pub struct AppState {
    pub gateway: Gateway,
    pub store: Store,
    pub toast: Toast,
    pub pages: Pages,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        Self::with_gateway(Gateway::http(config.gateway_url.clone()))
    }

    pub fn with_gateway(gateway: Gateway) -> Self {
        Self {
            gateway,
            store: Store::new(),
            toast: Toast::default(),
            pages: Pages::default(),
        }
    }

    /// Re-reads page state that mirrors the cache once a refresh has replaced
    /// `before`. An open attendance sheet drops unsaved marks.
    pub fn sync_pages(&mut self, before: &Arc<Snapshot>) {
        let current = self.store.snapshot();
        if Arc::ptr_eq(before, &current) {
            return;
        }
        if !self.pages.attendance.date.is_empty() {
            tracing::debug!(date = %self.pages.attendance.date, "re-syncing attendance sheet");
            self.pages.attendance.resync(&current);
        }
    }

    /// Borrows the flow plumbing and the page states side by side.
    pub fn split(&mut self) -> (FlowEnv<'_>, &mut Pages) {
        (
            FlowEnv {
                gateway: &self.gateway,
                store: &self.store,
                toast: &mut self.toast,
            },
            &mut self.pages,
        )
    }
}
