//! Page-level write flows. Every write goes
//! Idle -> Submitting -> Refreshing -> Idle: one gateway call, then an
//! unconditional cache refresh, then a toast with the outcome.

use crate::calc;
use crate::gateway::{Ack, Gateway, GatewayError};
use crate::model::{AttendanceRecord, AttendanceStatus, PaymentRecord, Snapshot, Student, StudentDraft};
use crate::store::Store;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};
use uuid::Uuid;

pub const TOAST_TTL: Duration = Duration::from_secs(3);

pub const MSG_EMPTY_SELECTION: &str = "Please select students to delete.";
pub const MSG_NO_PAYMENTS: &str = "No payments entered to save.";
pub const MSG_NO_DELETE_TARGET: &str = "Select a student to delete.";
pub const MSG_LIST_REFRESHED: &str = "List refreshed!";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NoticeKind {
    Success,
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub id: String,
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    fn new(kind: NoticeKind, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Warning, message)
    }

    pub fn failure(e: &GatewayError) -> Self {
        Self::new(NoticeKind::Error, format!("Error: {e}"))
    }
}

/// A single transient notification. Showing a new one replaces the current
/// one and restarts the visibility window.
#[derive(Debug, Default)]
pub struct Toast {
    current: Option<(Notice, Instant)>,
}

impl Toast {
    pub fn show(&mut self, notice: Notice) {
        self.show_at(notice, Instant::now());
    }

    pub fn show_at(&mut self, notice: Notice, at: Instant) {
        self.current = Some((notice, at));
    }

    pub fn visible_at(&self, now: Instant) -> Option<&Notice> {
        self.current
            .as_ref()
            .filter(|(_, shown)| now.saturating_duration_since(*shown) < TOAST_TTL)
            .map(|(n, _)| n)
    }

    pub fn visible(&self) -> Option<&Notice> {
        self.visible_at(Instant::now())
    }

    pub fn dismiss(&mut self) {
        self.current = None;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FlowPhase {
    #[default]
    Idle,
    Submitting,
    Refreshing,
}

#[derive(Debug, Default)]
pub struct PageState {
    pub phase: FlowPhase,
    pub busy: bool,
}

impl PageState {
    fn enter(&mut self, phase: FlowPhase) {
        tracing::debug!(from = ?self.phase, to = ?phase, "page phase");
        self.phase = phase;
        self.busy = phase != FlowPhase::Idle;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowOutcome {
    pub notice: Notice,
    /// False when local validation stopped the flow before any network call.
    pub submitted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_error: Option<String>,
}

/// Shared plumbing for every page.
pub struct FlowEnv<'a> {
    pub gateway: &'a Gateway,
    pub store: &'a Store,
    pub toast: &'a mut Toast,
}

impl FlowEnv<'_> {
    fn short_circuit(&mut self, notice: Notice) -> FlowOutcome {
        tracing::info!(message = %notice.message, "write skipped by local validation");
        self.toast.show(notice.clone());
        FlowOutcome {
            notice,
            submitted: false,
            refresh_error: None,
        }
    }

    fn run<F>(&mut self, page: &mut PageState, fallback: &str, submit: F) -> FlowOutcome
    where
        F: FnOnce(&Gateway) -> Result<Ack, GatewayError>,
    {
        page.enter(FlowPhase::Submitting);
        let notice = match submit(self.gateway) {
            Ok(ack) => Notice::success(ack.message_or(fallback)),
            Err(e) => {
                tracing::warn!(code = e.code(), error = %e, "write failed");
                Notice::failure(&e)
            }
        };
        self.toast.show(notice.clone());

        // Refresh even after a failed write; the backend may have applied part of it.
        page.enter(FlowPhase::Refreshing);
        let refresh_error = self.store.refresh(self.gateway).err().map(|e| e.to_string());

        page.enter(FlowPhase::Idle);
        FlowOutcome {
            notice,
            submitted: true,
            refresh_error,
        }
    }
}

#[derive(Debug, Default)]
pub struct StudentListPage {
    pub page: PageState,
    pub selection: BTreeSet<String>,
    pub editing: Option<String>,
    pub deleting: Option<String>,
}

impl StudentListPage {
    pub fn toggle(&mut self, student_id: &str) {
        if !self.selection.remove(student_id) {
            self.selection.insert(student_id.to_string());
        }
    }

    pub fn select_all(&mut self, checked: bool, students: &[Student]) {
        self.selection = if checked {
            students.iter().map(|s| s.id.clone()).collect()
        } else {
            BTreeSet::new()
        };
    }

    pub fn all_selected(&self, students: &[Student]) -> bool {
        !students.is_empty() && students.iter().all(|s| self.selection.contains(&s.id))
    }

    pub fn begin_edit(&mut self, student_id: Option<String>) {
        self.editing = student_id;
    }

    pub fn begin_delete(&mut self, student_id: String) {
        self.deleting = Some(student_id);
    }

    pub fn cancel(&mut self) {
        self.editing = None;
        self.deleting = None;
    }

    /// Updates the student being edited, or adds a new one.
    pub fn save(&mut self, env: &mut FlowEnv<'_>, draft: &StudentDraft) -> FlowOutcome {
        let snapshot = env.store.snapshot();
        let outcome = match self.editing.as_deref() {
            Some(id) => match snapshot.student(id) {
                Some(existing) => {
                    let updated = draft.apply_to(existing);
                    env.run(&mut self.page, "Student updated.", |gw| gw.update_student(&updated))
                }
                None => env.short_circuit(Notice::warning(format!(
                    "Student {id} is no longer in the list."
                ))),
            },
            None => env.run(&mut self.page, "Student added.", |gw| gw.add_student(draft)),
        };
        self.editing = None;
        outcome
    }

    pub fn confirm_delete(&mut self, env: &mut FlowEnv<'_>) -> FlowOutcome {
        let snapshot = env.store.snapshot();
        let target = self
            .deleting
            .as_deref()
            .and_then(|id| snapshot.student(id))
            .cloned();
        let outcome = match target {
            Some(student) => env.run(&mut self.page, "Student deleted.", |gw| {
                gw.delete_student(&student)
            }),
            None => env.short_circuit(Notice::warning(MSG_NO_DELETE_TARGET)),
        };
        self.deleting = None;
        outcome
    }

    pub fn delete_selected(&mut self, env: &mut FlowEnv<'_>) -> FlowOutcome {
        let snapshot = env.store.snapshot();
        let targets: Vec<Student> = snapshot
            .students
            .iter()
            .filter(|s| self.selection.contains(&s.id))
            .cloned()
            .collect();
        if targets.is_empty() {
            return env.short_circuit(Notice::warning(MSG_EMPTY_SELECTION));
        }
        let outcome = env.run(&mut self.page, "Students deleted.", |gw| {
            gw.delete_students(&targets)
        });
        self.selection.clear();
        outcome
    }
}

#[derive(Debug, Default)]
pub struct AttendanceSheet {
    pub page: PageState,
    pub date: String,
    pub statuses: BTreeMap<String, AttendanceStatus>,
}

impl AttendanceSheet {
    pub fn open(&mut self, date: &str, snapshot: &Snapshot) {
        self.date = date.to_string();
        self.resync(snapshot);
    }

    /// Reloads the day's marks from the cache, discarding unsaved edits.
    pub fn resync(&mut self, snapshot: &Snapshot) {
        self.statuses = calc::day_statuses(&snapshot.attendance, &snapshot.students, &self.date);
    }

    pub fn set_status(&mut self, student_id: &str, status: AttendanceStatus) {
        self.statuses.insert(student_id.to_string(), status);
    }

    pub fn status_of(&self, student_id: &str) -> AttendanceStatus {
        self.statuses
            .get(student_id)
            .copied()
            .unwrap_or(AttendanceStatus::Present)
    }

    /// Records one mark per student on the roster; untouched students are Present.
    pub fn submit(&mut self, env: &mut FlowEnv<'_>) -> FlowOutcome {
        let snapshot = env.store.snapshot();
        let records: Vec<AttendanceRecord> = snapshot
            .students
            .iter()
            .map(|s| AttendanceRecord {
                student_id: s.id.clone(),
                status: self.status_of(&s.id),
            })
            .collect();
        let date = self.date.clone();
        let outcome = env.run(&mut self.page, "Attendance saved.", |gw| {
            gw.record_attendance(&date, &records)
        });
        self.resync(&env.store.snapshot());
        outcome
    }
}

#[derive(Debug, Default)]
pub struct PaymentSheet {
    pub page: PageState,
    pub date: String,
    pub amounts: BTreeMap<String, f64>,
}

impl PaymentSheet {
    /// Entry starts blank so a resubmit cannot duplicate recorded payments.
    pub fn open(&mut self, date: &str) {
        self.date = date.to_string();
        self.amounts.clear();
    }

    pub fn set_amount(&mut self, student_id: &str, amount: f64) {
        self.amounts.insert(student_id.to_string(), amount);
    }

    pub fn pending(&self) -> Vec<PaymentRecord> {
        self.amounts
            .iter()
            .filter(|(_, a)| a.is_finite() && **a > 0.0)
            .map(|(id, a)| PaymentRecord {
                student_id: id.clone(),
                amount: *a,
            })
            .collect()
    }

    pub fn submit(&mut self, env: &mut FlowEnv<'_>) -> FlowOutcome {
        let records = self.pending();
        if records.is_empty() {
            return env.short_circuit(Notice::warning(MSG_NO_PAYMENTS));
        }
        let date = self.date.clone();
        let outcome = env.run(&mut self.page, "Payments saved.", |gw| {
            gw.record_payment(&date, &records)
        });
        if outcome.notice.kind == NoticeKind::Success {
            self.amounts.clear();
        }
        outcome
    }
}
