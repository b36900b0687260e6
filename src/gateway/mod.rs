//! Client for the spreadsheet backend: one POST endpoint, one tagged
//! `{action, payload}` envelope per call, one JSON reply.

#[cfg(test)]
pub mod fake;
mod wire;

use crate::model::{AttendanceRecord, PaymentRecord, Snapshot, Student, StudentDraft};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use wire::{
    AttendanceEntry, DayBatch, DeleteTarget, Envelope, InitialData, PaymentEntry, Reply,
    StudentFields, StudentUpdate,
};

pub const CONTENT_TYPE: &str = "text/plain;charset=utf-8";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GatewayError {
    /// Network, HTTP or JSON failure, or no endpoint configured.
    #[error("{0}")]
    Transport(String),
    /// The backend answered with `status: "Error"`.
    #[error("{0}")]
    Remote(String),
}

impl GatewayError {
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::Transport(_) => "transport_failed",
            GatewayError::Remote(_) => "remote_error",
        }
    }
}

/// Moves one request body to the endpoint and returns the response body.
pub trait Transport: Send + Sync {
    fn post(&self, url: &str, body: String) -> Result<String, GatewayError>;
}

pub struct HttpTransport {
    agent: ureq::Agent,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            agent: ureq::AgentBuilder::new().build(),
        }
    }
}

impl Transport for HttpTransport {
    fn post(&self, url: &str, body: String) -> Result<String, GatewayError> {
        let resp = match self
            .agent
            .post(url)
            .set("Content-Type", CONTENT_TYPE)
            .send_string(&body)
        {
            Ok(r) => r,
            // Non-2xx bodies may still carry an error envelope worth reporting.
            Err(ureq::Error::Status(code, r)) => {
                tracing::warn!(code, "gateway answered with non-success HTTP status");
                r
            }
            Err(e) => return Err(GatewayError::Transport(e.to_string())),
        };
        resp.into_string()
            .map_err(|e| GatewayError::Transport(format!("failed to read response: {e}")))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ack {
    pub message: Option<String>,
}

impl Ack {
    pub fn message_or(&self, fallback: &str) -> String {
        self.message
            .clone()
            .unwrap_or_else(|| fallback.to_string())
    }
}

pub struct Gateway {
    endpoint: Option<String>,
    transport: Box<dyn Transport>,
}

impl Gateway {
    pub fn new(endpoint: Option<String>, transport: Box<dyn Transport>) -> Self {
        Self {
            endpoint,
            transport,
        }
    }

    pub fn http(endpoint: Option<String>) -> Self {
        Self::new(endpoint, Box::new(HttpTransport::new()))
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    pub fn set_endpoint(&mut self, endpoint: Option<String>) {
        self.endpoint = endpoint;
    }

    /// One round trip. No retries.
    pub fn call(&self, action: &str, payload: Value) -> Result<Value, GatewayError> {
        let Some(url) = self.endpoint.as_deref() else {
            return Err(GatewayError::Transport(
                "gateway endpoint is not configured".to_string(),
            ));
        };
        let body = serde_json::to_string(&Envelope { action, payload })
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        tracing::debug!(action, "gateway call");
        let text = self.transport.post(url, body)?;
        let value: Value = serde_json::from_str(&text)
            .map_err(|e| GatewayError::Transport(format!("invalid response JSON: {e}")))?;

        let reply = Reply::deserialize(&value).unwrap_or_default();
        if reply.is_error() {
            let message = reply
                .message
                .unwrap_or_else(|| "the backend reported an error".to_string());
            tracing::info!(action, %message, "gateway returned error status");
            return Err(GatewayError::Remote(message));
        }
        Ok(value)
    }

    fn ack(&self, action: &str, payload: Value) -> Result<Ack, GatewayError> {
        let value = self.call(action, payload)?;
        let reply = Reply::deserialize(&value).unwrap_or_default();
        Ok(Ack {
            message: reply.message,
        })
    }

    pub fn get_initial_data(&self) -> Result<Snapshot, GatewayError> {
        let value = self.call("getInitialData", Value::Object(Default::default()))?;
        let raw: InitialData = serde_json::from_value(value)
            .map_err(|e| GatewayError::Transport(format!("unexpected initial data: {e}")))?;
        Ok(wire::snapshot_from_sheet(raw))
    }

    pub fn add_student(&self, draft: &StudentDraft) -> Result<Ack, GatewayError> {
        self.ack("addStudent", encode(&StudentFields::from(draft))?)
    }

    pub fn update_student(&self, student: &Student) -> Result<Ack, GatewayError> {
        self.ack("updateStudent", encode(&StudentUpdate::new(student))?)
    }

    pub fn delete_student(&self, student: &Student) -> Result<Ack, GatewayError> {
        self.ack("deleteStudent", encode(&DeleteTarget { id: &student.id })?)
    }

    pub fn delete_students(&self, students: &[Student]) -> Result<Ack, GatewayError> {
        let targets: Vec<DeleteTarget> = students
            .iter()
            .map(|s| DeleteTarget { id: &s.id })
            .collect();
        self.ack("deleteMultipleStudents", encode(&targets)?)
    }

    pub fn record_attendance(
        &self,
        date: &str,
        records: &[AttendanceRecord],
    ) -> Result<Ack, GatewayError> {
        let batch = DayBatch {
            date: date.to_string(),
            records: records
                .iter()
                .map(|r| AttendanceEntry {
                    student_id: &r.student_id,
                    status: r.status.code(),
                })
                .collect(),
        };
        self.ack("recordAttendance", encode(&batch)?)
    }

    pub fn record_payment(&self, date: &str, records: &[PaymentRecord]) -> Result<Ack, GatewayError> {
        let batch = DayBatch {
            date: date.to_string(),
            records: records
                .iter()
                .map(|r| PaymentEntry {
                    student_id: &r.student_id,
                    amount: r.amount,
                })
                .collect(),
        };
        self.ack("recordPayment", encode(&batch)?)
    }
}

fn encode<T: Serialize>(v: &T) -> Result<Value, GatewayError> {
    serde_json::to_value(v).map_err(|e| GatewayError::Transport(e.to_string()))
}
