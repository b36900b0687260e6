//! In-memory stand-in for the spreadsheet backend, speaking the same envelope.

use super::{GatewayError, Transport};
use serde_json::{json, Map, Value};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct SheetState {
    students: Vec<Map<String, Value>>,
    attendance: Map<String, Value>,
    payments: Map<String, Value>,
    next_id: u64,
    calls: Vec<String>,
    fail_next: Option<String>,
    offline: bool,
}

#[derive(Clone, Default)]
pub struct FakeSheet {
    inner: Arc<Mutex<SheetState>>,
}

impl FakeSheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Actions received so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.inner.lock().expect("lock").calls.clone()
    }

    /// The next write answers with `status: "Error"` and this message.
    pub fn fail_next(&self, message: &str) {
        self.inner.lock().expect("lock").fail_next = Some(message.to_string());
    }

    pub fn set_offline(&self, offline: bool) {
        self.inner.lock().expect("lock").offline = offline;
    }

    pub fn seed_student(&self, id: &str, name: &str, fee: f64) {
        let mut st = self.inner.lock().expect("lock");
        let row = st.students.len() as i64 + 2;
        let v = json!({
            "ID": id, "Name": name, "Class": "6", "Section": "A", "Email": "",
            "Phone": "", "Guardian Name": "", "Photo URL": "", "Tuition Fee": fee,
            "rowIndex": row
        });
        if let Value::Object(m) = v {
            st.students.push(m);
        }
    }

    pub fn seed_attendance(&self, date: &str, records: Value) {
        self.inner
            .lock()
            .expect("lock")
            .attendance
            .insert(date.to_string(), records);
    }

    pub fn seed_payments(&self, date: &str, records: Value) {
        self.inner
            .lock()
            .expect("lock")
            .payments
            .insert(date.to_string(), records);
    }

    fn dispatch(st: &mut SheetState, action: &str, payload: Value) -> Value {
        match action {
            "getInitialData" => json!({
                "status": "Success",
                "students": st.students,
                "attendance": st.attendance,
                "payments": st.payments,
            }),
            "addStudent" => {
                st.next_id += 1;
                let mut m = payload.as_object().cloned().unwrap_or_default();
                m.insert("ID".into(), json!(format!("STU{:03}", st.next_id)));
                m.insert("rowIndex".into(), json!(st.students.len() as i64 + 2));
                st.students.push(m);
                json!({ "status": "Success", "message": "Student added successfully." })
            }
            "updateStudent" => {
                let id = payload.get("ID").cloned().unwrap_or(Value::Null);
                let Some(existing) = st.students.iter_mut().find(|s| s.get("ID") == Some(&id)) else {
                    return json!({ "status": "Error", "message": "Student not found." });
                };
                if let Some(fields) = payload.as_object() {
                    for (k, v) in fields {
                        existing.insert(k.clone(), v.clone());
                    }
                }
                json!({ "status": "Success", "message": "Student updated successfully." })
            }
            "deleteStudent" | "deleteMultipleStudents" => {
                let targets: Vec<Value> = match payload {
                    Value::Array(items) => items,
                    other => vec![other],
                };
                let ids: Vec<Value> = targets
                    .iter()
                    .filter_map(|t| t.get("ID").cloned())
                    .collect();
                let before = st.students.len();
                st.students
                    .retain(|s| !s.get("ID").map(|id| ids.contains(id)).unwrap_or(false));
                for (i, s) in st.students.iter_mut().enumerate() {
                    s.insert("rowIndex".into(), json!(i as i64 + 2));
                }
                let removed = before - st.students.len();
                json!({ "status": "Success", "message": format!("{removed} student(s) deleted.") })
            }
            "recordAttendance" => {
                let date = payload
                    .get("date")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                let incoming = payload
                    .get("records")
                    .and_then(|v| v.as_array())
                    .cloned()
                    .unwrap_or_default();
                let mut day = st
                    .attendance
                    .get(&date)
                    .and_then(|v| v.as_array())
                    .cloned()
                    .unwrap_or_default();
                for r in incoming {
                    day.retain(|e| e.get("studentId") != r.get("studentId"));
                    day.push(r);
                }
                st.attendance.insert(date, Value::Array(day));
                json!({ "status": "Success", "message": "Attendance recorded successfully." })
            }
            "recordPayment" => {
                let date = payload
                    .get("date")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                let incoming = payload
                    .get("records")
                    .and_then(|v| v.as_array())
                    .cloned()
                    .unwrap_or_default();
                let mut day = st
                    .payments
                    .get(&date)
                    .and_then(|v| v.as_array())
                    .cloned()
                    .unwrap_or_default();
                day.extend(incoming);
                st.payments.insert(date, Value::Array(day));
                json!({ "status": "Success", "message": "Payments recorded successfully." })
            }
            other => json!({ "status": "Error", "message": format!("Unknown action: {other}") }),
        }
    }
}

impl Transport for FakeSheet {
    fn post(&self, _url: &str, body: String) -> Result<String, GatewayError> {
        let mut st = self.inner.lock().expect("lock");
        let envelope: Value = serde_json::from_str(&body).expect("envelope json");
        let action = envelope
            .get("action")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        st.calls.push(action.clone());

        if st.offline {
            return Err(GatewayError::Transport("connection refused".into()));
        }
        if action != "getInitialData" {
            if let Some(message) = st.fail_next.take() {
                return Ok(json!({ "status": "Error", "message": message }).to_string());
            }
        }
        let payload = envelope.get("payload").cloned().unwrap_or(Value::Null);
        Ok(Self::dispatch(&mut st, &action, payload).to_string())
    }
}
