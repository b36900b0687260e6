use crate::model::{AttendanceLog, AttendanceStatus, PaymentLog, Student};
use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::ops::{Add, AddAssign, Bound};

/// Inclusive `[start_date, end_date]` over ISO `YYYY-MM-DD` strings.
///
/// Comparison is plain string ordering, which matches chronological order for
/// ISO dates. An inverted window is valid and matches nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportWindow {
    pub start_date: String,
    pub end_date: String,
}

impl ReportWindow {
    pub fn new(start_date: impl Into<String>, end_date: impl Into<String>) -> Self {
        Self {
            start_date: start_date.into(),
            end_date: end_date.into(),
        }
    }

    /// One calendar month back from `today`, through `today`.
    pub fn last_month(today: NaiveDate) -> Self {
        let start = today.checked_sub_months(Months::new(1)).unwrap_or(today);
        Self::new(
            start.format("%Y-%m-%d").to_string(),
            today.format("%Y-%m-%d").to_string(),
        )
    }

    pub fn is_inverted(&self) -> bool {
        self.start_date > self.end_date
    }

    #[cfg(test)]
    pub fn contains(&self, date: &str) -> bool {
        self.start_date.as_str() <= date && date <= self.end_date.as_str()
    }
}

// BTreeMap::range panics on an inverted range, so that case yields nothing.
fn in_window<'a, T>(
    log: &'a BTreeMap<String, T>,
    window: &'a ReportWindow,
) -> impl Iterator<Item = (&'a String, &'a T)> + 'a {
    let range = (!window.is_inverted()).then(|| {
        log.range::<str, _>((
            Bound::Included(window.start_date.as_str()),
            Bound::Included(window.end_date.as_str()),
        ))
    });
    range.into_iter().flatten()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceTally {
    pub present: u32,
    pub absent: u32,
    pub leave: u32,
}

impl AttendanceTally {
    pub fn record(&mut self, status: AttendanceStatus) {
        match status {
            AttendanceStatus::Present => self.present += 1,
            AttendanceStatus::Absent => self.absent += 1,
            AttendanceStatus::Leave => self.leave += 1,
        }
    }

    /// Days with any mark.
    pub fn marked(&self) -> u32 {
        self.present + self.absent + self.leave
    }
}

impl Add for AttendanceTally {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            present: self.present + rhs.present,
            absent: self.absent + rhs.absent,
            leave: self.leave + rhs.leave,
        }
    }
}

impl AddAssign for AttendanceTally {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl std::iter::Sum for AttendanceTally {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceReportRow {
    #[serde(flatten)]
    pub student: Student,
    #[serde(flatten)]
    pub tally: AttendanceTally,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentReportRow {
    #[serde(flatten)]
    pub student: Student,
    #[serde(flatten)]
    pub tally: AttendanceTally,
    pub total_paid: f64,
    /// `tuition_fee - total_paid`. Negative means overpaid.
    pub due: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportTotals {
    #[serde(flatten)]
    pub tally: AttendanceTally,
    pub tuition_fee: f64,
    pub total_paid: f64,
    pub due: f64,
}

impl ReportTotals {
    pub fn from_rows(rows: &[StudentReportRow]) -> Self {
        rows.iter().fold(Self::default(), |mut acc, r| {
            acc.tally += r.tally;
            acc.tuition_fee += r.student.tuition_fee;
            acc.total_paid += r.total_paid;
            acc.due += r.due;
            acc
        })
    }
}

fn tallies_in_window<'a>(
    attendance: &'a AttendanceLog,
    window: &'a ReportWindow,
) -> HashMap<&'a str, AttendanceTally> {
    let mut out: HashMap<&str, AttendanceTally> = HashMap::new();
    for (_, records) in in_window(attendance, window) {
        for r in records {
            out.entry(r.student_id.as_str()).or_default().record(r.status);
        }
    }
    out
}

fn paid_in_window<'a>(payments: &'a PaymentLog, window: &'a ReportWindow) -> HashMap<&'a str, f64> {
    let mut out: HashMap<&str, f64> = HashMap::new();
    for (_, records) in in_window(payments, window) {
        for p in records {
            *out.entry(p.student_id.as_str()).or_default() += p.amount;
        }
    }
    out
}

/// One row per student, in roster order, with attendance counted over `window`.
pub fn build_attendance_report(
    students: &[Student],
    attendance: &AttendanceLog,
    window: &ReportWindow,
) -> Vec<AttendanceReportRow> {
    let tallies = tallies_in_window(attendance, window);
    students
        .iter()
        .map(|s| AttendanceReportRow {
            student: s.clone(),
            tally: tallies.get(s.id.as_str()).copied().unwrap_or_default(),
        })
        .collect()
}

/// Attendance plus fees: every payment inside `window` is summed.
pub fn build_student_report(
    students: &[Student],
    attendance: &AttendanceLog,
    payments: &PaymentLog,
    window: &ReportWindow,
) -> Vec<StudentReportRow> {
    let tallies = tallies_in_window(attendance, window);
    let paid = paid_in_window(payments, window);
    students
        .iter()
        .map(|s| {
            let total_paid = paid.get(s.id.as_str()).copied().unwrap_or(0.0);
            StudentReportRow {
                student: s.clone(),
                tally: tallies.get(s.id.as_str()).copied().unwrap_or_default(),
                total_paid,
                due: s.tuition_fee - total_paid,
            }
        })
        .collect()
}

/// Present marks for one student across the whole log.
pub fn total_presents(attendance: &AttendanceLog, student_id: &str) -> u32 {
    attendance
        .values()
        .filter(|day| {
            day.iter()
                .any(|r| r.student_id == student_id && r.status == AttendanceStatus::Present)
        })
        .count() as u32
}

/// Status per student for one day. Students without a mark default to Present.
pub fn day_statuses(
    attendance: &AttendanceLog,
    students: &[Student],
    date: &str,
) -> BTreeMap<String, AttendanceStatus> {
    let recorded: HashMap<&str, AttendanceStatus> = attendance
        .get(date)
        .map(|day| {
            day.iter()
                .map(|r| (r.student_id.as_str(), r.status))
                .collect()
        })
        .unwrap_or_default();
    students
        .iter()
        .map(|s| {
            let status = recorded
                .get(s.id.as_str())
                .copied()
                .unwrap_or(AttendanceStatus::Present);
            (s.id.clone(), status)
        })
        .collect()
}

pub fn day_counts<'a, I>(statuses: I) -> AttendanceTally
where
    I: IntoIterator<Item = &'a AttendanceStatus>,
{
    let mut t = AttendanceTally::default();
    for s in statuses {
        t.record(*s);
    }
    t
}

/// Sum of every payment a student made on `date`.
pub fn paid_on(payments: &PaymentLog, student_id: &str, date: &str) -> f64 {
    payments
        .get(date)
        .map(|day| {
            day.iter()
                .filter(|p| p.student_id == student_id)
                .map(|p| p.amount)
                .sum()
        })
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AttendanceRecord, PaymentRecord};

    fn student(id: &str, fee: f64) -> Student {
        Student {
            id: id.to_string(),
            name: format!("Student {id}"),
            class: "6".into(),
            section: "A".into(),
            email: String::new(),
            phone: String::new(),
            guardian: String::new(),
            tuition_fee: fee,
            photo_url: None,
            row: None,
        }
    }

    fn mark(student_id: &str, status: AttendanceStatus) -> AttendanceRecord {
        AttendanceRecord {
            student_id: student_id.into(),
            status,
        }
    }

    fn pay(student_id: &str, amount: f64) -> PaymentRecord {
        PaymentRecord {
            student_id: student_id.into(),
            amount,
        }
    }

    fn sample_attendance() -> AttendanceLog {
        let mut log = AttendanceLog::new();
        log.insert(
            "2024-01-01".into(),
            vec![
                mark("S1", AttendanceStatus::Present),
                mark("S2", AttendanceStatus::Leave),
            ],
        );
        log.insert("2024-01-02".into(), vec![mark("S1", AttendanceStatus::Absent)]);
        log.insert(
            "2024-01-03".into(),
            vec![
                mark("S1", AttendanceStatus::Present),
                mark("S2", AttendanceStatus::Present),
            ],
        );
        log.insert("2024-01-10".into(), vec![mark("S2", AttendanceStatus::Absent)]);
        log
    }

    fn sample_payments() -> PaymentLog {
        let mut log = PaymentLog::new();
        log.insert("2024-01-02".into(), vec![pay("S1", 30.0)]);
        log.insert("2024-01-05".into(), vec![pay("S1", 100.0), pay("S1", 50.0)]);
        log.insert("2024-01-09".into(), vec![pay("S2", 500.0)]);
        log
    }

    #[test]
    fn attendance_counts_per_status() {
        let mut log = AttendanceLog::new();
        log.insert("2024-01-01".into(), vec![mark("S1", AttendanceStatus::Present)]);
        log.insert("2024-01-02".into(), vec![mark("S1", AttendanceStatus::Absent)]);
        let rows = build_attendance_report(
            &[student("S1", 0.0)],
            &log,
            &ReportWindow::new("2024-01-01", "2024-01-02"),
        );
        assert_eq!(
            rows[0].tally,
            AttendanceTally {
                present: 1,
                absent: 1,
                leave: 0
            }
        );
    }

    #[test]
    fn payments_on_one_day_are_summed() {
        let rows = build_student_report(
            &[student("S1", 200.0)],
            &AttendanceLog::new(),
            &sample_payments(),
            &ReportWindow::new("2024-01-05", "2024-01-05"),
        );
        assert_eq!(rows[0].total_paid, 150.0);
        assert_eq!(rows[0].due, 50.0);
    }

    #[test]
    fn inverted_window_reports_zeros_and_full_fee() {
        let students = [student("S1", 200.0), student("S2", 0.0)];
        let rows = build_student_report(
            &students,
            &sample_attendance(),
            &sample_payments(),
            &ReportWindow::new("2024-02-01", "2024-01-01"),
        );
        assert_eq!(rows.len(), 2);
        for (row, s) in rows.iter().zip(students.iter()) {
            assert_eq!(row.tally, AttendanceTally::default());
            assert_eq!(row.total_paid, 0.0);
            assert_eq!(row.due, s.tuition_fee);
        }
    }

    #[test]
    fn due_goes_negative_when_overpaid_and_zero_fee_owes_minus_paid() {
        let rows = build_student_report(
            &[student("S1", 100.0), student("S2", 0.0)],
            &AttendanceLog::new(),
            &sample_payments(),
            &ReportWindow::new("2024-01-01", "2024-01-31"),
        );
        assert_eq!(rows[0].total_paid, 180.0);
        assert_eq!(rows[0].due, -80.0);
        assert_eq!(rows[1].due, -500.0);
    }

    #[test]
    fn rows_follow_roster_order_and_unmarked_students_are_zero() {
        let students = [student("S3", 0.0), student("S2", 0.0), student("S1", 0.0)];
        let rows = build_attendance_report(
            &students,
            &sample_attendance(),
            &ReportWindow::new("2024-01-01", "2024-01-31"),
        );
        let ids: Vec<&str> = rows.iter().map(|r| r.student.id.as_str()).collect();
        assert_eq!(ids, vec!["S3", "S2", "S1"]);
        assert_eq!(rows[0].tally, AttendanceTally::default());
    }

    #[test]
    fn marked_equals_days_with_a_record_in_window() {
        let log = sample_attendance();
        let window = ReportWindow::new("2024-01-01", "2024-01-09");
        let rows = build_attendance_report(&[student("S1", 0.0), student("S2", 0.0)], &log, &window);
        for row in rows {
            let days = log
                .iter()
                .filter(|(d, _)| window.contains(d))
                .filter(|(_, recs)| recs.iter().any(|r| r.student_id == row.student.id))
                .count() as u32;
            assert_eq!(row.tally.marked(), days, "student {}", row.student.id);
        }
    }

    #[test]
    fn report_is_additive_over_adjacent_windows() {
        let students = [student("S1", 200.0), student("S2", 600.0)];
        let attendance = sample_attendance();
        let payments = sample_payments();
        let whole = build_student_report(
            &students,
            &attendance,
            &payments,
            &ReportWindow::new("2024-01-01", "2024-01-31"),
        );
        let left = build_student_report(
            &students,
            &attendance,
            &payments,
            &ReportWindow::new("2024-01-01", "2024-01-04"),
        );
        let right = build_student_report(
            &students,
            &attendance,
            &payments,
            &ReportWindow::new("2024-01-05", "2024-01-31"),
        );
        for i in 0..students.len() {
            assert_eq!(whole[i].tally, left[i].tally + right[i].tally);
            assert_eq!(whole[i].total_paid, left[i].total_paid + right[i].total_paid);
        }
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let w = ReportWindow::new("2024-01-02", "2024-01-03");
        assert!(w.contains("2024-01-02"));
        assert!(w.contains("2024-01-03"));
        assert!(!w.contains("2024-01-01"));
        assert!(!w.contains("2024-01-04"));
    }

    #[test]
    fn last_month_window_clamps_to_month_end() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 31).expect("date");
        let w = ReportWindow::last_month(today);
        assert_eq!(w.start_date, "2024-02-29");
        assert_eq!(w.end_date, "2024-03-31");
    }

    #[test]
    fn sheet_helpers() {
        let log = sample_attendance();
        assert_eq!(total_presents(&log, "S1"), 2);
        assert_eq!(total_presents(&log, "S9"), 0);

        let students = [student("S1", 0.0), student("S2", 0.0), student("S3", 0.0)];
        let day = day_statuses(&log, &students, "2024-01-01");
        assert_eq!(day["S2"], AttendanceStatus::Leave);
        assert_eq!(day["S3"], AttendanceStatus::Present);
        assert_eq!(
            day_counts(day.values()),
            AttendanceTally {
                present: 2,
                absent: 0,
                leave: 1
            }
        );

        assert_eq!(paid_on(&sample_payments(), "S1", "2024-01-05"), 150.0);
        assert_eq!(paid_on(&sample_payments(), "S1", "2024-01-06"), 0.0);
    }

    #[test]
    fn totals_sum_columns() {
        let rows = build_student_report(
            &[student("S1", 200.0), student("S2", 600.0)],
            &sample_attendance(),
            &sample_payments(),
            &ReportWindow::new("2024-01-01", "2024-01-31"),
        );
        let t = ReportTotals::from_rows(&rows);
        assert_eq!(t.tuition_fee, 800.0);
        assert_eq!(t.total_paid, 680.0);
        assert_eq!(t.due, 120.0);
        assert_eq!(t.tally.marked(), 6);
    }
}
