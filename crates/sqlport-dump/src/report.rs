//! Dump results

use sqlport_core::ObjectRef;

use crate::DumpError;

/// An object that could not be dumped
#[derive(Debug)]
pub struct ObjectFailure {
    pub object: ObjectRef,
    pub error: DumpError,
}

impl ObjectFailure {
    pub fn reason(&self) -> String {
        self.error.to_string()
    }
}

/// Rows and batches written for one table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DataWriteSummary {
    pub rows: u64,
    pub batches: u64,
    pub cancelled: bool,
}

#[derive(Debug, Default)]
pub struct DumpReport {
    pub succeeded: Vec<ObjectRef>,
    pub failures: Vec<ObjectFailure>,
    pub rows_written: u64,
    pub batches_written: u64,
}

impl DumpReport {
    pub fn success_count(&self) -> usize {
        self.succeeded.len()
    }

    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failures.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub(crate) fn record_success(&mut self, object: ObjectRef) {
        self.succeeded.push(object);
    }

    pub(crate) fn record_failure(&mut self, object: ObjectRef, error: DumpError) {
        tracing::warn!(object = %object, error = %error, "object skipped in dump");
        self.failures.push(ObjectFailure { object, error });
    }

    pub(crate) fn add_data(&mut self, summary: DataWriteSummary) {
        self.rows_written += summary.rows;
        self.batches_written += summary.batches;
    }

    /// `N of M objects dumped`, followed by each failure and its reason
    pub fn summary(&self) -> String {
        let mut text = format!("{} of {} objects dumped", self.success_count(), self.total());
        if !self.failures.is_empty() {
            let failed = self
                .failures
                .iter()
                .map(|f| format!("{} ({})", f.object, f.reason()))
                .collect::<Vec<_>>()
                .join(", ");
            text.push_str("; failed: ");
            text.push_str(&failed);
        }
        text
    }
}

/// How a dump ended. Cancellation is an outcome, not an error.
#[derive(Debug)]
pub enum DumpOutcome {
    Completed(DumpReport),
    Cancelled(DumpReport),
}

impl DumpOutcome {
    pub fn report(&self) -> &DumpReport {
        match self {
            DumpOutcome::Completed(report) | DumpOutcome::Cancelled(report) => report,
        }
    }

    pub fn into_report(self) -> DumpReport {
        match self {
            DumpOutcome::Completed(report) | DumpOutcome::Cancelled(report) => report,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, DumpOutcome::Cancelled(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlport_core::CoreError;

    #[test]
    fn test_summary_lists_failures() {
        let mut report = DumpReport::default();
        report.record_success(ObjectRef::table("users"));
        report.record_success(ObjectRef::table("orders"));
        report.record_failure(
            ObjectRef::view("v_broken"),
            DumpError::from_core("shop.v_broken", CoreError::Query("view is invalid".into())),
        );

        assert_eq!(
            report.summary(),
            "2 of 3 objects dumped; failed: view v_broken \
             (Failed to introspect shop.v_broken: Query error: view is invalid)"
        );
        assert!(!report.is_complete());
    }

    #[test]
    fn test_summary_without_failures() {
        let mut report = DumpReport::default();
        report.record_success(ObjectRef::table("users"));
        report.add_data(DataWriteSummary {
            rows: 5,
            batches: 1,
            cancelled: false,
        });
        assert_eq!(report.summary(), "1 of 1 objects dumped");
        assert_eq!(report.rows_written, 5);
    }
}
