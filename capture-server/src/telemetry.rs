use metrics::{counter, gauge};

use crate::session::DuplicateKind;

pub struct Telemetry;

impl Telemetry {
    pub fn record_saved(total_lines: usize) {
        counter!("capture_messages_saved_total").increment(1);
        gauge!("capture_session_lines").set(total_lines as f64);
    }

    pub fn record_duplicate(kind: DuplicateKind) {
        let kind = match kind {
            DuplicateKind::Exact => "exact",
            DuplicateKind::Similar => "similar",
        };
        counter!("capture_duplicates_total", "kind" => kind).increment(1);
    }

    pub fn record_reset() {
        counter!("capture_resets_total").increment(1);
        gauge!("capture_session_lines").set(0.0);
    }

    pub fn record_error() {
        counter!("capture_errors_total").increment(1);
    }
}
