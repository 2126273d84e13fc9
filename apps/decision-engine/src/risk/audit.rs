//! Append-only audit log for risk decisions.
//!
//! Every assessment (approved or rejected) is appended to a JSON-lines
//! file and a CSV file with a UTC timestamp. Logging is best-effort: a
//! write failure is traced and swallowed so the decision path never
//! blocks on audit I/O.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::RiskDecision;

const CSV_HEADER: &str = "timestamp,approved,reason,instrument_id,action,position_size,\
entry_price,stop_loss,take_profit,risk_reward_ratio,risk_amount";

#[derive(Serialize)]
struct AuditEntry<'a> {
    timestamp: DateTime<Utc>,
    #[serde(flatten)]
    decision: &'a RiskDecision,
}

/// Durable decision history writer (JSON lines + CSV).
#[derive(Debug, Clone)]
pub struct AuditLog {
    json_path: PathBuf,
    csv_path: PathBuf,
}

impl AuditLog {
    /// Create an audit log writing into `dir`.
    #[must_use]
    pub fn new(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            json_path: dir.join("assessment_history.json"),
            csv_path: dir.join("assessment_history.csv"),
        }
    }

    /// Append one decision to both files. Never fails the caller.
    pub fn record(&self, decision: &RiskDecision) {
        let timestamp = Utc::now();
        if let Err(error) = self.append_json(decision, timestamp) {
            tracing::warn!(%error, path = %self.json_path.display(), "Audit JSON write failed");
        }
        if let Err(error) = self.append_csv(decision, timestamp) {
            tracing::warn!(%error, path = %self.csv_path.display(), "Audit CSV write failed");
        }
    }

    fn append_json(&self, decision: &RiskDecision, timestamp: DateTime<Utc>) -> std::io::Result<()> {
        if let Some(parent) = self.json_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let entry = AuditEntry {
            timestamp,
            decision,
        };
        let line = serde_json::to_string(&entry).map_err(std::io::Error::other)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.json_path)?;
        writeln!(file, "{line}")
    }

    fn append_csv(&self, decision: &RiskDecision, timestamp: DateTime<Utc>) -> std::io::Result<()> {
        if let Some(parent) = self.csv_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let needs_header = !self.csv_path.exists();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.csv_path)?;
        if needs_header {
            writeln!(file, "{CSV_HEADER}")?;
        }

        let opt = |value: Option<rust_decimal::Decimal>| {
            value.map(|v| v.to_string()).unwrap_or_default()
        };
        writeln!(
            file,
            "{},{},{},{},{},{},{},{},{},{},{}",
            timestamp.to_rfc3339(),
            decision.approved,
            csv_quote(&decision.reason),
            decision.instrument_id,
            decision.action,
            decision.position_size,
            decision.entry_price,
            opt(decision.stop_loss),
            opt(decision.take_profit),
            opt(decision.risk_reward_ratio),
            decision.risk_amount,
        )
    }
}

/// Quote a CSV field that may contain commas or quotes.
fn csv_quote(field: &str) -> String {
    if field.contains(',') || field.contains('"') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TradeAction;
    use rust_decimal_macros::dec;

    fn sample_decision() -> RiskDecision {
        RiskDecision {
            instrument_id: "LOGTEST".to_string(),
            action: TradeAction::Buy,
            approved: true,
            reason: "Trade approved.".to_string(),
            position_size: 10,
            entry_price: dec!(200),
            stop_loss: Some(dec!(190)),
            take_profit: None,
            risk_reward_ratio: None,
            risk_amount: dec!(100),
        }
    }

    #[test]
    fn test_record_writes_json_and_csv() {
        let dir = tempfile::tempdir().unwrap();
        let log = AuditLog::new(dir.path());

        log.record(&sample_decision());

        let json = std::fs::read_to_string(dir.path().join("assessment_history.json")).unwrap();
        let lines: Vec<&str> = json.lines().collect();
        assert_eq!(lines.len(), 1);
        let parsed: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed["instrument_id"], "LOGTEST");
        assert_eq!(parsed["approved"], true);

        let csv = std::fs::read_to_string(dir.path().join("assessment_history.csv")).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2); // header + 1 row
        assert!(lines[0].starts_with("timestamp,approved,reason"));
        assert!(lines[1].contains("LOGTEST"));
        assert!(lines[1].contains("true"));
    }

    #[test]
    fn test_header_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let log = AuditLog::new(dir.path());

        log.record(&sample_decision());
        log.record(&sample_decision());

        let csv = std::fs::read_to_string(dir.path().join("assessment_history.csv")).unwrap();
        assert_eq!(csv.lines().count(), 3);
        assert_eq!(
            csv.lines().filter(|l| l.starts_with("timestamp,")).count(),
            1
        );
    }

    #[test]
    fn test_reason_with_comma_is_quoted() {
        let dir = tempfile::tempdir().unwrap();
        let log = AuditLog::new(dir.path());

        let mut decision = sample_decision();
        decision.reason = "Scaled down, budget exhausted".to_string();
        log.record(&decision);

        let csv = std::fs::read_to_string(dir.path().join("assessment_history.csv")).unwrap();
        assert!(csv.contains("\"Scaled down, budget exhausted\""));
    }

    #[test]
    fn test_unwritable_directory_does_not_panic() {
        let log = AuditLog::new("/proc/nonexistent/audit");
        log.record(&sample_decision());
    }
}
