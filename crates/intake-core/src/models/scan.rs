use serde::{Deserialize, Serialize};

/// Verdict of a virus or heuristic scan.
///
/// `ScanError` must be treated exactly like `Infected` when deciding whether
/// to admit a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScanOutcome {
    Clean,
    Infected { signature: String },
    ScanError { cause: String },
}

impl ScanOutcome {
    pub fn is_clean(&self) -> bool {
        matches!(self, ScanOutcome::Clean)
    }
}

/// Result of a best-effort object deletion.
///
/// Deletion never fails the caller; this only tells it whether the object
/// store acknowledged the delete or the outcome is unknown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CleanupOutcome {
    Deleted,
    Attempted { reason: String },
}

impl CleanupOutcome {
    pub fn is_acknowledged(&self) -> bool {
        matches!(self, CleanupOutcome::Deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_clean_is_clean() {
        assert!(ScanOutcome::Clean.is_clean());
        assert!(!ScanOutcome::Infected {
            signature: "Eicar".into()
        }
        .is_clean());
        assert!(!ScanOutcome::ScanError {
            cause: "timeout".into()
        }
        .is_clean());
    }

    #[test]
    fn test_cleanup_outcome_serializes_with_status_tag() {
        let json = serde_json::to_value(CleanupOutcome::Attempted {
            reason: "access denied".into(),
        })
        .unwrap();
        assert_eq!(json["status"], "attempted");
        assert!(!CleanupOutcome::Attempted { reason: String::new() }.is_acknowledged());
        assert!(CleanupOutcome::Deleted.is_acknowledged());
    }
}
