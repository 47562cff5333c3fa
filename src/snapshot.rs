//! Resume snapshots.
//!
//! A snapshot captures the state a service was observed in, so a new
//! service for the same component (after a remount or hot reload) can be
//! created at that state with [`ServiceOptions::resume`]. Only the state is
//! captured; context, refs and effects belong to the live service.
//!
//! [`ServiceOptions::resume`]: crate::service::ServiceOptions::resume

use crate::core::State;
use crate::service::{MachineError, MachineStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Version identifier for the snapshot format.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Serializable capture of a service's active state.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Snapshot<S: State> {
    /// Snapshot format version
    pub version: u32,

    /// Unique snapshot identifier
    pub id: Uuid,

    /// Scope id of the service the snapshot was taken from
    pub service_id: String,

    /// When the snapshot was taken
    pub taken_at: DateTime<Utc>,

    /// Active state at the time of the snapshot
    pub state: S,

    /// Lifecycle status at the time of the snapshot
    pub status: MachineStatus,
}

impl<S: State> Snapshot<S> {
    pub fn new(service_id: impl Into<String>, state: S, status: MachineStatus) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            id: Uuid::new_v4(),
            service_id: service_id.into(),
            taken_at: Utc::now(),
            state,
            status,
        }
    }

    pub fn is_supported(&self) -> bool {
        self.version == SNAPSHOT_VERSION
    }

    pub(crate) fn check_version(&self) -> Result<(), MachineError> {
        if self.is_supported() {
            Ok(())
        } else {
            Err(MachineError::UnsupportedSnapshot {
                found: self.version,
                supported: SNAPSHOT_VERSION,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FixtureState;

    #[test]
    fn snapshot_survives_json() {
        let snapshot = Snapshot::new("tabs-1", FixtureState::Open, MachineStatus::Started);
        let json = serde_json::to_string(&snapshot).unwrap();
        let restored: Snapshot<FixtureState> = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.id, snapshot.id);
        assert_eq!(restored.service_id, "tabs-1");
        assert_eq!(restored.state, FixtureState::Open);
        assert_eq!(restored.status, MachineStatus::Started);
    }

    #[test]
    fn future_versions_are_rejected() {
        let mut snapshot = Snapshot::new("tabs-1", FixtureState::Idle, MachineStatus::Stopped);
        assert!(snapshot.check_version().is_ok());

        snapshot.version = SNAPSHOT_VERSION + 1;
        assert!(!snapshot.is_supported());
        assert_eq!(
            snapshot.check_version(),
            Err(MachineError::UnsupportedSnapshot {
                found: 2,
                supported: 1
            })
        );
    }
}
