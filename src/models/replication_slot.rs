//! Row model for `pg_replication_slots`.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One row of `pg_replication_slots`: a named, persistent marker on the
/// primary retaining WAL until a specific standby has consumed it.
///
/// LSN and transaction-horizon columns are carried as opaque text tokens;
/// consumers only compare or display them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ReplicationSlot {
    pub slot_name: String,
    pub plugin: Option<String>,
    pub slot_type: String,
    pub database: Option<String>,
    pub temporary: bool,
    pub active: bool,
    pub active_pid: Option<i32>,
    pub xmin: Option<String>,
    pub catalog_xmin: Option<String>,
    pub restart_lsn: Option<String>,
    pub confirmed_flush_lsn: Option<String>,
}

impl ReplicationSlot {
    /// Find a slot by name. If duplicates exist the first match is
    /// authoritative.
    pub fn find_by_name<'a>(slots: &'a [ReplicationSlot], name: &str) -> Option<&'a ReplicationSlot> {
        slots.iter().find(|slot| slot.slot_name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(name: &str, active: bool) -> ReplicationSlot {
        ReplicationSlot {
            slot_name: name.to_string(),
            plugin: None,
            slot_type: "physical".to_string(),
            database: None,
            temporary: false,
            active,
            active_pid: None,
            xmin: None,
            catalog_xmin: None,
            restart_lsn: Some("0/3000060".to_string()),
            confirmed_flush_lsn: None,
        }
    }

    #[test]
    fn find_by_name_returns_first_match() {
        let slots = vec![slot("node_a", true), slot("node_a", false), slot("node_b", true)];
        let found = ReplicationSlot::find_by_name(&slots, "node_a").unwrap();
        assert!(found.active);
    }

    #[test]
    fn find_by_name_missing() {
        let slots = vec![slot("node_a", true)];
        assert!(ReplicationSlot::find_by_name(&slots, "node_c").is_none());
    }
}
