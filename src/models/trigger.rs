use diesel::prelude::*;
use jiff_diesel::{Timestamp, ToDiesel};

use crate::jobs::{JobId, PersistedJobRecord};
use crate::trigger::round_up;

/// Postgres keeps microseconds.
const MICROSECOND_NANOS: i32 = 1_000;

/// Row of the `scheduled_triggers` table
///
/// Used for inserts as well as reads; `created_at` carries the record's
/// `scheduled_at` so the value survives a round trip. The trigger time is
/// rounded up to the column's microsecond precision.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = crate::schema::scheduled_triggers)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TriggerRow {
    pub job_id: String,
    pub job_group: String,
    pub job_name: String,
    pub trigger_time: Timestamp,
    pub serialized_payload: String,
    pub type_tag: String,
    pub created_at: Timestamp,
}

impl From<PersistedJobRecord> for TriggerRow {
    fn from(record: PersistedJobRecord) -> Self {
        Self {
            job_id: record.job_id.to_string(),
            job_group: record.job_group,
            job_name: record.job_name,
            trigger_time: round_up(record.trigger_at, MICROSECOND_NANOS).to_diesel(),
            serialized_payload: record.serialized_payload,
            type_tag: record.type_tag,
            created_at: record.scheduled_at.to_diesel(),
        }
    }
}

impl From<TriggerRow> for PersistedJobRecord {
    fn from(row: TriggerRow) -> Self {
        Self {
            job_id: JobId::from(row.job_id),
            job_group: row.job_group,
            job_name: row.job_name,
            trigger_at: row.trigger_time.to_jiff(),
            serialized_payload: row.serialized_payload,
            type_tag: row.type_tag,
            scheduled_at: row.created_at.to_jiff(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_row_conversion_keeps_every_field() {
        let record = PersistedJobRecord {
            job_id: JobId::from("0b5c7f3e-3f7a-4c55-9d1e-1a2b3c4d5e6f"),
            job_group: "hearings".to_string(),
            job_name: "adjourn".to_string(),
            trigger_at: jiff::Timestamp::from_second(1_750_000_000).unwrap(),
            serialized_payload: "{\"case\":12}".to_string(),
            type_tag: "adjournment".to_string(),
            scheduled_at: jiff::Timestamp::from_second(1_749_000_000).unwrap(),
        };

        let row = TriggerRow::from(record.clone());
        assert_eq!(row.job_id, "0b5c7f3e-3f7a-4c55-9d1e-1a2b3c4d5e6f");
        assert_eq!(PersistedJobRecord::from(row), record);
    }

    #[test]
    fn test_trigger_time_rounds_up_to_microseconds() {
        let at = jiff::Timestamp::from_nanosecond(1_750_000_000_000_000_001).unwrap();
        let record = PersistedJobRecord {
            job_id: JobId::generate(),
            job_group: "g".to_string(),
            job_name: "n".to_string(),
            trigger_at: at,
            serialized_payload: String::new(),
            type_tag: "t".to_string(),
            scheduled_at: at,
        };

        let stored = PersistedJobRecord::from(TriggerRow::from(record)).trigger_at;
        assert!(stored >= at);
        assert_eq!(stored.as_nanosecond(), 1_750_000_000_000_001_000);
    }
}
