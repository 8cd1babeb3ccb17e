//! Groups the session list by day for display.

use chrono::{DateTime, Utc};

use crate::session::ChatSessionRecord;

/// One display group: a label and the sessions under it, preserving the
/// order they were given in.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionGroup {
    pub label: String,
    pub session_ids: Vec<String>,
}

/// Buckets sessions by calendar day in local time: "Today", "Yesterday",
/// then one group per older day labeled with its full date. Input order is
/// preserved within and across groups, so callers pass a list already
/// sorted newest-first.
pub fn group_by_day(records: &[ChatSessionRecord]) -> Vec<SessionGroup> {
    group_by_day_at(records, Utc::now())
}

fn group_by_day_at(records: &[ChatSessionRecord], now: DateTime<Utc>) -> Vec<SessionGroup> {
    let mut groups: Vec<SessionGroup> = Vec::new();
    for record in records {
        let label = day_label(record.updated_at, now);
        match groups.last_mut() {
            Some(group) if group.label == label => group.session_ids.push(record.id.clone()),
            _ => groups.push(SessionGroup {
                label,
                session_ids: vec![record.id.clone()],
            }),
        }
    }
    groups
}

fn day_label(updated_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let today = now.date_naive();
    let day = updated_at.date_naive();
    if day == today {
        "Today".to_string()
    } else if today.pred_opt() == Some(day) {
        "Yesterday".to_string()
    } else {
        day.format("%B %-d, %Y").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record_at(id: &str, updated_at: DateTime<Utc>) -> ChatSessionRecord {
        ChatSessionRecord {
            id: id.to_string(),
            chat_data: Vec::new(),
            last_active_branch_index: 0,
            updated_at,
            title: id.to_string(),
        }
    }

    #[test]
    fn sessions_bucket_into_today_yesterday_and_dates() {
        let now = Utc.with_ymd_and_hms(2026, 8, 29, 12, 0, 0).unwrap();
        let records = vec![
            record_at("a", now),
            record_at("b", now - chrono::Duration::hours(2)),
            record_at("c", now - chrono::Duration::days(1)),
            record_at("d", now - chrono::Duration::days(10)),
            record_at("e", now - chrono::Duration::days(400)),
        ];

        let groups = group_by_day_at(&records, now);
        assert_eq!(groups.len(), 4);
        assert_eq!(groups[0].label, "Today");
        assert_eq!(groups[0].session_ids, vec!["a", "b"]);
        assert_eq!(groups[1].label, "Yesterday");
        assert_eq!(groups[1].session_ids, vec!["c"]);
        assert_eq!(groups[2].label, "August 19, 2026");
        assert_eq!(groups[3].label, "July 25, 2025");
    }

    #[test]
    fn older_dates_always_carry_the_year() {
        let now = Utc.with_ymd_and_hms(2026, 8, 29, 12, 0, 0).unwrap();
        let same_year = record_at("s", now - chrono::Duration::days(30));
        let groups = group_by_day_at(&[same_year], now);
        assert_eq!(groups[0].label, "July 30, 2026");
    }

    #[test]
    fn empty_list_yields_no_groups() {
        let now = Utc.with_ymd_and_hms(2026, 8, 29, 12, 0, 0).unwrap();
        assert!(group_by_day_at(&[], now).is_empty());
    }
}
