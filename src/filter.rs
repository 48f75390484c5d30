//! Snapshot selection.
//!
//! Each criterion is a predicate over a [`Snapshot`]. Configured criteria are
//! applied as successive narrowing passes, so a snapshot survives only when
//! every configured predicate accepts it.

use crate::snapshot::Snapshot;
use crate::tags::{TagFilters, split_values};
use chrono::{DateTime, Duration, Utc};

/// Instant `age_days` days before `now`, clamped to the earliest
/// representable instant for ages beyond chrono's range.
pub fn cutoff(now: DateTime<Utc>, age_days: u32) -> DateTime<Utc> {
    now.checked_sub_signed(Duration::days(i64::from(age_days)))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// True when the snapshot was started strictly before `cutoff`.
pub fn is_expired(snapshot: &Snapshot, cutoff: DateTime<Utc>) -> bool {
    snapshot.start_time < cutoff
}

/// True when at least one tag has a filtered key and shares a value with
/// that filter. Both sides are comma separated lists of values.
pub fn matches_tags(snapshot: &Snapshot, tags: &TagFilters) -> bool {
    snapshot.tags.iter().any(|tag| {
        tags.get(&tag.key).is_some_and(|wanted| {
            split_values(&tag.value).any(|have| split_values(wanted).any(|want| want == have))
        })
    })
}

/// Apply the age and tag criteria, then order by start time ascending.
///
/// `age_days == 0` and an empty tag map each disable their criterion.
/// Snapshots with equal start times keep their listing order.
pub fn select(
    mut snapshots: Vec<Snapshot>,
    now: DateTime<Utc>,
    age_days: u32,
    tags: &TagFilters,
) -> Vec<Snapshot> {
    if age_days > 0 {
        let cutoff = cutoff(now, age_days);
        snapshots.retain(|s| is_expired(s, cutoff));
    }
    if !tags.is_empty() {
        snapshots.retain(|s| matches_tags(s, tags));
    }
    snapshots.sort_by_key(|s| s.start_time);
    snapshots
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 30, 0, 0, 0).unwrap()
    }

    fn days_ago(days: i64) -> DateTime<Utc> {
        now() - Duration::days(days)
    }

    fn tags(pairs: &[(&str, &str)]) -> TagFilters {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn ids(snapshots: &[Snapshot]) -> Vec<&str> {
        snapshots.iter().map(|s| s.id.as_str()).collect()
    }

    #[test]
    fn age_keeps_only_older_than_cutoff() {
        let snapshots = vec![
            Snapshot::new("snap-10d", days_ago(10)),
            Snapshot::new("snap-5d", days_ago(5)),
            Snapshot::new("snap-1d", days_ago(1)),
        ];
        let got = select(snapshots, now(), 7, &TagFilters::new());
        assert_eq!(ids(&got), vec!["snap-10d"]);
    }

    #[test]
    fn huge_age_selects_nothing() {
        let snapshots = vec![
            Snapshot::new("epoch", DateTime::<Utc>::default()),
            Snapshot::new("snap-10d", days_ago(10)),
        ];
        assert_eq!(cutoff(now(), u32::MAX), DateTime::<Utc>::MIN_UTC);
        assert!(select(snapshots, now(), u32::MAX, &TagFilters::new()).is_empty());
    }

    #[test]
    fn cutoff_is_exclusive() {
        let exactly = Snapshot::new("snap-7d", days_ago(7));
        assert!(!is_expired(&exactly, cutoff(now(), 7)));
    }

    #[test]
    fn tag_values_are_alternatives() {
        let snapshots = vec![
            Snapshot::new("foo", days_ago(3)).with_tag("Name", "foo"),
            Snapshot::new("baz", days_ago(2)).with_tag("Name", "baz"),
            Snapshot::new("bar", days_ago(1)).with_tag("Name", "bar"),
        ];
        let got = select(snapshots, now(), 0, &tags(&[("Name", "foo,bar")]));
        assert_eq!(ids(&got), vec!["foo", "bar"]);
    }

    #[test]
    fn snapshot_tag_value_is_split_too() {
        let snapshot = Snapshot::new("multi", now()).with_tag("Role", "web, db");
        assert!(matches_tags(&snapshot, &tags(&[("Role", "db")])));
        assert!(!matches_tags(&snapshot, &tags(&[("Role", "cache")])));
    }

    #[test]
    fn any_filtered_key_is_enough() {
        let snapshot = Snapshot::new("s", now())
            .with_tag("Name", "other")
            .with_tag("Env", "prod");
        assert!(matches_tags(&snapshot, &tags(&[("Name", "foo"), ("Env", "prod")])));
    }

    #[test]
    fn untagged_snapshot_never_matches() {
        let snapshot = Snapshot::new("bare", now());
        assert!(!matches_tags(&snapshot, &tags(&[("Name", "foo")])));
    }

    #[test]
    fn age_and_tags_both_apply() {
        let snapshots = vec![
            Snapshot::new("old-match", days_ago(30)).with_tag("Env", "qa"),
            Snapshot::new("old-other", days_ago(30)).with_tag("Env", "prod"),
            Snapshot::new("new-match", days_ago(1)).with_tag("Env", "qa"),
        ];
        let got = select(snapshots, now(), 7, &tags(&[("Env", "qa")]));
        assert_eq!(ids(&got), vec!["old-match"]);
    }

    #[test]
    fn sort_is_stable_for_equal_times() {
        let t1 = days_ago(20);
        let t2 = days_ago(10);
        let snapshots = vec![
            Snapshot::new("S2", t2),
            Snapshot::new("S1", t1),
            Snapshot::new("S3", t1),
        ];
        let got = select(snapshots, now(), 1, &TagFilters::new());
        assert_eq!(ids(&got), vec!["S1", "S3", "S2"]);
    }
}
