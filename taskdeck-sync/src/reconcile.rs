//! Last-write-wins decision between the cached and the backend profile.
//!
//! | local   | remote  | timestamps        | outcome       |
//! |---------|---------|-------------------|---------------|
//! | absent  | present | n/a               | `AdoptRemote` |
//! | present | present | remote > local    | `AdoptRemote` |
//! | present | present | local > remote    | `PushLocal`   |
//! | present | present | equal             | `NoOp`        |
//! | any     | absent  | n/a               | `NoOp`        |
//!
//! Pure: no I/O, no clock. Comparison is strict, so ties never write.

use taskdeck_core::{ProfileRecord, ProfileUpdate};

/// What the runner must do to bring the two copies in line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// Write this record into the local cache verbatim.
    AdoptRemote(ProfileRecord),
    /// Send these fields to the backend.
    PushLocal(ProfileUpdate),
    NoOp,
}

pub fn reconcile(local: Option<&ProfileRecord>, remote: Option<&ProfileRecord>) -> Reconciliation {
    match (local, remote) {
        (None, Some(remote)) => Reconciliation::AdoptRemote(remote.clone()),
        (Some(local), Some(remote)) if remote.updated_at > local.updated_at => {
            Reconciliation::AdoptRemote(remote.clone())
        }
        (Some(local), Some(remote)) if local.updated_at > remote.updated_at => {
            Reconciliation::PushLocal(ProfileUpdate::from(local))
        }
        _ => Reconciliation::NoOp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use rstest::rstest;
    use taskdeck_core::{timestamp, UserId};

    fn profile(updated_at: &str, display_name: &str) -> ProfileRecord {
        ProfileRecord {
            id: UserId::from("u1"),
            username: "jdoe".to_string(),
            display_name: display_name.to_string(),
            email: Some("j@x.com".to_string()),
            avatar_ref: Some("https://cdn.example/u1.png".to_string()),
            updated_at: timestamp::parse(updated_at).unwrap(),
        }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn local_absent_adopts_remote() {
        let remote = profile("2025-01-02T10:00:00Z", "John Doe");
        assert_eq!(
            reconcile(None, Some(&remote)),
            Reconciliation::AdoptRemote(remote)
        );
    }

    #[test]
    fn newer_remote_is_adopted_field_for_field() {
        let local = profile("2025-01-01", "Old Name");
        let remote = profile("2025-01-03", "New Name");
        match reconcile(Some(&local), Some(&remote)) {
            Reconciliation::AdoptRemote(applied) => assert_eq!(applied, remote),
            other => panic!("expected AdoptRemote, got {other:?}"),
        }
    }

    #[test]
    fn newer_local_pushes_mutable_fields() {
        let mut local = profile("2025-01-05", "Local Name");
        local.username = "johnny".to_string();
        let remote = profile("2025-01-01", "Remote Name");
        assert_eq!(
            reconcile(Some(&local), Some(&remote)),
            Reconciliation::PushLocal(ProfileUpdate {
                username: "johnny".to_string(),
                display_name: "Local Name".to_string(),
                avatar_ref: Some("https://cdn.example/u1.png".to_string()),
            })
        );
    }

    #[rstest]
    #[case::equal_timestamps(Some(0), Some(0))]
    #[case::remote_absent(Some(0), None)]
    #[case::both_absent(None, None)]
    fn no_write_cases(#[case] local: Option<i64>, #[case] remote: Option<i64>) {
        let local = local.map(|s| ProfileRecord {
            updated_at: at(s),
            ..profile("2025-01-01", "L")
        });
        let remote = remote.map(|s| ProfileRecord {
            updated_at: at(s),
            ..profile("2025-01-01", "R")
        });
        assert_eq!(
            reconcile(local.as_ref(), remote.as_ref()),
            Reconciliation::NoOp
        );
    }

    #[rstest]
    #[case(100, 101)]
    #[case(101, 100)]
    #[case(100, 100)]
    fn deterministic_for_identical_inputs(#[case] local_secs: i64, #[case] remote_secs: i64) {
        let local = ProfileRecord {
            updated_at: at(local_secs),
            ..profile("2025-01-01", "L")
        };
        let remote = ProfileRecord {
            updated_at: at(remote_secs),
            ..profile("2025-01-01", "R")
        };
        let first = reconcile(Some(&local), Some(&remote));
        let second = reconcile(Some(&local), Some(&remote));
        assert_eq!(first, second);
    }

    #[test]
    fn adopting_remote_then_reconciling_again_is_noop() {
        let local = profile("2025-01-01", "Old");
        let remote = profile("2025-01-03", "New");
        let Reconciliation::AdoptRemote(applied) = reconcile(Some(&local), Some(&remote)) else {
            panic!("expected AdoptRemote");
        };
        assert_eq!(
            reconcile(Some(&applied), Some(&remote)),
            Reconciliation::NoOp
        );
    }

    #[test]
    fn sub_second_difference_is_respected() {
        let local = profile("2025-01-02 10:00:00.100+00", "L");
        let remote = profile("2025-01-02T10:00:00.200Z", "R");
        assert!(matches!(
            reconcile(Some(&local), Some(&remote)),
            Reconciliation::AdoptRemote(_)
        ));
    }
}
