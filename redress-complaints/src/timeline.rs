// Activity ledger timeline derivations.
//
// Two read-only views over a complaint's history and notes: a flat
// chronological feed, and the stage-grouped view that follows the
// state-machine track. Neither mutates the ledger; both are pure functions
// so they can be derived again after every refetch.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::lifecycle::{ChangeType, ComplaintStatus};
use crate::models::{HistoryEntry, Note};

/// History row joined with the actor's display name from the profile mirror.
#[derive(Debug, Clone)]
pub struct HistoryWithActor {
    pub entry: HistoryEntry,
    pub actor_name: Option<String>,
}

/// Note joined with the author's display name.
#[derive(Debug, Clone)]
pub struct NoteWithAuthor {
    pub note: Note,
    pub author_name: Option<String>,
}

// --- Flat chronological feed ---

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TimelineItem {
    History {
        id: Uuid,
        change_type: String,
        old_value: Option<String>,
        new_value: Option<String>,
        note: Option<String>,
        changed_by: Uuid,
        changed_by_name: Option<String>,
        created_at: DateTime<Utc>,
    },
    Note {
        id: Uuid,
        admin_id: Uuid,
        admin_name: Option<String>,
        note: String,
        created_at: DateTime<Utc>,
    },
}

impl TimelineItem {
    fn created_at(&self) -> DateTime<Utc> {
        match self {
            Self::History { created_at, .. } | Self::Note { created_at, .. } => *created_at,
        }
    }

    /// Tie-break rank for equal timestamps: history sorts before notes.
    fn kind_rank(&self) -> u8 {
        match self {
            Self::History { .. } => 0,
            Self::Note { .. } => 1,
        }
    }
}

/// Merge history and notes into one feed, newest first. Equal timestamps
/// order history before note so the feed is deterministic.
pub fn flat_timeline(history: Vec<HistoryWithActor>, notes: Vec<NoteWithAuthor>) -> Vec<TimelineItem> {
    let mut items: Vec<TimelineItem> = history
        .into_iter()
        .map(|h| TimelineItem::History {
            id: h.entry.id,
            change_type: h.entry.change_type,
            old_value: h.entry.old_value,
            new_value: h.entry.new_value,
            note: h.entry.note,
            changed_by: h.entry.changed_by,
            changed_by_name: h.actor_name,
            created_at: h.entry.created_at,
        })
        .chain(notes.into_iter().map(|n| TimelineItem::Note {
            id: n.note.id,
            admin_id: n.note.admin_id,
            admin_name: n.author_name,
            note: n.note.note,
            created_at: n.note.created_at,
        }))
        .collect();

    items.sort_by(|a, b| {
        b.created_at()
            .cmp(&a.created_at())
            .then(a.kind_rank().cmp(&b.kind_rank()))
    });
    items
}

// --- Stage-grouped view ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageState {
    Completed,
    Active,
    Upcoming,
}

#[derive(Debug, Clone, Serialize)]
pub struct StageNote {
    pub id: Uuid,
    pub admin_id: Uuid,
    pub admin_name: Option<String>,
    pub note: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct StageView {
    pub stage: ComplaintStatus,
    pub state: StageState,
    /// When the complaint entered this stage; `None` when the stage was
    /// skipped by a forward jump or not reached yet.
    pub entered_at: Option<DateTime<Utc>>,
    pub entered_by: Option<Uuid>,
    pub entered_by_name: Option<String>,
    pub notes: Vec<StageNote>,
}

/// Terminal banner shown instead of fitting `rejected` into the stage track.
#[derive(Debug, Serialize)]
pub struct RejectionInfo {
    pub rejected_at: DateTime<Utc>,
    pub rejected_by: Uuid,
    pub rejected_by_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StageTimeline {
    pub current_status: ComplaintStatus,
    pub stages: Vec<StageView>,
    pub rejection: Option<RejectionInfo>,
}

/// The earliest history row that enters a given stage. A `created` row
/// enters `pending`; a `status_change` row enters its `new_value`.
fn stage_entry<'a>(
    stage: ComplaintStatus,
    history: &'a [HistoryWithActor],
) -> Option<&'a HistoryWithActor> {
    history
        .iter()
        .filter(|h| {
            match h.entry.change_type.parse::<ChangeType>() {
                Ok(ChangeType::Created) => stage == ComplaintStatus::Pending,
                Ok(ChangeType::StatusChange) => {
                    h.entry.new_value.as_deref() == Some(stage.as_str())
                }
                _ => false,
            }
        })
        .min_by_key(|h| h.entry.created_at)
}

/// Build the stage-grouped timeline for a complaint with live status
/// `status`. Notes are bucketed into the window between a stage's entry and
/// the next reached stage's entry; the latest reached stage's window extends
/// to now. Stage states follow the live status: stages before it are
/// completed, the current one is active, later ones upcoming.
pub fn stage_timeline(
    status: ComplaintStatus,
    history: &[HistoryWithActor],
    notes: &[NoteWithAuthor],
) -> StageTimeline {
    let entries: Vec<Option<&HistoryWithActor>> = ComplaintStatus::STAGES
        .iter()
        .map(|stage| stage_entry(*stage, history))
        .collect();

    // (stage index, entered_at) for reached stages, in track order.
    let reached: Vec<(usize, DateTime<Utc>)> = entries
        .iter()
        .enumerate()
        .filter_map(|(i, e)| e.map(|h| (i, h.entry.created_at)))
        .collect();

    // A note belongs to the latest reached stage entered at or before the
    // note; notes that predate every entry go to the first reached stage.
    let bucket_for = |at: DateTime<Utc>| -> Option<usize> {
        reached
            .iter()
            .rev()
            .find(|(_, entered)| *entered <= at)
            .or_else(|| reached.first())
            .map(|(i, _)| *i)
    };

    let mut buckets: Vec<Vec<StageNote>> = vec![Vec::new(); ComplaintStatus::STAGES.len()];
    for n in notes {
        if let Some(idx) = bucket_for(n.note.created_at) {
            buckets[idx].push(StageNote {
                id: n.note.id,
                admin_id: n.note.admin_id,
                admin_name: n.author_name.clone(),
                note: n.note.note.clone(),
                created_at: n.note.created_at,
            });
        }
    }
    for bucket in &mut buckets {
        bucket.sort_by_key(|n| n.created_at);
    }

    let current_idx = status.stage_index();
    let mut buckets = buckets.into_iter();
    let stages = ComplaintStatus::STAGES
        .iter()
        .enumerate()
        .map(|(i, stage)| {
            let state = match current_idx {
                Some(cur) if i < cur => StageState::Completed,
                Some(cur) if i == cur => StageState::Active,
                Some(_) => StageState::Upcoming,
                // Rejected: reached stages stay completed, the rest never
                // happen.
                None => {
                    if entries[i].is_some() {
                        StageState::Completed
                    } else {
                        StageState::Upcoming
                    }
                }
            };
            StageView {
                stage: *stage,
                state,
                entered_at: entries[i].map(|h| h.entry.created_at),
                entered_by: entries[i].map(|h| h.entry.changed_by),
                entered_by_name: entries[i].and_then(|h| h.actor_name.clone()),
                notes: buckets.next().unwrap_or_default(),
            }
        })
        .collect();

    let rejection = history
        .iter()
        .filter(|h| h.entry.new_value.as_deref() == Some(ComplaintStatus::Rejected.as_str()))
        .min_by_key(|h| h.entry.created_at)
        .map(|h| RejectionInfo {
            rejected_at: h.entry.created_at,
            rejected_by: h.entry.changed_by,
            rejected_by_name: h.actor_name.clone(),
        });

    StageTimeline {
        current_status: status,
        stages,
        rejection,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn history_row(
        change_type: &str,
        old: Option<&str>,
        new: Option<&str>,
        at: DateTime<Utc>,
    ) -> HistoryWithActor {
        HistoryWithActor {
            entry: HistoryEntry {
                id: Uuid::new_v4(),
                complaint_id: Uuid::new_v4(),
                change_type: change_type.to_string(),
                old_value: old.map(String::from),
                new_value: new.map(String::from),
                note: None,
                changed_by: Uuid::new_v4(),
                created_at: at,
            },
            actor_name: Some("Dana".into()),
        }
    }

    fn note_row(text: &str, at: DateTime<Utc>) -> NoteWithAuthor {
        NoteWithAuthor {
            note: Note {
                id: Uuid::new_v4(),
                complaint_id: Uuid::new_v4(),
                admin_id: Uuid::new_v4(),
                note: text.to_string(),
                created_at: at,
                updated_at: at,
            },
            author_name: Some("Dana".into()),
        }
    }

    #[test]
    fn flat_feed_is_newest_first_with_history_winning_ties() {
        let t0 = Utc::now();
        let t1 = t0 + Duration::minutes(5);
        let history = vec![
            history_row("created", None, Some("pending"), t0),
            history_row("status_change", Some("pending"), Some("verified"), t1),
        ];
        let notes = vec![note_row("checked the access point", t1)];

        let feed = flat_timeline(history, notes);
        assert_eq!(feed.len(), 3);
        // t1 history beats t1 note on the tie; t0 history is last.
        assert!(matches!(&feed[0], TimelineItem::History { new_value: Some(v), .. } if v.as_str() == "verified"));
        assert!(matches!(&feed[1], TimelineItem::Note { .. }));
        assert!(matches!(&feed[2], TimelineItem::History { change_type, .. } if change_type.as_str() == "created"));
    }

    #[test]
    fn pending_entered_at_equals_creation_time() {
        let created_at = Utc::now();
        let history = vec![history_row("created", None, Some("pending"), created_at)];
        let view = stage_timeline(ComplaintStatus::Pending, &history, &[]);
        assert_eq!(view.stages[0].stage, ComplaintStatus::Pending);
        assert_eq!(view.stages[0].entered_at, Some(created_at));
        assert_eq!(view.stages[0].state, StageState::Active);
    }

    #[test]
    fn stage_states_follow_live_status() {
        let t0 = Utc::now();
        let history = vec![
            history_row("created", None, Some("pending"), t0),
            history_row("status_change", Some("pending"), Some("assigned"), t0 + Duration::hours(1)),
        ];
        let view = stage_timeline(ComplaintStatus::Assigned, &history, &[]);

        assert_eq!(view.stages[0].state, StageState::Completed); // pending
        assert_eq!(view.stages[1].state, StageState::Completed); // verified (skipped)
        assert_eq!(view.stages[1].entered_at, None); // but never entered
        assert_eq!(view.stages[2].state, StageState::Active); // assigned
        assert_eq!(view.stages[3].state, StageState::Upcoming); // in_progress
        assert!(view.rejection.is_none());
    }

    #[test]
    fn notes_bucket_into_stage_windows() {
        let t0 = Utc::now();
        let verified_at = t0 + Duration::hours(1);
        let history = vec![
            history_row("created", None, Some("pending"), t0),
            history_row("status_change", Some("pending"), Some("verified"), verified_at),
        ];
        let notes = vec![
            note_row("during pending", t0 + Duration::minutes(30)),
            note_row("during verified", verified_at + Duration::minutes(10)),
            note_row("also verified, later", verified_at + Duration::hours(5)),
        ];

        let view = stage_timeline(ComplaintStatus::Verified, &history, &notes);
        assert_eq!(view.stages[0].notes.len(), 1);
        assert_eq!(view.stages[0].notes[0].note, "during pending");
        // Current stage's window extends to now, catching the trailing note.
        assert_eq!(view.stages[1].notes.len(), 2);
        assert_eq!(view.stages[1].notes[0].note, "during verified");
    }

    #[test]
    fn rejection_is_a_banner_not_a_stage() {
        let t0 = Utc::now();
        let rejected_at = t0 + Duration::hours(2);
        let history = vec![
            history_row("created", None, Some("pending"), t0),
            history_row("status_change", Some("pending"), Some("rejected"), rejected_at),
        ];
        let view = stage_timeline(ComplaintStatus::Rejected, &history, &[]);

        let banner = view.rejection.expect("rejection banner");
        assert_eq!(banner.rejected_at, rejected_at);
        // The six-stage track never contains rejected.
        assert!(view.stages.iter().all(|s| s.stage != ComplaintStatus::Rejected));
        assert_eq!(view.stages[0].state, StageState::Completed);
        assert_eq!(view.stages[1].state, StageState::Upcoming);
    }

    #[test]
    fn unreached_stages_render_as_upcoming() {
        let view = stage_timeline(ComplaintStatus::Pending, &[], &[]);
        assert!(view.stages.iter().all(|s| s.entered_at.is_none()));
        assert_eq!(view.stages[0].state, StageState::Active);
        assert!(view.stages[1..].iter().all(|s| s.state == StageState::Upcoming));
    }
}
