//! Per-lane accumulation of flight events and time bucket collisions.

use std::collections::btree_map::Entry;

use indexmap::IndexMap;
use swimlane_core::{ConflictPolicy, FlightEvent, Lane, LaneCell};

/// Outcome of placing an event into its lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// The time bucket was free.
    Inserted,
    /// The event outranked the previous representative.
    Replaced,
    /// The previous representative stayed.
    Kept,
}

/// Lanes of one flattening pass, in the order their category first appeared.
#[derive(Debug, Default)]
pub struct LaneAccumulator {
    policy: ConflictPolicy,
    lanes: IndexMap<String, Lane>,
}

impl LaneAccumulator {
    pub fn new(policy: ConflictPolicy) -> Self {
        Self {
            policy,
            lanes: IndexMap::new(),
        }
    }

    /// Adds `doc_count` to `label`, creating the lane when needed.
    pub fn count(&mut self, label: &str, doc_count: u64) {
        let lane = self.lane_mut(label);
        lane.doc_count = lane.doc_count.saturating_add(doc_count);
    }

    /// Places `event` in its time bucket.
    ///
    /// A strictly higher status replaces the representative. On collision both
    /// the previous representative and the new event go to the conflict list.
    pub fn insert(&mut self, label: &str, event: FlightEvent) -> Placement {
        let policy = self.policy;
        let lane = self.lane_mut(label);

        match lane.cells.entry(event.time) {
            Entry::Vacant(slot) => {
                if policy == ConflictPolicy::AllEvents {
                    push_unique(&mut lane.conflicts, event.clone());
                }
                slot.insert(LaneCell {
                    value: event.status,
                    event: Some(event),
                });
                Placement::Inserted
            }
            Entry::Occupied(mut slot) => {
                let cell = slot.get_mut();
                if let Some(previous) = &cell.event {
                    push_unique(&mut lane.conflicts, previous.clone());
                }

                let placement = if event.status > cell.value {
                    *cell = LaneCell {
                        value: event.status,
                        event: Some(event.clone()),
                    };
                    Placement::Replaced
                } else {
                    Placement::Kept
                };

                push_unique(&mut lane.conflicts, event);
                placement
            }
        }
    }

    /// Records a bare metric value. Used when there is no category split.
    pub fn insert_value(&mut self, label: &str, time: i64, value: i64) -> Placement {
        let lane = self.lane_mut(label);
        match lane.cells.entry(time) {
            Entry::Vacant(slot) => {
                slot.insert(LaneCell { value, event: None });
                Placement::Inserted
            }
            Entry::Occupied(mut slot) if value > slot.get().value => {
                slot.get_mut().value = value;
                Placement::Replaced
            }
            Entry::Occupied(_) => Placement::Kept,
        }
    }

    pub fn len(&self) -> usize {
        self.lanes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }

    pub fn finish(self) -> Vec<Lane> {
        self.lanes.into_values().collect()
    }

    fn lane_mut(&mut self, label: &str) -> &mut Lane {
        self.lanes
            .entry(label.to_string())
            .or_insert_with(|| Lane::new(label))
    }
}

fn push_unique(list: &mut Vec<FlightEvent>, event: FlightEvent) {
    if !list.iter().any(|existing| existing.id == event.id) {
        list.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swimlane_core::BucketKey;

    fn flight(raw: &str, time: i64, status: i64) -> FlightEvent {
        FlightEvent::new(
            BucketKey {
                raw: raw.to_string(),
                ..BucketKey::default()
            },
            time,
            status,
        )
    }

    fn conflict_ids(lane: &Lane) -> Vec<&str> {
        lane.conflicts.iter().map(|event| event.id.as_str()).collect()
    }

    #[test]
    fn higher_status_replaces_and_both_are_listed() {
        let mut acc = LaneAccumulator::new(ConflictPolicy::CollisionsOnly);
        assert_eq!(acc.insert("SWR", flight("a", 100, 40)), Placement::Inserted);
        assert_eq!(acc.insert("SWR", flight("b", 100, 80)), Placement::Replaced);

        let lanes = acc.finish();
        let lane = &lanes[0];
        assert_eq!(lane.value_at(100), Some(80));
        assert_eq!(lane.representative_at(100).map(|e| e.key.raw.as_str()), Some("b"));
        assert_eq!(conflict_ids(lane), vec!["a@100", "b@100"]);
    }

    #[test]
    fn equal_or_lower_status_keeps_incumbent() {
        let mut acc = LaneAccumulator::new(ConflictPolicy::CollisionsOnly);
        acc.insert("SWR", flight("a", 100, 80));
        assert_eq!(acc.insert("SWR", flight("b", 100, 80)), Placement::Kept);
        assert_eq!(acc.insert("SWR", flight("c", 100, 20)), Placement::Kept);

        let lanes = acc.finish();
        assert_eq!(lanes[0].representative_at(100).map(|e| e.key.raw.as_str()), Some("a"));
        assert_eq!(conflict_ids(&lanes[0]), vec!["a@100", "b@100", "c@100"]);
    }

    #[test]
    fn conflict_list_is_idempotent() {
        let mut acc = LaneAccumulator::new(ConflictPolicy::CollisionsOnly);
        acc.insert("SWR", flight("a", 100, 40));
        acc.insert("SWR", flight("b", 100, 40));
        acc.insert("SWR", flight("b", 100, 40));

        let lanes = acc.finish();
        assert_eq!(conflict_ids(&lanes[0]), vec!["a@100", "b@100"]);
    }

    #[test]
    fn distinct_flights_with_same_status_are_both_kept() {
        let mut acc = LaneAccumulator::new(ConflictPolicy::CollisionsOnly);
        acc.insert("SWR", flight("a", 100, 50));
        acc.insert("SWR", flight("b", 100, 50));
        acc.insert("SWR", flight("c", 200, 50));

        let lanes = acc.finish();
        assert_eq!(lanes[0].conflicts.len(), 2);
        assert_eq!(lanes[0].cells.len(), 2);
    }

    #[test]
    fn all_events_policy_records_lone_events() {
        let mut acc = LaneAccumulator::new(ConflictPolicy::AllEvents);
        acc.insert("SWR", flight("a", 100, 40));
        acc.insert("SWR", flight("b", 200, 40));
        acc.insert("SWR", flight("c", 200, 60));

        let lanes = acc.finish();
        assert_eq!(conflict_ids(&lanes[0]), vec!["a@100", "b@200", "c@200"]);
    }

    #[test]
    fn lanes_keep_first_seen_order() {
        let mut acc = LaneAccumulator::new(ConflictPolicy::CollisionsOnly);
        acc.insert("SWR", flight("a", 100, 40));
        acc.count("EZY", 3);
        acc.insert("AFR", flight("b", 100, 40));
        acc.insert("EZY", flight("c", 100, 40));

        let labels: Vec<String> = acc.finish().into_iter().map(|lane| lane.label).collect();
        assert_eq!(labels, vec!["SWR", "EZY", "AFR"]);
    }

    #[test]
    fn counts_saturate() {
        let mut acc = LaneAccumulator::new(ConflictPolicy::CollisionsOnly);
        acc.count("SWR", u64::MAX - 1);
        acc.count("SWR", 5);
        assert_eq!(acc.finish()[0].doc_count, u64::MAX);
    }

    #[test]
    fn bare_values_keep_the_highest() {
        let mut acc = LaneAccumulator::new(ConflictPolicy::CollisionsOnly);
        acc.insert_value("Status", 100, 30);
        assert_eq!(acc.insert_value("Status", 100, 10), Placement::Kept);
        assert_eq!(acc.insert_value("Status", 100, 70), Placement::Replaced);

        let lanes = acc.finish();
        assert_eq!(lanes[0].value_at(100), Some(70));
        assert!(lanes[0].conflicts.is_empty());
    }
}
