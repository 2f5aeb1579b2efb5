use std::collections::HashSet;

use proptest::collection::vec;
use proptest::prelude::*;
use swimlane_core::{BucketKey, ConflictPolicy, FlightEvent, SchemaVersion, SortMode, SwimlaneConfig};
use swimlane_es::{decode_bucket_key, order_lanes, LaneAccumulator};

fn sort_mode() -> impl Strategy<Value = SortMode> {
    prop_oneof![Just(SortMode::None), Just(SortMode::Asc), Just(SortMode::Desc)]
}

proptest! {
    #[test]
    fn decoding_arbitrary_text_is_total(raw in ".*", legacy in any::<bool>()) {
        let config = SwimlaneConfig {
            schema_version: if legacy { SchemaVersion::V1 } else { SchemaVersion::V2 },
            ..SwimlaneConfig::default()
        };
        let key = decode_bucket_key(&raw, &config);
        prop_assert_eq!(key.raw, raw);
    }

    #[test]
    fn well_formed_keys_keep_their_carrier(
        code in "[A-Z]{3}",
        number in "[0-9]{1,4}[A-Z]?",
        extras in vec("[A-Z_]{1,8}=[A-Za-z0-9 :-]{0,12}", 0..5),
    ) {
        let mut raw = format!("20190509_{code}{number}_LSZH/20190509_LX{number}_ZRH/Carrier/LX/ZRH-LUX");
        if !extras.is_empty() {
            raw.push('/');
            raw.push_str(&extras.join("-"));
        }

        let key = decode_bucket_key(&raw, &SwimlaneConfig::default());
        prop_assert_eq!(key.carrier_code.as_deref(), Some(code.as_str()));
        prop_assert_eq!(key.flight_number.as_deref(), Some(number.as_str()));
        prop_assert_eq!(key.routing.as_deref(), Some("ZRH-LUX"));
    }

    #[test]
    fn representative_dominates_its_slot(events in vec((0i64..4, 0i64..130), 1..40)) {
        let mut lanes = LaneAccumulator::new(ConflictPolicy::CollisionsOnly);
        for (index, (time, status)) in events.iter().enumerate() {
            let key = BucketKey { raw: format!("flight-{index}"), ..BucketKey::default() };
            lanes.insert("SWR", FlightEvent::new(key, *time, *status));
        }

        let lanes = lanes.finish();
        prop_assert_eq!(lanes.len(), 1);
        let lane = &lanes[0];

        for (time, cell) in &lane.cells {
            let highest = events
                .iter()
                .filter(|(slot, _)| slot == time)
                .map(|(_, status)| *status)
                .max();
            prop_assert_eq!(Some(cell.value), highest);
            prop_assert_eq!(cell.event.as_ref().map(|event| event.status), highest);
        }

        let ids: HashSet<&str> = lane.conflicts.iter().map(|event| event.id.as_str()).collect();
        prop_assert_eq!(ids.len(), lane.conflicts.len());
        for event in &lane.conflicts {
            let shared = events.iter().filter(|(slot, _)| *slot == event.time).count();
            prop_assert!(shared > 1);
        }
    }

    #[test]
    fn lane_order_is_a_stable_permutation(
        labels in vec("[a-zA-Z0-9]{1,6}", 0..12),
        mode in sort_mode(),
    ) {
        let ordered = order_lanes(&labels, mode);
        prop_assert_eq!(&ordered, &order_lanes(&labels, mode));

        let mut expected = labels.clone();
        expected.sort();
        let mut actual = ordered.clone();
        actual.sort();
        prop_assert_eq!(actual, expected);
    }
}
