use std::collections::HashMap;

use proptest::prelude::*;

use kiln_broker::TopicLog;

const TOPICS: [&str; 4] = ["order-events", "notification-events", "inventory-events", "audit"];

proptest! {
    #[test]
    fn offsets_are_gapless_per_topic(picks in prop::collection::vec(0usize..TOPICS.len(), 0..200)) {
        let log = TopicLog::new();
        let mut expected: HashMap<&str, u64> = HashMap::new();

        for (i, pick) in picks.iter().enumerate() {
            let topic = TOPICS[*pick];
            let env = log.append(topic, serde_json::json!({ "seq": i }));
            let next = expected.entry(topic).or_insert(0);
            prop_assert_eq!(env.offset(), *next);
            *next += 1;
        }

        for (topic, count) in &expected {
            let offsets: Vec<u64> = log.list(topic).iter().map(|e| e.offset()).collect();
            prop_assert_eq!(offsets, (0..*count).collect::<Vec<u64>>());
        }
    }

    #[test]
    fn history_preserves_publish_order(picks in prop::collection::vec(0usize..TOPICS.len(), 0..200)) {
        let log = TopicLog::new();
        for (i, pick) in picks.iter().enumerate() {
            log.append(TOPICS[*pick], serde_json::json!({ "seq": i }));
        }

        let history = log.history();
        prop_assert_eq!(history.len(), picks.len());
        prop_assert_eq!(log.history_len(), picks.len());
        for (i, (env, pick)) in history.iter().zip(&picks).enumerate() {
            prop_assert_eq!(env.topic(), TOPICS[*pick]);
            prop_assert_eq!(env.value()["seq"].as_u64(), Some(i as u64));
        }
    }
}
