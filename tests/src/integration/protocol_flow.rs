//! # Protocol Flow
//!
//! Broadcaster, Responder and Reply Correlator working together across
//! simulated processes, below the metrics facade.

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::json;
    use tokio::time::Instant;

    use shared_bus::ProcessChannel;
    use shared_types::{ProcessPacket, METRICS_GET_TOPIC};

    use crate::harness::{pid, Fixed, Fleet};

    const TIMEOUT: Duration = Duration::from_millis(1000);

    #[tokio::test(start_paused = true)]
    async fn test_broadcast_reports_sibling_count() {
        for n in 0..=4u32 {
            let fleet = Fleet::new();
            let _workers: Vec<_> = (2..2 + n).map(|id| fleet.spawn_silent(id)).collect();

            let sent = fleet
                .broadcaster(1)
                .broadcast(METRICS_GET_TOPIC)
                .await
                .unwrap();

            assert_eq!(sent, n as usize);
            assert_eq!(fleet.bus.packets_sent(), u64::from(n));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_reply_routed_to_origin() {
        let fleet = Fleet::new();
        let _responder = fleet.spawn_answering(2, Arc::new(Fixed(json!("pong"))));
        let origin = fleet.bus.endpoint(pid(7));
        let mut inbox = origin.subscribe();

        origin
            .send(pid(2), ProcessPacket::request(METRICS_GET_TOPIC, pid(7)))
            .await
            .unwrap();

        let reply = inbox.recv().await.unwrap();
        assert!(reply.is_reply_for(METRICS_GET_TOPIC));
        assert_eq!(reply.sender_id, pid(2));
        assert_eq!(reply.origin_id, pid(7));
        assert_eq!(reply.payload, json!("pong"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_foreign_packets_ignored_while_waiting() {
        let fleet = Fleet::new();
        let _a = fleet.spawn_answering(2, Arc::new(Fixed(json!("a"))));
        let correlator = fleet.correlator(1);
        let noise = fleet.bus.endpoint(pid(9));

        let injector = async {
            // Another topic's reply, then a request on our topic.
            let other = ProcessPacket::request("health-get", pid(1))
                .reply(pid(9), json!("ok"))
                .unwrap();
            noise.send(pid(1), other).await.unwrap();
            noise
                .send(pid(1), ProcessPacket::request(METRICS_GET_TOPIC, pid(9)))
                .await
                .unwrap();
        };

        let (replies, ()) = tokio::join!(
            correlator.await_replies(METRICS_GET_TOPIC, TIMEOUT),
            injector
        );
        let replies = replies.unwrap();

        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].sender_id, pid(2));
        assert!(replies.iter().all(|r| r.is_reply_for(METRICS_GET_TOPIC)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_responder_started_twice_replies_once() {
        let fleet = Fleet::new();
        let worker = fleet.spawn_answering(2, Arc::new(Fixed(json!("once"))));
        worker.responder().unwrap().start();
        let correlator = fleet.correlator(1);

        let replies = correlator.await_replies(METRICS_GET_TOPIC, TIMEOUT).await.unwrap();
        assert_eq!(replies.len(), 1);

        // Let a duplicate listener, if any, deliver its reply.
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(fleet.bus.packets_sent(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_different_processes_query_concurrently() {
        let fleet = Fleet::new();
        let _a = fleet.spawn(2, 1, Duration::from_millis(20));
        let _b = fleet.spawn(3, 1, Duration::from_millis(20));
        let first = fleet.correlator(1);
        let second = fleet.correlator(4);

        let start = Instant::now();
        let (one, four) = tokio::join!(
            first.await_replies(METRICS_GET_TOPIC, TIMEOUT),
            second.await_replies(METRICS_GET_TOPIC, TIMEOUT),
        );

        let senders = |replies: Vec<ProcessPacket>| -> HashSet<u32> {
            replies.iter().map(|r| r.sender_id.get()).collect()
        };
        assert_eq!(senders(one.unwrap()), HashSet::from([2, 3]));
        assert_eq!(senders(four.unwrap()), HashSet::from([2, 3]));
        // Each responder answers both requests at once.
        assert_eq!(start.elapsed(), Duration::from_millis(20));
    }
}
