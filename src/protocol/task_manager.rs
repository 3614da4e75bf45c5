use futures::future::join_all;
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::error::RouterError;
use crate::network::Transport;
use crate::router::Router;

/// Result of one broadcast cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Spawns the periodic update task. The first broadcast goes out one full
/// interval after start; missed ticks are dropped, not replayed.
pub fn start_update_task(
    router: Arc<Router>,
    transport: Arc<dyn Transport>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        update_task(router, transport, &mut shutdown_rx).await;
    })
}

async fn update_task(
    router: Arc<Router>,
    transport: Arc<dyn Transport>,
    shutdown_rx: &mut broadcast::Receiver<()>,
) {
    let period = router.config().update_interval();
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                debug!("Update task shutting down");
                break;
            }
            _ = interval.tick() => {
                send_updates_to_neighbors(&router, transport.as_ref()).await;
            }
        }
    }
}

/// Builds one advertisement per neighbor from a single snapshot and pushes
/// them concurrently. A failed or timed-out push only affects its neighbor.
pub async fn send_updates_to_neighbors(router: &Router, transport: &dyn Transport) -> BroadcastReport {
    let adverts = router.build_advertisements().await;
    let timeout = router.config().push_timeout();
    info!("Sending periodic updates to {} neighbors", adverts.len());

    let pushes = adverts.into_iter().map(|(neighbor, advertisement)| async move {
        let result = match tokio::time::timeout(timeout, transport.push_advertisement(neighbor, &advertisement)).await {
            Ok(result) => result,
            Err(_) => Err(RouterError::Transport {
                neighbor: neighbor.to_string(),
                reason: format!("no answer within {:?}", timeout),
            }),
        };
        (neighbor, result)
    });

    let mut report = BroadcastReport::default();
    for (neighbor, result) in join_all(pushes).await {
        match result {
            Ok(()) => {
                debug!("Update delivered to {}", neighbor);
                report.delivered += 1;
            }
            Err(e) => {
                warn!("Could not send update to {}: {}", neighbor, e);
                report.failed += 1;
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouterConfig;
    use crate::error::Result;
    use crate::protocol::{Advertisement, NeighborSet};
    use crate::NeighborAddr;
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::sync::Mutex;

    const A: &str = "127.0.0.1:5001";
    const B: &str = "127.0.0.1:5002";

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<(NeighborAddr, Advertisement)>>,
        unreachable: Option<NeighborAddr>,
        silent: Option<NeighborAddr>,
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn push_advertisement(&self, neighbor: NeighborAddr, advertisement: &Advertisement) -> Result<()> {
            if Some(neighbor) == self.silent {
                std::future::pending::<()>().await;
            }
            if Some(neighbor) == self.unreachable {
                return Err(RouterError::Transport {
                    neighbor: neighbor.to_string(),
                    reason: "connection refused".into(),
                });
            }
            self.sent.lock().await.push((neighbor, advertisement.clone()));
            Ok(())
        }
    }

    fn router(interval: u64) -> Arc<Router> {
        let neighbors: NeighborSet = [(A.parse().unwrap(), 1), (B.parse().unwrap(), 2)]
            .into_iter()
            .collect();
        let config = RouterConfig::new(
            "127.0.0.1:5000".parse().unwrap(),
            "10.0.1.0/24".parse().unwrap(),
            neighbors,
        )
        .with_update_interval(interval);
        Arc::new(Router::new(config))
    }

    #[tokio::test]
    async fn test_send_updates_reaches_every_neighbor() {
        let router = router(1);
        let transport = RecordingTransport::default();
        let report = send_updates_to_neighbors(&router, &transport).await;

        assert_eq!(report, BroadcastReport { delivered: 2, failed: 0 });
        let sent = transport.sent.lock().await;
        let targets: Vec<NeighborAddr> = sent.iter().map(|(n, _)| *n).collect();
        assert!(targets.contains(&A.parse().unwrap()));
        assert!(targets.contains(&B.parse().unwrap()));
    }

    #[tokio::test]
    async fn test_failed_neighbor_does_not_block_others() {
        let router = router(1);
        let transport = RecordingTransport {
            unreachable: Some(A.parse().unwrap()),
            ..Default::default()
        };
        let report = send_updates_to_neighbors(&router, &transport).await;

        assert_eq!(report, BroadcastReport { delivered: 1, failed: 1 });
        assert_eq!(transport.sent.lock().await[0].0, B.parse().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_neighbor_times_out() {
        let router = router(1);
        let transport = RecordingTransport {
            silent: Some(B.parse().unwrap()),
            ..Default::default()
        };
        let report = send_updates_to_neighbors(&router, &transport).await;
        assert_eq!(report, BroadcastReport { delivered: 1, failed: 1 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_task_ticks_until_shutdown() {
        let router = router(1);
        let transport = Arc::new(RecordingTransport {
            unreachable: Some(A.parse().unwrap()),
            ..Default::default()
        });
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = start_update_task(router, transport.clone(), shutdown_rx);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(transport.sent.lock().await.is_empty());

        tokio::time::sleep(Duration::from_millis(3_000)).await;
        assert_eq!(transport.sent.lock().await.len(), 3);

        shutdown_tx.send(()).unwrap();
        handle.await.unwrap();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(transport.sent.lock().await.len(), 3);
    }
}
