//! Dispatch loop
//!
//! One receive task per link feeds frames into a bounded channel. A single
//! task owns the [`Router`], processes the frames in arrival order and
//! transmits whatever each frame produced.

use crate::capture::Capture;
use crate::dataplane::{Outbound, Router};
use crate::protocol::ethernet::MAX_FRAME_SIZE;
use crate::telemetry::MetricsRegistry;
use crate::{Error, Result};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace};

/// A received frame tagged with its ingress interface id
type Received = (usize, Vec<u8>);

/// Run the forwarding engine until `shutdown` resolves or every link stops.
///
/// `links[i]` must be the link of interface `i` in `router`. A transmit
/// failure stops the loop and is returned. A receive failure ends that
/// link's task; it is returned once all links have stopped.
pub async fn run<C, F>(
    mut router: Router,
    links: Vec<Arc<C>>,
    channel_capacity: usize,
    shutdown: F,
) -> Result<()>
where
    C: Capture + 'static,
    F: Future<Output = ()>,
{
    if links.len() != router.interfaces().len() {
        return Err(Error::Config(format!(
            "{} links given for {} interfaces",
            links.len(),
            router.interfaces().len()
        )));
    }

    let (tx, mut rx) = mpsc::channel::<Received>(channel_capacity.max(1));
    let receivers: Vec<JoinHandle<Result<()>>> = links
        .iter()
        .enumerate()
        .map(|(id, link)| tokio::spawn(receive(id, Arc::clone(link), tx.clone())))
        .collect();
    drop(tx);

    info!(
        "Forwarding on {} interfaces with {} routes",
        links.len(),
        router.routes().len()
    );

    tokio::pin!(shutdown);
    let mut outcome = loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown requested");
                break Ok(());
            }
            received = rx.recv() => {
                let Some((ingress, frame)) = received else {
                    debug!("All links stopped");
                    break Ok(());
                };
                let outbound = router.process_frame(ingress, &frame);
                if let Err(e) = transmit(&router, &links, outbound).await {
                    break Err(e);
                }
            }
        }
    };

    for handle in &receivers {
        handle.abort();
    }
    for handle in receivers {
        if let Ok(Err(e)) = handle.await {
            if outcome.is_ok() {
                outcome = Err(e);
            }
        }
    }

    log_metrics(router.metrics());
    outcome
}

async fn receive<C: Capture>(id: usize, link: Arc<C>, tx: mpsc::Sender<Received>) -> Result<()> {
    let mut buf = vec![0u8; MAX_FRAME_SIZE];
    loop {
        let info = match link.recv(&mut buf).await {
            Ok(info) => info,
            Err(e) => {
                error!("Receive error on interface {}: {}", id, e);
                return Err(e);
            }
        };
        if tx.send((id, buf[..info.len].to_vec())).await.is_err() {
            // Dispatcher is gone
            return Ok(());
        }
    }
}

async fn transmit<C: Capture>(router: &Router, links: &[Arc<C>], outbound: Outbound) -> Result<()> {
    for (egress, frame) in outbound {
        let link = links.get(egress).ok_or_else(|| Error::InterfaceNotFound {
            name: egress.to_string(),
        })?;
        let name = router.interface_name(egress);
        let sent = link.send(&frame).await.map_err(|e| {
            error!("Transmit on {} failed: {}", name, e);
            e
        })?;
        trace!("Sent {} bytes on {}", sent, name);
        router.metrics().record_tx(name, sent);
    }
    Ok(())
}

fn log_metrics(metrics: &MetricsRegistry) {
    for (name, value) in metrics.export() {
        info!("{} = {}", name, value);
    }
}
