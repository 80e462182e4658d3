//! Scheduler-facing WebSocket client: dials out, then runs a writer task
//! fed by an outbound channel alongside a read loop, mirroring the
//! duplex-connection shape of `askexperts-scheduler::transport` from the
//! other side of the wire.

use askexperts_scheduler::{SchedulerMessage, WorkerMessage};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as TMessage;
use tracing::warn;

use crate::error::{WorkerError, WorkerResult};
use crate::worker::Worker;

impl Worker {
    pub(crate) async fn connect_and_serve(&self) -> WorkerResult<()> {
        let (ws_stream, _) = tokio_tungstenite::connect_async(self.config().scheduler_url.as_str())
            .await
            .map_err(|e| WorkerError::internal(e.to_string()))?;
        let (mut write, mut read) = ws_stream.split();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<WorkerMessage>();

        let writer = tokio::spawn(async move {
            while let Some(frame) = outbound_rx.recv().await {
                let json = match serde_json::to_string(&frame) {
                    Ok(json) => json,
                    Err(err) => {
                        warn!(error = %err, "failed to encode worker frame");
                        continue;
                    }
                };
                if write.send(TMessage::Text(json.into())).await.is_err() {
                    break;
                }
            }
        });

        let _ = outbound_tx.send(WorkerMessage::Experts {
            worker_id: self.worker_id().to_string(),
            experts: self.hosted_pubkeys().await,
        });

        let mut need_job_interval = tokio::time::interval(self.config().need_job_interval);
        let result = loop {
            tokio::select! {
                incoming = read.next() => {
                    match incoming {
                        Some(Ok(TMessage::Text(text))) => {
                            match serde_json::from_str::<SchedulerMessage>(&text) {
                                Ok(frame) => self.handle_scheduler_frame(frame, &outbound_tx).await,
                                Err(err) => warn!(error = %err, "malformed scheduler frame, ignoring"),
                            }
                        }
                        Some(Ok(TMessage::Ping(_))) | Some(Ok(TMessage::Pong(_))) => {}
                        Some(Ok(TMessage::Close(_))) | None => break Ok(()),
                        Some(Ok(_)) => {}
                        Some(Err(err)) => break Err(WorkerError::internal(err.to_string())),
                    }
                }
                _ = need_job_interval.tick() => {
                    if self.has_capacity().await {
                        let _ = outbound_tx.send(WorkerMessage::NeedJob {
                            worker_id: self.worker_id().to_string(),
                        });
                    }
                }
            }
        };

        drop(outbound_tx);
        let _ = writer.await;
        result
    }
}
