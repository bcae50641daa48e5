//! Session pump: owns a connected socket, reads chunks and serves queued writes

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info, warn};

use super::registry::WriteReceiver;
use super::WorkerContext;
use crate::events::SessionWarning;
use crate::transport::BoxedSocket;

pub(crate) struct Pump {
    ctx: WorkerContext,
    socket: BoxedSocket,
    writes: WriteReceiver,
}

impl Pump {
    pub(crate) fn new(ctx: WorkerContext, socket: BoxedSocket, writes: WriteReceiver) -> Self {
        Self {
            ctx,
            socket,
            writes,
        }
    }

    pub(crate) async fn run(self) {
        let WorkerContext {
            id,
            mut cancel,
            config,
            callbacks,
            ..
        } = self.ctx;
        let mut writes = self.writes;
        let (mut reader, mut writer) = tokio::io::split(self.socket);
        let sink = callbacks.as_ref();

        let write_side = async {
            while let Some(bytes) = writes.recv().await {
                let written = async {
                    writer.write_all(&bytes).await?;
                    writer.flush().await
                }
                .await;
                match written {
                    Ok(()) => sink.on_outbound(id, bytes),
                    Err(e) => {
                        warn!("Write failed: {}", e);
                        sink.on_warning(id, SessionWarning::WriteFailed(e.to_string()));
                    }
                }
            }
            // Queue closed: released, wait for cancel
            std::future::pending::<()>().await
        };

        let read_side = async {
            let mut buf = vec![0u8; config.read_buffer_size];
            loop {
                match reader.read(&mut buf).await {
                    Ok(0) => {
                        info!("Peer closed the connection");
                        return ReadEnd::Lost;
                    }
                    Ok(n) => {
                        if !sink.on_inbound(id, buf[..n].to_vec()) {
                            debug!("Pump superseded, discarding {} bytes", n);
                            return ReadEnd::Superseded;
                        }
                    }
                    Err(e) => {
                        warn!("Read failed: {}", e);
                        return ReadEnd::Lost;
                    }
                }
            }
        };

        let end = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Pump cancelled, closing socket");
                return;
            }
            end = read_side => end,
            _ = write_side => return,
        };

        if end == ReadEnd::Lost {
            callbacks.on_lost(id);
        }
    }
}

/// Why the read half stopped
#[derive(Debug, PartialEq, Eq)]
enum ReadEnd {
    Lost,
    Superseded,
}
