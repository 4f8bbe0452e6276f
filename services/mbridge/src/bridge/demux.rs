//! Merges the read and write streams of one channel
//!
//! This merge point is what serializes bus access: the executor drains one
//! stream, one command at a time. Priority alternates between the inputs, so
//! when both are ready reads and writes strictly interleave.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, trace};

use super::command::Command;

pub struct Demultiplexer {
    read_rx: mpsc::Receiver<Command>,
    write_rx: mpsc::Receiver<Command>,
    merged_tx: mpsc::Sender<Command>,
    cancel: CancellationToken,
}

impl Demultiplexer {
    pub fn new(
        read_rx: mpsc::Receiver<Command>,
        write_rx: mpsc::Receiver<Command>,
        merged_tx: mpsc::Sender<Command>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            read_rx,
            write_rx,
            merged_tx,
            cancel,
        }
    }

    /// Forward until cancelled; the merged stream closes on return
    pub async fn run(mut self) {
        info!("start demultiplexer");
        let mut writes_first = true;
        loop {
            let next = if writes_first {
                tokio::select! {
                    biased;
                    () = self.cancel.cancelled() => None,
                    Some(cmd) = self.write_rx.recv() => Some(cmd),
                    Some(cmd) = self.read_rx.recv() => Some(cmd),
                    else => None,
                }
            } else {
                tokio::select! {
                    biased;
                    () = self.cancel.cancelled() => None,
                    Some(cmd) = self.read_rx.recv() => Some(cmd),
                    Some(cmd) = self.write_rx.recv() => Some(cmd),
                    else => None,
                }
            };
            let Some(cmd) = next else {
                break;
            };

            writes_first = !cmd.is_write();
            trace!("multiplexing {}", cmd);
            if self.merged_tx.send(cmd).await.is_err() {
                break;
            }
        }
        info!("shutdown demultiplexer");
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use crate::model::catalog::tests::point;
    use std::sync::Arc;
    use std::time::Duration;

    fn read(r: &str) -> Command {
        Command::Read(Arc::new(point("L", "d", r)))
    }

    fn write(r: &str) -> Command {
        Command::Write(Arc::new(point("L", "d", r)), 1)
    }

    #[tokio::test]
    async fn test_alternates_when_both_ready() {
        let (read_tx, read_rx) = mpsc::channel(8);
        let (write_tx, write_rx) = mpsc::channel(8);
        let (merged_tx, mut merged_rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();

        for i in 0..3 {
            read_tx.send(read(&format!("r{}", i))).await.unwrap();
            write_tx.send(write(&format!("w{}", i))).await.unwrap();
        }

        let demux = Demultiplexer::new(read_rx, write_rx, merged_tx, cancel.clone());
        let handle = tokio::spawn(demux.run());

        let mut order = Vec::new();
        for _ in 0..6 {
            order.push(merged_rx.recv().await.unwrap().register().title.clone());
        }
        assert_eq!(order, vec!["w0", "r0", "w1", "r1", "w2", "r2"]);

        cancel.cancel();
        handle.await.unwrap();
        assert!(merged_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_reads_flow_without_writes() {
        let (read_tx, read_rx) = mpsc::channel(1);
        let (_write_tx, write_rx) = mpsc::channel(1);
        let (merged_tx, mut merged_rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(
            Demultiplexer::new(read_rx, write_rx, merged_tx, cancel.clone()).run(),
        );

        for i in 0..3 {
            read_tx.send(read(&format!("r{}", i))).await.unwrap();
            let cmd = merged_rx.recv().await.unwrap();
            assert_eq!(cmd.register().title, format!("r{}", i));
        }

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
