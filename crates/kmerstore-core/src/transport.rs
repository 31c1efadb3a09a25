//! # Transport Seam
//!
//! The boundary to whatever physically moves messages between processes.
//! The store only needs reliable, per-sender-ordered delivery of opaque
//! frames; how frames travel is up to the implementation.
//!
//! [`ChannelTransport`] is an in-process fabric for running several ranks
//! as threads of one program (tests, simulation).

use crate::types::{KmerStoreError, ProcessId};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, unbounded};
use std::time::Duration;

/// Reliable delivery of frames between ranks.
pub trait Transport {
    /// This endpoint's rank.
    fn rank(&self) -> ProcessId;

    /// Number of ranks reachable, including this one.
    fn size(&self) -> u32;

    /// Queue `frame` for delivery to `to`.
    fn send(&self, to: ProcessId, frame: Vec<u8>) -> Result<(), KmerStoreError>;

    /// Next frame addressed to this rank.
    ///
    /// Waits at most `wait`; a zero wait never blocks. `Ok(None)` means
    /// nothing arrived in time.
    fn recv(&self, wait: Duration) -> Result<Option<Vec<u8>>, KmerStoreError>;
}

/// In-process transport built on crossbeam channels.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    rank: ProcessId,
    peers: Vec<Sender<Vec<u8>>>,
    inbox: Receiver<Vec<u8>>,
}

impl ChannelTransport {
    /// A fully connected fabric of `size` endpoints, indexed by rank.
    #[must_use]
    pub fn mesh(size: u32) -> Vec<Self> {
        let (senders, receivers): (Vec<_>, Vec<_>) = (0..size).map(|_| unbounded()).unzip();
        receivers
            .into_iter()
            .enumerate()
            .map(|(rank, inbox)| Self {
                rank: ProcessId(rank as u32),
                peers: senders.clone(),
                inbox,
            })
            .collect()
    }

    /// Frames waiting in this endpoint's inbox.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inbox.len()
    }
}

impl Transport for ChannelTransport {
    fn rank(&self) -> ProcessId {
        self.rank
    }

    fn size(&self) -> u32 {
        self.peers.len() as u32
    }

    fn send(&self, to: ProcessId, frame: Vec<u8>) -> Result<(), KmerStoreError> {
        let peer = self
            .peers
            .get(to.0 as usize)
            .ok_or_else(|| KmerStoreError::TransportError(format!("no such peer: {}", to)))?;
        peer.send(frame)
            .map_err(|_| KmerStoreError::TransportError(format!("{} hung up", to)))
    }

    fn recv(&self, wait: Duration) -> Result<Option<Vec<u8>>, KmerStoreError> {
        if wait.is_zero() {
            return match self.inbox.try_recv() {
                Ok(frame) => Ok(Some(frame)),
                Err(TryRecvError::Empty) => Ok(None),
                Err(TryRecvError::Disconnected) => Err(KmerStoreError::TransportError(
                    "inbox disconnected".to_string(),
                )),
            };
        }
        match self.inbox.recv_timeout(wait) {
            Ok(frame) => Ok(Some(frame)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(KmerStoreError::TransportError(
                "inbox disconnected".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mesh_assigns_ranks() {
        let mesh = ChannelTransport::mesh(3);
        assert_eq!(mesh.len(), 3);
        for (i, endpoint) in mesh.iter().enumerate() {
            assert_eq!(endpoint.rank(), ProcessId(i as u32));
            assert_eq!(endpoint.size(), 3);
        }
    }

    #[test]
    fn frames_arrive_in_send_order() {
        let mesh = ChannelTransport::mesh(2);
        mesh[0].send(ProcessId(1), vec![1]).expect("send");
        mesh[0].send(ProcessId(1), vec![2]).expect("send");
        assert_eq!(mesh[1].pending(), 2);

        assert_eq!(mesh[1].recv(Duration::ZERO).expect("recv"), Some(vec![1]));
        assert_eq!(mesh[1].recv(Duration::ZERO).expect("recv"), Some(vec![2]));
        assert_eq!(mesh[1].recv(Duration::ZERO).expect("recv"), None);
        assert_eq!(mesh[0].recv(Duration::ZERO).expect("recv"), None);
    }

    #[test]
    fn bounded_wait_on_empty_inbox() {
        let mesh = ChannelTransport::mesh(1);
        let got = mesh[0].recv(Duration::from_millis(5)).expect("recv");
        assert!(got.is_none());
    }

    #[test]
    fn unknown_peer_is_error() {
        let mesh = ChannelTransport::mesh(2);
        assert!(matches!(
            mesh[0].send(ProcessId(5), vec![0]),
            Err(KmerStoreError::TransportError(_))
        ));
    }
}
