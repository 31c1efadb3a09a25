//! # Partitioned Store
//!
//! One rank's share of a key space split across cooperating processes.
//!
//! Mutations of keys this rank owns are applied to the local [`KmerStore`]
//! immediately. Mutations of keys owned elsewhere are encoded as
//! [`SeqMessage`]s and sent to the owner, which applies them the next time
//! it calls [`SequenceCollection::pump_network`]. Reads and iteration only
//! ever see local keys.
//!
//! Messages from one sender are applied in the order they were sent.

use crate::collection::{Entry, SequenceCollection};
use crate::config::StoreConfig;
use crate::extension::{ExtensionRecord, KmerData, SeqExt, SeqFlag};
use crate::kmer::{Base, Kmer};
use crate::message::SeqMessage;
use crate::observer::{ListenerId, MutationListener};
use crate::partition::{HashPartitioner, Route};
use crate::stats::LoadReport;
use crate::store::KmerStore;
use crate::transport::Transport;
use crate::types::{ExtDirection, KmerStoreError, ProcessId};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Message traffic seen by one rank.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TrafficCounters {
    /// Messages sent to other ranks.
    pub sent: u64,
    /// Messages received and applied.
    pub applied: u64,
    /// Messages received for keys this rank does not own.
    pub misrouted: u64,
    /// Frames that could not be decoded or applied.
    pub rejected: u64,
}

/// A [`KmerStore`] holding one partition, plus the wiring to reach the rest.
#[derive(Debug)]
pub struct DistributedStore<T: Transport> {
    local: KmerStore,
    partitioner: HashPartitioner,
    transport: T,
    traffic: TrafficCounters,
}

impl<T: Transport> DistributedStore<T> {
    /// Build this rank's store.
    ///
    /// The transport must agree with the configuration on both this rank
    /// and the number of ranks.
    pub fn new(config: StoreConfig, transport: T) -> Result<Self, KmerStoreError> {
        config.validate()?;
        if transport.rank() != config.process_id() {
            return Err(KmerStoreError::InvalidConfig(format!(
                "transport is {}, config says {}",
                transport.rank(),
                config.process_id()
            )));
        }
        if transport.size() != config.partitions {
            return Err(KmerStoreError::InvalidConfig(format!(
                "transport reaches {} ranks, config has {} partitions",
                transport.size(),
                config.partitions
            )));
        }
        let partitioner = HashPartitioner::new(config.partitions, config.process_id())?;
        Ok(Self {
            local: KmerStore::new(config)?,
            partitioner,
            transport,
            traffic: TrafficCounters::default(),
        })
    }

    /// The locally owned partition.
    #[must_use]
    pub fn local(&self) -> &KmerStore {
        &self.local
    }

    #[must_use]
    pub fn partitioner(&self) -> &HashPartitioner {
        &self.partitioner
    }

    #[must_use]
    pub fn rank(&self) -> ProcessId {
        self.partitioner.local()
    }

    #[must_use]
    pub fn traffic(&self) -> TrafficCounters {
        self.traffic
    }

    /// Whether this rank owns `kmer`.
    #[must_use]
    pub fn owns(&self, kmer: &Kmer) -> bool {
        self.partitioner.is_local(kmer)
    }

    fn check_length(&self, kmer: &Kmer) -> Result<(), KmerStoreError> {
        let expected = self.local.kmer_length();
        if kmer.len() != expected {
            return Err(KmerStoreError::KmerLengthMismatch {
                expected,
                actual: kmer.len(),
            });
        }
        Ok(())
    }

    fn send(&mut self, owner: ProcessId, message: &SeqMessage) -> Result<(), KmerStoreError> {
        self.transport.send(owner, message.encode()?)?;
        self.traffic.sent = self.traffic.sent.saturating_add(1);
        Ok(())
    }

    /// Apply `message` here if the key is local, otherwise ship it.
    ///
    /// Returns true when it was applied locally.
    fn route(&mut self, message: SeqMessage) -> Result<bool, KmerStoreError> {
        match self.partitioner.route(message.kmer()) {
            Route::Local => {
                message.apply(&mut self.local)?;
                Ok(true)
            }
            Route::Remote(owner) => {
                self.send(owner, &message)?;
                Ok(false)
            }
        }
    }

    /// Decode and apply one received frame.
    ///
    /// A frame that cannot be used here is counted and dropped; it never
    /// stops the drain.
    fn deliver(&mut self, frame: &[u8]) {
        let message = match SeqMessage::decode(frame) {
            Ok(message) => message,
            Err(e) => {
                self.reject(&e);
                return;
            }
        };
        if !self.partitioner.is_local(message.kmer()) {
            self.traffic.misrouted = self.traffic.misrouted.saturating_add(1);
            tracing::warn!(
                rank = %self.rank(),
                owner = %self.partitioner.owner(message.kmer()),
                "dropping message for a key owned elsewhere"
            );
            return;
        }
        match message.apply(&mut self.local) {
            Ok(()) => self.traffic.applied = self.traffic.applied.saturating_add(1),
            Err(e) => self.reject(&e),
        }
    }

    fn reject(&mut self, error: &KmerStoreError) {
        self.traffic.rejected = self.traffic.rejected.saturating_add(1);
        tracing::warn!(rank = %self.rank(), %error, "dropping unusable message");
    }
}

impl<T: Transport> SequenceCollection for DistributedStore<T> {
    fn add(&mut self, kmer: &Kmer) -> Result<(), KmerStoreError> {
        self.check_length(kmer)?;
        self.route(SeqMessage::Add { kmer: *kmer }).map(|_| ())
    }

    fn remove(&mut self, kmer: &Kmer) -> Result<(), KmerStoreError> {
        self.route(SeqMessage::Remove { kmer: *kmer }).map(|_| ())
    }

    fn merge(&mut self, kmer: &Kmer, data: KmerData) -> Result<(), KmerStoreError> {
        self.check_length(kmer)?;
        self.route(SeqMessage::Merge { kmer: *kmer, data })
            .map(|_| ())
    }

    fn is_empty(&self) -> bool {
        self.local.is_empty()
    }

    fn len(&self) -> usize {
        self.local.len()
    }

    fn get_seq_data(&self, kmer: &Kmer) -> Option<(ExtensionRecord, u32)> {
        self.local.get_seq_data(kmer)
    }

    fn get_seq_and_data(&self, kmer: &Kmer) -> Result<Entry<'_>, KmerStoreError> {
        self.local.get_seq_and_data(kmer)
    }

    fn iter(&self) -> Box<dyn Iterator<Item = Entry<'_>> + '_> {
        self.local.iter()
    }

    fn print_load(&self) -> LoadReport {
        let report = self.local.print_load();
        tracing::info!(
            rank = %self.rank(),
            sent = self.traffic.sent,
            applied = self.traffic.applied,
            misrouted = self.traffic.misrouted,
            rejected = self.traffic.rejected,
            "partition traffic"
        );
        report
    }

    /// For a remote key the edge is set asynchronously and this returns
    /// false, since the outcome is not known yet.
    fn set_base_extension(
        &mut self,
        kmer: &Kmer,
        dir: ExtDirection,
        base: Base,
    ) -> Result<bool, KmerStoreError> {
        match self.partitioner.route(kmer) {
            Route::Local => self.local.set_base_extension(kmer, dir, base),
            Route::Remote(owner) => {
                self.send(
                    owner,
                    &SeqMessage::SetBaseExtension {
                        kmer: *kmer,
                        dir,
                        base,
                    },
                )?;
                Ok(false)
            }
        }
    }

    fn remove_extension(
        &mut self,
        kmer: &Kmer,
        dir: ExtDirection,
        ext: SeqExt,
    ) -> Result<(), KmerStoreError> {
        self.route(SeqMessage::RemoveExtension {
            kmer: *kmer,
            dir,
            ext,
        })
        .map(|_| ())
    }

    fn set_flag(&mut self, kmer: &Kmer, flag: SeqFlag) -> Result<(), KmerStoreError> {
        self.route(SeqMessage::SetFlag { kmer: *kmer, flag })
            .map(|_| ())
    }

    fn clear_flag(&mut self, kmer: &Kmer, flag: SeqFlag) -> Result<(), KmerStoreError> {
        self.route(SeqMessage::ClearFlag { kmer: *kmer, flag })
            .map(|_| ())
    }

    fn attach(&mut self, listener: Arc<dyn MutationListener>) -> ListenerId {
        self.local.attach(listener)
    }

    fn detach(&mut self, id: ListenerId) -> bool {
        self.local.detach(id)
    }

    /// Waits up to the configured pump wait for a first message, then
    /// drains whatever is already queued, up to the batch limit.
    ///
    /// Every drained frame counts, including dropped ones. Only a failing
    /// transport is an error.
    fn pump_network(&mut self) -> Result<usize, KmerStoreError> {
        let limit = self.local.config().max_pump_batch;
        let mut drained = 0usize;
        let mut next = self.transport.recv(self.local.config().pump_wait())?;

        while let Some(frame) = next {
            self.deliver(&frame);
            drained += 1;
            if drained >= limit {
                break;
            }
            next = self.transport.recv(Duration::ZERO)?;
        }

        if drained > 0 {
            tracing::debug!(rank = %self.rank(), drained, "pumped network");
        }
        Ok(drained)
    }

    fn config(&self) -> &StoreConfig {
        self.local.config()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::{MutationKind, MutationTally};
    use crate::transport::ChannelTransport;
    use std::time::Instant;

    fn config(ranks: u32, rank: u32) -> StoreConfig {
        StoreConfig {
            partitions: ranks,
            rank,
            ..StoreConfig::with_kmer_length(4)
        }
    }

    fn cluster(ranks: u32) -> Vec<DistributedStore<ChannelTransport>> {
        ChannelTransport::mesh(ranks)
            .into_iter()
            .enumerate()
            .map(|(rank, t)| DistributedStore::new(config(ranks, rank as u32), t).expect("rank"))
            .collect()
    }

    fn pump_all(stores: &mut [DistributedStore<ChannelTransport>]) -> usize {
        stores
            .iter_mut()
            .map(|s| s.pump_network().expect("pump"))
            .sum()
    }

    /// A key owned by `rank` in a cluster of `ranks`.
    fn key_owned_by(ranks: u32, rank: u32) -> Kmer {
        let p = HashPartitioner::new(ranks, ProcessId(rank)).expect("partitioner");
        (0..256u128)
            .map(|bits| Kmer::from_raw(4, bits).expect("kmer"))
            .find(|k| p.is_local(k))
            .expect("some 4-mer belongs to every rank")
    }

    #[test]
    fn rejects_mismatched_transport() {
        let mut mesh = ChannelTransport::mesh(2);
        let t1 = mesh.pop().expect("endpoint");
        assert!(DistributedStore::new(config(2, 0), t1).is_err());

        let t0 = ChannelTransport::mesh(3).swap_remove(0);
        assert!(DistributedStore::new(config(2, 0), t0).is_err());
    }

    #[test]
    fn empty_pump_returns_zero() {
        let mut stores = cluster(2);
        assert_eq!(pump_all(&mut stores), 0);
    }

    #[test]
    fn remote_add_lands_after_pump() {
        let mut stores = cluster(2);
        let k = key_owned_by(2, 1);

        stores[0].add(&k).expect("add");
        stores[0].add(&k).expect("add");
        assert!(stores[0].get_seq_data(&k).is_none());
        assert!(stores[1].get_seq_data(&k).is_none());
        assert_eq!(stores[0].traffic().sent, 2);

        assert_eq!(stores[1].pump_network().expect("pump"), 2);
        assert_eq!(stores[1].get_seq_data(&k).map(|(_, m)| m), Some(2));
        assert_eq!(stores[1].traffic().applied, 2);
    }

    #[test]
    fn local_add_is_immediate() {
        let mut stores = cluster(2);
        let k = key_owned_by(2, 0);
        stores[0].add(&k).expect("add");
        assert_eq!(stores[0].len(), 1);
        assert_eq!(stores[0].traffic().sent, 0);
    }

    #[test]
    fn remote_set_extension_reports_false() {
        let mut stores = cluster(2);
        let k = key_owned_by(2, 1);
        stores[0].add(&k).expect("add");
        assert!(
            !stores[0]
                .set_base_extension(&k, ExtDirection::Sense, Base::T)
                .expect("ext")
        );
        pump_all(&mut stores);

        let (ext, _) = stores[1].get_seq_data(&k).expect("present");
        assert!(ext.sense.has_base(Base::T));
    }

    #[test]
    fn per_sender_order_is_kept() {
        let mut stores = cluster(2);
        let k = key_owned_by(2, 1);
        stores[0].add(&k).expect("add");
        stores[0].set_flag(&k, SeqFlag::Delete).expect("flag");
        stores[0].remove(&k).expect("remove");
        stores[0].add(&k).expect("add");
        pump_all(&mut stores);

        let (_, data) = stores[1].get_seq_and_data(&k).expect("present");
        assert_eq!(data.multiplicity, 1);
        assert!(!data.is_deleted());
    }

    #[test]
    fn listeners_fire_on_owner_when_pumped() {
        let mut stores = cluster(2);
        let tally = Arc::new(MutationTally::new());
        stores[1].attach(tally.clone());
        let k = key_owned_by(2, 1);

        stores[0].add(&k).expect("add");
        assert_eq!(tally.total(), 0);
        pump_all(&mut stores);
        assert_eq!(tally.count(MutationKind::Added), 1);
    }

    #[test]
    fn pump_respects_batch_limit() {
        let mut mesh = ChannelTransport::mesh(2);
        let t1 = mesh.pop().expect("endpoint");
        let t0 = mesh.pop().expect("endpoint");
        let mut sender = DistributedStore::new(config(2, 0), t0).expect("rank 0");
        let mut receiver = DistributedStore::new(
            StoreConfig {
                max_pump_batch: 2,
                ..config(2, 1)
            },
            t1,
        )
        .expect("rank 1");

        let k = key_owned_by(2, 1);
        for _ in 0..5 {
            sender.add(&k).expect("add");
        }
        assert_eq!(receiver.pump_network().expect("pump"), 2);
        assert_eq!(receiver.pump_network().expect("pump"), 2);
        assert_eq!(receiver.pump_network().expect("pump"), 1);
        assert_eq!(receiver.pump_network().expect("pump"), 0);
        assert_eq!(receiver.get_seq_data(&k).map(|(_, m)| m), Some(5));
    }

    #[test]
    fn misrouted_message_is_dropped() {
        let mut mesh = ChannelTransport::mesh(2);
        let t1 = mesh.pop().expect("endpoint");
        let t0 = mesh.pop().expect("endpoint");
        let k = key_owned_by(2, 0);

        let frame = SeqMessage::Add { kmer: k }.encode().expect("encode");
        t0.send(ProcessId(1), frame).expect("send");

        let mut receiver = DistributedStore::new(config(2, 1), t1).expect("rank 1");
        assert_eq!(receiver.pump_network().expect("pump"), 1);
        assert!(receiver.is_empty());
        assert_eq!(receiver.traffic().misrouted, 1);
    }

    #[test]
    fn wrong_length_rejected_before_routing() {
        let mut stores = cluster(2);
        let short: Kmer = "ACG".parse().expect("kmer");
        assert!(matches!(
            stores[0].add(&short),
            Err(KmerStoreError::KmerLengthMismatch { .. })
        ));
        assert_eq!(stores[0].traffic().sent, 0);
    }

    #[test]
    fn partitions_are_disjoint() {
        let mut stores = cluster(3);
        for bits in 0..256u128 {
            stores[0]
                .add(&Kmer::from_raw(4, bits).expect("kmer"))
                .expect("add");
        }
        pump_all(&mut stores);

        let total: usize = stores.iter().map(|s| s.len()).sum();
        assert_eq!(total, 256);
        for (rank, store) in stores.iter().enumerate() {
            for (key, _) in store.iter() {
                assert_eq!(store.partitioner().owner(key), ProcessId(rank as u32));
            }
        }
    }

    #[test]
    fn bad_frame_does_not_stop_the_drain() {
        let mut mesh = ChannelTransport::mesh(2);
        let t1 = mesh.pop().expect("endpoint");
        let t0 = mesh.pop().expect("endpoint");
        let k = key_owned_by(2, 1);
        let add = SeqMessage::Add { kmer: k }.encode().expect("encode");

        t0.send(ProcessId(1), add.clone()).expect("send");
        t0.send(ProcessId(1), vec![0xff, 0xff, 0xff]).expect("send");
        t0.send(ProcessId(1), add).expect("send");

        let mut receiver = DistributedStore::new(config(2, 1), t1).expect("rank 1");
        assert_eq!(receiver.pump_network().expect("pump"), 3);
        assert_eq!(receiver.get_seq_data(&k).map(|(_, m)| m), Some(2));
        assert_eq!(receiver.traffic().applied, 2);
        assert_eq!(receiver.traffic().rejected, 1);
        assert_eq!(receiver.pump_network().expect("pump"), 0);
    }

    #[test]
    fn inapplicable_message_is_rejected() {
        let mut mesh = ChannelTransport::mesh(1);
        let t0 = mesh.pop().expect("endpoint");
        let short: Kmer = "ACG".parse().expect("kmer");
        let frame = SeqMessage::Add { kmer: short }.encode().expect("encode");
        t0.send(ProcessId(0), frame).expect("send");

        let mut store = DistributedStore::new(config(1, 0), t0).expect("rank 0");
        assert_eq!(store.pump_network().expect("pump"), 1);
        assert!(store.is_empty());
        assert_eq!(store.traffic().rejected, 1);
    }

    #[test]
    fn empty_pump_wait_is_bounded() {
        let t0 = ChannelTransport::mesh(1).pop().expect("endpoint");
        let mut store = DistributedStore::new(
            StoreConfig {
                pump_wait_ms: 30,
                ..config(1, 0)
            },
            t0,
        )
        .expect("rank 0");

        let started = Instant::now();
        assert_eq!(store.pump_network().expect("pump"), 0);
        let waited = started.elapsed();
        assert!(waited >= Duration::from_millis(30));
        assert!(waited < Duration::from_secs(5));
    }
}
