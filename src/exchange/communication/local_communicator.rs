use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Barrier};

use tracing::{info, trace};

use crate::exchange::communication::GroupCommunicator;
use crate::exchange::error::{ExchangeError, Result};
use crate::exchange::messages::{Receipt, Tag};

/// Communicator of a group which consists of this process only. There is nobody to talk to.
pub struct DummyCommunicator();

impl GroupCommunicator for DummyCommunicator {
    fn rank(&self) -> u32 {
        0
    }

    fn size(&self) -> u32 {
        1
    }

    fn send(&self, destination: u32, _tag: Tag, _payload: &[u8]) -> Result<()> {
        Err(ExchangeError::UnknownRank {
            rank: destination,
            size: self.size(),
        })
    }

    fn receive(&self, source: u32, _tag: Tag, _capacity: usize) -> Result<(Vec<u8>, Receipt)> {
        Err(ExchangeError::UnknownRank {
            rank: source,
            size: self.size(),
        })
    }

    fn barrier(&self) {
        info!("Barrier was called on DummyCommunicator, which doesn't do anything.")
    }
}

struct Envelope {
    source: u32,
    tag: Tag,
    payload: Vec<u8>,
}

/// Communicator for a group of threads within one process. Every rank owns one receiving end and a
/// sender to every other rank.
pub struct ChannelCommunicator {
    receiver: Receiver<Envelope>,
    // no sender to ourselves. Otherwise a receive could never notice that all peers are gone.
    senders: Vec<Option<Sender<Envelope>>>,
    // messages which arrived before somebody asked for them
    pending: RefCell<VecDeque<Envelope>>,
    rank: u32,
    barrier: Arc<Barrier>,
}

impl ChannelCommunicator {
    pub fn create_n_2_n(num_procs: u32) -> Vec<ChannelCommunicator> {
        let mut senders: Vec<_> = Vec::new();
        let mut comms: Vec<_> = Vec::new();
        let barrier = Arc::new(Barrier::new(num_procs as usize));

        for rank in 0..num_procs {
            let (sender, receiver) = channel();
            let comm = ChannelCommunicator {
                receiver,
                senders: vec![],
                pending: RefCell::new(VecDeque::new()),
                rank,
                barrier: barrier.clone(),
            };
            senders.push(sender);
            comms.push(comm);
        }

        for comm in &mut comms {
            for (target, sender) in senders.iter().enumerate() {
                let sender = (target as u32 != comm.rank).then(|| sender.clone());
                comm.senders.push(sender);
            }
        }

        comms
    }

    fn check_rank(&self, rank: u32) -> Result<()> {
        if rank < self.size() {
            Ok(())
        } else {
            Err(ExchangeError::UnknownRank {
                rank,
                size: self.size(),
            })
        }
    }

    fn take_pending(&self, source: u32, tag: Tag) -> Option<Envelope> {
        let mut pending = self.pending.borrow_mut();
        let index = pending
            .iter()
            .position(|e| e.source == source && e.tag == tag)?;
        pending.remove(index)
    }

    fn wait_for(&self, source: u32, tag: Tag) -> Result<Envelope> {
        if let Some(envelope) = self.take_pending(source, tag) {
            return Ok(envelope);
        }

        loop {
            let envelope = self
                .receiver
                .recv()
                .map_err(|_| ExchangeError::Disconnected { rank: source })?;

            if envelope.source == source && envelope.tag == tag {
                return Ok(envelope);
            }

            trace!(
                "Process #{} holds back message from #{} with tag {} while waiting for #{source}",
                self.rank,
                envelope.source,
                envelope.tag
            );
            self.pending.borrow_mut().push_back(envelope);
        }
    }
}

impl GroupCommunicator for ChannelCommunicator {
    fn rank(&self) -> u32 {
        self.rank
    }

    fn size(&self) -> u32 {
        self.senders.len() as u32
    }

    fn send(&self, destination: u32, tag: Tag, payload: &[u8]) -> Result<()> {
        self.check_rank(destination)?;
        let sender = self.senders[destination as usize]
            .as_ref()
            .ok_or(ExchangeError::Disconnected { rank: destination })?;

        sender
            .send(Envelope {
                source: self.rank,
                tag,
                payload: payload.to_vec(),
            })
            .map_err(|_| ExchangeError::Disconnected { rank: destination })
    }

    fn receive(&self, source: u32, tag: Tag, capacity: usize) -> Result<(Vec<u8>, Receipt)> {
        self.check_rank(source)?;
        let envelope = self.wait_for(source, tag)?;

        let len = envelope.payload.len();
        if len > capacity {
            return Err(ExchangeError::Truncated {
                from_rank: source,
                len,
                capacity,
            });
        }

        let receipt = Receipt {
            source: envelope.source,
            tag: envelope.tag,
            len,
        };
        Ok((envelope.payload, receipt))
    }

    fn barrier(&self) {
        self.barrier.wait();
    }
}
