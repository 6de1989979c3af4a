//! The greeting exchange. Rank 0 greets everybody and then prints one greeting per worker, in
//! ascending rank order. Every other rank sends exactly one greeting to rank 0.
//!
//! The coordinator asks for the workers' messages one rank after the other. If a worker never sends
//! its greeting, the coordinator waits for it forever, even if greetings of higher ranks are
//! already available.

use std::io::Write;

use tracing::{debug, info, instrument};

use crate::exchange::communication::GroupCommunicator;
use crate::exchange::error::Result;
use crate::exchange::messages::{GreetingBuffer, Tag, MESSAGE_CAPACITY};

pub const COORDINATOR_RANK: u32 = 0;
pub const GREETING_TAG: Tag = 0;
pub const COORDINATOR_GREETING: &str = "Pozdrav tudi vam!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Coordinator,
    Worker,
}

impl Role {
    pub fn from_rank(rank: u32) -> Self {
        if rank == COORDINATOR_RANK {
            Role::Coordinator
        } else {
            Role::Worker
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeSummary {
    Coordinated { received: u32 },
    Greeted { sent_bytes: usize },
}

pub fn worker_greeting(rank: u32) -> Result<GreetingBuffer> {
    GreetingBuffer::from_text(&format!("Poroces {rank} posilja pozdrav!"))
}

/// Runs the role of `comm`'s rank. Only the coordinator writes to `out`.
pub fn execute_role<C, W>(comm: &C, out: &mut W) -> Result<ExchangeSummary>
where
    C: GroupCommunicator,
    W: Write,
{
    let rank = comm.rank();
    let role = Role::from_rank(rank);
    debug!("Process #{rank} of {} acts as {role:?}", comm.size());

    match role {
        Role::Coordinator => run_coordinator(comm, out),
        Role::Worker => run_worker(comm),
    }
}

#[instrument(level = "info", skip_all, fields(rank = comm.rank()))]
pub fn run_coordinator<C, W>(comm: &C, out: &mut W) -> Result<ExchangeSummary>
where
    C: GroupCommunicator,
    W: Write,
{
    writeln!(out, "{COORDINATOR_GREETING}\n")?;
    out.flush()?;

    let size = comm.size();
    let mut received = 0;
    for source in (COORDINATOR_RANK + 1)..size {
        let (payload, receipt) = comm.receive(source, GREETING_TAG, MESSAGE_CAPACITY)?;
        let greeting = GreetingBuffer::from_wire(&payload, receipt.source)?;
        debug!("Received {} bytes from #{}", receipt.len, receipt.source);

        writeln!(out, "{greeting}")?;
        out.flush()?;
        received += 1;
    }

    info!("Received greetings from {received} workers.");
    Ok(ExchangeSummary::Coordinated { received })
}

#[instrument(level = "info", skip_all, fields(rank = comm.rank()))]
pub fn run_worker<C>(comm: &C) -> Result<ExchangeSummary>
where
    C: GroupCommunicator,
{
    let greeting = worker_greeting(comm.rank())?;
    comm.send(COORDINATOR_RANK, GREETING_TAG, greeting.to_wire())?;

    debug!("Sent {} bytes to #{COORDINATOR_RANK}", greeting.wire_len());
    Ok(ExchangeSummary::Greeted {
        sent_bytes: greeting.wire_len(),
    })
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use crate::exchange::communication::local_communicator::DummyCommunicator;
    use crate::exchange::communication::GroupCommunicator;
    use crate::exchange::error::{ExchangeError, Result};
    use crate::exchange::messages::{Receipt, Tag, MESSAGE_CAPACITY};
    use crate::exchange::protocol::{
        execute_role, run_coordinator, run_worker, worker_greeting, ExchangeSummary, Role,
        GREETING_TAG,
    };

    /// Pretends to be one member of a group. Incoming messages are scripted up front, outgoing
    /// messages and receive calls are recorded.
    struct ScriptedCommunicator {
        rank: u32,
        size: u32,
        // arrival order, as the transport would deliver it
        incoming: RefCell<Vec<(u32, Vec<u8>)>>,
        sent: RefCell<Vec<(u32, Tag, Vec<u8>)>>,
        receive_calls: RefCell<Vec<u32>>,
    }

    impl ScriptedCommunicator {
        fn new(rank: u32, size: u32) -> Self {
            ScriptedCommunicator {
                rank,
                size,
                incoming: RefCell::new(vec![]),
                sent: RefCell::new(vec![]),
                receive_calls: RefCell::new(vec![]),
            }
        }

        fn arrive(self, source: u32, payload: &[u8]) -> Self {
            self.incoming.borrow_mut().push((source, payload.to_vec()));
            self
        }
    }

    impl GroupCommunicator for ScriptedCommunicator {
        fn rank(&self) -> u32 {
            self.rank
        }

        fn size(&self) -> u32 {
            self.size
        }

        fn send(&self, destination: u32, tag: Tag, payload: &[u8]) -> Result<()> {
            self.sent
                .borrow_mut()
                .push((destination, tag, payload.to_vec()));
            Ok(())
        }

        fn receive(&self, source: u32, tag: Tag, capacity: usize) -> Result<(Vec<u8>, Receipt)> {
            assert_eq!(tag, GREETING_TAG);
            assert_eq!(capacity, MESSAGE_CAPACITY);
            self.receive_calls.borrow_mut().push(source);

            let mut incoming = self.incoming.borrow_mut();
            let index = incoming
                .iter()
                .position(|(s, _)| *s == source)
                .ok_or(ExchangeError::Disconnected { rank: source })?;
            let (_, payload) = incoming.remove(index);
            let len = payload.len();
            Ok((
                payload,
                Receipt {
                    source,
                    tag,
                    len,
                },
            ))
        }

        fn barrier(&self) {}
    }

    fn output_of(comm: &ScriptedCommunicator) -> String {
        let mut out = Vec::new();
        execute_role(comm, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn role_from_rank() {
        assert_eq!(Role::from_rank(0), Role::Coordinator);
        assert_eq!(Role::from_rank(1), Role::Worker);
        assert_eq!(Role::from_rank(u32::MAX), Role::Worker);
    }

    #[test]
    fn worker_greeting_text() {
        assert_eq!(
            worker_greeting(1).unwrap().text(),
            "Poroces 1 posilja pozdrav!"
        );
        assert_eq!(
            worker_greeting(999).unwrap().text(),
            "Poroces 999 posilja pozdrav!"
        );
    }

    #[test]
    fn worker_greeting_fits_for_largest_rank() {
        let greeting = worker_greeting(u32::MAX).unwrap();
        assert_eq!(greeting.text(), "Poroces 4294967295 posilja pozdrav!");
        assert!(greeting.wire_len() <= MESSAGE_CAPACITY);
    }

    #[test]
    fn worker_sends_once_to_coordinator() {
        let comm = ScriptedCommunicator::new(3, 5);
        let summary = run_worker(&comm).unwrap();

        let sent = comm.sent.borrow();
        assert_eq!(sent.len(), 1);
        let (destination, tag, payload) = &sent[0];
        assert_eq!(*destination, 0);
        assert_eq!(*tag, GREETING_TAG);
        assert_eq!(payload.as_slice(), b"Poroces 3 posilja pozdrav!\0");
        assert_eq!(summary, ExchangeSummary::Greeted { sent_bytes: 27 });
        assert!(comm.receive_calls.borrow().is_empty());
    }

    #[test]
    fn worker_prints_nothing() {
        let comm = ScriptedCommunicator::new(2, 3);
        assert_eq!(output_of(&comm), "");
    }

    #[test]
    fn coordinator_alone() {
        let comm = ScriptedCommunicator::new(0, 1);
        let mut out = Vec::new();
        let summary = run_coordinator(&comm, &mut out).unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "Pozdrav tudi vam!\n\n");
        assert_eq!(summary, ExchangeSummary::Coordinated { received: 0 });
        assert!(comm.receive_calls.borrow().is_empty());
    }

    #[test]
    fn coordinator_alone_on_dummy() {
        let mut out = Vec::new();
        execute_role(&DummyCommunicator(), &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Pozdrav tudi vam!\n\n");
    }

    #[test]
    fn coordinator_prints_in_rank_order_regardless_of_arrival() {
        let comm = ScriptedCommunicator::new(0, 4)
            .arrive(3, b"Poroces 3 posilja pozdrav!\0")
            .arrive(1, b"Poroces 1 posilja pozdrav!\0")
            .arrive(2, b"Poroces 2 posilja pozdrav!\0");

        assert_eq!(
            output_of(&comm),
            "Pozdrav tudi vam!\n\nPoroces 1 posilja pozdrav!\nPoroces 2 posilja pozdrav!\nPoroces 3 posilja pozdrav!\n"
        );
        assert_eq!(*comm.receive_calls.borrow(), vec![1, 2, 3]);
    }

    #[test]
    fn coordinator_prints_what_workers_sent() {
        let mut greetings = HashMap::new();
        let mut comm = ScriptedCommunicator::new(0, 6);
        for rank in (1..6).rev() {
            let greeting = worker_greeting(rank).unwrap();
            comm = comm.arrive(rank, greeting.to_wire());
            greetings.insert(rank, greeting.text().to_string());
        }

        let output = output_of(&comm);
        let lines: Vec<_> = output.lines().skip(2).collect();
        assert_eq!(lines.len(), 5);
        for (i, line) in lines.iter().enumerate() {
            assert_eq!(*line, greetings[&(i as u32 + 1)]);
        }
    }

    #[test]
    fn coordinator_stops_at_missing_worker() {
        let comm = ScriptedCommunicator::new(0, 3).arrive(2, b"Poroces 2 posilja pozdrav!\0");
        let mut out = Vec::new();

        let result = run_coordinator(&comm, &mut out);

        assert!(matches!(result, Err(ExchangeError::Disconnected { rank: 1 })));
        // the greeting of rank 2 is never looked at, because rank 1 comes first
        assert_eq!(*comm.receive_calls.borrow(), vec![1]);
        assert_eq!(String::from_utf8(out).unwrap(), "Pozdrav tudi vam!\n\n");
    }

    #[test]
    fn coordinator_rejects_invalid_text() {
        let comm = ScriptedCommunicator::new(0, 2).arrive(1, &[0xc3, 0x28, 0]);
        let mut out = Vec::new();
        let result = run_coordinator(&comm, &mut out);
        assert!(matches!(
            result,
            Err(ExchangeError::InvalidText { from_rank: 1, .. })
        ));
    }
}
