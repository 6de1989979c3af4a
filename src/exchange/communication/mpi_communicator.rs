use mpi::collective::CommunicatorCollectives;
use mpi::point_to_point::{Destination, Source};
use mpi::topology::{Communicator, SimpleCommunicator};
use mpi::traits::Equivalence;
use mpi::Rank;
use tracing::instrument;

use crate::exchange::communication::GroupCommunicator;
use crate::exchange::error::{ExchangeError, Result};
use crate::exchange::messages::{Receipt, Tag};

pub struct MpiCommunicator {
    pub mpi_communicator: SimpleCommunicator,
}

impl MpiCommunicator {
    pub(crate) fn new(mpi_communicator: SimpleCommunicator) -> Self {
        MpiCommunicator { mpi_communicator }
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
}

// rsmpi installs MPI_ERRORS_ARE_FATAL, so failures inside the MPI calls below abort the whole job
// instead of coming back as an error.
impl GroupCommunicator for MpiCommunicator {
    fn rank(&self) -> u32 {
        self.mpi_communicator.rank() as u32
    }

    fn size(&self) -> u32 {
        self.mpi_communicator.size() as u32
    }

    #[instrument(level = "trace", skip(self, payload), fields(rank = self.rank()))]
    fn send(&self, destination: u32, tag: Tag, payload: &[u8]) -> Result<()> {
        self.check_rank(destination)?;
        self.mpi_communicator
            .process_at_rank(destination as Rank)
            .send_with_tag(payload, tag);
        Ok(())
    }

    #[instrument(level = "trace", skip(self), fields(rank = self.rank()))]
    fn receive(&self, source: u32, tag: Tag, capacity: usize) -> Result<(Vec<u8>, Receipt)> {
        self.check_rank(source)?;

        let mut buffer = vec![0u8; capacity];
        let status = self
            .mpi_communicator
            .process_at_rank(source as Rank)
            .receive_into_with_tag(&mut buffer[..], tag);

        let len = status.count(u8::equivalent_datatype()) as usize;
        buffer.truncate(len);

        let receipt = Receipt {
            source: status.source_rank() as u32,
            tag: status.tag(),
            len,
        };
        Ok((buffer, receipt))
    }

    fn barrier(&self) {
        self.mpi_communicator.barrier();
    }
}
