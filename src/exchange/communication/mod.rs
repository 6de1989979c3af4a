use crate::exchange::error::Result;
use crate::exchange::messages::{Receipt, Tag};

pub mod local_communicator;

#[cfg(feature = "mpi")]
pub mod mpi_communicator;

/// Point-to-point view on a process group. Ranks are in `[0, size())` and don't change for the
/// lifetime of a communicator.
pub trait GroupCommunicator {
    fn rank(&self) -> u32;

    fn size(&self) -> u32;

    /// Sends `payload` to `destination`, tagged with `tag`.
    fn send(&self, destination: u32, tag: Tag, payload: &[u8]) -> Result<()>;

    /// Blocks until a message with `tag` from exactly `source` is available. Payloads larger than
    /// `capacity` are an error.
    fn receive(&self, source: u32, tag: Tag, capacity: usize) -> Result<(Vec<u8>, Receipt)>;

    fn barrier(&self);
}
