pub mod local_controller;
#[cfg(feature = "mpi")]
pub mod mpi_controller;

use std::io::Write;
use std::thread::{sleep, JoinHandle};
use std::time::Duration;

use derive_builder::Builder;
use nohash_hasher::IntMap;
use tracing::{error, info};

use crate::exchange::communication::GroupCommunicator;
use crate::exchange::config::Config;
use crate::exchange::error::{ExchangeError, Result};
use crate::exchange::logging;
use crate::exchange::protocol::{self, ExchangeSummary};

#[derive(Builder)]
#[builder(pattern = "owned", build_fn(error = "ExchangeError"))]
pub struct ProcessArguments<C: GroupCommunicator, W: Write> {
    communicator: C,
    config: Config,
    // only the coordinator writes to it
    output: W,
}

/// Runs the greeting exchange for a single process of the group.
pub fn execute_process<C, W>(arguments: ProcessArguments<C, W>) -> Result<ExchangeSummary>
where
    C: GroupCommunicator,
    W: Write,
{
    let ProcessArguments {
        communicator: comm,
        config,
        mut output,
    } = arguments;

    let rank = comm.rank();
    let _guards = logging::init_logging(&config, rank)?;

    info!("Process #{rank} of {} has started.", comm.size());
    let result = protocol::execute_role(&comm, &mut output);

    match &result {
        Ok(summary) => info!("Process #{rank} finished: {summary:?}"),
        Err(e) => error!("Process #{rank} failed: {e}"),
    }
    result
}

/// Have this more complicated join logic, so that threads in the back of the handle map can also
/// end the run. Returns the summaries by rank, or the first failure.
pub fn try_join(
    mut handles: IntMap<u32, JoinHandle<Result<ExchangeSummary>>>,
) -> Result<IntMap<u32, ExchangeSummary>> {
    let mut summaries = IntMap::default();
    let mut first_error = None;

    while !handles.is_empty() {
        sleep(Duration::from_millis(10)); // test for finished threads every 10ms
        let finished: Vec<u32> = handles
            .iter()
            .filter(|(_, handle)| handle.is_finished())
            .map(|(rank, _)| *rank)
            .collect();

        for rank in finished {
            let Some(handle) = handles.remove(&rank) else {
                continue;
            };
            let result = handle
                .join()
                .unwrap_or(Err(ExchangeError::ThreadPanicked { rank }));

            match result {
                Ok(summary) => {
                    summaries.insert(rank, summary);
                }
                Err(e) => {
                    error!("Process #{rank} did not complete the exchange: {e}");
                    first_error.get_or_insert(e);
                }
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(summaries),
    }
}
