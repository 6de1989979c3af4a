use std::io;
use std::io::Write;
use std::thread;
use std::thread::JoinHandle;

use clap::Parser;
use nohash_hasher::IntMap;
use tracing::{error, info};

use crate::exchange::communication::local_communicator::{ChannelCommunicator, DummyCommunicator};
use crate::exchange::communication::GroupCommunicator;
use crate::exchange::config::{CommandLineArgs, Config};
use crate::exchange::controller::{self, ProcessArgumentsBuilder};
use crate::exchange::error::Result;
use crate::exchange::logging;
use crate::exchange::protocol::ExchangeSummary;

/// Starts one thread per process of the group. `output` is asked once per rank for the writer
/// that process prints to.
pub fn run_channel<W, F>(
    config: &Config,
    output: F,
) -> Result<IntMap<u32, JoinHandle<Result<ExchangeSummary>>>>
where
    W: Write + Send + 'static,
    F: Fn(u32) -> W,
{
    let num_procs = config.group.num_procs;
    if num_procs < 2 {
        info!("Starting greeting exchange with a single process.");
        let handle = spawn_process(DummyCommunicator(), config.clone(), output(0))?;
        return Ok(IntMap::from_iter([(0, handle)]));
    }

    info!("Starting multithreaded greeting exchange with {num_procs} processes.");
    let mut handles = IntMap::default();
    for comm in ChannelCommunicator::create_n_2_n(num_procs) {
        let rank = comm.rank();
        let handle = spawn_process(comm, config.clone(), output(rank))?;
        handles.insert(rank, handle);
    }
    Ok(handles)
}

fn spawn_process<C, W>(
    comm: C,
    config: Config,
    output: W,
) -> Result<JoinHandle<Result<ExchangeSummary>>>
where
    C: GroupCommunicator + Send + 'static,
    W: Write + Send + 'static,
{
    let rank = comm.rank();
    let args = ProcessArgumentsBuilder::default()
        .communicator(comm)
        .config(config)
        .output(output)
        .build()?;

    let handle = thread::Builder::new()
        .name(rank.to_string())
        .spawn(move || controller::execute_process(args))?;
    Ok(handle)
}

pub fn run_channel_from_args() -> Result<()> {
    let _guard = logging::init_std_err_logging_thread_local();

    let args = CommandLineArgs::parse();
    let result = Config::from_args(&args)
        .and_then(|config| run_channel(&config, |_| io::stdout()))
        .and_then(controller::try_join);

    match result {
        Ok(summaries) => {
            info!("All {} processes have finished.", summaries.len());
            Ok(())
        }
        Err(e) => {
            error!("Greeting exchange failed: {e}");
            Err(e)
        }
    }
}
