use std::io;

use clap::Parser;
use mpi::topology::Communicator;
use tracing::{error, info};

use crate::exchange::communication::mpi_communicator::MpiCommunicator;
use crate::exchange::config::{CommandLineArgs, Config};
use crate::exchange::controller::{self, ProcessArgumentsBuilder};
use crate::exchange::error::{ExchangeError, Result};
use crate::exchange::logging;

pub fn run_mpi() -> Result<()> {
    let _guard = logging::init_std_err_logging_thread_local();

    // MPI is finalized when the universe is dropped at the end of this function
    let universe = mpi::initialize().ok_or(ExchangeError::RuntimeInit)?;
    let world = universe.world();
    let size = world.size();
    let rank = world.rank();

    let comm = MpiCommunicator::new(world);

    let mut args = CommandLineArgs::parse();
    // override the num procs argument, with the number of processes mpi has started.
    args.num_procs = Some(size as u32);

    let result = Config::from_args(&args)
        .and_then(|config| {
            ProcessArgumentsBuilder::default()
                .communicator(comm)
                .config(config)
                .output(io::stdout())
                .build()
        })
        .and_then(controller::execute_process);

    match result {
        Ok(_) => {
            info!("Process #{rank} finishing.");
            Ok(())
        }
        Err(e) => {
            error!("Process #{rank} failed: {e}");
            Err(e)
        }
    }
}
