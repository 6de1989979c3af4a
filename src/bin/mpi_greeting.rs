#[cfg(feature = "mpi")]
use greeting_exchange::exchange::controller::mpi_controller;

#[cfg(feature = "mpi")]
fn main() {
    if mpi_controller::run_mpi().is_err() {
        std::process::exit(1);
    }
}
