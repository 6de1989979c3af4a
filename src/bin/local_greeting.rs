use std::process;

use greeting_exchange::exchange::controller::local_controller;

fn main() {
    if local_controller::run_channel_from_args().is_err() {
        process::exit(1);
    }
}
