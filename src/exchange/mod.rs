pub mod communication;
pub mod config;
pub mod controller;
pub mod error;
pub mod io;
pub mod logging;
pub mod messages;
pub mod protocol;
