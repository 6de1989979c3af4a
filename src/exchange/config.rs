use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::exchange::error::{ExchangeError, Result};

#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
pub struct CommandLineArgs {
    #[arg(long, short)]
    pub config_path: Option<String>,
    /// Number of processes. Only used when the group is not provided by MPI.
    #[arg(long, short)]
    pub num_procs: Option<u32>,
    #[arg(long, short)]
    pub output_dir: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub group: Group,
    #[serde(default)]
    pub output: Output,
    // where the config was read from. Relative paths in the config are resolved against it.
    #[serde(skip)]
    context: Option<PathBuf>,
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self> {
        let to_error = |message: String| ExchangeError::Config {
            path: PathBuf::from(path),
            message,
        };

        let file = File::open(path).map_err(|e| to_error(e.to_string()))?;
        let mut config: Config =
            serde_yaml::from_reader(BufReader::new(file)).map_err(|e| to_error(e.to_string()))?;
        config.context = Some(PathBuf::from(path));
        Ok(config)
    }

    /// Loads the config file if one is given and applies the overrides from the command line.
    pub fn from_args(args: &CommandLineArgs) -> Result<Self> {
        let mut config = match &args.config_path {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };

        if let Some(num_procs) = args.num_procs {
            config.group.num_procs = num_procs;
        }
        if let Some(output_dir) = &args.output_dir {
            config.output.output_dir = output_dir.clone();
        }
        Ok(config)
    }

    pub fn context(&self) -> &Option<PathBuf> {
        &self.context
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Group {
    #[serde(default = "u32_value_1")]
    pub num_procs: u32,
}

impl Default for Group {
    fn default() -> Self {
        Group { num_procs: 1 }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Output {
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default)]
    pub logging: Logging,
}

impl Default for Output {
    fn default() -> Self {
        Output {
            output_dir: default_output_dir(),
            logging: Logging::default(),
        }
    }
}

/// Have this extra layer of log level enum, as tracing subscriber has no
/// off/none option by default. At least it can't be parsed
#[derive(PartialEq, Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub enum Logging {
    #[default]
    None,
    Info,
}

fn u32_value_1() -> u32 {
    1
}

fn default_output_dir() -> String {
    String::from("./")
}
