pub mod server;

use crate::cli::globals::Environment;
use std::path::PathBuf;

#[derive(Debug)]
pub enum Action {
    Server {
        port: u16,
        dsn: String,
        environment: Environment,
        key_file: PathBuf,
        frontend_dir: PathBuf,
        frontend_dev_url: String,
    },
}
