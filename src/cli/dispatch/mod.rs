use crate::cli::{actions::Action, globals::Environment};
use anyhow::Result;
use std::path::PathBuf;

pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let arg = |name: &str| -> Result<String> {
        matches
            .get_one(name)
            .map(|s: &String| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --{name}"))
    };

    Ok(Action::Server {
        port: matches.get_one::<u16>("port").copied().unwrap_or(5000),
        dsn: arg("dsn")?,
        environment: match arg("env")?.as_str() {
            "prod" => Environment::Prod,
            _ => Environment::Dev,
        },
        key_file: PathBuf::from(arg("key-file")?),
        frontend_dir: PathBuf::from(arg("frontend-dir")?),
        frontend_dev_url: arg("frontend-dev-url")?,
    })
}
