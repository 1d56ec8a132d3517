use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Harness config file (YAML)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

pub fn run(args: ConfigArgs) -> Result<i32> {
    let config = super::load_config(args.config.as_deref())?;
    print!("{}", serde_yaml::to_string(&config)?);
    Ok(0)
}
