use clap::Parser;
use mdm_policy::{cli::Args, error::PolicyError, runtime::run};

#[tokio::main]
async fn main() -> Result<(), PolicyError> {
    env_logger::init();

    let args = Args::parse();
    run(&args).await
}
