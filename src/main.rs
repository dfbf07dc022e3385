//! firetv - Control Amazon Fire TV devices over adb
//!
//! This is the binary entry point. All logic lives in the library.

use clap::Parser;
use firetv::Cli;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    firetv_core::logging::init(cli.verbose)?;

    firetv::run(cli).await?;
    Ok(())
}
