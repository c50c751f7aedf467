/// audx - command-line audio transcoder
use audx_cli::{logging, run, Args, AudxConfig};
use clap::Parser;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // Help and version go to stdout and are not failures
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match start(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn start(args: &Args) -> anyhow::Result<()> {
    let config = AudxConfig::load()?;
    logging::init(config.log_filter.as_deref())?;

    let summary = run(args, &config)?;
    tracing::info!(%summary, "Done");
    Ok(())
}
