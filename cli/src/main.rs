mod cli_options;

use clap::Parser;
use cli_options::CliArgs;
use ilp_common::log::{self, LogOptions};
use ilp_sender::Sender;

fn main() {
    let args = CliArgs::parse();
    log::init(LogOptions { debug: args.debug, ..LogOptions::default() });

    if let Err(err) = run(&args) {
        tracing::error!(error = %err, "ilp-cli failed");
        std::process::exit(1);
    }
}

fn run(args: &CliArgs) -> ilp_common::CResult<()> {
    let mut sender = match &args.conf {
        Some(conf) => Sender::from_conf(conf)?,
        None => Sender::from_env()?,
    };

    sender.connect()?;
    tracing::info!(table = %args.table, rows = args.rows, "sending demo rows");

    for i in 0..args.rows {
        sender
            .table(&args.table)?
            .symbol("host", "demo-host")?
            .int_column("sequence", i as i64)?
            .float_column("value", i as f64 * 1.5)?;
        sender.at_now()?;
    }

    sender.flush()?;
    sender.close()?;
    tracing::info!("done");
    Ok(())
}
