use clap::Parser;

/// Sends a handful of demo rows over the QuestDB line protocol.
#[derive(Parser, Debug)]
#[command(name = "ilp-cli", about = "QuestDB line-protocol ingestion demo client")]
pub struct CliArgs {
    /// Config string, e.g. "http::addr=localhost:9000". Overrides QDB_CLIENT_CONF.
    #[arg(long)]
    pub conf: Option<String>,

    /// Table to write the demo rows into.
    #[arg(long, default_value = "ilp_cli_demo")]
    pub table: String,

    /// Number of demo rows to send.
    #[arg(long, default_value_t = 3)]
    pub rows: u32,

    #[arg(long)]
    pub debug: bool,
}
