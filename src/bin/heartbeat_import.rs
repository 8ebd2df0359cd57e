use std::io::{self, Write};

use chrono::{DateTime, Utc};
use clap::Parser;
use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};

use heartbeat_importer::{DumpImporter, ImportOutcome, ImporterConfig, User, init_logger};

#[derive(Parser, Debug)]
#[command(
    name = "heartbeat-import",
    about = "Import heartbeats from a WakaTime data dump as JSON lines"
)]
struct Args {
    /// WakaTime API key used to request and download the dump.
    #[arg(long, env = "WAKATIME_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Id of the user the imported heartbeats belong to.
    #[arg(long)]
    user: String,

    /// Earliest heartbeat to emit (any format dateparser understands).
    #[arg(long)]
    from: Option<String>,

    /// Latest heartbeat to emit, defaults to now.
    #[arg(long)]
    to: Option<String>,
}

fn parse_time(flag: &str, raw: &str) -> Result<DateTime<Utc>, io::Error> {
    dateparser::parse(raw).map_err(|err| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid --{flag} '{raw}': {err}"),
        )
    })
}

/// Write `value` as one JSON line.
async fn write_json_line<W, T>(out: &mut W, value: &T) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut line = serde_json::to_vec(value)?;
    line.push(b'\n');
    out.write_all(&line).await
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logger();

    let args = Args::parse();
    let user_id = args.user.trim();
    if user_id.is_empty() {
        writeln!(io::stderr(), "error: --user must not be empty")?;
        std::process::exit(1);
    }
    let user = User::new(user_id);

    let importer = DumpImporter::with_config(&args.api_key, ImporterConfig::from_env())?;

    let mut handle = match (args.from.as_deref(), args.to.as_deref()) {
        (None, None) => importer.import_all(&user).await?,
        (from, to) => {
            let from = match from {
                Some(raw) => parse_time("from", raw)?,
                None => DateTime::<Utc>::MIN_UTC,
            };
            let to = match to {
                Some(raw) => parse_time("to", raw)?,
                None => Utc::now(),
            };
            importer.import(&user, from, to).await?
        }
    };

    log::info!("waiting for data dump '{}'", handle.dump_id());

    let mut out = BufWriter::new(tokio::io::stdout());
    while let Some(heartbeat) = handle.recv().await {
        write_json_line(&mut out, &heartbeat).await?;
    }
    out.flush().await?;

    match handle.finish().await {
        ImportOutcome::Completed(stats) => {
            log::info!(
                "imported {} heartbeats ({} days, {} bytes, {} polls)",
                stats.emitted,
                stats.days,
                stats.bytes_downloaded,
                stats.polls
            );
            Ok(())
        }
        ImportOutcome::Failed(err) => {
            writeln!(io::stderr(), "error: import failed: {err}")?;
            std::process::exit(1);
        }
    }
}
