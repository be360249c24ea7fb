//! fsread binary entry point
//!
//! Reads one path through a configured connection and streams it to stdout.
//! The exit status is the read code, or 64 for misconfiguration and 70 for
//! any other failure.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, bail, Context};
use chrono::{DateTime, Utc};
use tokio::io::AsyncWriteExt;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fs_core::ManagerConfig;
use manager::{FileSystemManager, ReadCode, ReadRequest};

const USAGE: &str = "usage: fsread <config.json> <connection> <path> [--if-newer-than <rfc3339>]";

/// Exit status for bad arguments or configuration
const EXIT_MISCONFIGURED: u8 = 64;

/// Exit status for backend and I/O failures
const EXIT_FAILED: u8 = 70;

#[derive(Debug)]
struct Args {
    config: PathBuf,
    connection: String,
    path: String,
    if_newer_than: Option<DateTime<Utc>>,
}

impl Args {
    fn parse(args: impl IntoIterator<Item = String>) -> anyhow::Result<Self> {
        let mut positional = Vec::new();
        let mut if_newer_than = None;

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--if-newer-than" => {
                    let value = args
                        .next()
                        .ok_or_else(|| anyhow!("--if-newer-than needs a timestamp"))?;
                    let since = DateTime::parse_from_rfc3339(&value)
                        .with_context(|| format!("invalid timestamp {:?}", value))?;
                    if_newer_than = Some(since.with_timezone(&Utc));
                }
                flag if flag.starts_with("--") => bail!("unknown option {}", flag),
                _ => positional.push(arg),
            }
        }

        let [config, connection, path]: [String; 3] = positional
            .try_into()
            .map_err(|_| anyhow!("expected exactly three arguments"))?;

        Ok(Self {
            config: PathBuf::from(config),
            connection,
            path,
            if_newer_than,
        })
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "manager=info,storage=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = match Args::parse(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("fsread: {:#}\n{}", e, USAGE);
            return ExitCode::from(EXIT_MISCONFIGURED);
        }
    };

    match run(args).await {
        Ok(code) => ExitCode::from(u8::from(code)),
        Err(e) => {
            tracing::error!("Read failed: {:#}", e);
            let misconfigured = e
                .downcast_ref::<fs_core::Error>()
                .is_some_and(|e| e.is_misconfiguration());
            ExitCode::from(if misconfigured {
                EXIT_MISCONFIGURED
            } else {
                EXIT_FAILED
            })
        }
    }
}

async fn run(args: Args) -> anyhow::Result<ReadCode> {
    let config = ManagerConfig::from_file(&args.config).await?;
    let manager = FileSystemManager::new(config);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let mut request = ReadRequest::new(args.path.as_str()).with_cancellation(cancel);
    if let Some(since) = args.if_newer_than {
        request = request.check_cache(move |stat| stat.mtime() <= since);
    }

    let result = manager.read(&args.connection, request).await?;
    let code = result.code();

    match result.into_stream() {
        Some(mut stream) => {
            let mut stdout = tokio::io::stdout();
            while let Some(chunk) = stream.next().await {
                stdout.write_all(&chunk?).await?;
            }
            stdout.flush().await?;
        }
        None => eprintln!("{}", code),
    }
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_positional() {
        let parsed = Args::parse(args(&["fs.json", "docs", "report.pdf"])).unwrap();
        assert_eq!(parsed.config, PathBuf::from("fs.json"));
        assert_eq!(parsed.connection, "docs");
        assert_eq!(parsed.path, "report.pdf");
        assert!(parsed.if_newer_than.is_none());
    }

    #[test]
    fn test_parse_if_newer_than() {
        let parsed = Args::parse(args(&[
            "fs.json",
            "--if-newer-than",
            "2024-03-01T12:00:00+02:00",
            "docs",
            "report.pdf",
        ]))
        .unwrap();
        let since = parsed.if_newer_than.unwrap();
        assert_eq!(since.to_rfc3339(), "2024-03-01T10:00:00+00:00");
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(Args::parse(args(&["fs.json", "docs"])).is_err());
        assert!(Args::parse(args(&["fs.json", "docs", "a", "b"])).is_err());
        assert!(Args::parse(args(&["fs.json", "docs", "a", "--verbose"])).is_err());
        assert!(Args::parse(args(&["fs.json", "docs", "a", "--if-newer-than"])).is_err());
        assert!(
            Args::parse(args(&["fs.json", "docs", "a", "--if-newer-than", "yesterday"])).is_err()
        );
    }
}
