use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracker_app::{parse_command, render, AppConfig, Cli, Command, HELP};
use tracker_core::Msg;
use tracker_engine::{BatchMonitor, ReqwestSnapshotApi, WsConnector};
use tracker_logging::{tracker_info, tracker_warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    cli.apply(&mut config);
    tracker_logging::initialize(&config.log_destination(), config.log_level()?);

    let settings = config.monitor_settings()?;
    let connector = Arc::new(WsConnector::new(
        settings.connection.endpoint.clone(),
        settings.connection.bearer_token.clone(),
        settings.connection.connect_timeout,
    ));
    let api = Arc::new(
        ReqwestSnapshotApi::new(settings.api.clone()).context("building the http client")?,
    );
    tracker_info!(
        "tracking batch {} via {}",
        cli.batch_id,
        settings.connection.endpoint
    );

    let monitor = BatchMonitor::start(connector, api, &settings);
    monitor.send(Msg::OpenBatch {
        batch_id: cli.batch_id.clone(),
    });
    for job_id in &cli.watch {
        monitor.send(Msg::WatchJob(job_id.clone()));
    }

    let result = run_terminal(&monitor).await;
    monitor.shutdown().await;
    result
}

async fn run_terminal(monitor: &BatchMonitor) -> anyhow::Result<()> {
    let mut view = monitor.view();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            changed = view.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = view.borrow_and_update().clone();
                let mut screen = render(&current, &chrono::Local::now()).join("\n");
                screen.push_str("\n\n");
                stdout.write_all(screen.as_bytes()).await?;
                stdout.flush().await?;
            }
            line = lines.next_line() => {
                let Some(line) = line.context("reading stdin")? else {
                    break;
                };
                match parse_command(&line) {
                    Ok(Some(Command::Send(msg))) => monitor.send(msg),
                    Ok(Some(Command::Help)) => {
                        stdout.write_all(format!("{HELP}\n").as_bytes()).await?;
                    }
                    Ok(Some(Command::Quit)) => break,
                    Ok(None) => {}
                    Err(err) => {
                        tracker_warn!("rejected input: {}", err);
                        stdout.write_all(format!("{err}\n").as_bytes()).await?;
                    }
                }
            }
        }
    }
    Ok(())
}
