use std::time::Duration;

use adsprims_client::{ClientEvent, SubscriptionSettings};
use tokio::sync::mpsc;
use tracing::info;

use crate::cmd::{connect, ConnectionArgs, WatchArgs};
use crate::exit::{client_error, CliError, CliResult, SUCCESS, TRANSPORT_ERROR, USAGE};
use crate::output::{print_sample, OutputFormat};

pub async fn run(args: WatchArgs, conn: &ConnectionArgs, format: OutputFormat) -> CliResult<i32> {
    if args.cycle_ms == 0 {
        return Err(CliError::new(USAGE, "--cycle-ms must be greater than zero"));
    }
    let settings = SubscriptionSettings {
        cycle_time: Duration::from_millis(args.cycle_ms),
        send_on_change: args.on_change,
        ..SubscriptionSettings::default()
    };

    let client = connect(conn).await?;
    let mut events = client.events();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let subscribed = client
        .subscribe(&args.path, settings, move |sample| {
            let _ = tx.send(sample);
        })
        .await;
    if let Err(err) = subscribed {
        client.disconnect().await;
        return Err(client_error(&format!("subscribe {} failed", args.path), err));
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut printed = 0usize;

    let outcome = loop {
        tokio::select! {
            sample = rx.recv() => {
                let Some(sample) = sample else { break Ok(SUCCESS) };
                print_sample(&args.path, &sample, format);
                printed = printed.saturating_add(1);
                if args.count.is_some_and(|count| printed >= count) {
                    break Ok(SUCCESS);
                }
            }
            event = events.recv() => {
                if let Ok(ClientEvent::ConnectionLost { reason }) = event {
                    break Err(CliError::new(TRANSPORT_ERROR, format!("connection lost: {reason}")));
                }
            }
            _ = &mut ctrl_c => {
                info!(samples = printed, "interrupted");
                break Ok(SUCCESS);
            }
        }
    };

    // Deletes the device notification as well.
    client.disconnect().await;
    outcome
}
