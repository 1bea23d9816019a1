//! Foreground follow loop shared by `start` and `attach`.
//!
//! Prints server output, lifecycle changes, restart notices and remote
//! console events until Ctrl-C, the restart policy gives up, or a run ends
//! with restarts disabled.

use anyhow::Result;
use skald_core::ProcessState;
use skald_rcon::{RconEvent, RconSession};
use skald_runtime::{ProcessEvent, Watchdog, WatchdogEvent};
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use crate::bootstrap::CliContext;
use crate::presentation::format_entry;

/// What the loop should do after an event.
enum Flow {
    Continue,
    Finished,
}

/// Follow the supervised server. On exit a detached server is left
/// running and an attached one is stopped.
pub async fn run(ctx: &CliContext, watchdog: &Watchdog, detached: bool) -> Result<()> {
    let restarts = watchdog.policy().enabled;
    let session = RconSession::start(ctx.settings().rcon.clone(), watchdog.state_receiver());

    let mut process_events = watchdog.subscribe_process();
    let mut notices = watchdog.subscribe();
    let mut rcon_events = session.subscribe();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        let flow = tokio::select! {
            _ = &mut ctrl_c => {
                println!();
                Flow::Finished
            }
            event = process_events.recv() => match event {
                Ok(event) => on_process_event(&event, restarts),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped = %skipped, "Output display fell behind");
                    Flow::Continue
                }
                Err(RecvError::Closed) => Flow::Finished,
            },
            notice = notices.recv() => match notice {
                Ok(notice) => on_watchdog_event(&notice),
                Err(RecvError::Lagged(_)) => Flow::Continue,
                Err(RecvError::Closed) => Flow::Finished,
            },
            event = rcon_events.recv() => {
                if let Ok(event) = event {
                    on_rcon_event(&event);
                }
                Flow::Continue
            }
        };

        if matches!(flow, Flow::Finished) {
            break;
        }
    }

    session.shutdown().await;

    if !watchdog.state().is_active() {
        return Ok(());
    }
    if detached {
        watchdog.detach().await?;
        println!("Detached. The server keeps running; use `skald attach` or `skald stop`.");
    } else {
        println!("Stopping server...");
        watchdog.stop().await?;
        println!("Server stopped.");
    }
    Ok(())
}

fn on_process_event(event: &ProcessEvent, restarts: bool) -> Flow {
    match event {
        ProcessEvent::Log(entry) => println!("{}", format_entry(entry)),
        ProcessEvent::StateChanged { to, .. } => {
            println!("== server {to}");
            if *to == ProcessState::Crashed && !restarts {
                return Flow::Finished;
            }
        }
        ProcessEvent::PlayerJoined { name } => println!("== {name} joined"),
        ProcessEvent::PlayerLeft { name } => println!("== {name} left"),
        ProcessEvent::Fatal { message } => eprintln!("!! {message}"),
        ProcessEvent::Exited { .. } | ProcessEvent::Server(_) => {}
    }
    Flow::Continue
}

fn on_watchdog_event(event: &WatchdogEvent) -> Flow {
    match event {
        WatchdogEvent::Restarting {
            attempt,
            max_restarts,
            delay,
        } => println!(
            "== restarting in {}s (attempt {attempt}/{max_restarts})",
            delay.as_secs()
        ),
        WatchdogEvent::Restarted { attempt, pid } => {
            println!("== restarted (attempt {attempt}, pid {pid})");
        }
        WatchdogEvent::RestartFailed { attempt, error } => {
            eprintln!("!! restart attempt {attempt} failed: {error}");
        }
        WatchdogEvent::MaxRestartsExceeded {
            crashes,
            max_restarts,
        } => {
            eprintln!(
                "!! server crashed {crashes} times, giving up after {max_restarts} restarts"
            );
            return Flow::Finished;
        }
    }
    Flow::Continue
}

fn on_rcon_event(event: &RconEvent) {
    match event {
        RconEvent::Connected => println!("== remote console connected"),
        RconEvent::Disconnected { reason } => println!("== remote console disconnected ({reason})"),
        RconEvent::Reconnecting { attempt, delay } => println!(
            "== remote console reconnecting in {}ms (attempt {attempt})",
            delay.as_millis()
        ),
        RconEvent::AuthFailed => eprintln!("!! remote console rejected the password"),
        RconEvent::PlayerJoined { name } => println!("== {name} is online"),
        RconEvent::PlayerLeft { name } => println!("== {name} went offline"),
    }
}
