//! Minimal smoke-test binary: engages a [`Screen`], paints a banner and a
//! colored ruler, and echoes decoded input events to the title bar until
//! `Escape` is pressed or the terminal closes the input stream.
use anyhow::Result;
use std::path::Path;
use std::sync::Once;
use std::time::Duration;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use wincon::Screen;
use wincon_events::{Event, KeyCode};
use wincon_style::{AttrMask, Color, Style};

fn configure_logging() -> Option<WorkerGuard> {
    let log_dir = Path::new(".");
    let appender = tracing_appender::rolling::never(log_dir, "wincon-demo.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    match tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(writer)
        .try_init()
    {
        Ok(()) => Some(guard),
        Err(_) => None,
    }
}

/// Logs a panic via `tracing` before chaining to whatever hook was
/// previously installed, so a panic still shows up in `wincon-demo.log` even
/// though the alternate screen swallows stderr.
fn install_panic_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            tracing::error!(target: "runtime.panic", ?info, "panic");
            default_panic(info);
        }));
    });
}

fn paint_banner(screen: &Screen) {
    let (w, _h) = screen.size();
    let title_style = Style::default()
        .with_fg(Color::Rgb(255, 200, 0))
        .with_attrs(AttrMask::BOLD);
    for (i, ch) in "wincon demo — press Escape to quit".chars().enumerate() {
        if i >= w {
            break;
        }
        screen.set_content(i, 0, ch, &[], title_style.clone());
    }
    for x in 0..w {
        let hue = (x * 255 / w.max(1)) as u8;
        let style = Style::default().with_fg(Color::Rgb(hue, 80, 255 - hue));
        screen.set_content(x, 1, '\u{2588}', &[], style);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _log_guard = configure_logging();
    install_panic_hook();
    info!(target: "demo.startup", "starting wincon-demo");

    let screen = Screen::new();
    screen.init()?;
    screen.set_title("wincon demo")?;

    let mut events = screen.event_queue().expect("event queue already taken");
    let mut stop = screen.stop_queue();

    paint_banner(&screen);
    screen.show_cursor(0, 2);
    screen.show()?;

    loop {
        tokio::select! {
            _ = stop.changed() => {
                if *stop.borrow() {
                    break;
                }
            }
            _ = tokio::time::sleep(Duration::from_millis(250)) => {
                // periodic idle tick: nothing to animate, just lets the
                // select! loop notice Ctrl+C / external shutdown promptly
            }
            maybe_event = events.recv() => {
                let Some(event) = maybe_event else {
                    warn!(target: "demo.events", "event channel closed");
                    break;
                };
                match event {
                    Event::Key(k) if k.code == KeyCode::Escape => {
                        info!(target: "demo.events", "escape pressed, shutting down");
                        break;
                    }
                    Event::Resize(r) => {
                        info!(target: "demo.events", width = r.width, height = r.height, "resize");
                        paint_banner(&screen);
                        screen.sync()?;
                    }
                    other => {
                        tracing::debug!(target: "demo.events", ?other, "event");
                    }
                }
            }
        }
    }

    screen.fini()?;
    Ok(())
}
