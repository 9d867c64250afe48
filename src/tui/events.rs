use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind};
use log::error;

/// Terminal event delivered to the app
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Event {
    /// A key was pressed
    Input(KeyEvent),
    /// The terminal was resized
    Resize,
    /// The tick rate elapsed without input
    Tick,
}

/// Terminal events handler
pub struct Events {
    /// Event receiver channel
    rx: mpsc::Receiver<Event>,
}

impl Events {
    /// Constructs a new instance of Events with the specified tick rate
    pub fn new(tick_rate: Duration) -> Self {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let mut last_tick = Instant::now();
            loop {
                let timeout = tick_rate
                    .checked_sub(last_tick.elapsed())
                    .unwrap_or_else(|| Duration::from_secs(0));

                match event::poll(timeout) {
                    Ok(true) => {
                        let event = match event::read() {
                            Ok(CrosstermEvent::Key(key)) if key.kind != KeyEventKind::Release => Event::Input(key),
                            Ok(CrosstermEvent::Resize(..)) => Event::Resize,
                            Ok(_) => continue,
                            Err(e) => {
                                error!("Failed to read terminal event: {}", e);
                                break;
                            }
                        };
                        if tx.send(event).is_err() {
                            break;
                        }
                    }
                    Ok(false) => {}
                    Err(e) => {
                        error!("Failed to poll terminal events: {}", e);
                        break;
                    }
                }

                if last_tick.elapsed() >= tick_rate {
                    if tx.send(Event::Tick).is_err() {
                        break;
                    }
                    last_tick = Instant::now();
                }
            }
        });

        Self { rx }
    }

    /// Attempts to read an event
    pub fn next(&self) -> Result<Event, mpsc::RecvError> {
        self.rx.recv()
    }
}
