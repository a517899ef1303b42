//! TUI application state and event loop.
//!
//! Polling runs on a background thread so the UI never blocks on a slow or
//! unreachable server.

use std::io;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};
use std::thread;
use std::time::{Duration, Instant};

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;

use maintwatch_core::Channel;

use crate::dashboard::{DashboardClient, DashboardState};

/// Channel after `channel` in chart order.
pub fn next_channel(channel: Channel) -> Channel {
    match channel {
        Channel::Vibration => Channel::Temperature,
        Channel::Temperature => Channel::Pressure,
        Channel::Pressure => Channel::Vibration,
    }
}

pub struct App {
    client: Arc<DashboardClient>,
    refresh_rate: Duration,
    running: bool,
    paused: bool,
    chart_channel: Channel,
    shared: Arc<Mutex<DashboardState>>,
    collector_flag: Arc<AtomicBool>,
}

impl App {
    pub fn new(client: DashboardClient, refresh_rate: Duration, history_len: usize) -> Self {
        Self {
            client: Arc::new(client),
            refresh_rate,
            running: true,
            paused: false,
            chart_channel: Channel::Vibration,
            shared: Arc::new(Mutex::new(DashboardState::new(history_len))),
            collector_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn run(&mut self) -> io::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        // Restore the terminal before a panic message is printed.
        let original_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let _ = disable_raw_mode();
            let _ = execute!(io::stdout(), LeaveAlternateScreen, crossterm::cursor::Show);
            original_hook(info);
        }));

        let result = self.run_loop(&mut terminal);

        let _ = std::panic::take_hook();
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            crossterm::cursor::Show
        )?;

        result
    }

    fn run_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> io::Result<()> {
        self.kick_collect();
        let mut last_tick = Instant::now();

        while self.running {
            let snapshot = self.snapshot();
            terminal.draw(|f| super::ui::draw(f, self, &snapshot))?;

            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code);
                    }
                }
            }

            if last_tick.elapsed() >= self.refresh_rate {
                if !self.paused {
                    self.kick_collect();
                }
                last_tick = Instant::now();
            }
        }

        Ok(())
    }

    fn handle_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('q') | KeyCode::Esc => self.running = false,
            KeyCode::Char(' ') => self.paused = !self.paused,
            KeyCode::Char('c') => self.chart_channel = next_channel(self.chart_channel),
            KeyCode::Char('r') => self.kick_collect(),
            _ => {}
        }
    }

    /// Start one background poll unless one is already in flight.
    fn kick_collect(&self) {
        if self.collector_flag.swap(true, Ordering::AcqRel) {
            return;
        }
        let client = Arc::clone(&self.client);
        let shared = Arc::clone(&self.shared);
        let flag = Arc::clone(&self.collector_flag);

        thread::spawn(move || {
            let tick = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| client.tick()));
            match tick {
                Ok(tick) => shared.lock().unwrap_or_else(|e| e.into_inner()).apply(tick),
                Err(_) => log::error!("dashboard poll panicked"),
            }
            flag.store(false, Ordering::Release);
        });
    }

    pub fn snapshot(&self) -> DashboardState {
        self.shared
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn base_url(&self) -> &str {
        self.client.base_url()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_collecting(&self) -> bool {
        self.collector_flag.load(Ordering::Relaxed)
    }

    pub fn chart_channel(&self) -> Channel {
        self.chart_channel
    }

    pub fn refresh_rate(&self) -> Duration {
        self.refresh_rate
    }
}
