//! `maintwatch dashboard`: watch a running server.

use std::sync::Arc;

use maintwatch_core::{Clock, MonitorConfig, SystemClock};

use crate::dashboard::{DashboardClient, DashboardState};

pub fn run(config: &MonitorConfig, url: &str, plain: bool) {
    super::ensure_valid(config);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let client = DashboardClient::new(url, config.request_timeout(), config.window(), clock);

    if plain {
        println!(
            "Polling {} every {}ms (Ctrl+C to stop)",
            client.base_url(),
            config.sample_interval_ms
        );
        let mut state = DashboardState::new(config.history_len);
        loop {
            state.apply(client.tick());
            println!("{}", state.plain_line());
            std::thread::sleep(config.sample_interval());
        }
    }

    let mut app = crate::tui::app::App::new(client, config.sample_interval(), config.history_len);
    if let Err(e) = app.run() {
        super::fail("dashboard", e);
    }
}
