//! `maintwatch record`: record a session of sensor readings.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use maintwatch_core::session::{SessionConfig, SessionWriter};
use maintwatch_core::{Clock, MonitorConfig, SystemClock};

pub struct RecordCommandConfig<'a> {
    pub config: &'a MonitorConfig,
    pub remote: Option<&'a str>,
    pub duration: Option<&'a str>,
    pub tags: &'a [String],
    pub note: Option<&'a str>,
    pub output: Option<PathBuf>,
}

/// Run the record command.
pub fn run(cmd: RecordCommandConfig<'_>) {
    let config = cmd.config;
    super::ensure_valid(config);

    let max_duration = cmd
        .duration
        .map(|d| super::parse_duration(d).unwrap_or_else(|e| super::fail("--duration", e)));
    let interval = config.sample_interval();

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let sampler = super::make_sampler(config, cmd.remote, clock);
    let sampler_name = sampler.name().to_string();

    let session_config = SessionConfig {
        sampler: sampler_name.clone(),
        interval: Some(interval),
        output_dir: cmd.output.unwrap_or_else(|| PathBuf::from("sessions")),
        tags: super::parse_tags(cmd.tags),
        note: cmd.note.map(str::to_string),
        duration: max_duration,
    };

    let mut writer =
        SessionWriter::new(session_config).unwrap_or_else(|e| super::fail("creating session", e));

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    }) {
        super::fail("setting Ctrl+C handler", e);
    }

    println!("Recording session");
    println!("  Sampler:   {sampler_name}");
    match max_duration {
        Some(d) => println!("  Duration:  {}s", d.as_secs()),
        None => println!("  Duration:  until Ctrl+C"),
    }
    println!("  Interval:  {}ms", interval.as_millis());
    println!("  Output:    {}", writer.session_dir().display());
    println!();

    let start = Instant::now();
    let mut failures = 0u64;
    let mut had_write_error = false;

    while running.load(Ordering::SeqCst) {
        if max_duration.is_some_and(|max| start.elapsed() >= max) {
            break;
        }

        match sampler.sample() {
            Ok(reading) if reading.is_finite() => {
                if let Err(e) = writer.write_reading(&reading) {
                    eprintln!("\nError writing reading: {e}");
                    had_write_error = true;
                    break;
                }
            }
            Ok(_) => {
                log::warn!("skipping non-finite reading");
                failures += 1;
            }
            Err(e) => {
                log::warn!("{e}");
                failures += 1;
            }
        }

        print!(
            "\r  Readings: {:<8} Unavailable: {failures:<6} Elapsed: {:.1}s",
            writer.total_readings(),
            start.elapsed().as_secs_f64()
        );
        let _ = std::io::Write::flush(&mut std::io::stdout());

        let deadline = Instant::now() + interval;
        while Instant::now() < deadline && running.load(Ordering::SeqCst) {
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    println!();
    println!();

    if had_write_error {
        eprintln!("Recording stopped due to write error.");
    }

    match writer.finish() {
        Ok(dir) => {
            println!("Session saved to {}", dir.display());
            println!("  session.json  — metadata");
            println!("  readings.csv  — timestamp,vibration,temperature,pressure");
            println!();
            println!("Replay with: maintwatch replay {}", dir.display());
        }
        Err(e) => super::fail("finalizing session", e),
    }
}
