//! Headless activity feed: follows the store and prints what changed since
//! the previous wake-up, oldest first.

use chrono::{DateTime, Local, Utc};
use rainguard_core::pipeline_ipc::WeatherUpdatePayload;
use rainguard_core::{ActivityEntry, DashboardState, Severity, StatusClass};
use std::fmt;
use std::io::{self, Write};
use tokio::sync::watch;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DroughtLevel {
    High,
    Medium,
    Low,
}

impl DroughtLevel {
    pub fn from_probability(probability: f64) -> Self {
        if probability > 0.70 {
            DroughtLevel::High
        } else if probability > 0.40 {
            DroughtLevel::Medium
        } else {
            DroughtLevel::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DroughtLevel::High => "high",
            DroughtLevel::Medium => "medium",
            DroughtLevel::Low => "low",
        }
    }
}

impl fmt::Display for DroughtLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn format_age(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - timestamp).num_seconds();
    if secs < 60 {
        "just now".to_string()
    } else if secs < 3600 {
        format!("{}m ago", secs / 60)
    } else if secs < 86_400 {
        format!("{}h ago", secs / 3600)
    } else {
        timestamp.with_timezone(&Local).format("%H:%M:%S").to_string()
    }
}

pub fn format_entry(entry: &ActivityEntry, now: DateTime<Utc>) -> String {
    format!(
        "{:>9} [{}] {}: {}",
        format_age(entry.timestamp, now),
        entry.severity,
        entry.title,
        entry.message
    )
}

pub fn format_weather(reading: &WeatherUpdatePayload) -> String {
    let level = DroughtLevel::from_probability(reading.drought_probability);
    let mut line = format!(
        "  weather {}: drought {:.1}% ({level})",
        reading.region,
        reading.drought_probability * 100.0
    );
    if let Some(rainfall) = reading.rainfall {
        line.push_str(&format!(", rainfall {rainfall:.1}mm"));
    }
    if let Some(temperature) = reading.temperature {
        line.push_str(&format!(", {temperature:.1}°C"));
    }
    line
}

fn format_status(state: &DashboardState) -> String {
    let stats = state.stats();
    let mut per_stage = [0usize; 5];
    for view in state.claims() {
        per_stage[usize::from(view.stage.ordinal() - 1)] += 1;
    }
    let open = state.claims().filter(|view| !view.stage.is_terminal()).count();
    format!(
        "== {} | farmers {} | regions {} | active claims {} | open {} | stages {:?} | disbursed {:.2}",
        state.status().text,
        stats.total_farmers,
        stats.total_regions,
        stats.active_claims,
        open,
        per_stage,
        stats.total_disbursed
    )
}

/// Remembers how far the printer has read into the state.
#[derive(Debug, Default)]
pub struct FeedCursor {
    last_seq: u64,
    last_status: Option<StatusClass>,
    last_weather: u64,
    severities: Vec<Severity>,
}

impl FeedCursor {
    /// An empty severity list prints everything.
    pub fn new(severities: Vec<Severity>) -> Self {
        Self {
            severities,
            ..Self::default()
        }
    }

    fn wants(&self, severity: Severity) -> bool {
        self.severities.is_empty() || self.severities.contains(&severity)
    }

    /// Lines for everything that appeared since the previous call.
    pub fn advance(&mut self, state: &DashboardState, now: DateTime<Utc>) -> Vec<String> {
        let mut lines = Vec::new();

        let class = state.status().class;
        if self.last_status != Some(class) {
            self.last_status = Some(class);
            lines.push(format_status(state));
        }

        let fresh: Vec<&ActivityEntry> = state
            .activity()
            .iter()
            .take_while(|entry| entry.seq > self.last_seq)
            .collect();
        if let Some(oldest) = fresh.last() {
            let skipped = oldest.seq.saturating_sub(self.last_seq + 1);
            if skipped > 0 && self.last_seq > 0 {
                lines.push(format!("  ... {skipped} older entries rotated out"));
            }
        }
        for entry in fresh.iter().rev() {
            if self.wants(entry.severity) {
                lines.push(format_entry(entry, now));
            }
        }
        if let Some(newest) = fresh.first() {
            self.last_seq = newest.seq;
        }

        let unseen = state.weather_received().saturating_sub(self.last_weather);
        let unseen = usize::try_from(unseen).unwrap_or(usize::MAX);
        let readings: Vec<&WeatherUpdatePayload> = state.weather().iter().take(unseen).collect();
        for reading in readings.iter().rev() {
            debug!(
                event = "weather_reading",
                region = %reading.region,
                drought_level = %DroughtLevel::from_probability(reading.drought_probability)
            );
            if self.wants(Severity::Info) {
                lines.push(format_weather(reading));
            }
        }
        self.last_weather = state.weather_received();

        lines
    }
}

/// Prints feed lines until the store is dropped.
pub async fn run_feed<W: Write>(
    mut rx: watch::Receiver<DashboardState>,
    severities: Vec<Severity>,
    mut out: W,
) -> io::Result<()> {
    let mut cursor = FeedCursor::new(severities);
    loop {
        let lines = {
            let state = rx.borrow_and_update();
            cursor.advance(&state, Utc::now())
        };
        for line in lines {
            writeln!(out, "{line}")?;
        }
        out.flush()?;
        if rx.changed().await.is_err() {
            return Ok(());
        }
    }
}
