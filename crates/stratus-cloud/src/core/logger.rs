/// Logging facilities to record simulation activity.
use std::fs::File;
use std::io;

use log::Level;
use serde::Serialize;

use stratus_core::SimulationContext;
use stratus_core::{log_debug, log_error, log_info, log_trace, log_warn};

pub trait Logger {
    fn log(&mut self, ctx: &SimulationContext, level: Level, message: String);

    fn log_error(&mut self, ctx: &SimulationContext, message: String) {
        self.log(ctx, Level::Error, message);
    }

    fn log_warn(&mut self, ctx: &SimulationContext, message: String) {
        self.log(ctx, Level::Warn, message);
    }

    fn log_info(&mut self, ctx: &SimulationContext, message: String) {
        self.log(ctx, Level::Info, message);
    }

    fn log_debug(&mut self, ctx: &SimulationContext, message: String) {
        self.log(ctx, Level::Debug, message);
    }

    fn log_trace(&mut self, ctx: &SimulationContext, message: String) {
        self.log(ctx, Level::Trace, message);
    }

    fn save_log(&self, _path: &str) -> Result<(), io::Error> {
        Ok(())
    }
}

/// Prints log records to stdout via the crate-level log macros.
#[derive(Default)]
pub struct StdoutLogger {}

impl StdoutLogger {
    pub fn new() -> Self {
        Self {}
    }
}

impl Logger for StdoutLogger {
    fn log(&mut self, ctx: &SimulationContext, level: Level, message: String) {
        match level {
            Level::Error => log_error!(ctx, message),
            Level::Warn => log_warn!(ctx, message),
            Level::Info => log_info!(ctx, message),
            Level::Debug => log_debug!(ctx, message),
            Level::Trace => log_trace!(ctx, message),
        }
    }
}

#[derive(Serialize)]
struct LogRecord {
    timestamp: f64,
    component: String,
    level: String,
    message: String,
}

/// Collects log records in memory and saves them to a CSV file on demand.
pub struct FileLogger {
    records: Vec<LogRecord>,
    level: Level,
}

impl Default for FileLogger {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            level: Level::Info,
        }
    }
}

impl FileLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(level: Level) -> Self {
        Self {
            records: Vec::new(),
            level,
        }
    }
}

impl Logger for FileLogger {
    fn log(&mut self, ctx: &SimulationContext, level: Level, message: String) {
        if self.level < level {
            return;
        }
        self.records.push(LogRecord {
            timestamp: ctx.time(),
            component: ctx.name().to_string(),
            level: level.to_string(),
            message,
        });
    }

    fn save_log(&self, path: &str) -> Result<(), io::Error> {
        let file = File::create(path)?;
        let mut wtr = csv::Writer::from_writer(file);
        for record in &self.records {
            wtr.serialize(record)?;
        }
        wtr.flush()?;
        Ok(())
    }
}
