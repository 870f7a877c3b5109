//! Configuration and CLI argument handling

use clap::Parser;

use crate::engine::ClockStrategy;
use crate::error::TimerError;
use crate::state::DurationSetting;

/// CLI argument parsing structure
#[derive(Parser, Debug)]
#[command(name = "tomato-timer")]
#[command(about = "A state-managed countdown timer engine with an HTTP control surface")]
#[command(version = "0.1.0")]
pub struct Config {
    /// Port to bind the server to
    #[arg(short, long, default_value = "20625")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Default session length, minutes part (0-59)
    #[arg(short, long, default_value = "25")]
    pub minutes: u8,

    /// Default session length, seconds part (0-59)
    #[arg(short, long, default_value = "0")]
    pub seconds: u8,

    /// Clock source strategy
    #[arg(long, value_enum, default_value = "wall-clock")]
    pub clock: ClockStrategy,

    /// Raise a desktop notification when a session completes
    #[arg(short, long)]
    pub notify: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    /// Validated default session duration.
    pub fn default_duration(&self) -> Result<DurationSetting, TimerError> {
        DurationSetting::new(self.minutes, self.seconds)
    }
}
