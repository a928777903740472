//! Stderr logging for the tokentally commands.

use stderrlog::LogLevelNum;

/// How loud a subcommand is before any `-v` flags.
///
/// `count` runs locally and only surfaces warnings; the probe-driven
/// commands narrate their batteries at info, since a calibration run can
/// spend minutes talking to the API with nothing else to show.
#[derive(Debug, Clone, Copy)]
pub enum Verbosity {
    /// Warnings and errors only.
    Warnings,

    /// Progress at info, plus warnings and errors.
    Progress,
}

/// Logging options shared by every subcommand.
#[derive(clap::Args, Debug)]
pub struct LogArgs {
    /// Log more (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log errors only.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl LogArgs {
    /// Install the stderr logger at the command's baseline, raised one
    /// step per `-v` flag.
    pub fn init(
        &self,
        baseline: Verbosity,
    ) -> anyhow::Result<()> {
        let base = match baseline {
            Verbosity::Warnings => 2,
            Verbosity::Progress => 3,
        };

        let level = if self.quiet {
            LogLevelNum::Error
        } else {
            match base + self.verbose as usize {
                0 | 1 => LogLevelNum::Error,
                2 => LogLevelNum::Warn,
                3 => LogLevelNum::Info,
                4 => LogLevelNum::Debug,
                _ => LogLevelNum::Trace,
            }
        };

        stderrlog::new().verbosity(level).init()?;
        Ok(())
    }
}
