mod calibrate;
mod count;
mod measure;
mod select_encoding;

use tokentally::bpe::BpeTokenizer;
use tokentally::encoding::openai::Encoding;

/// Subcommands.
#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Count a prompt locally and print the breakdown.
    Count(count::CountArgs),

    /// Calibrate a model's overhead coefficients against the live API.
    Calibrate(calibrate::CalibrateArgs),

    /// Pick the best-fitting encoding (and content multiplier) for a model.
    SelectEncoding(select_encoding::SelectEncodingArgs),

    /// Measure counting accuracy and update the accuracy report.
    Measure(measure::MeasureArgs),
}

impl Commands {
    /// Run the selected command.
    pub fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        match self {
            Commands::Count(args) => args.run(),
            Commands::Calibrate(args) => args.run(),
            Commands::SelectEncoding(args) => args.run(),
            Commands::Measure(args) => args.run(),
        }
    }
}

/// Build an engine for `encoding`, resolving rank data from the
/// `TOKENTALLY_DATA_DIR` directory.
pub fn load_engine(encoding: Encoding) -> anyhow::Result<BpeTokenizer<u32>> {
    let table = encoding.load_table_from_env::<u32>()?;
    Ok(BpeTokenizer::new(table.into()))
}
