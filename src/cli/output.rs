use clap::ValueEnum;

/// Output format for command results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Tables and plain text
    #[default]
    Human,
    /// One JSON document on stdout
    Json,
}
