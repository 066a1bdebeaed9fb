//! CLI enum types for the convert command.

use clap::ValueEnum;
use recast_core::ReportFormat;

/// Supported report formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormatArg {
    /// Single JSON array
    Json,
    /// One JSON object per line (newline-delimited)
    Jsonl,
}

impl From<ReportFormatArg> for ReportFormat {
    fn from(arg: ReportFormatArg) -> Self {
        match arg {
            ReportFormatArg::Json => ReportFormat::Json,
            ReportFormatArg::Jsonl => ReportFormat::JsonLines,
        }
    }
}

impl std::fmt::Display for ReportFormatArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportFormatArg::Json => write!(f, "json"),
            ReportFormatArg::Jsonl => write!(f, "jsonl"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maps_to_core_format() {
        assert_eq!(ReportFormat::from(ReportFormatArg::Json), ReportFormat::Json);
        assert_eq!(
            ReportFormat::from(ReportFormatArg::Jsonl),
            ReportFormat::JsonLines
        );
    }

    #[test]
    fn test_display_round_trips_through_core_parser() {
        for arg in [ReportFormatArg::Json, ReportFormatArg::Jsonl] {
            assert_eq!(ReportFormat::parse(&arg.to_string()), Some(arg.into()));
        }
    }
}
