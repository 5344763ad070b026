// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line interface.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use spoolgate_core::Orientation;

#[derive(Parser, Debug)]
#[command(name = "spoolgate")]
#[command(about = "Fetch documents and dispatch them to a CUPS printer.")]
pub struct CommandLine {
    /// TOML configuration file (defaults and SPOOLGATE_* env vars apply)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Consume print jobs from the message stream until interrupted
    #[command(alias = "r")]
    Run,
    /// Print a single document and exit
    #[command(alias = "p")]
    Print {
        /// URL or local path of the document
        #[arg(default_value = "ToBePrinted/info-1.pdf")]
        source: String,
        /// Number of copies
        #[arg(short = 'n', long, default_value_t = 1)]
        quantity: u32,
        /// Print on both sides (long edge)
        #[arg(short, long)]
        double_sided: bool,
        /// Print in color instead of grayscale
        #[arg(long)]
        color: bool,
        /// Page orientation
        #[arg(long, value_enum, default_value_t = Position::Portrait)]
        position: Position,
    },
    /// List the printers the spooler currently knows
    Printers,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Position {
    Portrait,
    Landscape,
}

impl From<Position> for Orientation {
    fn from(position: Position) -> Self {
        match position {
            Position::Portrait => Orientation::Portrait,
            Position::Landscape => Orientation::Landscape,
        }
    }
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_line_is_well_formed() {
        CommandLine::command().debug_assert();
    }

    #[test]
    fn print_defaults_match_the_example_job() {
        let cli = CommandLine::try_parse_from(["spoolgate", "print"]).unwrap();
        match cli.command {
            Commands::Print {
                source,
                quantity,
                double_sided,
                color,
                position,
            } => {
                assert_eq!(source, "ToBePrinted/info-1.pdf");
                assert_eq!(quantity, 1);
                assert!(!double_sided);
                assert!(!color);
                assert_eq!(position, Position::Portrait);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn print_accepts_landscape_and_config() {
        let cli = CommandLine::try_parse_from([
            "spoolgate",
            "print",
            "https://x/doc.pdf",
            "-n",
            "2",
            "--double-sided",
            "--position",
            "landscape",
            "--config",
            "/etc/spoolgate.toml",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/etc/spoolgate.toml")));
        assert!(matches!(
            cli.command,
            Commands::Print {
                quantity: 2,
                double_sided: true,
                position: Position::Landscape,
                ..
            }
        ));
    }
}
