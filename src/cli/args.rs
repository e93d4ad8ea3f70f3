//! CLI argument parsing using clap.

use clap::{
    Parser,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

const AFTER_HELP: &str = "\
Files whose extension is tracked (.asciidoc, .adoc, .asc by default) are not copied;
the compiler regenerates their output from the entry file after every change.

Settings are read from .docmirror.toml (or $DOCMIRROR_CONFIG) and DOCMIRROR_* variables.";

/// Mirror a document tree into an output directory and rebuild on change.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(
    name = "docmirror",
    version,
    about,
    styles = clap_cargo_style(),
    after_help = AFTER_HELP
)]
pub struct Cli {
    /// Directory to watch
    #[arg(value_name = "WATCH_PATH")]
    pub watch_path: PathBuf,

    /// Directory receiving the mirror and the generated output
    #[arg(value_name = "OUTPUT_PATH")]
    pub output_path: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_two_positionals() {
        let cli = Cli::try_parse_from(["docmirror", "docs", "public"]).unwrap();
        assert_eq!(cli.watch_path, PathBuf::from("docs"));
        assert_eq!(cli.output_path, PathBuf::from("public"));
    }

    #[test]
    fn test_missing_or_extra_arguments_are_rejected() {
        assert!(Cli::try_parse_from(["docmirror"]).is_err());
        assert!(Cli::try_parse_from(["docmirror", "docs"]).is_err());
        assert!(Cli::try_parse_from(["docmirror", "docs", "public", "extra"]).is_err());
        assert!(Cli::try_parse_from(["docmirror", "--watch", "docs", "public"]).is_err());
    }
}
