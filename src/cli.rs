//! Command-line surface.

use clap::Parser;

use crate::config::RunConfig;

/// Build a binary kernel hot-patch object from a base and a patched
/// relocatable object file.
#[derive(Debug, Parser)]
#[command(name = "objpatchdiff", version, about)]
pub struct Cli {
    /// The unmodified object file.
    pub original: String,
    /// The object file built from the changed source.
    pub patched: String,
    /// Where to write the extracted patch object.
    pub output: String,

    /// Raise log verbosity to debug.
    #[arg(long)]
    pub debug: bool,

    /// Also write `<output>.inventory`, a human-readable listing of the
    /// output object's sections and symbols.
    #[arg(long)]
    pub inventory: bool,
}

impl From<Cli> for RunConfig {
    fn from(cli: Cli) -> Self {
        RunConfig::builder()
            .base(cli.original)
            .patched(cli.patched)
            .output(cli.output)
            .verbose(cli.debug)
            .inventory(cli.inventory)
            .build()
    }
}
