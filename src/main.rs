mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use nbgrade::ConvertOptions;
use std::num::NonZeroUsize;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Convert {
            path,
            num_questions,
            pages_per_question,
            output,
            solution,
            all_cells,
            show_input,
            no_preamble,
            marker,
            zoom,
            on_overflow,
            split_dir,
            strict,
        } => {
            let options = ConvertOptions {
                num_questions: num_questions.map(NonZeroUsize::get),
                budget: commands::convert::budget(pages_per_question)?,
                output,
                solution,
                all_cells,
                hide_code_input: !show_input,
                preamble: !no_preamble,
                marker: marker.parse()?,
                zoom,
                on_overflow,
                split_dir,
                strict,
            };
            commands::convert::run(&path, &options)?;
        }
        Commands::Inspect { path } => {
            commands::inspect::run(&path)?;
        }
    }

    Ok(())
}
