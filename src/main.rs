//! # elizette
//!
//! Command-line front end for the ELIZA engine.
//!
//! ```bash
//! # Interactive chat with the built-in DOCTOR script
//! elizette chat
//!
//! # One-shot reply
//! elizette ask "I am very sad today"
//!
//! # Dump the rule table as a JSON tree for visualization tooling
//! elizette tree
//!
//! # Use a custom script
//! elizette --script my_script.toml chat
//! ```

use anyhow::Result;
use clap::Parser;
use elizette::{Script, rule_tree};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about = "Classic ELIZA pattern-matching chatbot", long_about = None)]
struct Args {
    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Path to a TOML script (defaults to the built-in DOCTOR script)
    #[arg(long)]
    script: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Run interactive chat TUI
    Chat,
    /// Reply to a single utterance and exit
    Ask {
        /// The utterance (joined with spaces if given as multiple words)
        text: Vec<String>,
    },
    /// Print the rule table as a JSON tree
    Tree,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing to stderr
    let env_filter = if args.debug {
        EnvFilter::new("elizette=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("elizette=info"))
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .init();

    let script = match &args.script {
        Some(path) => Script::from_path(path)?,
        None => Script::builtin(),
    };

    match args.command {
        Command::Chat => elizette::chat::run(&script)?,
        Command::Ask { text } => {
            let input = text.join(" ");
            println!("{}", script.table.reply(&input));
        }
        Command::Tree => {
            println!("{}", serde_json::to_string_pretty(&rule_tree(&script.table))?);
        }
    }

    Ok(())
}
