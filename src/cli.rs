use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use colored::Colorize;
use greetings_ffi::{Greetings, GreetingsError, LoaderConfig, Person, ReleaseSnapshot, configure};
use tracing::debug;

use crate::utils::logger;

#[derive(Parser, Debug)]
#[command(name = "greetings", version, about = "Drive the native greetings library")]
pub struct GreetingsCli {
    #[arg(long, global = true, value_name = "PATH")]
    /// Load the library from this exact file instead of searching for it.
    library: Option<PathBuf>,

    #[arg(long = "search-dir", global = true, value_name = "DIR")]
    /// Extra directory to search for the library; may be repeated.
    search_dirs: Vec<PathBuf>,

    #[cfg(feature = "toml-config")]
    #[arg(long, global = true, value_name = "FILE")]
    /// Read loader settings from a TOML file before applying flags.
    config: Option<PathBuf>,

    #[arg(long, global = true)]
    /// Print acquire/release counters after the command.
    metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Has the library print a greeting to its own stdout.
    Print {
        #[arg(default_value = "World")]
        name: String,
    },
    /// Renders a greeting for a name.
    Render { name: String },
    /// Greets a person by first and last name.
    Greet { first: String, last: String },
    /// Fetches a greeting returned by value.
    Value,
    /// Fetches a greeting returned by reference and releases it.
    Reference,
    /// Renders the default greeting set and releases it.
    Set,
    /// Renders numbered greetings concurrently inside the library.
    Parallel {
        name: String,
        #[arg(short, long, default_value_t = 4)]
        count: usize,
    },
    /// Lets the library call back with a greeting.
    Callback,
    /// Lets the library call back with a greeting set.
    Send,
}

impl GreetingsCli {
    pub fn command(&self) -> &Command {
        &self.command
    }

    /// Environment defaults, then the config file if any, then flags.
    pub fn loader_config(&self) -> Result<LoaderConfig> {
        #[cfg(feature = "toml-config")]
        let mut config = match &self.config {
            Some(path) => LoaderConfig::from_toml_file(path)
                .with_context(|| format!("failed to read loader config {}", path.display()))?,
            None => LoaderConfig::from_env(),
        };
        #[cfg(not(feature = "toml-config"))]
        let mut config = LoaderConfig::from_env();

        if let Some(path) = &self.library {
            config = config.with_library_path(path);
        }
        for dir in &self.search_dirs {
            config = config.with_search_dir(dir);
        }
        Ok(config)
    }
}

pub fn run() -> Result<()> {
    logger::init_logging();
    let cli = GreetingsCli::parse();

    configure(cli.loader_config()?)?;
    let greetings = Greetings::global().context("native greetings library is unavailable")?;
    if let Some(path) = greetings.library_path() {
        debug!(library = %path.display(), "using native library");
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    execute(greetings, cli.command(), &mut out)?;

    let metrics = greetings.metrics();
    if cli.metrics {
        print_metrics(&metrics, &mut out)?;
    }
    ensure_balanced(&metrics)
}

/// Runs one command, writing what it produces to `out`.
pub fn execute(greetings: &Greetings, command: &Command, out: &mut dyn Write) -> Result<()> {
    match command {
        Command::Print { name } => greetings.print_greeting(name)?,
        Command::Render { name } => writeln!(out, "{}", greetings.render_greeting(name)?)?,
        Command::Greet { first, last } => {
            let person = Person::new(first.as_str(), last.as_str());
            writeln!(out, "{}", greetings.greet(&person)?)?;
        }
        Command::Value => writeln!(out, "{}", greetings.greeting_by_value()?.text())?,
        Command::Reference => {
            let text = greetings.with_greeting_by_reference(|greeting| greeting.text())??;
            writeln!(out, "{text}")?;
        }
        Command::Set => {
            let texts = greetings.with_greeting_set(|set| set.texts())??;
            print_numbered(&texts, out)?;
        }
        Command::Parallel { name, count } => {
            let set = greetings.render_greetings_in_parallel(*count, name)?;
            let texts = set.texts()?;
            set.release();
            print_numbered(&texts, out)?;
        }
        Command::Callback => {
            greetings.call_me_back(|text| {
                writeln!(out, "{} {text}", "callback".cyan().bold())?;
                Ok::<_, io::Error>(())
            })?;
        }
        Command::Send => {
            let mut received = Vec::new();
            greetings.send_greetings(|set| {
                received.extend(set.texts()?);
                Ok::<_, GreetingsError>(())
            })?;
            for text in received {
                writeln!(out, "{} {text}", "received".cyan().bold())?;
            }
        }
    }
    Ok(())
}

/// Fails if any native record was acquired without being released.
pub fn ensure_balanced(metrics: &ReleaseSnapshot) -> Result<()> {
    if !metrics.is_balanced() {
        bail!(
            "{} native record(s) were not released: {metrics:?}",
            metrics.outstanding()
        );
    }
    Ok(())
}

fn print_numbered(texts: &[String], out: &mut dyn Write) -> io::Result<()> {
    for (index, text) in texts.iter().enumerate() {
        writeln!(out, "{} {text}", format!("{:>3}.", index + 1).as_str().dimmed())?;
    }
    Ok(())
}

fn print_metrics(metrics: &ReleaseSnapshot, out: &mut dyn Write) -> io::Result<()> {
    writeln!(out, "{}", "[Release]".bold())?;
    let rows = [
        ("Greetings", metrics.greetings_acquired, metrics.greetings_released),
        ("Sets", metrics.sets_acquired, metrics.sets_released),
        ("Texts", metrics.texts_acquired, metrics.texts_released),
    ];
    for (name, acquired, released) in rows {
        writeln!(out, "{name:>16}: {acquired} acquired, {released} released")?;
    }
    let status = if metrics.is_balanced() {
        "balanced".green()
    } else {
        "unbalanced".red()
    };
    writeln!(out, "{:>16}: {status}", "Status")
}
