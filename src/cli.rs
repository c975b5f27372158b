//! CLI argument parsing and command handlers

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use crate::index::{CancelToken, SymbolIndex};
use crate::matchers::Registry;
use crate::models::IndexConfig;
use crate::server::Server;
use crate::watcher::{self, ChangeHandler, WatchConfig};

/// RubyLens: go-to-definition and find-references for Ruby projects
#[derive(Parser, Debug)]
#[command(
    name = "rbl",
    version,
    about = "A fast go-to-definition and find-references language server for Ruby",
    long_about = "RubyLens indexes a Ruby project with a regex-level scanner and a trigram \
                  text index, then serves textDocument/definition and textDocument/references \
                  over stdio with incremental updates as files change on disk."
)]
pub struct Cli {
    /// Enable verbose logging (can be repeated for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the language server on stdio
    Serve {
        /// Root of the Ruby project (defaults to current directory)
        #[arg(long, value_name = "PATH")]
        root: Option<PathBuf>,
    },

    /// Index a project once and print the discovered symbols
    Scan {
        /// Directory to index (defaults to current directory)
        #[arg(value_name = "PATH", default_value = ".")]
        path: PathBuf,

        /// Emit the full symbol list as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        // stdout belongs to the LSP channel; logs go to stderr
        let log_level = match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
            .init();

        match self.command {
            Command::Serve { root } => handle_serve(root),
            Command::Scan { path, json } => handle_scan(path, json),
        }
    }
}

/// Handle the `serve` subcommand: build, watch, then speak LSP on stdio
fn handle_serve(root: Option<PathBuf>) -> Result<()> {
    let root = match root {
        Some(root) => root,
        None => std::env::current_dir().context("failed to get current directory")?,
    };
    let root = root
        .canonicalize()
        .with_context(|| format!("invalid root path {}", root.display()))?;

    log::info!("rubylens starting, root={}", root.display());

    let index = Arc::new(SymbolIndex::new(
        &root,
        Registry::with_defaults(),
        IndexConfig::default(),
    ));
    index.build(&CancelToken::new())?;

    // Incremental updates: removals apply before changed-file updates, and
    // a failed update just waits for the next event
    let watch_index = Arc::clone(&index);
    let watch_root = root.clone();
    std::thread::spawn(move || {
        let index = Arc::clone(&watch_index);
        let handler: ChangeHandler = Box::new(move |changed, removed| {
            for path in removed {
                index.remove_file(path);
            }
            for path in changed {
                if let Err(e) = index.update_file(path) {
                    log::warn!("failed to update {}: {}", path.display(), e);
                }
            }
        });

        if let Err(e) = watcher::watch(&watch_root, WatchConfig::default(), handler) {
            log::error!("file watcher stopped: {}", e);
        }
    });

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut server = Server::new(index);
    server.run(stdin.lock(), stdout.lock())
}

/// Handle the `scan` subcommand
fn handle_scan(path: PathBuf, json: bool) -> Result<()> {
    let root = path
        .canonicalize()
        .with_context(|| format!("invalid path {}", path.display()))?;

    let index = SymbolIndex::new(
        &root,
        Registry::with_defaults(),
        IndexConfig::default(),
    );
    index.build(&CancelToken::new())?;

    let symbols = index.all_symbols();

    if json {
        println!("{}", serde_json::to_string_pretty(&symbols)?);
        return Ok(());
    }

    let mut by_kind: BTreeMap<String, usize> = BTreeMap::new();
    for sym in &symbols {
        *by_kind.entry(sym.kind.to_string()).or_default() += 1;
    }

    println!("Indexed {} symbols in {}", symbols.len(), root.display());
    for (kind, count) in &by_kind {
        println!("  {:<18} {}", kind, count);
    }

    Ok(())
}
