mod allocator;
mod catalog;
mod config;
mod descriptor;
mod error;
mod executor;
mod matcher;
mod model;
mod registry;
mod scan;
mod shell;
mod sources;
mod store;
mod tracker;
mod view;
mod watch;

use anyhow::{Result, anyhow};
use calloop::EventLoop;
use calloop::channel::Event;
use clap::{Parser, Subcommand};
use log::{debug, info, warn};
use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use crate::config::load_config;
use crate::executor::ProcessLauncher;
use crate::matcher::FuzzyMatcher;
use crate::model::{Domain, ItemRecord, Params};
use crate::registry::RegistryEvent;
use crate::scan::ScanOutcome;
use crate::shell::Shell;
use crate::store::file::FileStore;
use crate::watch::{ChangeWatcher, WatchEvent};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file to use instead of the default location
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Items that can be added to the home screen
    List {
        #[arg(value_enum)]
        domain: Domain,
        /// Fuzzy filter on the display name
        #[arg(short, long)]
        query: Option<String>,
    },
    /// Shortcuts currently on the home screen
    Installed {
        #[arg(value_enum)]
        domain: Domain,
    },
    /// Add a shortcut for an item
    Install {
        #[arg(value_enum)]
        domain: Domain,
        key: String,
        /// Instance parameter, e.g. X-View=2
        #[arg(short, long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,
    },
    /// Remove a shortcut
    Remove {
        #[arg(value_enum)]
        domain: Domain,
        id: String,
    },
    /// Start the task or open the bookmark behind an item or shortcut
    Launch {
        #[arg(value_enum)]
        domain: Domain,
        key: String,
    },
    /// Keep the catalogs and installed sets current, printing changes
    Watch,
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got {:?}", raw)),
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = load_config(args.config.as_deref())?;
    let store = FileStore::new(config.store_dir());
    let mut shell = Shell::new(&config, store.clone())?;

    match args.command {
        Commands::List { domain, query } => {
            let registry = shell.registry_mut(domain);
            registry.scan_now();
            let view = registry.view();
            if view.is_empty() && !args.json {
                eprintln!("No {} items available", domain);
                return Ok(());
            }
            let items: Vec<&ItemRecord> = match query.as_deref() {
                Some(query) => view.search(query, &mut FuzzyMatcher::new()),
                None => view.items().iter().collect(),
            };
            debug!("{} of {} {} items shown", items.len(), view.len(), domain);
            if args.json {
                println!("{}", serde_json::to_string_pretty(&items)?);
            } else {
                for item in items {
                    let marker = if item.multiple { "*" } else { " " };
                    println!("{} {:<32} {}", marker, item.name, item.key);
                }
            }
        }
        Commands::Installed { domain } => {
            let registry = shell.registry(domain);
            if registry.installed().is_empty() && !args.json {
                eprintln!("No {} shortcuts installed", domain);
                return Ok(());
            }
            let installed: Vec<_> = registry.installed().iter().collect();
            if args.json {
                println!("{}", serde_json::to_string_pretty(&installed)?);
            } else {
                for shortcut in installed {
                    println!("{:<32} {}", shortcut.id, shortcut.item_key.as_deref().unwrap_or("-"));
                }
            }
        }
        Commands::Install { domain, key, params } => {
            let registry = shell.registry_mut(domain);
            registry.scan_now();
            let params: Params = params.into_iter().collect();
            let id = registry.install(&key, params)?;
            println!("{}", id);
        }
        Commands::Remove { domain, id } => {
            shell.registry_mut(domain).remove(&id)?;
        }
        Commands::Launch { domain, key } => {
            let registry = shell.registry_mut(domain);
            registry.scan_now();
            registry.launch(&key, &ProcessLauncher::new(config.general.browser.clone()))?;
        }
        Commands::Watch => watch(shell, &store, args.json)?,
    }

    Ok(())
}

struct WatchState {
    shell: Shell,
    watcher: ChangeWatcher,
    scans: calloop::channel::Sender<ScanOutcome>,
    events: Vec<Receiver<RegistryEvent>>,
}

impl WatchState {
    fn start_scan(&mut self, domain: Domain) {
        let job = self.shell.begin_scan(domain);
        if let Err(e) = scan::spawn(job, self.scans.clone()) {
            warn!("Could not start {} scan: {}", domain, e);
            self.shell.registry_mut(domain).cancel_scan();
        }
    }

    fn print_events(&self, json: bool) -> Result<()> {
        for rx in &self.events {
            for event in rx.try_iter() {
                if json {
                    println!("{}", serde_json::to_string(&event_json(&event))?);
                } else {
                    println!("{:?}", event);
                }
            }
        }
        Ok(())
    }
}

fn event_json(event: &RegistryEvent) -> serde_json::Value {
    use serde_json::json;
    match event {
        RegistryEvent::ItemAppeared { domain, key } => json!({"event": "item-appeared", "domain": domain, "key": key}),
        RegistryEvent::ItemUpdated { domain, key } => json!({"event": "item-updated", "domain": domain, "key": key}),
        RegistryEvent::ItemDisappeared { domain, key } => json!({"event": "item-disappeared", "domain": domain, "key": key}),
        RegistryEvent::ShortcutInstalled { domain, id, key } => {
            json!({"event": "shortcut-installed", "domain": domain, "id": id, "key": key})
        }
        RegistryEvent::ShortcutRemoved { domain, id } => json!({"event": "shortcut-removed", "domain": domain, "id": id}),
        RegistryEvent::InstalledReloaded { domain } => json!({"event": "installed-reloaded", "domain": domain}),
    }
}

fn watch(mut shell: Shell, store: &FileStore, json: bool) -> Result<()> {
    let mut event_loop: EventLoop<WatchState> = EventLoop::try_new()?;
    let (tx_scans, rx_scans) = calloop::channel::channel::<ScanOutcome>();
    let (tx_watch, rx_watch) = calloop::channel::channel::<WatchEvent>();

    let events = Domain::ALL
        .into_iter()
        .map(|domain| shell.registry_mut(domain).subscribe())
        .collect();
    let watcher = ChangeWatcher::new(store.root(), tx_watch)?;
    let mut state = WatchState {
        shell,
        watcher,
        scans: tx_scans,
        events,
    };

    // Scan results
    event_loop
        .handle()
        .insert_source(rx_scans, |event, _, state: &mut WatchState| {
            if let Event::Msg(outcome) = event {
                let domain = outcome.domain;
                if state.shell.apply_scan(outcome) {
                    let dirs = state.shell.registry(domain).watched_dirs().to_vec();
                    state.watcher.watch_dirs(&dirs);
                    debug!("Watching {} paths", state.watcher.watched());
                }
            }
        })
        .map_err(|e| anyhow!("inserting scan channel: {}", e.error))?;

    // Store and descriptor notifications
    event_loop
        .handle()
        .insert_source(rx_watch, |event, _, state: &mut WatchState| {
            let Event::Msg(change) = event else {
                return;
            };
            match change {
                WatchEvent::Store(change) => {
                    if state.shell.handle_store_change(&change).is_none() {
                        debug!("Ignoring change to store key {}", change.key);
                    }
                }
                WatchEvent::Descriptors(dir) => {
                    let domain = state
                        .shell
                        .domain_for_dir(&dir)
                        .or_else(|| dir.parent().and_then(|parent| state.shell.domain_for_dir(parent)));
                    match domain {
                        Some(domain) => state.start_scan(domain),
                        None => debug!("No domain watches {:?}", dir),
                    }
                }
            }
        })
        .map_err(|e| anyhow!("inserting watch channel: {}", e.error))?;

    for domain in Domain::ALL {
        state.start_scan(domain);
    }
    info!("Watching for changes");

    loop {
        event_loop.dispatch(None, &mut state)?;
        state.print_events(json)?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_split_on_first_equals() {
        assert_eq!(parse_param("X-View=2"), Ok(("X-View".to_string(), "2".to_string())));
        assert_eq!(parse_param("a=b=c"), Ok(("a".to_string(), "b=c".to_string())));
        assert!(parse_param("novalue").is_err());
        assert!(parse_param("=x").is_err());
    }

    #[test]
    fn cli_parses_install_with_params() {
        let args = Args::try_parse_from(["homeshell", "install", "background", "sea.desktop", "-p", "X-View=1"]).unwrap();
        match args.command {
            Commands::Install { domain, key, params } => {
                assert_eq!(domain, Domain::Background);
                assert_eq!(key, "sea.desktop");
                assert_eq!(params, vec![("X-View".to_string(), "1".to_string())]);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
