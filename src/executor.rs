use std::process::{Command, Stdio};
use anyhow::{Context, Result, bail};
use log::info;
use crate::model::{ItemKind, ItemRecord};

const SERVICE_PREFIX: &str = "com.nokia";
const ACTIVATION_METHOD: &str = "top_application";

/// Starts whatever an item stands for.
pub trait Launcher {
    fn launch(&self, item: &ItemRecord) -> Result<()>;
}

/// Bus name, object path and interface used to activate `service`.
pub fn service_address(service: &str) -> (String, String, String) {
    let name = if service.contains('.') {
        service.to_string()
    } else {
        format!("{}.{}", SERVICE_PREFIX, service)
    };
    let path = format!("/{}", name.replace('.', "/"));
    (name.clone(), path, name)
}

/// `Exec` split into program and arguments, with `%x` field codes dropped.
pub fn exec_argv(exec: &str) -> Vec<String> {
    exec.split_whitespace()
        .filter(|part| !(part.len() == 2 && part.starts_with('%')))
        .map(str::to_string)
        .collect()
}

pub struct ProcessLauncher {
    pub browser: String,
}

impl ProcessLauncher {
    pub fn new(browser: impl Into<String>) -> Self {
        Self { browser: browser.into() }
    }

    fn activate(&self, service: &str) -> Result<()> {
        let (name, path, interface) = service_address(service);
        info!("Activating {} via {}", name, ACTIVATION_METHOD);
        let conn = zbus::blocking::Connection::session().context("connecting to the session bus")?;
        conn.call_method(
            Some(name.as_str()),
            path.as_str(),
            Some(interface.as_str()),
            ACTIVATION_METHOD,
            &(),
        )
        .with_context(|| format!("activating {}", name))?;
        Ok(())
    }

    fn spawn(&self, argv: &[String]) -> Result<()> {
        let Some((program, args)) = argv.split_first() else {
            bail!("empty command line");
        };
        info!("Spawning {:?}", argv);
        Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("spawning {}", program))?;
        Ok(())
    }
}

impl Launcher for ProcessLauncher {
    fn launch(&self, item: &ItemRecord) -> Result<()> {
        match &item.kind {
            ItemKind::Task { service: Some(service), .. } => self.activate(service),
            ItemKind::Task { exec: Some(exec), .. } => self.spawn(&exec_argv(exec)),
            ItemKind::Task { .. } => bail!("{} has neither a service nor a command", item.key),
            ItemKind::Bookmark { url, .. } => {
                let mut argv = exec_argv(&self.browser);
                argv.push(url.clone());
                self.spawn(&argv)
            }
            ItemKind::Applet { .. } | ItemKind::Background { .. } => {
                bail!("{} items cannot be launched", item.domain())
            }
        }
    }
}
