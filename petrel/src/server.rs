// Copyright (c) 2022 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Affero General Public License that can be found
// in the LICENSE file.

use clap::Parser;
use std::fs::{self, File};
use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tokio::sync::mpsc;

use crate::config::Config;
use crate::constants::{CHANNEL_CAPACITY, MAX_DRAIN_PER_UPDATE};
use crate::dispatcher::Dispatcher;
use crate::error::{Error, ErrorKind};
use crate::listener::Listener;
use crate::queue::TsQueue;
use crate::session::SessionRef;
use crate::timer::TimerService;

const DEFAULT_CONFIG: &str = "/etc/petrel/petrel.toml";

#[derive(Debug, Parser)]
#[command(name = "petrel", version, about = "Petrel MQTT broker")]
struct Arguments {
    /// Path to the config file.
    #[arg(short, long, value_name = "config_file")]
    config: Option<PathBuf>,

    /// Check config file syntax and exit.
    #[arg(short, long)]
    test: bool,

    /// Ask a running broker to reload its config.
    #[arg(short, long)]
    reload: bool,
}

/// Process entry point of the broker binary.
///
/// # Errors
///
/// Returns error if the config, logger or listener cannot be set up.
pub fn run_server() -> Result<(), Error> {
    let args = Arguments::parse();

    let config_file = args
        .config
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
    let config = if config_file.exists() {
        let content = fs::read_to_string(&config_file)?;
        toml::from_str::<Config>(&content)?
    } else {
        Config::default()
    };
    config.validate()?;

    if args.test {
        println!("The configuration file {} syntax is Ok", config_file.display());
        return Ok(());
    }
    if args.reload {
        return notify_reload(&config);
    }

    crate::log::init_log(config.log())?;
    write_pid(&config)?;

    let mut server = ServerContext::new(config);
    server.start()?;
    loop {
        server.update(MAX_DRAIN_PER_UPDATE);
    }
}

fn write_pid(config: &Config) -> Result<(), Error> {
    let pid = std::process::id();
    let mut fd = File::create(config.general().pid_file())?;
    write!(fd, "{pid}")?;
    Ok(())
}

/// Signal the broker process named by the pid file to reload.
#[cfg(unix)]
fn notify_reload(config: &Config) -> Result<(), Error> {
    let pid_file = config.general().pid_file();
    let pid_str = fs::read_to_string(pid_file)?;
    let pid = pid_str.trim().parse::<i32>().map_err(|err| {
        Error::from_string(
            ErrorKind::PidError,
            format!("Failed to parse pid from {}: {err}", pid_file.display()),
        )
    })?;
    unsafe { nc::kill(pid, nc::SIGUSR1) }.map_err(|errno| {
        Error::from_string(
            ErrorKind::PidError,
            format!("Failed to notify process {pid}, errno {errno}"),
        )
    })?;
    Ok(())
}

#[cfg(not(unix))]
fn notify_reload(_config: &Config) -> Result<(), Error> {
    Err(Error::new(
        ErrorKind::PidError,
        "reload signalling is unix-only",
    ))
}

/// Owns the async runtime, the active-session registry and the deletion
/// queue.
///
/// The I/O runtime accepts sockets and runs sessions; this object's
/// [`ServerContext::update`] runs on the caller's thread and is the only
/// place sessions are erased, keeping socket teardown out of read
/// completions.
#[derive(Debug)]
pub struct ServerContext {
    config: Config,
    active_sessions: Arc<TsQueue<SessionRef>>,
    deletion_queue: Arc<TsQueue<SessionRef>>,
    runtime: Option<Runtime>,
    local_addr: Option<SocketAddr>,
}

impl ServerContext {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            active_sessions: Arc::new(TsQueue::new()),
            deletion_queue: Arc::new(TsQueue::new()),
            runtime: None,
            local_addr: None,
        }
    }

    /// Bind the listener and launch the accept loop and dispatcher.
    ///
    /// # Errors
    ///
    /// Returns error if the runtime or the listener cannot be created.
    pub fn start(&mut self) -> Result<(), Error> {
        let runtime = Runtime::new()?;

        let (dispatcher_sender, dispatcher_receiver) = mpsc::channel(CHANNEL_CAPACITY);
        let dispatcher = Dispatcher::new(dispatcher_receiver);
        let (timer_service, timer_driver) = TimerService::new();

        let listener = runtime.block_on(Listener::bind(
            &self.config,
            Arc::clone(&self.active_sessions),
            Arc::clone(&self.deletion_queue),
            dispatcher_sender,
            timer_service,
        ))?;
        self.local_addr = Some(listener.local_addr()?);

        runtime.spawn(dispatcher.run_loop());
        runtime.spawn(timer_driver.run_loop());
        runtime.spawn(listener.run_loop());
        #[cfg(unix)]
        runtime.spawn(watch_reload_signal());

        self.runtime = Some(runtime);
        Ok(())
    }

    /// Drain the deletion queue: wait for at least one finished session,
    /// then pop up to `max_sessions` handles, signal their shutdown and
    /// erase them from the active registry by identity.
    pub fn update(&self, max_sessions: usize) {
        self.deletion_queue.wait();
        for _ in 0..max_sessions {
            let Some(session) = self.deletion_queue.pop_front() else {
                break;
            };
            session.shutdown();
            let _found = self.active_sessions.find_and_erase(&session);
            log::debug!("server: session {} destroyed", session.id());
        }
    }

    /// Number of sessions currently registered.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.active_sessions.len()
    }

    /// The bound listener address, available after `start`.
    #[must_use]
    pub const fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Tear the runtime down without waiting for session tasks.
    pub fn stop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
        log::info!("server stopped");
    }
}

impl Drop for ServerContext {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Log reload requests; config is re-read on the next start.
#[cfg(unix)]
async fn watch_reload_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::user_defined1()) {
        Ok(mut stream) => {
            while stream.recv().await.is_some() {
                log::info!("reload requested; restart to apply config changes");
            }
        }
        Err(err) => log::error!("failed to install reload handler: {err}"),
    }
}
