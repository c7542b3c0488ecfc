use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::first_blood::FirstBlood;
use crate::host::Host;
use crate::notify::Dispatcher;
use crate::notify::telegram::{self, TelegramClient};
use crate::timing::{self, MilestoneFlags, MilestonePoller};

/// Process-level knobs, read from the environment.
#[derive(Clone, Debug)]
pub struct PluginSettings {
    pub telegram_api: String,
    pub http_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for PluginSettings {
    fn default() -> Self {
        Self {
            telegram_api: telegram::DEFAULT_API_BASE.to_string(),
            http_timeout: Duration::from_secs(10),
            poll_interval: timing::DEFAULT_INTERVAL,
        }
    }
}

impl PluginSettings {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            telegram_api: env::var("TELEGRAM_API_URL").unwrap_or(defaults.telegram_api),
            http_timeout: secs_var("HERALD_HTTP_TIMEOUT_SECS").unwrap_or(defaults.http_timeout),
            poll_interval: secs_var("HERALD_POLL_SECS").unwrap_or(defaults.poll_interval),
        }
    }
}

fn secs_var(name: &str) -> Option<Duration> {
    let raw = env::var(name).ok()?;
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Some(Duration::from_secs(secs)),
        _ => {
            warn!("Ignoring {name}={raw:?}, expected a positive number of seconds");
            None
        }
    }
}

pub struct NotifyPlugin {
    dispatcher: Arc<Dispatcher>,
    poll_interval: Duration,
    is_loaded: AtomicBool,
    stop: CancellationToken,
    poller: Mutex<Option<JoinHandle<MilestoneFlags>>>,
}

impl NotifyPlugin {
    pub fn new(host: &Host, settings: &PluginSettings) -> Result<Self, reqwest::Error> {
        let chat = TelegramClient::new(settings.telegram_api.as_str(), settings.http_timeout)?;
        Ok(Self {
            dispatcher: Arc::new(Dispatcher::new(host, chat)),
            poll_interval: settings.poll_interval,
            is_loaded: AtomicBool::new(false),
            stop: CancellationToken::new(),
            poller: Mutex::new(None),
        })
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Hooks first-blood detection into the solve pipeline and starts the timing poller.
    /// A host runs at most one poller, whichever plugin loaded first owns it.
    /// Returns false if nothing new was installed.
    pub fn load(&self, host: &Host) -> bool {
        if self.is_loaded.swap(true, Ordering::SeqCst) {
            debug!("Notify plugin already loaded");
            return false;
        }

        let observer = FirstBlood::new(host, Arc::clone(&self.dispatcher));
        let registered = host.hooks.register(Arc::new(observer));

        if !host.claim_timing_poller() {
            debug!("Timing poller already running on this host");
            return registered;
        }
        let poller = MilestonePoller::new(self.poll_interval);
        let run = poller.run(
            host.config.clone(),
            Arc::clone(&self.dispatcher),
            self.stop.clone(),
        );
        *self.poller.lock().unwrap_or_else(|e| e.into_inner()) = Some(tokio::spawn(run));
        info!("Notify plugin loaded");
        true
    }

    /// Stops the timing poller and waits for it. Returns its latches if this plugin ran it.
    pub async fn shutdown(&self, host: &Host) -> Option<MilestoneFlags> {
        self.stop.cancel();
        let handle = self.poller.lock().unwrap_or_else(|e| e.into_inner()).take()?;
        let result = handle.await;
        host.release_timing_poller();
        match result {
            Ok(flags) => Some(flags),
            Err(err) => {
                error!("Timing poller ended abnormally: {err:?}");
                None
            }
        }
    }
}
