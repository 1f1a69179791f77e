//! Pass scheduling and configuration hot reload
//!
//! The [`Supervisor`] owns everything that lives across passes: the zone
//! configuration, its fingerprint and the provider handle. All three are
//! replaced together when the configuration file changes; nothing is mutated
//! in place.
//!
//! ## Lifecycle
//!
//! ```text
//! Idle ─► Resolving-Address ─► Reconciling ─┬─► (single-shot) done
//!                ▲                          │
//!                └── Reloading-Config ◄─ Sleeping (continuous)
//! ```
//!
//! ## Failure handling
//!
//! - Address resolution fails: the pass is skipped. Fatal in single-shot mode.
//! - Config edit fails validation: the previous config and fingerprint are
//!   kept, so the next tick tries again.
//! - The provider cannot be rebuilt from an edited config: fatal.

mod report;

pub use report::PassReport;

use crate::config::ZoneConfig;
use crate::engine::{DesiredRecord, Reconciler, ZoneState};
use crate::error::Result;
use crate::fingerprint::ConfigFingerprint;
use crate::traits::{DnsProvider, DnsProviderFactory, IpSource};
use chrono::Utc;
use report::plural;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{error, info, warn};

/// Shortest accepted polling interval in seconds
pub const MIN_INTERVAL_SECS: u64 = 30;

/// Longest accepted polling interval in seconds
pub const MAX_INTERVAL_SECS: u64 = 3600;

/// Interval used when the requested one is out of range
pub const DEFAULT_INTERVAL_SECS: u64 = 60;

/// Capacity of the supervisor event channel
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// How often passes run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// One pass, then exit
    SingleShot,
    /// A pass every interval until shut down
    Continuous(Duration),
}

impl RunMode {
    /// Mode for an optional interval in seconds.
    ///
    /// Intervals outside [30, 3600] are replaced by 60 rather than rejected.
    pub fn from_interval(interval_secs: Option<u64>) -> Self {
        match interval_secs {
            None => RunMode::SingleShot,
            Some(secs) if (MIN_INTERVAL_SECS..=MAX_INTERVAL_SECS).contains(&secs) => {
                RunMode::Continuous(Duration::from_secs(secs))
            }
            Some(secs) => {
                warn!(
                    "Interval {} seconds is outside recommended range ({} to {}). Using default value of {} seconds.",
                    secs, MIN_INTERVAL_SECS, MAX_INTERVAL_SECS, DEFAULT_INTERVAL_SECS
                );
                RunMode::Continuous(Duration::from_secs(DEFAULT_INTERVAL_SECS))
            }
        }
    }
}

/// Events emitted by the supervisor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorEvent {
    /// Run loop started
    Started {
        hostnames: usize,
        mode: RunMode,
    },

    /// A pass reconciled every hostname
    PassCompleted {
        changes: usize,
        failures: usize,
    },

    /// A pass was skipped because the address could not be resolved
    PassAborted {
        reason: String,
    },

    /// The configuration file changed and was applied
    ConfigReloaded {
        fingerprint: ConfigFingerprint,
    },

    /// The configuration file changed but could not be applied
    ReloadRejected {
        reason: String,
    },

    /// Run loop stopped
    Stopped {
        reason: String,
    },
}

/// Drives reconciliation passes for one configuration file
pub struct Supervisor {
    /// Configuration file being watched
    config_path: PathBuf,

    /// Configuration of the last successful load
    config: ZoneConfig,

    /// Fingerprint of the last successful load
    fingerprint: ConfigFingerprint,

    /// Provider built from `config`
    provider: Box<dyn DnsProvider>,

    /// Builds providers on startup and reload
    factory: Box<dyn DnsProviderFactory>,

    /// Public address discovery
    ip_source: Box<dyn IpSource>,

    /// Single-shot or continuous
    mode: RunMode,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<SupervisorEvent>,
}

impl Supervisor {
    /// Load the configuration and build the provider
    ///
    /// # Returns
    ///
    /// A tuple of (supervisor, event_receiver). Any error here is a startup
    /// failure: unreadable or invalid configuration, rejected credentials or
    /// an unknown zone.
    pub async fn start(
        config_path: impl Into<PathBuf>,
        factory: Box<dyn DnsProviderFactory>,
        ip_source: Box<dyn IpSource>,
        mode: RunMode,
    ) -> Result<(Self, mpsc::Receiver<SupervisorEvent>)> {
        let config_path = config_path.into();
        let loaded = ZoneConfig::load(&config_path)?;
        info!("Configuration loaded successfully ({})", loaded.fingerprint);

        info!("Initializing provider client...");
        let provider = factory.connect(&loaded.config).await?;

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let supervisor = Self {
            config_path,
            config: loaded.config,
            fingerprint: loaded.fingerprint,
            provider,
            factory,
            ip_source,
            mode,
            event_tx: tx,
        };

        Ok((supervisor, rx))
    }

    /// Configuration currently in effect
    pub fn config(&self) -> &ZoneConfig {
        &self.config
    }

    /// Fingerprint of the configuration currently in effect
    pub fn fingerprint(&self) -> &ConfigFingerprint {
        &self.fingerprint
    }

    /// Run until done (single-shot) or until `shutdown` resolves
    ///
    /// A shutdown interrupts the sleep or the pass in flight. Each record
    /// write is a single provider call, so interrupting a pass never leaves a
    /// record half-written.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: single-shot pass finished, or shutdown requested
    /// - `Err(Error)`: fatal failure (address resolution in single-shot mode,
    ///   or a provider that cannot be rebuilt after a config change)
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        self.emit_event(SupervisorEvent::Started {
            hostnames: self.config.subdomains.len(),
            mode: self.mode,
        });

        let mut first = true;
        loop {
            if !first {
                let RunMode::Continuous(interval) = self.mode else {
                    break;
                };
                info!("Sleeping for {} seconds...", interval.as_secs());

                let interrupted = tokio::select! {
                    _ = tokio::time::sleep(interval) => false,
                    _ = &mut shutdown => true,
                };
                if interrupted {
                    self.stopped("Shutdown signal");
                    return Ok(());
                }
            }

            let result = tokio::select! {
                result = self.tick(!first) => Some(result),
                _ = &mut shutdown => None,
            };

            match result {
                None => {
                    self.stopped("Shutdown signal");
                    return Ok(());
                }
                Some(Err(e)) => {
                    self.emit_event(SupervisorEvent::Stopped {
                        reason: e.to_string(),
                    });
                    return Err(e);
                }
                Some(Ok(())) => {}
            }

            first = false;
        }

        self.stopped("Single pass complete");
        Ok(())
    }

    /// One scheduler tick: optional reload check, then a pass
    async fn tick(&mut self, check_reload: bool) -> Result<()> {
        if check_reload {
            self.reload_if_changed().await?;
        }

        match self.run_pass().await {
            Ok(report) => {
                self.emit_event(SupervisorEvent::PassCompleted {
                    changes: report.changes(),
                    failures: report.failures(),
                });
                Ok(())
            }
            Err(e) => {
                self.emit_event(SupervisorEvent::PassAborted {
                    reason: e.to_string(),
                });
                if self.mode == RunMode::SingleShot {
                    error!("Failed to fetch IP address: {}", e);
                    Err(e)
                } else {
                    error!("Failed to fetch IP address, skipping this pass: {}", e);
                    Ok(())
                }
            }
        }
    }

    /// Resolve the address and reconcile every hostname once
    ///
    /// # Returns
    ///
    /// - `Ok(PassReport)`: every hostname was attempted (some may have failed)
    /// - `Err(Error)`: the address could not be resolved; nothing was attempted
    pub async fn run_pass(&self) -> Result<PassReport> {
        let started_at = Utc::now();

        info!("Fetching current IP address...");
        let observation = self.ip_source.current().await?;
        info!("Successfully fetched IP address: {}", observation);

        let count = self.config.subdomains.len();
        info!("Checking {} subdomain{}...", count, plural(count));

        let reconciler = Reconciler::new(self.provider.as_ref());
        let mut zone = ZoneState::new(self.provider.base_domain());
        let mut outcomes = Vec::with_capacity(count);

        for spec in &self.config.subdomains {
            let desired = DesiredRecord::from_spec(spec);
            info!(
                "Subdomain: {}, Proxied: {}, TTL: {}",
                desired.name, desired.proxied, desired.ttl
            );
            let outcome = reconciler.reconcile(&desired, &observation, &mut zone).await;
            outcomes.push((desired.name, outcome));
        }

        let report = PassReport {
            started_at,
            observation,
            outcomes,
        };
        report.log_summary();

        Ok(report)
    }

    /// Reload the configuration if the file content changed
    ///
    /// # Returns
    ///
    /// - `Ok(true)`: new configuration and provider are in effect
    /// - `Ok(false)`: unchanged, or the change was rejected (previous
    ///   configuration kept)
    /// - `Err(Error)`: the new configuration is valid but the provider could
    ///   not be built from it
    pub async fn reload_if_changed(&mut self) -> Result<bool> {
        let current = match ConfigFingerprint::read(&self.config_path) {
            Ok(fingerprint) => fingerprint,
            Err(e) => {
                warn!(
                    "Cannot read configuration file {}: {}. Continuing with current config.",
                    self.config_path.display(),
                    e
                );
                self.emit_event(SupervisorEvent::ReloadRejected {
                    reason: e.to_string(),
                });
                return Ok(false);
            }
        };

        if current == self.fingerprint {
            return Ok(false);
        }

        info!("Detected change in config file. Reloading...");
        let loaded = match ZoneConfig::load(&self.config_path) {
            Ok(loaded) => loaded,
            Err(e) => {
                warn!(
                    "Failed to reload configuration: {}. Continuing with current config.",
                    e
                );
                self.emit_event(SupervisorEvent::ReloadRejected {
                    reason: e.to_string(),
                });
                return Ok(false);
            }
        };

        let provider = self.factory.connect(&loaded.config).await.map_err(|e| {
            error!("Provider client initialization failed after reload: {}", e);
            e
        })?;

        self.config = loaded.config;
        self.provider = provider;
        self.fingerprint = loaded.fingerprint;

        info!("Configuration reloaded successfully ({})", self.fingerprint);
        self.emit_event(SupervisorEvent::ConfigReloaded {
            fingerprint: self.fingerprint.clone(),
        });

        Ok(true)
    }

    fn stopped(&self, reason: &str) {
        info!("Supervisor stopped: {}", reason);
        self.emit_event(SupervisorEvent::Stopped {
            reason: reason.to_string(),
        });
    }

    fn emit_event(&self, event: SupervisorEvent) {
        if deliver(&self.event_tx, event) == Delivery::Dropped {
            warn!("Event channel full, dropping supervisor event");
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Delivery {
    Sent,
    /// Channel full
    Dropped,
    /// Receiver gone; events are optional
    Unobserved,
}

fn deliver(tx: &mpsc::Sender<SupervisorEvent>, event: SupervisorEvent) -> Delivery {
    match tx.try_send(event) {
        Ok(()) => Delivery::Sent,
        Err(TrySendError::Full(_)) => Delivery::Dropped,
        Err(TrySendError::Closed(_)) => Delivery::Unobserved,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_interval_is_single_shot() {
        assert_eq!(RunMode::from_interval(None), RunMode::SingleShot);
    }

    #[test]
    fn in_range_interval_is_kept() {
        for secs in [30, 300, 3600] {
            assert_eq!(
                RunMode::from_interval(Some(secs)),
                RunMode::Continuous(Duration::from_secs(secs))
            );
        }
    }

    #[test]
    fn out_of_range_interval_becomes_default() {
        for secs in [0, 1, 29, 3601, u64::MAX] {
            assert_eq!(
                RunMode::from_interval(Some(secs)),
                RunMode::Continuous(Duration::from_secs(DEFAULT_INTERVAL_SECS)),
                "interval {}",
                secs
            );
        }
    }

    fn stopped() -> SupervisorEvent {
        SupervisorEvent::Stopped {
            reason: "test".to_string(),
        }
    }

    #[test]
    fn full_channel_drops_event() {
        let (tx, _rx) = mpsc::channel(1);
        assert_eq!(deliver(&tx, stopped()), Delivery::Sent);
        assert_eq!(deliver(&tx, stopped()), Delivery::Dropped);
    }

    #[test]
    fn dropped_receiver_is_not_a_full_channel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        assert_eq!(deliver(&tx, stopped()), Delivery::Unobserved);
    }
}
