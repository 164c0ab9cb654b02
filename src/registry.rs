use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::time::Instant;
use uuid::Uuid;

use crate::channel::MessageChannel;
use crate::clock::{Clock, Scheduler, TokioClock, TokioScheduler};
use crate::config::RegistryConfig;
use crate::jitter::{Dwell, Jitter, RandomDwell};
use crate::message::{InboundMessage, KeyGrant, KeyRequest, OutboundMessage};
use crate::record::{FileRef, TransferRecord, TransferStatus};
use crate::subscriber::{RegistrySubscriber, Subscribers};
use crate::{RegistryError, Result};

const LOG_PREFIX: &str = "[registry]";

/// Files shared by the local participant, in submission order.
///
/// All three transitions (`register`, `request_removal`, `apply_keys`) apply
/// synchronously; the visible `Ready` and eviction steps are deferred by the
/// dwell delay and run on the injected [`Scheduler`].
#[derive(Clone)]
pub struct TransferRegistry {
    shared: Arc<Shared>,
}

struct Shared {
    records: Mutex<Vec<TransferRecord>>,
    subscribers: Subscribers,
    /// Held for a whole notification round so subscribers see snapshots in
    /// the order the mutations happened.
    delivery: Mutex<()>,
    channel: Arc<dyn MessageChannel>,
    clock: Arc<dyn Clock>,
    scheduler: Arc<dyn Scheduler>,
    jitter: Jitter,
    config: RegistryConfig,
}

enum Removal {
    Started(Instant),
    AlreadyRemoving,
}

impl TransferRegistry {
    /// Registry with the default dwell window, running its timers on the
    /// current tokio runtime.
    pub fn new(channel: Arc<dyn MessageChannel>) -> Result<Self> {
        Self::with_config(channel, RegistryConfig::default())
    }

    pub fn with_config(
        channel: Arc<dyn MessageChannel>,
        config: RegistryConfig,
    ) -> Result<Self> {
        let scheduler = TokioScheduler::current()?;
        Ok(Self::with_runtime(
            channel,
            config,
            Arc::new(TokioClock),
            Arc::new(scheduler),
            Arc::new(RandomDwell::new()),
        ))
    }

    pub fn with_runtime(
        channel: Arc<dyn MessageChannel>,
        config: RegistryConfig,
        clock: Arc<dyn Clock>,
        scheduler: Arc<dyn Scheduler>,
        dwell: Arc<dyn Dwell>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                records: Mutex::new(Vec::new()),
                subscribers: Subscribers::default(),
                delivery: Mutex::new(()),
                channel,
                clock,
                scheduler,
                jitter: Jitter::new(&config, dwell),
                config,
            }),
        }
    }

    /// Add files to the registry and ask the service for their keys.
    ///
    /// A file whose name is already registered is dropped, first seen wins.
    /// One `download-keys` message lists the files actually added.
    pub fn register<I>(&self, files: I)
    where
        I: IntoIterator<Item = FileRef>,
    {
        let requested = {
            let mut records = self.shared.records();
            let mut requested = Vec::new();
            for file in files {
                if records.iter().any(|r| r.file.name == file.name) {
                    log::trace!(
                        "{} {} is already registered, skipping",
                        LOG_PREFIX,
                        file.name
                    );
                    continue;
                }

                requested.push(KeyRequest {
                    name: file.name.clone(),
                    size: file.size,
                });
                records.push(TransferRecord::new(file, self.shared.clock.now()));
            }
            requested
        };

        if !requested.is_empty() {
            log::info!("{} registered {} files", LOG_PREFIX, requested.len());
            self.shared.notify();
        } else if self.shared.config.skip_empty_key_requests {
            log::debug!("{} nothing new to request keys for", LOG_PREFIX);
            return;
        }

        self.shared
            .post(&OutboundMessage::DownloadKeys(requested));
    }

    /// Ask the service to stop sharing the file with server id `id`.
    ///
    /// The record turns `Removing` immediately and is evicted once the dwell
    /// delay has passed. Repeated calls for a record that is already
    /// `Removing` do nothing.
    pub fn request_removal(&self, id: &str) {
        let updated_at = match self.shared.mark_removing(id) {
            Ok(Removal::Started(updated_at)) => updated_at,
            Ok(Removal::AlreadyRemoving) => {
                log::debug!("{} {} is already being removed", LOG_PREFIX, id);
                return;
            }
            Err(e) => {
                log::warn!("{} {}", LOG_PREFIX, e);
                return;
            }
        };
        self.shared.notify();

        self.shared
            .post(&OutboundMessage::RemoveFile(id.to_owned()));

        let delay = self.shared.delay_since(updated_at);
        let shared = Arc::downgrade(&self.shared);
        let id = id.to_owned();
        self.shared.scheduler.schedule(
            delay,
            Box::new(move || {
                if let Some(shared) = Weak::upgrade(&shared) {
                    shared.evict(&id);
                }
            }),
        );
    }

    /// Apply authorization keys issued by the service.
    ///
    /// Each grant is matched by file name and turns its record `Ready` after
    /// the dwell delay. Grants for unknown names are skipped.
    pub fn apply_keys<I>(&self, grants: I)
    where
        I: IntoIterator<Item = KeyGrant>,
    {
        for grant in grants {
            let target = self
                .shared
                .records()
                .iter()
                .find(|r| r.file.name == grant.name)
                .map(|r| (r.handle, r.updated_at));

            let Some((handle, updated_at)) = target else {
                log::warn!(
                    "{} {}",
                    LOG_PREFIX,
                    RegistryError::UnknownKeyTarget(grant.name)
                );
                continue;
            };

            let delay = self.shared.delay_since(updated_at);
            let shared = Arc::downgrade(&self.shared);
            let id = grant.id;
            self.shared.scheduler.schedule(
                delay,
                Box::new(move || {
                    if let Some(shared) = Weak::upgrade(&shared) {
                        shared.enable(handle, id);
                    }
                }),
            );
        }
    }

    /// Route a text frame received from the service.
    ///
    /// Frames of other types are ignored; only malformed JSON is an error.
    pub fn handle_inbound(&self, text: &str) -> Result<()> {
        if let Some(InboundMessage::DownloadKeys(grants)) =
            InboundMessage::parse(text)?
        {
            log::debug!("{} received {} keys", LOG_PREFIX, grants.len());
            self.apply_keys(grants);
        }
        Ok(())
    }

    /// Remaining dwell for a record last updated at `last_update`.
    pub fn compute_jitter_delay(&self, last_update: Instant) -> Duration {
        self.shared.delay_since(last_update)
    }

    /// Current records in display order.
    pub fn snapshot(&self) -> Vec<TransferRecord> {
        self.shared.records().clone()
    }

    pub fn get(&self, name: &str) -> Option<TransferRecord> {
        self.shared
            .records()
            .iter()
            .find(|r| r.file.name == name)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.shared.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.records().is_empty()
    }

    pub fn subscribe(&self, subscriber: Arc<dyn RegistrySubscriber>) {
        self.shared.subscribers.insert(subscriber);
    }

    pub fn unsubscribe(&self, subscriber: Arc<dyn RegistrySubscriber>) {
        self.shared.subscribers.remove(&subscriber);
    }
}

impl Shared {
    fn records(&self) -> MutexGuard<'_, Vec<TransferRecord>> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn delay_since(&self, last_update: Instant) -> Duration {
        self.jitter
            .delay(last_update, self.clock.now())
    }

    fn mark_removing(&self, id: &str) -> Result<Removal> {
        let mut records = self.records();
        let record = records
            .iter_mut()
            .find(|r| r.id.as_deref() == Some(id))
            .ok_or_else(|| RegistryError::UnknownRemovalTarget(id.to_owned()))?;

        if record.status == TransferStatus::Removing {
            return Ok(Removal::AlreadyRemoving);
        }
        record.mark_removing(self.clock.now());
        Ok(Removal::Started(record.updated_at))
    }

    /// Deferred half of `apply_keys`.
    fn enable(&self, handle: Uuid, id: String) {
        {
            let mut records = self.records();
            let Some(record) = records.iter_mut().find(|r| r.handle == handle)
            else {
                log::debug!(
                    "{} key {} arrived for a file that is gone",
                    LOG_PREFIX,
                    id
                );
                return;
            };

            if record.status == TransferStatus::Removing {
                log::debug!(
                    "{} {} is being removed, dropping key {}",
                    LOG_PREFIX,
                    record.file.name,
                    id
                );
                return;
            }
            record.mark_ready(id, self.clock.now());
            log::info!("{} {} is ready", LOG_PREFIX, record.file.name);
        }
        self.notify();
    }

    /// Deferred half of `request_removal`. The record is looked up again
    /// since it may have been evicted in the meantime.
    fn evict(&self, id: &str) {
        {
            let mut records = self.records();
            let Some(index) =
                records.iter().position(|r| r.id.as_deref() == Some(id))
            else {
                log::trace!("{} {} was already evicted", LOG_PREFIX, id);
                return;
            };
            let record = records.remove(index);
            log::info!("{} {} removed", LOG_PREFIX, record.file.name);
        }
        self.notify();
    }

    fn post(&self, message: &OutboundMessage) {
        let text = match serde_json::to_string(message) {
            Ok(text) => text,
            Err(e) => {
                log::error!("{} failed to encode {:?}: {}", LOG_PREFIX, message, e);
                return;
            }
        };
        if let Err(e) = self.channel.send(text) {
            log::error!("{} failed to send message: {}", LOG_PREFIX, e);
        }
    }

    /// The snapshot is taken after the delivery lock is acquired, so the
    /// last round to run always carries the latest state.
    fn notify(&self) {
        let subscribers = self.subscribers.snapshot();
        if subscribers.is_empty() {
            return;
        }
        let _delivery = self
            .delivery
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let records = self.records().clone();
        for subscriber in subscribers {
            subscriber.notify_changed(&records);
        }
    }
}
