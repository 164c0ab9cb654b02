use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::record::TransferRecord;

/// Listener for changes of the record collection, typically the view that
/// renders the list of shared files.
pub trait RegistrySubscriber: Send + Sync {
    fn get_id(&self) -> String;
    /// Called after every append, status change and eviction with the
    /// records in display order.
    ///
    /// Calls are serialized and never carry an older list than a previous
    /// call. The registry may be read from here but must not be mutated.
    fn notify_changed(&self, records: &[TransferRecord]);
}

#[derive(Default)]
pub(crate) struct Subscribers {
    inner: RwLock<HashMap<String, Arc<dyn RegistrySubscriber>>>,
}

impl Subscribers {
    pub fn insert(&self, subscriber: Arc<dyn RegistrySubscriber>) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(subscriber.get_id(), subscriber);
    }

    pub fn remove(&self, subscriber: &Arc<dyn RegistrySubscriber>) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&subscriber.get_id());
    }

    pub fn snapshot(&self) -> Vec<Arc<dyn RegistrySubscriber>> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }
}
