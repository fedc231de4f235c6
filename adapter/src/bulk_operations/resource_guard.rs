use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
struct Entry {
    token: CancellationToken,
    holders: usize,
}

/// Cancellation tokens of the bulk operations currently running.
#[derive(Debug, Clone, Default)]
pub struct ActiveOperations {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl ActiveOperations {
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Registers `operation_id` until the returned guard is dropped.
    ///
    /// Reusing the id of an operation that is still running shares its token,
    /// so one cancel stops both.
    pub fn register(&self, operation_id: String) -> OperationGuard {
        let token = {
            let mut entries = self.lock();
            let entry = entries.entry(operation_id.clone()).or_insert_with(|| Entry {
                token: CancellationToken::new(),
                holders: 0,
            });
            entry.holders += 1;
            entry.token.clone()
        };

        log::debug!("Registered bulk operation {operation_id}");

        OperationGuard {
            operations: self.clone(),
            operation_id,
            token,
        }
    }

    /// Returns false when no running operation has this id.
    pub fn cancel(&self, operation_id: &str) -> bool {
        match self.lock().get(operation_id) {
            Some(entry) => {
                entry.token.cancel();
                log::info!("Cancellation requested for bulk operation {operation_id}");
                true
            }
            None => {
                log::debug!("No active bulk operation {operation_id} to cancel");
                false
            }
        }
    }

    pub fn is_active(&self, operation_id: &str) -> bool {
        self.lock().contains_key(operation_id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn release(&self, operation_id: &str) {
        let mut entries = self.lock();
        if let Some(entry) = entries.get_mut(operation_id) {
            entry.holders = entry.holders.saturating_sub(1);
            if entry.holders == 0 {
                entries.remove(operation_id);
            }
        }
    }
}

/// RAII registration of one running bulk operation.
pub struct OperationGuard {
    operations: ActiveOperations,
    operation_id: String,
    token: CancellationToken,
}

impl OperationGuard {
    pub fn operation_id(&self) -> &str {
        &self.operation_id
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for OperationGuard {
    fn drop(&mut self) {
        self.operations.release(&self.operation_id);
        log::debug!("Bulk operation {} released", self.operation_id);
    }
}
