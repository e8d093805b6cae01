//! Pump command and query services.
//!
//! The command service is the serialization point for a pump: a keyed mutex
//! makes on/off linearizable per pump name, and the repository's
//! transactional row lock backs that up at the storage layer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use crate::domain::ports::{
    Page, PumpCommand, PumpQuery, PumpRepository, PumpRepositoryError, PumpStateChange,
};
use crate::domain::pump::{PinMap, Pump, PumpAction, PumpActivity, PumpName};
use crate::domain::relay::{RelayController, RelayError};
use crate::domain::Error;

fn map_repository_error(error: PumpRepositoryError) -> Error {
    match error {
        PumpRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("pump ledger unavailable: {message}"))
        }
        PumpRepositoryError::Query { message } => {
            Error::internal(format!("pump ledger error: {message}"))
        }
        PumpRepositoryError::NotFound { name } => {
            Error::not_found(format!("pump '{name}' not found"))
        }
    }
}

fn map_relay_error(error: RelayError) -> Error {
    match error {
        RelayError::UnknownPump { name } => Error::not_found(format!("unknown pump: {name}")),
        RelayError::HardwareFault {
            name,
            attempted,
            message,
        } => Error::hardware_fault(format!(
            "pump '{name}' could not be driven {attempted}: {message}"
        )),
    }
}

/// One mutex per pump name, created lazily on first use.
#[derive(Default)]
struct PumpLocks {
    inner: StdMutex<HashMap<PumpName, Arc<Mutex<()>>>>,
}

impl PumpLocks {
    async fn acquire(&self, name: &PumpName) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = match self.inner.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            Arc::clone(
                locks
                    .entry(name.clone())
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };
        lock.lock_owned().await
    }

    /// Drop the entry for a name nobody else is waiting on. Keeps requests
    /// for unknown pump names from growing the map without bound.
    fn discard_if_idle(&self, name: &PumpName) {
        let mut locks = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        // The caller still holds its guard, so a count above two means
        // another task has cloned the lock and needs the entry to stay.
        if locks
            .get(name)
            .is_some_and(|lock| Arc::strong_count(lock) <= 2)
        {
            locks.remove(name);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        match self.inner.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}

/// Executes pump commands: relay transition plus ledger update.
pub struct PumpCommandService<R> {
    relay: Arc<RelayController>,
    repo: Arc<R>,
    locks: PumpLocks,
}

impl<R> PumpCommandService<R>
where
    R: PumpRepository,
{
    /// Create a command service over the relay controller and the ledger.
    pub fn new(relay: Arc<RelayController>, repo: Arc<R>) -> Self {
        Self {
            relay,
            repo,
            locks: PumpLocks::default(),
        }
    }

    /// Reconcile the pin map into the ledger at startup.
    pub async fn sync_config(&self, map: &PinMap) -> Result<Vec<Pump>, Error> {
        let pumps = self
            .repo
            .sync_config(map)
            .await
            .map_err(map_repository_error)?;
        info!(pumps = pumps.len(), "pump configuration synced into ledger");
        Ok(pumps)
    }

    /// One retry on a hardware fault; the fault is surfaced after that.
    /// Unknown pumps are not retried.
    async fn transition_with_retry(
        &self,
        name: &PumpName,
        action: PumpAction,
    ) -> Result<(), Error> {
        let attempt = |is_retry: bool| async move {
            let result = match action {
                PumpAction::On => self.relay.activate(name).await,
                PumpAction::Off => self.relay.deactivate(name).await,
            };
            if let Err(RelayError::HardwareFault { ref message, .. }) = result {
                if !is_retry {
                    warn!(pump = %name, action = %action, error = %message, "relay write failed, retrying once");
                }
            }
            result
        };

        match attempt(false).await {
            Ok(()) => Ok(()),
            Err(RelayError::HardwareFault { .. }) => {
                attempt(true).await.map_err(map_relay_error)
            }
            Err(err) => Err(map_relay_error(err)),
        }
    }

    async fn resolve(&self, name: &PumpName) -> Result<Pump, Error> {
        self.repo
            .find_by_name(name)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| Error::not_found(format!("pump '{name}' not found")))
    }
}

#[async_trait]
impl<R> PumpCommand for PumpCommandService<R>
where
    R: PumpRepository,
{
    async fn turn_on(&self, name: &PumpName) -> Result<PumpStateChange, Error> {
        let _guard = self.locks.acquire(name).await;
        let pump = match self.resolve(name).await {
            Ok(pump) => pump,
            Err(err) => {
                self.locks.discard_if_idle(name);
                return Err(err);
            }
        };

        if pump.is_active {
            debug!(pump = %name, "already on, skipping physical activation");
            return Ok(PumpStateChange {
                pump: name.clone(),
                state: PumpAction::On,
            });
        }

        self.transition_with_retry(name, PumpAction::On).await?;

        match self.repo.record_on(name).await {
            Ok(_) => {
                info!(pump = %name, "pump on");
                Ok(PumpStateChange {
                    pump: name.clone(),
                    state: PumpAction::On,
                })
            }
            Err(err) => {
                // The relay fired but the ledger write failed; drive the
                // relay back off so hardware and ledger cannot diverge with
                // a pump silently running.
                if let Err(relay_err) = self.relay.deactivate(name).await {
                    warn!(pump = %name, error = %relay_err, "failsafe deactivation failed after ledger error");
                }
                Err(map_repository_error(err))
            }
        }
    }

    async fn turn_off(&self, name: &PumpName) -> Result<PumpStateChange, Error> {
        let _guard = self.locks.acquire(name).await;
        if let Err(err) = self.resolve(name).await {
            self.locks.discard_if_idle(name);
            return Err(err);
        }

        self.transition_with_retry(name, PumpAction::Off).await?;

        let activity = self
            .repo
            .record_off(name)
            .await
            .map_err(map_repository_error)?;
        info!(pump = %name, duration = ?activity.duration, "pump off");
        Ok(PumpStateChange {
            pump: name.clone(),
            state: PumpAction::Off,
        })
    }
}

/// Read side: paginated ledger listings.
pub struct PumpQueryService<R> {
    repo: Arc<R>,
}

impl<R> PumpQueryService<R>
where
    R: PumpRepository,
{
    /// Create a query service over the ledger.
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl<R> PumpQuery for PumpQueryService<R>
where
    R: PumpRepository,
{
    async fn list_pumps(&self, page: Page) -> Result<Vec<Pump>, Error> {
        self.repo
            .list_pumps(page)
            .await
            .map_err(map_repository_error)
    }

    async fn list_activities(
        &self,
        pump_id: Option<i32>,
        page: Page,
    ) -> Result<Vec<PumpActivity>, Error> {
        self.repo
            .list_activities(pump_id, page)
            .await
            .map_err(map_repository_error)
    }
}
