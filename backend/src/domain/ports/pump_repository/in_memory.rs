//! In-memory ledger used by tests and by builds without a database.
//!
//! A single mutex over the whole state makes every mutation linearizable,
//! which trivially satisfies the per-pump serialization the port demands.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::domain::pump::{Pump, PumpActivity, PumpAction, PumpName, PumpType};
use crate::domain::PinMap;

use super::{Page, PumpRepository, PumpRepositoryError, RecordOnOutcome};

#[derive(Debug, Default)]
struct State {
    pumps: Vec<Pump>,
    activities: Vec<PumpActivity>,
    next_pump_id: i32,
    next_activity_id: i64,
}

impl State {
    fn pump_index_by_name(&self, name: &PumpName) -> Option<usize> {
        self.pumps.iter().position(|p| &p.name == name)
    }

    /// The open ON for a pump is its most recent activity when that
    /// activity is an ON; every OFF closes whatever preceded it.
    fn open_on(&self, pump_id: i32) -> Option<&PumpActivity> {
        self.activities
            .iter()
            .rev()
            .find(|a| a.pump_id == pump_id)
            .filter(|a| a.action == PumpAction::On)
    }

    fn push_activity(
        &mut self,
        pump_id: i32,
        action: PumpAction,
        duration: Option<f64>,
    ) -> PumpActivity {
        self.next_activity_id += 1;
        let activity = PumpActivity {
            id: self.next_activity_id,
            pump_id,
            action,
            timestamp: Utc::now(),
            duration,
        };
        self.activities.push(activity.clone());
        activity
    }
}

/// Mutex-guarded in-memory implementation of the ledger port.
#[derive(Debug, Default)]
pub struct InMemoryPumpRepository {
    state: Mutex<State>,
}

impl InMemoryPumpRepository {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, State>, PumpRepositoryError> {
        self.state
            .lock()
            .map_err(|_| PumpRepositoryError::connection("ledger state poisoned"))
    }
}

#[async_trait]
impl PumpRepository for InMemoryPumpRepository {
    async fn find_by_name(
        &self,
        name: &PumpName,
    ) -> Result<Option<Pump>, PumpRepositoryError> {
        let state = self.lock()?;
        Ok(state
            .pump_index_by_name(name)
            .map(|idx| state.pumps[idx].clone()))
    }

    async fn list_pumps(&self, page: Page) -> Result<Vec<Pump>, PumpRepositoryError> {
        let state = self.lock()?;
        let mut pumps = state.pumps.clone();
        pumps.sort_by_key(|p| p.id);
        Ok(pumps
            .into_iter()
            .skip(page.skip() as usize)
            .take(page.limit() as usize)
            .collect())
    }

    async fn list_activities(
        &self,
        pump_id: Option<i32>,
        page: Page,
    ) -> Result<Vec<PumpActivity>, PumpRepositoryError> {
        let state = self.lock()?;
        let mut rows: Vec<PumpActivity> = state
            .activities
            .iter()
            .filter(|a| pump_id.is_none_or(|id| a.pump_id == id))
            .cloned()
            .collect();
        // Newest first; id breaks ties between same-instant rows.
        rows.sort_by(|a, b| (b.timestamp, b.id).cmp(&(a.timestamp, a.id)));
        Ok(rows
            .into_iter()
            .skip(page.skip() as usize)
            .take(page.limit() as usize)
            .collect())
    }

    async fn record_on(
        &self,
        name: &PumpName,
    ) -> Result<RecordOnOutcome, PumpRepositoryError> {
        let mut state = self.lock()?;
        let idx = state
            .pump_index_by_name(name)
            .ok_or_else(|| PumpRepositoryError::not_found(name.as_str()))?;
        let pump_id = state.pumps[idx].id;

        if let Some(open) = state.open_on(pump_id) {
            return Ok(RecordOnOutcome {
                activity: open.clone(),
                was_open: true,
            });
        }

        let activity = state.push_activity(pump_id, PumpAction::On, None);
        let pump = &mut state.pumps[idx];
        pump.is_active = true;
        pump.updated_at = activity.timestamp;
        Ok(RecordOnOutcome {
            activity,
            was_open: false,
        })
    }

    async fn record_off(
        &self,
        name: &PumpName,
    ) -> Result<PumpActivity, PumpRepositoryError> {
        let mut state = self.lock()?;
        let idx = state
            .pump_index_by_name(name)
            .ok_or_else(|| PumpRepositoryError::not_found(name.as_str()))?;
        let pump_id = state.pumps[idx].id;

        let duration = state.open_on(pump_id).map(|open| {
            let elapsed = Utc::now() - open.timestamp;
            (elapsed.num_milliseconds().max(0) as f64) / 1000.0
        });

        let activity = state.push_activity(pump_id, PumpAction::Off, duration);
        let pump = &mut state.pumps[idx];
        pump.is_active = false;
        pump.updated_at = activity.timestamp;
        Ok(activity)
    }

    async fn sync_config(&self, map: &PinMap) -> Result<Vec<Pump>, PumpRepositoryError> {
        let mut state = self.lock()?;
        let mut synced = Vec::with_capacity(map.len());
        for (name, pin) in map.iter() {
            match state.pump_index_by_name(name) {
                Some(idx) => {
                    let pump = &mut state.pumps[idx];
                    if pump.pin != pin {
                        pump.pin = pin;
                        pump.updated_at = Utc::now();
                    }
                    synced.push(pump.clone());
                }
                None => {
                    state.next_pump_id += 1;
                    let now = Utc::now();
                    let pump = Pump {
                        id: state.next_pump_id,
                        name: name.clone(),
                        pin,
                        pump_type: PumpType::infer_from_name(name),
                        description: None,
                        is_active: false,
                        created_at: now,
                        updated_at: now,
                    };
                    state.pumps.push(pump.clone());
                    synced.push(pump);
                }
            }
        }
        synced.sort_by_key(|p| p.id);
        Ok(synced)
    }

    async fn delete_pump(&self, pump_id: i32) -> Result<bool, PumpRepositoryError> {
        let mut state = self.lock()?;
        if state.activities.iter().any(|a| a.pump_id == pump_id) {
            return Err(PumpRepositoryError::query(format!(
                "pump {pump_id} still has activity records"
            )));
        }
        let before = state.pumps.len();
        state.pumps.retain(|p| p.id != pump_id);
        Ok(state.pumps.len() < before)
    }
}
