//! PostgreSQL-backed activity ledger.
//!
//! Implements [`PumpRepository`] over Diesel with `diesel-async`. Every
//! read-then-write sequence runs inside a transaction that first takes a
//! `FOR UPDATE` lock on the pump row, so concurrent commands for the same
//! pump serialize at the database even across processes.

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use tracing::debug;

use crate::domain::ports::{Page, PumpRepository, PumpRepositoryError, RecordOnOutcome};
use crate::domain::{PinMap, Pump, PumpActivity, PumpAction, PumpName, PumpType};

use super::models::{NewPumpActivityRow, NewPumpRow, PumpActivityRow, PumpRow};
use super::pool::{DbPool, PoolError};
use super::schema::{pump_activities, pumps};

/// Diesel-backed implementation of the pump ledger port.
#[derive(Clone)]
pub struct DieselPumpRepository {
    pool: DbPool,
}

impl DieselPumpRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> PumpRepositoryError {
    let message = match error {
        PoolError::Checkout { message } | PoolError::Build { message } => message,
    };
    PumpRepositoryError::connection(message)
}

fn map_diesel_error(error: diesel::result::Error) -> PumpRepositoryError {
    use diesel::result::{DatabaseErrorKind, Error as DieselError};

    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(
            error_type = %std::any::type_name_of_val(&error),
            "diesel operation failed"
        ),
    }

    match error {
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            PumpRepositoryError::connection("database connection error")
        }
        DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
            PumpRepositoryError::query("pump has ledger activity")
        }
        _ => PumpRepositoryError::query(error.to_string()),
    }
}

fn map_row_error(message: String) -> PumpRepositoryError {
    PumpRepositoryError::query(message)
}

/// Lock the pump row for the rest of the transaction.
async fn lock_pump_row(
    conn: &mut AsyncPgConnection,
    name: &PumpName,
) -> Result<Option<PumpRow>, diesel::result::Error> {
    pumps::table
        .filter(pumps::name.eq(name.as_str()))
        .select(PumpRow::as_select())
        .for_update()
        .first(conn)
        .await
        .optional()
}

/// Newest ledger entry for a pump, if any.
async fn latest_activity(
    conn: &mut AsyncPgConnection,
    pump_id: i32,
) -> Result<Option<PumpActivityRow>, diesel::result::Error> {
    pump_activities::table
        .filter(pump_activities::pump_id.eq(pump_id))
        .order((pump_activities::timestamp.desc(), pump_activities::id.desc()))
        .select(PumpActivityRow::as_select())
        .first(conn)
        .await
        .optional()
}

async fn set_pump_active(
    conn: &mut AsyncPgConnection,
    pump_id: i32,
    is_active: bool,
) -> Result<(), diesel::result::Error> {
    diesel::update(pumps::table.filter(pumps::id.eq(pump_id)))
        .set((
            pumps::is_active.eq(is_active),
            pumps::updated_at.eq(diesel::dsl::now),
        ))
        .execute(conn)
        .await
        .map(|_| ())
}

/// The open ON entry, when the newest ledger entry is an ON.
fn open_on(latest: Option<PumpActivityRow>) -> Option<PumpActivityRow> {
    latest.filter(|row| row.action == PumpAction::On.as_str())
}

/// Seconds elapsed since the open ON entry, clamped at zero.
fn elapsed_seconds(open_on: &PumpActivityRow) -> f64 {
    let millis = (Utc::now() - open_on.timestamp).num_milliseconds().max(0);
    #[expect(clippy::cast_precision_loss, reason = "run times are far below 2^52 ms")]
    let millis = millis as f64;
    millis / 1000.0
}

/// Map entries in name order, giving concurrent syncs a stable row lock
/// order.
fn sorted_entries(map: &PinMap) -> Vec<(&PumpName, u8)> {
    let mut entries: Vec<_> = map.iter().collect();
    entries.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));
    entries
}

#[async_trait]
impl PumpRepository for DieselPumpRepository {
    async fn find_by_name(
        &self,
        name: &PumpName,
    ) -> Result<Option<Pump>, PumpRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<PumpRow> = pumps::table
            .filter(pumps::name.eq(name.as_str()))
            .select(PumpRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(Pump::try_from)
            .transpose()
            .map_err(map_row_error)
    }

    async fn list_pumps(&self, page: Page) -> Result<Vec<Pump>, PumpRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<PumpRow> = pumps::table
            .order(pumps::id.asc())
            .offset(page.skip())
            .limit(page.limit())
            .select(PumpRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        rows.into_iter()
            .map(Pump::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map_err(map_row_error)
    }

    async fn list_activities(
        &self,
        pump_id: Option<i32>,
        page: Page,
    ) -> Result<Vec<PumpActivity>, PumpRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let mut query = pump_activities::table.into_boxed();
        if let Some(pump_id) = pump_id {
            query = query.filter(pump_activities::pump_id.eq(pump_id));
        }
        let rows: Vec<PumpActivityRow> = query
            .order((pump_activities::timestamp.desc(), pump_activities::id.desc()))
            .offset(page.skip())
            .limit(page.limit())
            .select(PumpActivityRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        rows.into_iter()
            .map(PumpActivity::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map_err(map_row_error)
    }

    async fn record_on(
        &self,
        name: &PumpName,
    ) -> Result<RecordOnOutcome, PumpRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let outcome: Option<(PumpActivityRow, bool)> = conn
            .transaction(|conn| {
                async move {
                    let Some(pump) = lock_pump_row(conn, name).await? else {
                        return Ok(None);
                    };

                    let latest = latest_activity(conn, pump.id).await?;
                    if let Some(open) = open_on(latest) {
                        set_pump_active(conn, pump.id, true).await?;
                        return Ok(Some((open, true)));
                    }

                    let row: PumpActivityRow = diesel::insert_into(pump_activities::table)
                        .values(&NewPumpActivityRow {
                            pump_id: pump.id,
                            action: PumpAction::On.as_str(),
                            duration: None,
                        })
                        .returning(PumpActivityRow::as_returning())
                        .get_result(conn)
                        .await?;
                    set_pump_active(conn, pump.id, true).await?;
                    Ok(Some((row, false)))
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error)?;

        let (row, was_open) = outcome
            .ok_or_else(|| PumpRepositoryError::not_found(name.as_str()))?;
        Ok(RecordOnOutcome {
            activity: PumpActivity::try_from(row).map_err(map_row_error)?,
            was_open,
        })
    }

    async fn record_off(&self, name: &PumpName) -> Result<PumpActivity, PumpRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<PumpActivityRow> = conn
            .transaction(|conn| {
                async move {
                    let Some(pump) = lock_pump_row(conn, name).await? else {
                        return Ok(None);
                    };

                    let latest = latest_activity(conn, pump.id).await?;
                    let duration = open_on(latest).as_ref().map(elapsed_seconds);

                    let row: PumpActivityRow = diesel::insert_into(pump_activities::table)
                        .values(&NewPumpActivityRow {
                            pump_id: pump.id,
                            action: PumpAction::Off.as_str(),
                            duration,
                        })
                        .returning(PumpActivityRow::as_returning())
                        .get_result(conn)
                        .await?;
                    set_pump_active(conn, pump.id, false).await?;
                    Ok(Some(row))
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error)?;

        let row = row.ok_or_else(|| PumpRepositoryError::not_found(name.as_str()))?;
        PumpActivity::try_from(row).map_err(map_row_error)
    }

    async fn sync_config(&self, map: &PinMap) -> Result<Vec<Pump>, PumpRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<PumpRow> = conn
            .transaction(|conn| {
                async move {
                    let mut rows = Vec::with_capacity(map.len());
                    for (name, pin) in sorted_entries(map) {
                        let existing = lock_pump_row(conn, name).await?;
                        let row = match existing {
                            Some(row) if row.pin == i16::from(pin) => row,
                            Some(row) => {
                                diesel::update(pumps::table.filter(pumps::id.eq(row.id)))
                                    .set((
                                        pumps::pin.eq(i16::from(pin)),
                                        pumps::updated_at.eq(diesel::dsl::now),
                                    ))
                                    .returning(PumpRow::as_returning())
                                    .get_result(conn)
                                    .await?
                            }
                            None => {
                                let pump_type = PumpType::infer_from_name(name);
                                diesel::insert_into(pumps::table)
                                    .values(&NewPumpRow {
                                        name: name.as_str(),
                                        pin: i16::from(pin),
                                        pump_type: pump_type.as_str(),
                                        description: None,
                                    })
                                    .returning(PumpRow::as_returning())
                                    .get_result(conn)
                                    .await?
                            }
                        };
                        rows.push(row);
                    }
                    Ok(rows)
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error)?;

        rows.into_iter()
            .map(Pump::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map_err(map_row_error)
    }

    async fn delete_pump(&self, pump_id: i32) -> Result<bool, PumpRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let deleted = diesel::delete(pumps::table.filter(pumps::id.eq(pump_id)))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(deleted > 0)
    }
}
