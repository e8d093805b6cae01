//! Hardware tier HTTP handlers.
//!
//! ```text
//! POST /pump/{name}/on
//! POST /pump/{name}/off
//! GET  /pumps?skip&limit
//! GET  /activities?pump_id&skip&limit
//! ```

use actix_web::{get, post, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::ports::PumpStateChange;
use crate::domain::{Pump, PumpActivity, PumpAction};

use super::error::ApiResult;
use super::state::HttpState;
use super::validation::{parse_page, parse_pump_name};

/// Response payload for an accepted pump command: `{pump, state}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PumpStateBody {
    pub pump: String,
    pub state: PumpAction,
}

impl From<PumpStateChange> for PumpStateBody {
    fn from(change: PumpStateChange) -> Self {
        Self {
            pump: change.pump.to_string(),
            state: change.state,
        }
    }
}

/// Pump listing payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PumpBody {
    pub id: i32,
    pub name: String,
    pub pin: u8,
    #[serde(rename = "type")]
    pub pump_type: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Pump> for PumpBody {
    fn from(pump: Pump) -> Self {
        Self {
            id: pump.id,
            name: pump.name.to_string(),
            pin: pump.pin,
            pump_type: pump.pump_type.as_str().to_owned(),
            description: pump.description,
            is_active: pump.is_active,
            created_at: pump.created_at,
            updated_at: pump.updated_at,
        }
    }
}

/// Activity listing payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PumpActivityBody {
    pub id: i64,
    pub pump_id: i32,
    pub action: PumpAction,
    pub timestamp: DateTime<Utc>,
    pub duration: Option<f64>,
}

impl From<PumpActivity> for PumpActivityBody {
    fn from(activity: PumpActivity) -> Self {
        Self {
            id: activity.id,
            pump_id: activity.pump_id,
            action: activity.action,
            timestamp: activity.timestamp,
            duration: activity.duration,
        }
    }
}

/// Pagination query parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct PageQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

/// Activity listing query parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct ActivityQuery {
    pub pump_id: Option<i32>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

/// Turn a pump on.
#[post("/pump/{name}/on")]
pub async fn pump_on(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<PumpStateBody>> {
    let name = parse_pump_name(&path)?;
    let change = state.commands.turn_on(&name).await?;
    Ok(web::Json(change.into()))
}

/// Turn a pump off.
#[post("/pump/{name}/off")]
pub async fn pump_off(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<PumpStateBody>> {
    let name = parse_pump_name(&path)?;
    let change = state.commands.turn_off(&name).await?;
    Ok(web::Json(change.into()))
}

/// List provisioned pumps.
#[get("/pumps")]
pub async fn list_pumps(
    state: web::Data<HttpState>,
    query: web::Query<PageQuery>,
) -> ApiResult<web::Json<Vec<PumpBody>>> {
    let page = parse_page(query.skip, query.limit)?;
    let pumps = state.queries.list_pumps(page).await?;
    Ok(web::Json(pumps.into_iter().map(Into::into).collect()))
}

/// List activities, newest first, optionally for one pump.
#[get("/activities")]
pub async fn list_activities(
    state: web::Data<HttpState>,
    query: web::Query<ActivityQuery>,
) -> ApiResult<web::Json<Vec<PumpActivityBody>>> {
    let page = parse_page(query.skip, query.limit)?;
    let activities = state.queries.list_activities(query.pump_id, page).await?;
    Ok(web::Json(activities.into_iter().map(Into::into).collect()))
}
