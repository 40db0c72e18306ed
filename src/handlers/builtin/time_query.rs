//! Current-time handler.

use chrono::{FixedOffset, Utc};
use serde_json::Value;

use crate::error::{HandlerErrorKind, RpcError, RpcResult};
use crate::handlers::{Handler, HandlerParams};

/// Returns the current time, optionally shifted by `offset_hours`.
pub struct TimeQueryHandler;

fn offset_for(hours: i64) -> RpcResult<FixedOffset> {
    let invalid = || RpcError::Handler {
        kind: HandlerErrorKind::InvalidParameter {
            param: "offset_hours".to_string(),
            message: format!("{} is outside -12..=14", hours),
        },
    };
    if !(-12..=14).contains(&hours) {
        return Err(invalid());
    }
    FixedOffset::east_opt((hours * 3600) as i32).ok_or_else(invalid)
}

impl Handler for TimeQueryHandler {
    fn request_type(&self) -> &str {
        "time_query"
    }

    fn validate(&self, params: &HandlerParams) -> RpcResult<()> {
        if let Some(hours) = params.get_optional_i64("offset_hours")? {
            offset_for(hours)?;
        }
        Ok(())
    }

    fn handle(&self, params: HandlerParams) -> RpcResult<Value> {
        let hours = params.get_optional_i64("offset_hours")?.unwrap_or(0);
        let offset = offset_for(hours)?;
        let now = Utc::now().with_timezone(&offset);
        let timezone = if hours == 0 {
            "UTC".to_string()
        } else {
            offset.to_string()
        };

        Ok(serde_json::json!({
            "result": now.to_rfc3339(),
            "timezone": timezone,
        }))
    }
}
