use axum::extract::{FromRequest, FromRequestParts};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bson::oid::ObjectId;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::db::records::{DateRange, PageRequest};
use crate::error::AppError;

/// JSON body extractor whose rejections render as a 400 envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

/// Query-string extractor whose rejections render as a 400 envelope.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct QueryParams<T>(pub T);

/// Page metadata attached to list responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u64,
    pub total_pages: u64,
    pub total_items: u64,
    pub limit: u64,
}

impl Pagination {
    pub fn new(page: PageRequest, total_items: u64) -> Self {
        Self {
            current_page: page.page,
            total_pages: page.total_pages(total_items),
            total_items,
            limit: page.limit,
        }
    }
}

/// The `{success, message?, data?, pagination?}` envelope every handler
/// answers with.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize = serde_json::Value> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pagination: Option<Pagination>,
    #[serde(skip)]
    status: StatusCode,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
            pagination: None,
            status: StatusCode::OK,
        }
    }

    /// 201 with the created resource.
    pub fn created(data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            ..Self::ok(data)
        }
    }

    /// A bare confirmation without data.
    pub fn message_only(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
            pagination: None,
            status: StatusCode::OK,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status;
        (status, axum::Json(self)).into_response()
    }
}

/// Query parameters understood by the list endpoints. Everything arrives as
/// text so a malformed number falls back to its default instead of failing.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub keyword: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub search_type: Option<String>,
    pub board_type: Option<String>,
    pub category: Option<String>,
}

impl ListParams {
    pub fn page_request(&self, default_limit: u64) -> PageRequest {
        PageRequest::parse(self.page.as_deref(), self.limit.as_deref(), default_limit)
    }

    /// `startDate` from 00:00:00.000 and `endDate` through 23:59:59.999 (UTC).
    pub fn date_range(&self) -> Result<DateRange, AppError> {
        Ok(DateRange {
            from: parse_date_bound(self.start_date.as_deref(), false)?,
            to: parse_date_bound(self.end_date.as_deref(), true)?,
        })
    }
}

/// Parse a `YYYY-MM-DD` day or an RFC 3339 instant. Blank means unbounded.
pub fn parse_date_bound(
    raw: Option<&str>,
    end_of_day: bool,
) -> Result<Option<DateTime<Utc>>, AppError> {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return Ok(None);
    };

    if let Ok(day) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        let at = if end_of_day {
            day.and_hms_milli_opt(23, 59, 59, 999)
        } else {
            day.and_hms_opt(0, 0, 0)
        };
        return at
            .map(|at| Some(at.and_utc()))
            .ok_or_else(|| AppError::BadRequest(format!("Invalid date: {raw}")));
    }

    DateTime::parse_from_rfc3339(raw)
        .map(|at| Some(at.with_timezone(&Utc)))
        .map_err(|_| AppError::BadRequest(format!("Invalid date: {raw}")))
}

/// Parse a path id. A malformed id cannot name an existing record, so it
/// reports the same not-found error as a missing one.
pub fn parse_id(raw: &str, label: &str) -> Result<ObjectId, AppError> {
    ObjectId::parse_str(raw.trim()).map_err(|_| AppError::not_found(label))
}

/// Keep only `_id` and the listed fields of a rendered object.
pub fn only(value: serde_json::Value, fields: &[&str]) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => map
            .into_iter()
            .filter(|(key, _)| key == "_id" || fields.contains(&key.as_str()))
            .collect::<serde_json::Map<_, _>>()
            .into(),
        other => other,
    }
}

/// Drop the listed fields from a rendered object.
pub fn without(mut value: serde_json::Value, fields: &[&str]) -> serde_json::Value {
    if let Some(map) = value.as_object_mut() {
        for field in fields {
            map.remove(*field);
        }
    }
    value
}

/// Body of the bulk endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct IdsBody {
    #[serde(default)]
    pub ids: Vec<String>,
}
