//! Serde adapters for fields that are BSON-native in MongoDB but plain
//! strings in JSON.
//!
//! The MongoDB driver serializes through a non human-readable serializer, so
//! these adapters emit a real `ObjectId` / BSON date there and a hex string /
//! RFC 3339 string everywhere else (JSON responses, request bodies, tests).

use bson::oid::ObjectId;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Serializer options for turning entities into documents by hand.
pub fn bson_serializer_options() -> bson::SerializerOptions {
    bson::SerializerOptions::builder().human_readable(false).build()
}

/// Deserializer options matching [`bson_serializer_options`].
pub fn bson_deserializer_options() -> bson::DeserializerOptions {
    bson::DeserializerOptions::builder()
        .human_readable(false)
        .build()
}

/// Format used for every timestamp rendered to clients.
pub fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub mod object_id {
    use super::*;

    pub fn serialize<S: Serializer>(value: &ObjectId, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            value.to_hex().serialize(serializer)
        } else {
            value.serialize(serializer)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ObjectId, D::Error> {
        if deserializer.is_human_readable() {
            let raw = String::deserialize(deserializer)?;
            ObjectId::parse_str(&raw).map_err(D::Error::custom)
        } else {
            ObjectId::deserialize(deserializer)
        }
    }
}

pub mod timestamp {
    use super::*;

    pub fn serialize<S: Serializer>(
        value: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            format_timestamp(value).serialize(serializer)
        } else {
            bson::DateTime::from_chrono(*value).serialize(serializer)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        if deserializer.is_human_readable() {
            let raw = String::deserialize(deserializer)?;
            DateTime::parse_from_rfc3339(&raw)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(D::Error::custom)
        } else {
            bson::DateTime::deserialize(deserializer).map(|dt| dt.to_chrono())
        }
    }
}

pub mod opt_timestamp {
    use super::*;

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(value) => super::timestamp::serialize(value, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        if deserializer.is_human_readable() {
            let raw: Option<String> = Option::deserialize(deserializer)?;
            raw.map(|raw| {
                DateTime::parse_from_rfc3339(&raw)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(D::Error::custom)
            })
            .transpose()
        } else {
            let raw: Option<bson::DateTime> = Option::deserialize(deserializer)?;
            Ok(raw.map(|dt| dt.to_chrono()))
        }
    }
}
