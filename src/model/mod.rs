//! Typed decoding of upstream query result envelopes.
//!
//! The upstream API returns `{"status": ..., "data": {"resultType": <tag>,
//! "result": <shape>}}` where the payload shape is determined only by the
//! sibling tag. Decoding is therefore two-phase: first capture the tag and
//! the raw unparsed `result` bytes, then parse the payload into the variant
//! the tag names. The tag is authoritative; the payload shape is never
//! guessed (an empty list is valid for both vector and matrix, so guessing
//! would be ambiguous).

pub mod value;

pub use value::{Labels, SamplePair, SampleValue, StringSample};

use crate::error::DecodeError;
use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use std::fmt;

/// Envelope status reported by a successful upstream query.
pub const STATUS_SUCCESS: &str = "success";

/// The closed set of result shapes the upstream API can return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultType {
    None,
    Scalar,
    Vector,
    Matrix,
    String,
}

impl ResultType {
    /// The tag's canonical wire form.
    pub fn as_str(self) -> &'static str {
        match self {
            ResultType::None => "none",
            ResultType::Scalar => "scalar",
            ResultType::Vector => "vector",
            ResultType::Matrix => "matrix",
            ResultType::String => "string",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "none" => Some(ResultType::None),
            "scalar" => Some(ResultType::Scalar),
            "vector" => Some(ResultType::Vector),
            "matrix" => Some(ResultType::Matrix),
            "string" => Some(ResultType::String),
            _ => None,
        }
    }
}

impl fmt::Display for ResultType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One instant-vector entry: a label set with a single sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorSample {
    pub metric: Labels,
    pub value: SamplePair,
}

/// One matrix entry: a label set with an ordered run of samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesRange {
    pub metric: Labels,
    pub values: Vec<SamplePair>,
}

/// The decoded `result` payload, one constructor per tag.
///
/// Scalar and string results are owned singletons; vector and matrix own
/// their sequences in received order.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultValue {
    Scalar(Box<SamplePair>),
    String(Box<StringSample>),
    Vector(Vec<VectorSample>),
    Matrix(Vec<SeriesRange>),
}

/// The `data` member of an envelope: the tag plus the typed payload.
///
/// `result` is `None` exactly when `result_type` is [`ResultType::None`].
#[derive(Debug, Clone, PartialEq)]
pub struct PrometheusData {
    pub result_type: ResultType,
    pub result: Option<ResultValue>,
}

/// Top-level upstream query response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrometheusEnvelope {
    pub status: String,
    pub data: PrometheusData,
}

impl PrometheusEnvelope {
    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }
}

/// Decode a raw response body into a typed envelope.
///
/// This is the typed entry point: shell failures come back as
/// [`DecodeError::Envelope`], an unrecognized tag as
/// [`DecodeError::UnknownResultType`] carrying the literal tag, and a payload
/// that does not match its declared tag as [`DecodeError::MalformedResult`].
pub fn decode_envelope(bytes: &[u8]) -> Result<PrometheusEnvelope, DecodeError> {
    let shell: EnvelopeShell = serde_json::from_slice(bytes)?;
    let data = decode_data(&shell.data.result_type, shell.data.result.as_deref())?;
    Ok(PrometheusEnvelope {
        status: shell.status,
        data,
    })
}

// Phase one: the shell keeps `result` as raw bytes until the tag is known.
#[derive(Deserialize)]
struct EnvelopeShell {
    status: String,
    data: DataShell,
}

#[derive(Deserialize)]
struct DataShell {
    #[serde(rename = "resultType")]
    result_type: String,
    result: Option<Box<RawValue>>,
}

// Phase two: dispatch on the tag and parse the captured bytes.
fn decode_data(tag: &str, raw: Option<&RawValue>) -> Result<PrometheusData, DecodeError> {
    let result_type =
        ResultType::from_tag(tag).ok_or_else(|| DecodeError::UnknownResultType(tag.to_string()))?;

    // A missing `result` parses as `null`, which fails shape parsing for
    // every tag except `none`.
    let raw = raw.map(RawValue::get).unwrap_or("null");

    let result = match result_type {
        ResultType::None => None,
        ResultType::Scalar => Some(ResultValue::Scalar(Box::new(parse_shape(raw, "scalar")?))),
        ResultType::String => Some(ResultValue::String(Box::new(parse_shape(raw, "string")?))),
        ResultType::Vector => Some(ResultValue::Vector(parse_shape(raw, "vector")?)),
        ResultType::Matrix => Some(ResultValue::Matrix(parse_shape(raw, "matrix")?)),
    };

    Ok(PrometheusData {
        result_type,
        result,
    })
}

fn parse_shape<T: serde::de::DeserializeOwned>(
    raw: &str,
    result_type: &'static str,
) -> Result<T, DecodeError> {
    serde_json::from_str(raw).map_err(|source| DecodeError::MalformedResult {
        result_type,
        source,
    })
}

impl Serialize for PrometheusData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let entries = if self.result.is_some() { 2 } else { 1 };
        let mut map = serializer.serialize_map(Some(entries))?;
        map.serialize_entry("resultType", self.result_type.as_str())?;
        match &self.result {
            Some(ResultValue::Scalar(v)) => map.serialize_entry("result", v)?,
            Some(ResultValue::String(v)) => map.serialize_entry("result", v)?,
            Some(ResultValue::Vector(v)) => map.serialize_entry("result", v)?,
            Some(ResultValue::Matrix(v)) => map.serialize_entry("result", v)?,
            None => {}
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for PrometheusData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let shell = DataShell::deserialize(deserializer)?;
        decode_data(&shell.result_type, shell.result.as_deref()).map_err(de::Error::custom)
    }
}
