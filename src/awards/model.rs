use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::BoardError;

/// An award division as reported by the awards endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Division {
    pub div_id: u64,
    pub rsu_div_id: u64,
    pub name: String,
    pub num_awards: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prio: Option<u32>,
    #[serde(default, rename = "gen", skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<u32>,
}

impl Division {
    pub fn new(div_id: u64, rsu_div_id: u64, name: impl Into<String>, num_awards: u32) -> Self {
        Division {
            div_id,
            rsu_div_id,
            name: name.into(),
            num_awards,
            shname: None,
            prio: None,
            gender: None,
            min: None,
            max: None,
        }
    }

    pub fn with_gender(mut self, gender: impl Into<String>) -> Self {
        self.gender = Some(gender.into());
        self
    }
}

/// Current holder of one award place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Award {
    pub awardee_id: u64,
    pub div_id: u64,
    pub rsu_div_id: u64,
    pub place: u32,
    pub name: String,
    pub bib: String,
    pub picked_up: bool,
    pub prev_picked_up: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Payload of the awards endpoint.
///
/// `divisions` is only present when requested; each row holds one division
/// per gender column, padded with `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwardsData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub divisions: Option<Vec<Vec<Option<Division>>>>,
    #[serde(default)]
    pub awards: Vec<Award>,
}

/// Result of toggling an award's picked-up flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickupStatus {
    pub picked_up: bool,
    #[serde(default)]
    pub prev_picked_up: bool,
}

#[derive(Deserialize)]
struct NotesBody {
    #[serde(default)]
    notes: String,
}

/// Check the `error` member of a response envelope.
fn envelope(body: &str) -> Result<Value, BoardError> {
    let value: Value = serde_json::from_str(body)?;
    if let Some(error) = value.get("error").and_then(Value::as_str) {
        return Err(BoardError::Backend(error.to_string()));
    }
    if value.get("status").and_then(Value::as_str) == Some("fail") {
        return Err(BoardError::Backend("request failed".into()));
    }
    Ok(value)
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, BoardError> {
    Ok(serde_json::from_value(value)?)
}

/// Decode an awards response (`{"status": "success", "data": {...}}`).
pub fn decode_awards(body: &str) -> Result<AwardsData, BoardError> {
    let mut value = envelope(body)?;
    let data = value
        .get_mut("data")
        .map(Value::take)
        .ok_or_else(|| BoardError::Decode("missing data member".into()))?;
    decode(data)
}

/// Decode a picked-up toggle response; fields sit at the top level.
pub fn decode_pickup(body: &str) -> Result<PickupStatus, BoardError> {
    decode(envelope(body)?)
}

/// Decode a notes response; fields sit at the top level.
pub fn decode_notes(body: &str) -> Result<String, BoardError> {
    let notes: NotesBody = decode(envelope(body)?)?;
    Ok(notes.notes)
}
