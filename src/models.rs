// Request bodies, filters and the small amount of response inspection the
// composite operations need.
// Resources themselves stay opaque `serde_json::Value`s. Each request body
// is its own type and decides through `JsonBody` whether it goes on the
// wire as-is or wrapped under a resource key.

use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::{FizzyError, FizzyResult};

/// Encoding of a request body.
pub trait JsonBody {
    fn to_json(&self) -> FizzyResult<String>;
}

fn encode<T: Serialize + ?Sized>(value: &T) -> FizzyResult<String> {
    serde_json::to_string(value).map_err(FizzyError::Serialization)
}

/// Board create/update body. Sent unwrapped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BoardPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl BoardPayload {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none()
    }
}

impl JsonBody for BoardPayload {
    fn to_json(&self) -> FizzyResult<String> {
        encode(self)
    }
}

/// Card create/update body. Sent wrapped as `{"card": {...}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CardPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_ids: Option<Vec<String>>,
}

impl CardPayload {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Serialize)]
struct CardEnvelope<'a> {
    card: &'a CardPayload,
}

impl JsonBody for CardPayload {
    fn to_json(&self) -> FizzyResult<String> {
        encode(&CardEnvelope { card: self })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentPayload {
    pub content: String,
}

impl JsonBody for CommentPayload {
    fn to_json(&self) -> FizzyResult<String> {
        encode(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaggingPayload {
    pub tag_title: String,
}

impl JsonBody for TaggingPayload {
    fn to_json(&self) -> FizzyResult<String> {
        encode(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriagePayload {
    pub column_id: String,
}

impl JsonBody for TriagePayload {
    fn to_json(&self) -> FizzyResult<String> {
        encode(self)
    }
}

/// Query filters for card listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardFilters {
    pub board_id: Option<String>,
    pub column_id: Option<String>,
    pub assignee_id: Option<String>,
    pub tag_id: Option<String>,
    pub status: Option<String>,
}

impl CardFilters {
    /// Set filters in wire order. Unset and empty filters are left out.
    pub fn pairs(&self) -> Vec<(&'static str, &str)> {
        [
            ("board_id", &self.board_id),
            ("column_id", &self.column_id),
            ("assignee_id", &self.assignee_id),
            ("tag_id", &self.tag_id),
            ("status", &self.status),
        ]
        .into_iter()
        .filter_map(|(key, value)| {
            value
                .as_deref()
                .filter(|v| !v.is_empty())
                .map(|v| (key, v))
        })
        .collect()
    }

    /// `?k=v&...`, or an empty string when no filter is set.
    pub fn query_string(&self) -> String {
        let pairs = self.pairs();
        if pairs.is_empty() {
            return String::new();
        }
        let joined = pairs
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        format!("?{}", joined)
    }
}

/// Human-facing card status, each backed by lifecycle sub-resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardStatus {
    Published,
    Closed,
    NotNow,
}

impl CardStatus {
    pub const ALL: [CardStatus; 3] = [
        CardStatus::Published,
        CardStatus::Closed,
        CardStatus::NotNow,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CardStatus::Published => "published",
            CardStatus::Closed => "closed",
            CardStatus::NotNow => "not_now",
        }
    }
}

impl fmt::Display for CardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CardStatus {
    type Err = FizzyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                let accepted = Self::ALL.map(CardStatus::as_str).join(", ");
                FizzyError::validation(format!(
                    "Invalid status \"{}\". Expected one of: {}",
                    s, accepted
                ))
            })
    }
}

/// Render a JSON id (string or number) as a string.
pub fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// The owning board of a card: `board.id`, else `board_id`.
pub fn card_board_id(card: &Value) -> Option<String> {
    card.get("board")
        .and_then(|board| board.get("id"))
        .and_then(id_string)
        .or_else(|| card.get("board_id").and_then(id_string))
}

/// The fields of a column that lookup cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub id: String,
    pub name: String,
}

impl Column {
    pub fn from_value(value: &Value) -> Option<Self> {
        let id = value.get("id").and_then(id_string)?;
        let name = value
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Some(Self { id, name })
    }

    /// Columns from either a bare array or an object with a `columns` array.
    pub fn list_from(value: &Value) -> Vec<Self> {
        let items: &[Value] = match value {
            Value::Array(items) => items.as_slice(),
            Value::Object(map) => map
                .get("columns")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default(),
            _ => &[],
        };
        items.iter().filter_map(Self::from_value).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnMatch {
    ById(Column),
    ByName(Column),
    NotFound,
}

impl ColumnMatch {
    pub fn column(&self) -> Option<&Column> {
        match self {
            ColumnMatch::ById(column) | ColumnMatch::ByName(column) => Some(column),
            ColumnMatch::NotFound => None,
        }
    }
}

/// Exact id match first, then case-insensitive name match.
/// A blank target never matches, and nameless columns are only reachable by id.
pub fn resolve_column(columns: &[Column], target: &str) -> ColumnMatch {
    if target.trim().is_empty() {
        return ColumnMatch::NotFound;
    }
    if let Some(column) = columns.iter().find(|c| c.id == target) {
        return ColumnMatch::ById(column.clone());
    }
    // Name phase skips columns the API returned without a name
    let wanted = target.to_lowercase();
    match columns
        .iter()
        .filter(|c| !c.name.is_empty())
        .find(|c| c.name.to_lowercase() == wanted)
    {
        Some(column) => ColumnMatch::ByName(column.clone()),
        None => ColumnMatch::NotFound,
    }
}
