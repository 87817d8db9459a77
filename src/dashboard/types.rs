//! Domain types returned by the dashboard backend.
//!
//! Field names follow the backend's snake_case; camelCase spellings are
//! accepted as aliases. Unknown fields are kept in `extra` so nothing the
//! backend sends is lost when printing or re-submitting an entity.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Entity identifier: the backend uses numeric ids for some tables and
/// string ids (UUIDs, slugs) for others.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
  Number(i64),
  Text(String),
}

impl fmt::Display for Id {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Id::Number(n) => write!(f, "{}", n),
      Id::Text(s) => f.write_str(s),
    }
  }
}

impl From<&str> for Id {
  fn from(value: &str) -> Self {
    match value.parse::<i64>() {
      Ok(n) => Id::Number(n),
      Err(_) => Id::Text(value.to_string()),
    }
  }
}

impl From<i64> for Id {
  fn from(value: i64) -> Self {
    Id::Number(value)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
  #[serde(alias = "_id")]
  pub id: Id,
  #[serde(default)]
  pub title: String,
  pub description: Option<String>,
  pub location: Option<String>,
  #[serde(alias = "startDate")]
  pub start_date: Option<String>,
  #[serde(alias = "endDate")]
  pub end_date: Option<String>,
  pub status: Option<String>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
  #[serde(alias = "_id")]
  pub id: Id,
  #[serde(default, alias = "firstName")]
  pub first_name: String,
  #[serde(default, alias = "lastName")]
  pub last_name: String,
  pub email: Option<String>,
  pub phone: Option<String>,
  pub role: Option<String>,
  pub status: Option<String>,
  #[serde(alias = "joinedAt", alias = "join_date")]
  pub joined_at: Option<String>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

impl Member {
  pub fn full_name(&self) -> String {
    format!("{} {}", self.first_name, self.last_name)
      .trim()
      .to_string()
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
  #[serde(alias = "_id")]
  pub id: Id,
  /// "income" or "expense"
  #[serde(rename = "type", alias = "transaction_type", alias = "transactionType")]
  pub kind: Option<String>,
  #[serde(default, deserialize_with = "amount")]
  pub amount: f64,
  pub category: Option<String>,
  pub description: Option<String>,
  pub date: Option<String>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinanceSummary {
  #[serde(default, alias = "totalIncome", deserialize_with = "amount")]
  pub total_income: f64,
  #[serde(
    default,
    alias = "total_expenses",
    alias = "totalExpense",
    alias = "totalExpenses",
    deserialize_with = "amount"
  )]
  pub total_expense: f64,
  #[serde(default, deserialize_with = "amount")]
  pub balance: f64,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsArticle {
  #[serde(alias = "_id")]
  pub id: Id,
  #[serde(default)]
  pub title: String,
  pub content: Option<String>,
  pub author: Option<String>,
  #[serde(default, alias = "isPublished", alias = "is_published")]
  pub published: bool,
  #[serde(alias = "publishedAt")]
  pub published_at: Option<String>,
  #[serde(alias = "imageUrl")]
  pub image_url: Option<String>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeetingMinutes {
  #[serde(alias = "_id")]
  pub id: Id,
  #[serde(default)]
  pub title: String,
  #[serde(alias = "meetingDate", alias = "date")]
  pub meeting_date: Option<String>,
  #[serde(default)]
  pub attendees: Vec<String>,
  pub content: Option<String>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedFile {
  #[serde(alias = "fileUrl", alias = "file_url", alias = "location")]
  pub url: String,
  #[serde(alias = "fileName", alias = "originalName", alias = "filename")]
  pub file_name: Option<String>,
  pub size: Option<u64>,
  #[serde(alias = "mimeType", alias = "mimetype")]
  pub mime_type: Option<String>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

/// Amounts arrive as numbers or as decimal strings ("12.50").
fn amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
  D: Deserializer<'de>,
{
  match Value::deserialize(deserializer)? {
    Value::Number(n) => Ok(n.as_f64().unwrap_or_default()),
    Value::String(s) => s
      .trim()
      .parse()
      .map_err(|_| serde::de::Error::custom(format!("invalid amount: {:?}", s))),
    Value::Null => Ok(0.0),
    other => Err(serde::de::Error::custom(format!("invalid amount: {}", other))),
  }
}
