use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// User identifiers are opaque strings. Older data stored numeric ids, which
/// are read back as their decimal text.
pub type UserId = String;

/// Case-insensitive comparison for names and emails, for any script.
pub fn same_text(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}

/// Account role. Decides which dashboard a user lands on.
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Manager,
    #[default]
    Employee,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Manager => "manager",
            Role::Employee => "employee",
        }
    }

    /// Route a signed-in user of this role is sent to.
    pub fn home_route(self) -> &'static str {
        match self {
            Role::Manager => "/dashboard",
            Role::Employee => "/employee",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored account.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct User {
    #[serde(default, deserialize_with = "lenient::id")]
    pub id: UserId,
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub email: String,
    /// Kept in plain text; the application has no security model.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
    /// Anything other than `manager` reads as an employee.
    #[serde(default, deserialize_with = "lenient::role")]
    pub role: Role,
}

/// A project and all of its tasks. Always stored and replaced as a whole.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(default, deserialize_with = "lenient::id")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "lenient::date")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient::date")]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default = "Utc::now", deserialize_with = "lenient::timestamp_or_now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now", deserialize_with = "lenient::timestamp_or_now")]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub created_by: String,
}

/// A unit of work inside a project.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(default, deserialize_with = "lenient::id")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "lenient::number")]
    pub price: f64,
    /// Estimated effort in hours.
    #[serde(default, deserialize_with = "lenient::number")]
    pub estimated_time: f64,
    #[serde(default, deserialize_with = "lenient::date")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient::date")]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub assigned_to: Assignees,
    #[serde(default)]
    pub assigned_to_names: Vec<String>,
    /// Percent complete, 0 to 100.
    #[serde(default, deserialize_with = "lenient::progress")]
    pub progress: u8,
    #[serde(default, deserialize_with = "lenient::timestamp")]
    pub actual_start_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient::timestamp")]
    pub actual_end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub comments: Vec<TaskComment>,
}

impl Task {
    /// A task is open for claiming when nobody is assigned, by id or by name.
    pub fn is_available(&self) -> bool {
        self.assigned_to.is_empty() && self.assigned_to_names.iter().all(|n| n.trim().is_empty())
    }

    /// Matches by id first, then by display name for records that only
    /// carry names.
    pub fn is_assigned_to(&self, user: &User) -> bool {
        self.assigned_to.contains(&user.id)
            || self
                .assigned_to_names
                .iter()
                .any(|n| same_text(n, &user.name))
    }

    pub fn is_done(&self) -> bool {
        self.progress >= 100
    }
}

/// Set of user ids assigned to a task.
///
/// Stored data holds either `null`, a single id or an array of ids; all three
/// are read into the same set and always written back as an array.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct Assignees(BTreeSet<UserId>);

impl Assignees {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(id: impl Into<UserId>) -> Self {
        let mut set = Self::new();
        set.insert(id);
        set
    }

    pub fn insert(&mut self, id: impl Into<UserId>) -> bool {
        let id = id.into();
        if id.trim().is_empty() {
            return false;
        }
        self.0.insert(id)
    }

    pub fn remove(&mut self, id: &str) -> bool {
        self.0.remove(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains(id)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &UserId> {
        self.0.iter()
    }
}

impl<S: Into<UserId>> FromIterator<S> for Assignees {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Assignees::new();
        for id in iter {
            set.insert(id);
        }
        set
    }
}

impl<'de> Deserialize<'de> for Assignees {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        let ids = match value {
            serde_json::Value::Array(items) => items.into_iter().filter_map(lenient::id_text).collect(),
            other => lenient::id_text(other).into_iter().collect(),
        };
        Ok(ids)
    }
}

/// A comment on a task.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(from = "RawComment")]
pub struct TaskComment {
    pub id: String,
    pub text: String,
    pub author: String,
    pub date: Option<DateTime<Utc>>,
}

impl TaskComment {
    pub fn new(author: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            text: text.into(),
            author: author.into(),
            date: Some(Utc::now()),
        }
    }
}

/// On-disk comment shapes: bare strings from older data, or full records.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawComment {
    Text(String),
    Full {
        #[serde(default, deserialize_with = "lenient::id")]
        id: String,
        #[serde(default, deserialize_with = "lenient::text")]
        text: String,
        #[serde(default, deserialize_with = "lenient::text")]
        author: String,
        #[serde(default, deserialize_with = "lenient::timestamp")]
        date: Option<DateTime<Utc>>,
    },
}

impl From<RawComment> for TaskComment {
    fn from(raw: RawComment) -> Self {
        match raw {
            RawComment::Text(text) => TaskComment {
                id: uuid::Uuid::new_v4().to_string(),
                text,
                author: String::new(),
                date: None,
            },
            RawComment::Full { id, text, author, date } => TaskComment {
                id: if id.is_empty() { uuid::Uuid::new_v4().to_string() } else { id },
                text,
                author,
                date,
            },
        }
    }
}

/// The signed-in user record. At most one exists at a time.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub user_id: Option<UserId>,
    pub role: Role,
    #[serde(default)]
    pub is_authenticated: bool,
    #[serde(default = "Utc::now", deserialize_with = "lenient::timestamp_or_now")]
    pub login_time: DateTime<Utc>,
}

/// Input for a new account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

/// Fields of an account to overwrite.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Default)]
pub struct NewProject {
    pub name: String,
    pub description: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default)]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Input for a new task. `id` is generated when not supplied and `progress`
/// defaults to 0.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub id: Option<String>,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub estimated_time: f64,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub assigned_to: Assignees,
    pub progress: Option<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub estimated_time: Option<f64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub assigned_to: Option<Assignees>,
    pub progress: Option<u8>,
}

/// Tolerant readers for values that older data stored in several shapes.
/// A bad field must not make the whole collection unreadable.
mod lenient {
    use chrono::{DateTime, NaiveDate, Utc};
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub(super) fn id_text(value: Value) -> Option<String> {
        match value {
            Value::String(s) if !s.trim().is_empty() => Some(s),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn id<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(id_text(Value::deserialize(d)?).unwrap_or_default())
    }

    /// Text that older data sometimes stored as null or a number.
    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => String::new(),
        })
    }

    pub fn role<'de, D: Deserializer<'de>>(d: D) -> Result<super::Role, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) if s.trim().eq_ignore_ascii_case("manager") => super::Role::Manager,
            _ => super::Role::Employee,
        })
    }

    pub fn number<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Number(n) => n.as_f64().unwrap_or(0.0),
            Value::String(s) => s.trim().replace(',', ".").parse().unwrap_or(0.0),
            _ => 0.0,
        })
    }

    pub fn progress<'de, D: Deserializer<'de>>(d: D) -> Result<u8, D::Error> {
        let n = number(d)?;
        Ok(n.round().clamp(0.0, 100.0) as u8)
    }

    pub(super) fn parse_date(s: &str) -> Option<NaiveDate> {
        let s = s.trim();
        s.get(..10)
            .and_then(|head| NaiveDate::parse_from_str(head, "%Y-%m-%d").ok())
    }

    pub fn date<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDate>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) => parse_date(&s),
            _ => None,
        })
    }

    fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
        let s = s.trim();
        if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
            return Some(ts.with_timezone(&Utc));
        }
        parse_date(s)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    }

    pub fn timestamp<'de, D: Deserializer<'de>>(d: D) -> Result<Option<DateTime<Utc>>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) => parse_timestamp(&s),
            Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
            _ => None,
        })
    }

    pub fn timestamp_or_now<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        Ok(timestamp(d)?.unwrap_or_else(Utc::now))
    }
}

/// Parses a `YYYY-MM-DD` date, also accepting a full ISO timestamp.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    lenient::parse_date(s)
}
