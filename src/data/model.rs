use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DataError;

// ---------------------------------------------------------------------------
// ColumnType – semantic type declared in the second header row
// ---------------------------------------------------------------------------

/// Semantic type of a data column. The set is closed; every consumer
/// dispatches on it with an exhaustive `match`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    String,
    Number,
    Boolean,
    Date,
    Timestamp,
    Category,
    /// Patient identifier.
    Pid,
    /// Event identifier.
    Eid,
}

impl ColumnType {
    pub fn as_str(self) -> &'static str {
        match self {
            ColumnType::String => "string",
            ColumnType::Number => "number",
            ColumnType::Boolean => "boolean",
            ColumnType::Date => "date",
            ColumnType::Timestamp => "timestamp",
            ColumnType::Category => "category",
            ColumnType::Pid => "pid",
            ColumnType::Eid => "eid",
        }
    }

    /// Whether cells of this type map onto a continuous axis.
    pub fn is_continuous(self) -> bool {
        matches!(
            self,
            ColumnType::Number | ColumnType::Date | ColumnType::Timestamp
        )
    }

    /// Date and timestamp columns share the interval filter and binning.
    pub fn is_temporal(self) -> bool {
        matches!(self, ColumnType::Date | ColumnType::Timestamp)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColumnType {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "string" => Ok(ColumnType::String),
            "number" => Ok(ColumnType::Number),
            "boolean" => Ok(ColumnType::Boolean),
            "date" => Ok(ColumnType::Date),
            "timestamp" => Ok(ColumnType::Timestamp),
            "category" => Ok(ColumnType::Category),
            "pid" => Ok(ColumnType::Pid),
            "eid" => Ok(ColumnType::Eid),
            other => Err(DataError::UnknownColumnType(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Column – static metadata computed from the header rows
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    /// Position of the cell in [`Entity::values`].
    pub index: usize,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType, index: usize) -> Self {
        Self {
            name: name.into(),
            column_type,
            index,
        }
    }
}

// ---------------------------------------------------------------------------
// EntityId / Entity – one row of a table
// ---------------------------------------------------------------------------

/// Stable row identifier, unique within its table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for EntityId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        EntityId(s.to_string())
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        EntityId(s)
    }
}

/// A single row: identifier plus raw, unparsed cell values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub uid: EntityId,
    pub values: Vec<String>,
}

impl Entity {
    pub fn new(uid: impl Into<EntityId>, values: Vec<String>) -> Self {
        Self {
            uid: uid.into(),
            values,
        }
    }

    /// Raw cell for `column`, `None` when the row is shorter than the header.
    pub fn cell(&self, column: &Column) -> Option<&str> {
        self.values.get(column.index).map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// EntityKind – which of the two linked tables
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Patients,
    Events,
}

impl EntityKind {
    /// Column type whose cell value becomes the row uid.
    pub fn id_column_type(self) -> ColumnType {
        match self {
            EntityKind::Patients => ColumnType::Pid,
            EntityKind::Events => ColumnType::Eid,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            EntityKind::Patients => "Patient",
            EntityKind::Events => "Event",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Patients => f.write_str("patients"),
            EntityKind::Events => f.write_str("events"),
        }
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "patients" => Ok(EntityKind::Patients),
            "events" => Ok(EntityKind::Events),
            other => Err(format!("unknown view '{other}', expected patients or events")),
        }
    }
}

// ---------------------------------------------------------------------------
// EntityTable – the complete loaded table
// ---------------------------------------------------------------------------

/// Immutable table of entities with a uid lookup index.
#[derive(Debug, Clone)]
pub struct EntityTable {
    pub kind: EntityKind,
    pub columns: Vec<Column>,
    pub rows: Vec<Entity>,
    row_index: HashMap<EntityId, usize>,
}

impl EntityTable {
    /// Build the uid index. Rows must already carry unique uids; the loader
    /// drops duplicates before this point, and a later duplicate is ignored
    /// by the index.
    pub fn new(kind: EntityKind, columns: Vec<Column>, rows: Vec<Entity>) -> Self {
        let mut row_index = HashMap::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            row_index.entry(row.uid.clone()).or_insert(i);
        }
        Self {
            kind,
            columns,
            rows,
            row_index,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// First column of the given type.
    pub fn first_column_of(&self, column_type: ColumnType) -> Option<&Column> {
        self.columns.iter().find(|c| c.column_type == column_type)
    }

    /// The `pid` column linking rows of this table to patients.
    pub fn pid_column(&self) -> Option<&Column> {
        self.first_column_of(ColumnType::Pid)
    }

    pub fn row(&self, uid: &str) -> Option<&Entity> {
        self.row_index.get(uid).map(|&i| &self.rows[i])
    }

    pub fn contains(&self, uid: &str) -> bool {
        self.row_index.contains_key(uid)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}
