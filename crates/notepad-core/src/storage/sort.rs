//! Sort specifications for note listings.
//!
//! A specification is a comma-separated list of `field [direction]` items,
//! for example `"lower(name) asc, modified desc"`. Parsing produces a
//! [`SortOrder`], which composes one comparator per field into a single
//! lexicographic ordering. Both storage engines sort through this module so
//! their listings agree exactly.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::{NotePadError, Result};
use crate::storage::types::NoteItem;

/// A composable total-order comparator over notes.
pub type NoteComparator = Box<dyn Fn(&NoteItem, &NoteItem) -> Ordering + Send + Sync>;

/// A sortable note attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    RowId,
    Created,
    Modified,
    CategoryId,
    /// Category name, optionally compared case-insensitively
    CategoryName { case_fold: bool },
    Privacy,
    Content,
}

impl SortField {
    fn parse(token: &str) -> Result<Self> {
        let normalized: String = token
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "_id" | "id" => Ok(SortField::RowId),
            "created" => Ok(SortField::Created),
            "modified" => Ok(SortField::Modified),
            "category_id" => Ok(SortField::CategoryId),
            "name" | "category" => Ok(SortField::CategoryName { case_fold: false }),
            "lower(name)" | "lower(category)" => Ok(SortField::CategoryName { case_fold: true }),
            "private" | "privacy" => Ok(SortField::Privacy),
            "note" | "content" => Ok(SortField::Content),
            _ => Err(NotePadError::InvalidSortField(token.trim().to_string())),
        }
    }

    fn token(self) -> &'static str {
        match self {
            SortField::RowId => "_id",
            SortField::Created => "created",
            SortField::Modified => "modified",
            SortField::CategoryId => "category_id",
            SortField::CategoryName { case_fold: false } => "name",
            SortField::CategoryName { case_fold: true } => "lower(name)",
            SortField::Privacy => "private",
            SortField::Content => "note",
        }
    }

    /// The ascending comparator for this field.
    ///
    /// Absent values sort before present ones. Category names fall back to
    /// category ids only when both names are absent, which keeps a mix of
    /// joined and unjoined notes totally ordered.
    pub fn comparator(self) -> NoteComparator {
        match self {
            SortField::RowId => Box::new(|a, b| a.id.cmp(&b.id)),
            SortField::Created => Box::new(|a, b| a.created.cmp(&b.created)),
            SortField::Modified => Box::new(|a, b| a.modified.cmp(&b.modified)),
            SortField::CategoryId => Box::new(|a, b| a.category_id.cmp(&b.category_id)),
            SortField::CategoryName { case_fold } => Box::new(move |a, b| {
                match (a.category_name.as_deref(), b.category_name.as_deref()) {
                    (Some(left), Some(right)) if case_fold => {
                        left.to_lowercase().cmp(&right.to_lowercase())
                    }
                    (Some(left), Some(right)) => left.cmp(right),
                    (None, Some(_)) => Ordering::Less,
                    (Some(_), None) => Ordering::Greater,
                    (None, None) => a.category_id.cmp(&b.category_id),
                }
            }),
            SortField::Privacy => Box::new(|a, b| a.privacy.cmp(&b.privacy)),
            // Option<NoteContent>: None < Text < Cipher
            SortField::Content => Box::new(|a, b| a.content.cmp(&b.content)),
        }
    }
}

/// Sort direction of one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    fn parse(token: &str) -> Result<Self> {
        match token.to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortDirection::Ascending),
            "desc" | "descending" => Ok(SortDirection::Descending),
            _ => Err(NotePadError::InvalidSortDirection(token.to_string())),
        }
    }
}

/// Wrap a comparator so it yields the opposite order.
///
/// The wrapped comparator is left untouched, so the same field comparator
/// can appear ascending in one order and descending in another.
pub fn reversed(inner: NoteComparator) -> NoteComparator {
    Box::new(move |a, b| inner(a, b).reverse())
}

/// Compose two comparators: `second` only breaks ties left by `first`.
pub fn then(first: NoteComparator, second: NoteComparator) -> NoteComparator {
    Box::new(move |a, b| first(a, b).then_with(|| second(a, b)))
}

/// One `(field, direction)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    pub fn comparator(&self) -> NoteComparator {
        match self.direction {
            SortDirection::Ascending => self.field.comparator(),
            SortDirection::Descending => reversed(self.field.comparator()),
        }
    }
}

/// An ordered list of sort keys.
///
/// The empty order sorts by row id.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SortOrder {
    keys: Vec<SortKey>,
}

impl SortOrder {
    /// Order by a single ascending field.
    pub fn by(field: SortField) -> Self {
        Self {
            keys: vec![SortKey::new(field, SortDirection::Ascending)],
        }
    }

    /// Append a tiebreak key.
    pub fn then_by(mut self, field: SortField, direction: SortDirection) -> Self {
        self.keys.push(SortKey::new(field, direction));
        self
    }

    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// The composed comparator, ending with an ascending row-id tiebreak so
    /// that the order is total.
    pub fn comparator(&self) -> NoteComparator {
        self.keys
            .iter()
            .rev()
            .fold(SortField::RowId.comparator(), |rest, key| {
                then(key.comparator(), rest)
            })
    }

    /// Sort `notes` in place.
    pub fn sort(&self, notes: &mut [NoteItem]) {
        let comparator = self.comparator();
        notes.sort_by(|a, b| comparator(a, b));
    }
}

impl FromStr for SortOrder {
    type Err = NotePadError;

    fn from_str(spec: &str) -> Result<Self> {
        if spec.trim().is_empty() {
            return Ok(SortOrder::default());
        }

        let mut keys = Vec::new();
        for item in spec.split(',') {
            let item = item.trim();
            if item.is_empty() {
                return Err(NotePadError::InvalidSortField(String::new()));
            }

            let (field_token, rest) = split_field(item);
            let field = SortField::parse(field_token)?;

            let mut words = rest.split_whitespace();
            let direction = match words.next() {
                Some(token) => SortDirection::parse(token)?,
                None => SortDirection::Ascending,
            };
            if let Some(extra) = words.next() {
                return Err(NotePadError::InvalidSortDirection(extra.to_string()));
            }

            keys.push(SortKey::new(field, direction));
        }

        Ok(SortOrder { keys })
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, key) in self.keys.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            let direction = match key.direction {
                SortDirection::Ascending => "asc",
                SortDirection::Descending => "desc",
            };
            write!(f, "{} {}", key.field.token(), direction)?;
        }
        Ok(())
    }
}

/// Split an item into its field token and the remainder, keeping
/// `lower( name )` together.
fn split_field(item: &str) -> (&str, &str) {
    if item.to_ascii_lowercase().starts_with("lower") {
        if let Some(close) = item.find(')') {
            return (&item[..=close], &item[close + 1..]);
        }
    }
    match item.find(char::is_whitespace) {
        Some(split) => (&item[..split], &item[split..]),
        None => (item, ""),
    }
}
