//! Conjunctive search filters built from typed predicates.
//!
//! A [`Filter`] accumulates one [`Predicate`] per supplied criterion. Column
//! names come only from the closed [`Column`] enum and every user-supplied
//! value is carried as data, so the SQLite backend can render the filter with
//! bound parameters only ([`Filter::push_where`]) and the in-memory backend can
//! evaluate the very same predicates ([`Filter::matches`]).
//!
//! Substring predicates follow SQLite `LIKE` semantics on both backends:
//! ASCII case-insensitive, and `%` / `_` in the needle act as wildcards
//! (they are not escaped).

use sqlx::{QueryBuilder, Sqlite};

use crate::models::{CommitRecord, PullRequestRecord};

/// A searchable column. The only way a column name reaches SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Title,
    Body,
    State,
    Author,
    Repository,
    Message,
}

impl Column {
    pub fn as_sql(self) -> &'static str {
        match self {
            Column::Title => "title",
            Column::Body => "body",
            Column::State => "state",
            Column::Author => "author",
            Column::Repository => "repository",
            Column::Message => "message",
        }
    }
}

/// A single filter criterion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// The needle occurs in at least one of the columns.
    Contains {
        columns: &'static [Column],
        needle: String,
    },
    /// The column equals the value exactly.
    Equals { column: Column, value: String },
}

/// Read access to the column values of a record, for in-memory evaluation.
pub trait Columns {
    fn column(&self, column: Column) -> Option<&str>;
}

impl Columns for PullRequestRecord {
    fn column(&self, column: Column) -> Option<&str> {
        match column {
            Column::Title => Some(&self.title),
            Column::Body => self.body.as_deref(),
            Column::State => Some(&self.state),
            Column::Author => Some(&self.author),
            Column::Repository => Some(&self.repository),
            Column::Message => None,
        }
    }
}

impl Columns for CommitRecord {
    fn column(&self, column: Column) -> Option<&str> {
        match column {
            Column::Message => Some(&self.message),
            Column::Author => Some(&self.author),
            Column::Repository => Some(&self.repository),
            Column::Title | Column::Body | Column::State => None,
        }
    }
}

/// An AND-conjunction of predicates. Empty criteria are dropped on entry,
/// so an empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    predicates: Vec<Predicate>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `needle` as a substring of any of `columns`. No-op when empty.
    pub fn contains(mut self, columns: &'static [Column], needle: &str) -> Self {
        if !needle.is_empty() {
            self.predicates.push(Predicate::Contains {
                columns,
                needle: needle.to_string(),
            });
        }
        self
    }

    /// Require `column == value`. No-op when the value is absent or empty.
    pub fn equals(mut self, column: Column, value: Option<&str>) -> Self {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            self.predicates.push(Predicate::Equals {
                column,
                value: value.to_string(),
            });
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Append ` WHERE ... AND ...` to a query, binding every value.
    pub fn push_where(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        for (i, predicate) in self.predicates.iter().enumerate() {
            qb.push(if i == 0 { " WHERE " } else { " AND " });
            match predicate {
                Predicate::Contains { columns, needle } => {
                    let pattern = format!("%{}%", needle);
                    qb.push("(");
                    for (j, column) in columns.iter().enumerate() {
                        if j > 0 {
                            qb.push(" OR ");
                        }
                        qb.push(column.as_sql());
                        qb.push(" LIKE ");
                        qb.push_bind(pattern.clone());
                    }
                    qb.push(")");
                }
                Predicate::Equals { column, value } => {
                    qb.push(column.as_sql());
                    qb.push(" = ");
                    qb.push_bind(value.clone());
                }
            }
        }
    }

    /// Evaluate the filter against a record held in memory.
    pub fn matches<R: Columns>(&self, record: &R) -> bool {
        self.predicates.iter().all(|predicate| match predicate {
            Predicate::Contains { columns, needle } => {
                let pattern: Vec<char> = format!("%{}%", needle).chars().collect();
                columns.iter().any(|c| {
                    record
                        .column(*c)
                        .is_some_and(|text| like_matches(&pattern, text))
                })
            }
            Predicate::Equals { column, value } => record.column(*column) == Some(value.as_str()),
        })
    }
}

/// SQLite `LIKE`: `%` matches any run, `_` any single char, ASCII letters
/// compare case-insensitively.
fn like_matches(pattern: &[char], text: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let (mut p, mut t) = (0usize, 0usize);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && pattern[p] == '%' {
            backtrack = Some((p, t));
            p += 1;
        } else if p < pattern.len()
            && (pattern[p] == '_' || pattern[p].eq_ignore_ascii_case(&text[t]))
        {
            p += 1;
            t += 1;
        } else if let Some((star, mark)) = backtrack {
            p = star + 1;
            t = mark + 1;
            backtrack = Some((star, mark + 1));
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|c| *c == '%')
}
