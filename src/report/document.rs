use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::enums::OrderType;

/// Structured report content, independent of the output format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDocument {
    pub title: String,
    pub header: ReportHeader,
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportHeader {
    /// Laboratory letterhead, one entry per line.
    pub lab_lines: Vec<String>,
    pub order_code: String,
    pub order_type: OrderType,
    pub patient_name: String,
    pub patient_birth_date: Option<NaiveDate>,
    pub professional_name: String,
    pub scientist_name: String,
    pub executed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub heading: String,
    pub entries: Vec<Entry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Entry {
    /// A table row; cells are laid out in fixed columns.
    Row(Vec<String>),
    Text(String),
}

impl Section {
    pub fn new(heading: impl Into<String>) -> Self {
        Self {
            heading: heading.into(),
            entries: Vec::new(),
        }
    }

    pub fn row<I, S>(mut self, cells: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entries.push(Entry::Row(cells.into_iter().map(Into::into).collect()));
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.entries.push(Entry::Text(text.into()));
        self
    }

    /// First cell of every row.
    pub fn row_labels(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter_map(|entry| match entry {
                Entry::Row(cells) => cells.first().map(String::as_str),
                Entry::Text(_) => None,
            })
            .collect()
    }
}

impl ReportDocument {
    pub fn section(&self, heading: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.heading == heading)
    }

    pub fn headings(&self) -> Vec<&str> {
        self.sections.iter().map(|s| s.heading.as_str()).collect()
    }
}
