use std::collections::HashMap;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

pub const TITLE_FIELD: &str = "Title";
pub const TAGS_FIELD: &str = "Tags";
pub const DESCRIPTION_FIELDS: [&str; 2] = ["Description", "Desc"];
pub const RESOURCE_URL_FIELDS: [&str; 3] = ["File/Image URL", "FileURL", "Image URL"];

static TAG_SEPARATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[,;\s]+").expect("valid tag separator regex"));

/// One decoded row: header name to cell value.
pub type Record = HashMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub id: String,
    pub fields: Record,
}

impl Post {
    pub fn new(id: impl Into<String>, fields: Record) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn title(&self) -> &str {
        self.field(TITLE_FIELD).unwrap_or_default()
    }

    pub fn tags_raw(&self) -> &str {
        self.field(TAGS_FIELD).unwrap_or_default()
    }

    pub fn description(&self) -> Option<&str> {
        first_non_empty(&self.fields, &DESCRIPTION_FIELDS)
    }

    pub fn resource_url(&self) -> Option<&str> {
        first_non_empty(&self.fields, &RESOURCE_URL_FIELDS)
    }

    /// Tag tokens with their original casing, as shown on cards.
    pub fn display_tags(&self) -> Vec<&str> {
        split_tags(self.tags_raw()).collect()
    }

    /// Lower-cased tag tokens, as used for filtering and the tag universe.
    pub fn normalized_tags(&self) -> Vec<String> {
        split_tags(self.tags_raw())
            .map(str::to_lowercase)
            .collect()
    }
}

fn first_non_empty<'a>(fields: &'a Record, names: &[&str]) -> Option<&'a str> {
    names
        .iter()
        .filter_map(|name| fields.get(*name))
        .map(String::as_str)
        .find(|value| !value.is_empty())
}

/// Splits a raw tags cell on runs of commas, semicolons and whitespace.
pub fn split_tags(raw: &str) -> impl Iterator<Item = &str> {
    TAG_SEPARATOR_RE
        .split(raw)
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
}

pub fn has_title(record: &Record) -> bool {
    record
        .get(TITLE_FIELD)
        .is_some_and(|title| !title.trim().is_empty())
}

/// Keeps titled rows, assigns ids and reverses into newest-first order.
pub fn posts_from_records(records: Vec<Record>, refreshed_at: DateTime<Utc>) -> Vec<Post> {
    let stamp = refreshed_at.timestamp_millis();
    let mut posts: Vec<Post> = records
        .into_iter()
        .filter(has_title)
        .enumerate()
        .map(|(index, fields)| {
            let id = format!("{}_{}_{}", fields[TITLE_FIELD], index, stamp);
            Post::new(id, fields)
        })
        .collect();
    posts.reverse();
    posts
}
