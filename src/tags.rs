use std::collections::HashSet;

use crate::post::Post;

pub const ALL_TAGS: &str = "all";
const ALL_TAGS_LABEL: &str = "All Posts";

/// Every normalized tag across the current posts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagUniverse {
    tags: HashSet<String>,
}

impl TagUniverse {
    pub fn contains(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn sorted(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.tags.iter().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }
}

impl<S: Into<String>> FromIterator<S> for TagUniverse {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            tags: iter.into_iter().map(Into::into).collect(),
        }
    }
}

pub fn extract_tags<'a, I>(posts: I) -> TagUniverse
where
    I: IntoIterator<Item = &'a Post>,
{
    posts
        .into_iter()
        .flat_map(Post::normalized_tags)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagOption {
    pub value: String,
    pub label: String,
}

/// Selector options: "all" first, then each tag alphabetically.
pub fn tag_options(universe: &TagUniverse) -> Vec<TagOption> {
    let mut options = Vec::with_capacity(universe.len() + 1);
    options.push(TagOption {
        value: ALL_TAGS.to_string(),
        label: ALL_TAGS_LABEL.to_string(),
    });
    options.extend(universe.sorted().into_iter().map(|tag| TagOption {
        value: tag.to_string(),
        label: capitalize(tag),
    }));
    options
}

fn capitalize(tag: &str) -> String {
    let mut chars = tag.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode;
    use crate::post::{posts_from_records, Record};
    use chrono::Utc;

    fn post(tags: &str) -> Post {
        let mut fields = Record::new();
        fields.insert("Title".into(), "t".into());
        fields.insert("Tags".into(), tags.into());
        Post::new("id", fields)
    }

    #[test]
    fn extracts_normalized_unique_tags() {
        let posts = vec![post("Rust, web"), post("rust;CLI"), post("")];
        let universe = extract_tags(&posts);
        assert_eq!(universe.sorted(), vec!["cli", "rust", "web"]);
    }

    #[test]
    fn order_does_not_matter() {
        let forward = vec![post("a b"), post("c;A"), post("d")];
        let mut backward = forward.clone();
        backward.reverse();
        assert_eq!(extract_tags(&forward), extract_tags(&backward));
        assert_eq!(extract_tags(&forward), extract_tags(&forward));
    }

    #[test]
    fn decoded_rows_produce_expected_universe() {
        let records = decode("Title,Tags\nA,\"x, Y\"\nB,\n").unwrap();
        let posts = posts_from_records(records, Utc::now());
        let universe = extract_tags(&posts);
        assert_eq!(universe, TagUniverse::from_iter(["x", "y"]));
    }

    #[test]
    fn options_start_with_all_and_capitalize() {
        let universe = TagUniverse::from_iter(["news", "art"]);
        let options = tag_options(&universe);
        let labels: Vec<_> = options.iter().map(|o| o.label.as_str()).collect();
        let values: Vec<_> = options.iter().map(|o| o.value.as_str()).collect();
        assert_eq!(values, vec!["all", "art", "news"]);
        assert_eq!(labels, vec!["All Posts", "Art", "News"]);
    }
}
