use std::fmt;

use crate::post::Post;
use crate::tags::ALL_TAGS;

/// Which posts are shown. Survives refreshes by value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TagFilter {
    #[default]
    All,
    Tag(String),
}

impl TagFilter {
    /// Parses a selector value; anything other than "all" is a tag.
    pub fn parse(selector: &str) -> Self {
        let selector = selector.trim();
        if selector.is_empty() || selector == ALL_TAGS {
            TagFilter::All
        } else {
            TagFilter::Tag(selector.to_lowercase())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            TagFilter::All => ALL_TAGS,
            TagFilter::Tag(tag) => tag,
        }
    }

    pub fn matches(&self, post: &Post) -> bool {
        match self {
            TagFilter::All => true,
            TagFilter::Tag(tag) => post.normalized_tags().iter().any(|t| t == tag),
        }
    }
}

impl fmt::Display for TagFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn filter<'a>(posts: &'a [Post], selector: &TagFilter) -> Vec<&'a Post> {
    posts.iter().filter(|post| selector.matches(post)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::post::Record;

    fn post(title: &str, tags: &str) -> Post {
        let mut fields = Record::new();
        fields.insert("Title".into(), title.into());
        fields.insert("Tags".into(), tags.into());
        Post::new(title, fields)
    }

    fn sample() -> Vec<Post> {
        vec![
            post("one", "Rust, web"),
            post("two", "cli"),
            post("three", "rustacean;WEB"),
        ]
    }

    #[test]
    fn all_returns_everything_in_order() {
        let posts = sample();
        let shown = filter(&posts, &TagFilter::All);
        let expected: Vec<&Post> = posts.iter().collect();
        assert_eq!(shown, expected);
    }

    #[test]
    fn tag_matches_exact_token_case_insensitively() {
        let posts = sample();
        let titles: Vec<_> = filter(&posts, &TagFilter::parse("web"))
            .into_iter()
            .map(Post::title)
            .collect();
        assert_eq!(titles, vec!["one", "three"]);

        let titles: Vec<_> = filter(&posts, &TagFilter::parse("rust"))
            .into_iter()
            .map(Post::title)
            .collect();
        assert_eq!(titles, vec!["one"]);
    }

    #[test]
    fn no_match_is_empty() {
        let posts = sample();
        assert!(filter(&posts, &TagFilter::parse("missing")).is_empty());
    }

    #[test]
    fn parse_all_and_blank() {
        assert_eq!(TagFilter::parse("all"), TagFilter::All);
        assert_eq!(TagFilter::parse(""), TagFilter::All);
        assert_eq!(TagFilter::parse("News"), TagFilter::Tag("news".into()));
        assert_eq!(TagFilter::Tag("news".into()).to_string(), "news");
    }
}
