//! Feed renderer
//!
//! Renders posts, the tag selector and the feed states to HTML fragments.

use std::fmt::Write as _;

use crate::filter::TagFilter;
use crate::media::{self, MediaKind};
use crate::post::Post;
use crate::tags::TagOption;

const BROKEN_IMAGE_PLACEHOLDER: &str =
    "https://via.placeholder.com/400x200/eee/666?text=Image+Not+Found";
const NO_DESCRIPTION: &str = "No description available";
const YOUTUBE_EMBED_BASE: &str = "https://www.youtube.com/embed/";

/// What the page is currently showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedStatus {
    /// Nothing fetched yet.
    Loading,
    /// A fetch succeeded but the sheet has no titled rows.
    Empty,
    /// Posts exist, none match the selected tag.
    NoMatches,
    Ready,
}

pub struct PageView<'a> {
    pub status: FeedStatus,
    pub posts: Vec<&'a Post>,
    pub options: Vec<TagOption>,
    pub selected: &'a TagFilter,
    pub countdown_secs: u64,
    pub notice: Option<&'a str>,
    /// A refresh is in progress.
    pub fetching: bool,
}

/// Escapes text for element content and quoted attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Descriptions are embedded as markup on purpose: only newlines are
/// rewritten, so authors can use inline tags in the sheet.
fn description_markup(post: &Post) -> String {
    post.description()
        .unwrap_or(NO_DESCRIPTION)
        .replace("\r\n", "\n")
        .replace('\n', "<br>")
}

pub fn render_post(post: &Post, kind: &MediaKind) -> String {
    let url = post.resource_url().unwrap_or_default().trim();
    let mut buf = String::new();

    let _ = writeln!(
        buf,
        r#"<article class="post-card" data-id="{}" data-media="{}">"#,
        escape_html(&post.id),
        kind.as_str()
    );
    buf.push_str(&render_media(kind, url, post.title()));
    buf.push_str("<div class=\"post-content\">\n");
    let _ = writeln!(
        buf,
        r#"<h2 class="post-title">{}</h2>"#,
        escape_html(post.title())
    );
    let _ = writeln!(
        buf,
        r#"<p class="post-description">{}</p>"#,
        description_markup(post)
    );

    let tags = post.display_tags();
    if !tags.is_empty() {
        buf.push_str("<div class=\"post-tags\">");
        for tag in tags {
            let _ = write!(buf, r#"<span class="tag">{}</span>"#, escape_html(tag));
        }
        buf.push_str("</div>\n");
    }

    if !url.is_empty() {
        let _ = writeln!(
            buf,
            r#"<a href="{}" class="post-link" target="_blank" rel="noopener noreferrer"><i class="fas fa-external-link-alt"></i> {}</a>"#,
            escape_html(url),
            media::link_label(url)
        );
    }

    buf.push_str("</div>\n</article>\n");
    buf
}

fn render_media(kind: &MediaKind, url: &str, title: &str) -> String {
    match kind {
        MediaKind::YouTube { video_id } => format!(
            concat!(
                r#"<div class="post-image youtube-container">"#,
                r#"<iframe src="{}{}" frameborder="0" "#,
                r#"allow="accelerometer; autoplay; clipboard-write; encrypted-media; gyroscope; picture-in-picture" "#,
                r#"allowfullscreen></iframe></div>"#,
                "\n"
            ),
            YOUTUBE_EMBED_BASE,
            escape_html(video_id)
        ),
        MediaKind::UnknownAttachment => {
            "<div class=\"post-image video-link\"><i class=\"fas fa-video\"></i> Video Link</div>\n"
                .to_string()
        }
        MediaKind::VideoFile => format!(
            concat!(
                r#"<video class="post-image" controls>"#,
                r#"<source src="{}" type="video/mp4">"#,
                "Your browser does not support videos.</video>\n"
            ),
            escape_html(url)
        ),
        MediaKind::AudioFile => format!(
            concat!(
                r#"<div class="post-image audio-container"><i class="fas fa-music"></i>"#,
                r#"<audio controls><source src="{}" type="audio/mpeg">"#,
                "Your browser does not support audio.</audio></div>\n"
            ),
            escape_html(url)
        ),
        MediaKind::Image => format!(
            concat!(
                r#"<img class="post-image" src="{}" alt="{}" loading="lazy" "#,
                r#"onerror="this.onerror=null; this.src='{}'">"#,
                "\n"
            ),
            escape_html(url),
            escape_html(title),
            BROKEN_IMAGE_PLACEHOLDER
        ),
        MediaKind::None => {
            "<div class=\"post-image no-image\"><i class=\"fas fa-paperclip\"></i></div>\n"
                .to_string()
        }
    }
}

/// Cards for `posts`, or the no-results block when the filter left nothing.
pub fn render_posts(posts: &[&Post]) -> String {
    if posts.is_empty() {
        return render_no_results();
    }
    posts
        .iter()
        .map(|post| {
            let kind = media::classify(post.resource_url().unwrap_or_default());
            render_post(post, &kind)
        })
        .collect()
}

fn render_no_results() -> String {
    concat!(
        "<div class=\"no-filter-results\">\n",
        "<i class=\"fas fa-search\"></i>\n",
        "<h3>No posts found</h3>\n",
        "<p>Try selecting a different tag or check back later.</p>\n",
        "</div>\n"
    )
    .to_string()
}

pub fn render_tag_select(options: &[TagOption], selected: &TagFilter) -> String {
    let mut buf = String::from("<select id=\"tagFilter\">\n");
    for option in options {
        let marker = if option.value == selected.as_str() {
            " selected"
        } else {
            ""
        };
        let _ = writeln!(
            buf,
            r#"<option value="{}"{}>{}</option>"#,
            escape_html(&option.value),
            marker,
            escape_html(&option.label)
        );
    }
    buf.push_str("</select>\n");
    buf
}

pub fn render_page(view: &PageView<'_>) -> String {
    let mut buf = String::new();

    buf.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    buf.push_str("<meta charset=\"utf-8\">\n<title>Postboard</title>\n</head>\n<body>\n");

    buf.push_str("<header class=\"feed-controls\">\n");
    buf.push_str(&render_tag_select(&view.options, view.selected));
    buf.push_str("<button id=\"refreshBtn\" type=\"button\">Refresh</button>\n");
    let _ = writeln!(
        buf,
        r#"<span class="refresh-timer">Next refresh in <span id="countdown">{}</span>s</span>"#,
        view.countdown_secs
    );
    buf.push_str("</header>\n");

    if view.fetching || (matches!(view.status, FeedStatus::Loading) && view.notice.is_none()) {
        buf.push_str("<div id=\"loading\">Loading posts...</div>\n");
    }

    if let Some(notice) = view.notice {
        let _ = writeln!(
            buf,
            r#"<div id="noPosts"><p>{}</p></div>"#,
            escape_html(notice)
        );
    } else if matches!(view.status, FeedStatus::Empty) {
        buf.push_str("<div id=\"noPosts\"><p>No posts yet.</p></div>\n");
    }

    buf.push_str("<main id=\"postsContainer\">\n");
    match view.status {
        FeedStatus::Loading | FeedStatus::Empty => {}
        FeedStatus::NoMatches | FeedStatus::Ready => buf.push_str(&render_posts(&view.posts)),
    }
    buf.push_str("</main>\n</body>\n</html>\n");

    buf
}
