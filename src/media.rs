use once_cell::sync::Lazy;
use regex::Regex;

const VIDEO_EXTENSIONS: [&str; 5] = ["mp4", "webm", "ogg", "mov", "avi"];
const AUDIO_EXTENSIONS: [&str; 4] = ["mp3", "wav", "ogg", "m4a"];
const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "gif", "bmp", "webp"];
const DOCUMENT_EXTENSIONS: [&str; 5] = ["pdf", "doc", "docx", "xls", "xlsx"];

static YOUTUBE_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?:youtube\.com/(?:[^/]+/.+/|(?:v|e(?:mbed)?)/|.*[?&]v=)|youtu\.be/)([^"&?/\s]{11})"#,
    )
    .expect("valid youtube id regex")
});

/// How a post's attached resource is presented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaKind {
    YouTube { video_id: String },
    VideoFile,
    AudioFile,
    Image,
    /// A YouTube link with no playable id.
    UnknownAttachment,
    None,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::YouTube { .. } => "youtube",
            MediaKind::VideoFile => "video-file",
            MediaKind::AudioFile => "audio-file",
            MediaKind::Image => "image",
            MediaKind::UnknownAttachment => "unknown-attachment",
            MediaKind::None => "none",
        }
    }
}

pub fn classify(reference: &str) -> MediaKind {
    let reference = reference.trim();
    if reference.is_empty() {
        return MediaKind::None;
    }
    if is_youtube(reference) {
        return match youtube_id(reference) {
            Some(video_id) => MediaKind::YouTube { video_id },
            None => MediaKind::UnknownAttachment,
        };
    }
    if has_extension(reference, &VIDEO_EXTENSIONS) {
        return MediaKind::VideoFile;
    }
    if has_extension(reference, &AUDIO_EXTENSIONS) {
        return MediaKind::AudioFile;
    }
    MediaKind::Image
}

/// Human label for the external link on a card.
pub fn link_label(reference: &str) -> &'static str {
    let reference = reference.trim();
    if is_youtube(reference) {
        "Watch on YouTube"
    } else if has_extension(reference, &VIDEO_EXTENSIONS) {
        "Download Video"
    } else if has_extension(reference, &AUDIO_EXTENSIONS) {
        "Download Audio"
    } else if has_extension(reference, &IMAGE_EXTENSIONS) {
        "View Full Image"
    } else if has_extension(reference, &DOCUMENT_EXTENSIONS) {
        "Download Document"
    } else {
        "Download File"
    }
}

pub fn is_youtube(reference: &str) -> bool {
    reference.contains("youtube.com") || reference.contains("youtu.be")
}

pub fn youtube_id(reference: &str) -> Option<String> {
    YOUTUBE_ID_RE
        .captures(reference)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Matches only a trailing extension; query strings defeat the match.
fn has_extension(reference: &str, extensions: &[&str]) -> bool {
    let Some((_, ext)) = reference.rsplit_once('.') else {
        return false;
    };
    extensions
        .iter()
        .any(|candidate| ext.eq_ignore_ascii_case(candidate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_common_references() {
        assert_eq!(
            classify("https://youtu.be/dQw4w9WgXcQ"),
            MediaKind::YouTube {
                video_id: "dQw4w9WgXcQ".into()
            }
        );
        assert_eq!(classify("clip.mp4"), MediaKind::VideoFile);
        assert_eq!(classify("song.mp3"), MediaKind::AudioFile);
        assert_eq!(classify("pic.png"), MediaKind::Image);
        assert_eq!(classify(""), MediaKind::None);
        assert_eq!(classify("   "), MediaKind::None);
    }

    #[test]
    fn youtube_url_shapes() {
        for url in [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://www.youtube.com/watch?feature=share&v=dQw4w9WgXcQ",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
            "https://youtube.com/v/dQw4w9WgXcQ?start=3",
        ] {
            assert_eq!(youtube_id(url).as_deref(), Some("dQw4w9WgXcQ"), "{url}");
        }
    }

    #[test]
    fn youtube_without_id_is_unknown_attachment() {
        assert_eq!(
            classify("https://www.youtube.com/channel"),
            MediaKind::UnknownAttachment
        );
    }

    #[test]
    fn ogg_resolves_to_video() {
        assert_eq!(classify("ambient.ogg"), MediaKind::VideoFile);
        assert_eq!(link_label("ambient.ogg"), "Download Video");
    }

    #[test]
    fn extension_match_is_case_insensitive_and_trailing() {
        assert_eq!(classify("CLIP.MOV"), MediaKind::VideoFile);
        assert_eq!(classify("track.M4A"), MediaKind::AudioFile);
        assert_eq!(classify("clip.mp4?raw=1"), MediaKind::Image);
    }

    #[test]
    fn link_labels() {
        assert_eq!(link_label("https://youtu.be/dQw4w9WgXcQ"), "Watch on YouTube");
        assert_eq!(link_label("a.webm"), "Download Video");
        assert_eq!(link_label("a.wav"), "Download Audio");
        assert_eq!(link_label("a.JPEG"), "View Full Image");
        assert_eq!(link_label("report.xlsx"), "Download Document");
        assert_eq!(link_label("archive.zip"), "Download File");
    }
}
