//! Link detection for history entries.

const YOUTUBE_PREFIX: &str = "https://www.youtube.com/";

/// A history entry that looks like a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Link {
    /// YouTube watch link.
    Video { url: String, video_id: String },
    /// Any other http(s) link.
    Web { url: String, host: String },
}

impl Link {
    /// Classify an entry. Returns `None` for plain text.
    pub fn detect(text: &str) -> Option<Self> {
        let text = text.trim();

        if text.starts_with(YOUTUBE_PREFIX) {
            if let Some(video_id) = youtube_video_id(text) {
                return Some(Link::Video {
                    url: text.to_string(),
                    video_id,
                });
            }
        }

        let rest = text
            .strip_prefix("https://")
            .or_else(|| text.strip_prefix("http://"))?;
        let host = host_of(rest)?;
        Some(Link::Web {
            url: text.to_string(),
            host,
        })
    }

    pub fn url(&self) -> &str {
        match self {
            Link::Video { url, .. } | Link::Web { url, .. } => url,
        }
    }

    /// Thumbnail image for the link.
    pub fn thumbnail_url(&self) -> String {
        match self {
            Link::Video { video_id, .. } => {
                format!("https://img.youtube.com/vi/{}/1.jpg", video_id)
            }
            Link::Web { host, .. } => format!("https://favicons.githubusercontent.com/{}", host),
        }
    }

    /// Short label shown next to the entry.
    pub fn label(&self) -> String {
        match self {
            Link::Video { .. } => "▶ youtube".to_string(),
            Link::Web { host, .. } => host.clone(),
        }
    }
}

fn youtube_video_id(url: &str) -> Option<String> {
    let (_, after) = url.split_once("watch?v=")?;
    let id = after.split('&').next().unwrap_or(after);
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}

/// Host part of a URL with the scheme already stripped.
fn host_of(rest: &str) -> Option<String> {
    let authority = rest.split(['/', '?', '#']).next().unwrap_or(rest);
    // Drop credentials and port
    let host = authority.rsplit('@').next().unwrap_or(authority);
    let host = host.split(':').next().unwrap_or(host);
    if host.is_empty() || host.contains(char::is_whitespace) {
        None
    } else {
        Some(host.to_ascii_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_youtube() {
        let link = Link::detect("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42").unwrap();
        assert_eq!(
            link,
            Link::Video {
                url: "https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42".to_string(),
                video_id: "dQw4w9WgXcQ".to_string(),
            }
        );
        assert_eq!(
            link.thumbnail_url(),
            "https://img.youtube.com/vi/dQw4w9WgXcQ/1.jpg"
        );
    }

    #[test]
    fn test_detect_youtube_without_extra_params() {
        let link = Link::detect("https://www.youtube.com/watch?v=abc123").unwrap();
        assert!(matches!(link, Link::Video { ref video_id, .. } if video_id == "abc123"));
    }

    #[test]
    fn test_youtube_channel_page_is_web_link() {
        let link = Link::detect("https://www.youtube.com/@somechannel").unwrap();
        assert_eq!(
            link,
            Link::Web {
                url: "https://www.youtube.com/@somechannel".to_string(),
                host: "www.youtube.com".to_string(),
            }
        );
    }

    #[test]
    fn test_detect_web_link() {
        let link = Link::detect("https://User:pw@Docs.rs:443/tokio/latest?x=1").unwrap();
        assert_eq!(link.label(), "docs.rs");
        assert_eq!(
            link.thumbnail_url(),
            "https://favicons.githubusercontent.com/docs.rs"
        );
        assert_eq!(link.url(), "https://User:pw@Docs.rs:443/tokio/latest?x=1");
    }

    #[test]
    fn test_plain_text_is_not_a_link() {
        assert_eq!(Link::detect("just some words"), None);
        assert_eq!(Link::detect("ftp://example.com"), None);
        assert_eq!(Link::detect("https://"), None);
    }
}
