use std::path::Path;

use url::Url;

/// Extension used for avatars whose URL carries none (Gravatar-style URLs).
pub const DEFAULT_AVATAR_EXTENSION: &str = "jpg";

/// Local identifier for a remote slug.
///
/// Slugs are already URL-safe; path separators are replaced so the id can
/// double as a directory name.
pub fn local_id(slug: &str) -> String {
    slug.trim()
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '-' } else { c })
        .collect()
}

/// Local filename for an embedded asset: the last path segment of `src`, with
/// query string and fragment stripped.
///
/// Returns `None` when no usable filename can be derived.
pub fn asset_filename(src: &str) -> Option<String> {
    let src = src.trim();
    if src.is_empty() || src.starts_with("data:") {
        return None;
    }

    let candidate = match parse_absolute(src) {
        Some(url) => url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .map(str::to_string),
        None => {
            let end = src.find(['?', '#']).unwrap_or(src.len());
            src[..end].rsplit('/').next().map(str::to_string)
        }
    }?;

    if candidate.is_empty() || candidate == "." || candidate == ".." {
        return None;
    }
    Some(candidate)
}

/// `<local_id>.<ext>` for an author avatar, with the extension taken from the
/// avatar URL's path.
pub fn avatar_filename(local_id: &str, avatar_url: &str) -> String {
    let extension = asset_filename(avatar_url)
        .and_then(|name| {
            Path::new(&name)
                .extension()
                .and_then(|ext| ext.to_str())
                .filter(|ext| !ext.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| DEFAULT_AVATAR_EXTENSION.to_string());
    format!("{local_id}.{extension}")
}

fn parse_absolute(src: &str) -> Option<Url> {
    if let Some(rest) = src.strip_prefix("//") {
        return Url::parse(&format!("https://{rest}")).ok();
    }
    Url::parse(src).ok().filter(|url| url.has_host())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_string_is_stripped() {
        assert_eq!(
            asset_filename("https://example.com/wp-content/uploads/2024/01/photo.jpg?resize=640%2C480&ssl=1"),
            Some("photo.jpg".to_string())
        );
    }

    #[test]
    fn relative_and_protocol_relative_sources() {
        assert_eq!(
            asset_filename("/uploads/pic.png?x=1#top"),
            Some("pic.png".to_string())
        );
        assert_eq!(
            asset_filename("//cdn.example.com/a/b.gif"),
            Some("b.gif".to_string())
        );
    }

    #[test]
    fn directory_urls_have_no_filename() {
        assert_eq!(asset_filename("https://example.com/"), None);
        assert_eq!(asset_filename("   "), None);
    }

    #[test]
    fn avatar_extension_falls_back_to_default() {
        assert_eq!(
            avatar_filename("jane", "https://example.com/avatars/jane-96.png?s=96&d=mm"),
            "jane.png"
        );
        assert_eq!(
            avatar_filename("john", "https://secure.gravatar.com/avatar/abc123?s=96&d=mm&r=g"),
            "john.jpg"
        );
    }

    #[test]
    fn local_id_is_path_safe() {
        assert_eq!(local_id(" hello/world "), "hello-world");
    }
}
