use url::Url;
use uuid::Uuid;

/// `create_id(url)` — UUIDv3 in the URL namespace over the URL string
/// (spec.md §4.7 step 3 / §8 scenario 11).
pub fn create_id(url_string: &str) -> String {
    Uuid::new_v3(&Uuid::NAMESPACE_URL, url_string.as_bytes()).to_string()
}

/// `get_path(url)` — URL path with `/` replaced by ` / `, falling back
/// to the host when the path is empty (spec.md §8 scenario 12).
pub fn get_path(url_string: &str) -> String {
    let Ok(parsed) = Url::parse(url_string) else {
        return url_string.to_string();
    };
    let trimmed = parsed.path().trim_matches('/');
    if trimmed.is_empty() {
        return parsed.host_str().unwrap_or_default().to_string();
    }
    trimmed.replace('/', " / ")
}

/// `get_type_from_url(url)` — first path segment, title-cased, with
/// `-`/`_` treated as word separators; falls back to `"Web Page"`
/// (spec.md §8 scenario 13).
pub fn get_type_from_url(url_string: &str) -> String {
    let Ok(parsed) = Url::parse(url_string) else {
        return "Web Page".to_string();
    };
    let trimmed = parsed.path().trim_matches('/');
    let first_segment = trimmed.split('/').next().unwrap_or("");
    if first_segment.is_empty() {
        return "Web Page".to_string();
    }

    let normalized = first_segment.replace(['-', '_'], " ");
    title_case(&normalized)
}

fn title_case(s: &str) -> String {
    s.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_with_segments() {
        assert_eq!(
            get_path("http://www.example.com/test/path/"),
            "test / path"
        );
    }

    #[test]
    fn path_falls_back_to_host() {
        assert_eq!(get_path("http://www.example.com"), "www.example.com");
    }

    #[test]
    fn type_from_hyphenated_path() {
        assert_eq!(
            get_type_from_url("http://example.com/path-to-page"),
            "Path To Page"
        );
    }

    #[test]
    fn type_from_root_is_web_page() {
        assert_eq!(get_type_from_url("http://example.com/"), "Web Page");
    }

    #[test]
    fn id_is_stable_uuid_v3() {
        let id = create_id("http://example.com");
        let expected = Uuid::new_v3(&Uuid::NAMESPACE_URL, b"http://example.com").to_string();
        assert_eq!(id, expected);
    }
}
