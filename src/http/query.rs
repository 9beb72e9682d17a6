//! Query string parsing module

use url::form_urlencoded;

/// First value of `name` in a raw query string, percent-decoded
///
/// # Examples
/// ```
/// use filedrop::http::query::query_param;
/// assert_eq!(query_param(Some("path=photos%2F2024"), "path").as_deref(), Some("photos/2024"));
/// assert_eq!(query_param(None, "path"), None);
/// ```
pub fn query_param(query: Option<&str>, name: &str) -> Option<String> {
    form_urlencoded::parse(query?.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoding() {
        assert_eq!(
            query_param(Some("path=my+files%2Fa%20b.txt"), "path").as_deref(),
            Some("my files/a b.txt")
        );
    }

    #[test]
    fn test_first_value_wins() {
        assert_eq!(
            query_param(Some("path=a&path=b"), "path").as_deref(),
            Some("a")
        );
    }

    #[test]
    fn test_missing_and_empty() {
        assert_eq!(query_param(Some("other=1"), "path"), None);
        assert_eq!(query_param(Some("path="), "path").as_deref(), Some(""));
        assert_eq!(query_param(Some(""), "path"), None);
    }
}
