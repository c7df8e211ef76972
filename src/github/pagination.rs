//! `Link` header parsing for paginated GitHub API responses.
//!
//! GitHub paginates list endpoints with an RFC-5988 `Link` response header;
//! the next page, when one exists, is the entry tagged `rel="next"`. The
//! client follows that chain until the header stops advertising a next page.

use url::Url;

/// Extracts the `rel="next"` target from a `Link` header value.
///
/// Returns `None` when the header has no next entry or when the advertised
/// target is not a valid absolute URL.
///
/// # Example
///
/// ```
/// use cadence::github::pagination::next_page_url;
///
/// let header = "<https://api.github.com/repos?page=2>; rel=\"next\", \
///               <https://api.github.com/repos?page=5>; rel=\"last\"";
/// let next = next_page_url(header).expect("header advertises a next page");
/// assert_eq!(next.as_str(), "https://api.github.com/repos?page=2");
/// ```
#[must_use]
pub fn next_page_url(header: &str) -> Option<Url> {
    header.split(',').find_map(|entry| {
        let mut parts = entry.split(';');
        let target = parts.next()?.trim();
        let is_next = parts.any(|param| param.trim() == "rel=\"next\"");
        if !is_next {
            return None;
        }
        let trimmed = target.strip_prefix('<')?.strip_suffix('>')?;
        Url::parse(trimmed).ok()
    })
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::next_page_url;

    #[test]
    fn finds_next_among_multiple_relations() {
        let header = "<https://api.example/repos?page=1>; rel=\"prev\", \
                      <https://api.example/repos?page=3>; rel=\"next\", \
                      <https://api.example/repos?page=7>; rel=\"last\"";
        let next = next_page_url(header).expect("next relation should be found");
        assert_eq!(next.as_str(), "https://api.example/repos?page=3");
    }

    #[rstest]
    #[case("<https://api.example/repos?page=1>; rel=\"prev\"")]
    #[case("")]
    #[case("not a link header at all")]
    #[case("<not a url>; rel=\"next\"")]
    fn returns_none_without_a_valid_next(#[case] header: &str) {
        assert_eq!(next_page_url(header), None);
    }

    #[test]
    fn tolerates_whitespace_around_entries() {
        let header = " <https://api.example/items?page=2> ;  rel=\"next\" ";
        let next = next_page_url(header).expect("next relation should be found");
        assert_eq!(next.as_str(), "https://api.example/items?page=2");
    }
}
