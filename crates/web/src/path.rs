/// Returns the canonical form of a URL path.
///
/// Repeated slashes collapse into one, `.` segments are dropped and `..` removes the segment
/// before it. The result always starts with `/` and keeps a trailing slash if `path` had one.
pub fn clean_path(path: &str) -> String {
    if path.is_empty() {
        return "/".to_owned();
    }

    let trailing_slash = path.len() > 1 && path.ends_with('/');
    let mut segments: Vec<&str> = Vec::with_capacity(8);
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }

    let mut cleaned = String::with_capacity(path.len() + 1);
    for segment in &segments {
        cleaned.push('/');
        cleaned.push_str(segment);
    }
    if cleaned.is_empty() || trailing_slash {
        cleaned.push('/');
    }
    cleaned
}

/// Joins a group prefix and a relative route path.
pub(crate) fn join_paths(absolute: &str, relative: &str) -> String {
    if relative.is_empty() {
        return absolute.to_owned();
    }
    clean_path(&format!("{absolute}/{relative}"))
}

#[cfg(test)]
mod tests {
    use super::{clean_path, join_paths};

    #[test]
    fn test_clean_path() {
        let cases = [
            ("", "/"),
            ("/", "/"),
            ("abc", "/abc"),
            ("/abc/", "/abc/"),
            ("//abc//def", "/abc/def"),
            ("/abc/./def", "/abc/def"),
            ("/abc/def/..", "/abc"),
            ("/abc/def/../..", "/"),
            ("/abc/def/../../..", "/"),
            ("/abc/../def/", "/def/"),
            ("/./", "/"),
            ("/../", "/"),
        ];

        for (input, expected) in cases {
            assert_eq!(clean_path(input), expected, "clean_path({input:?})");
        }
    }

    #[test]
    fn test_join_paths() {
        assert_eq!(join_paths("/", ""), "/");
        assert_eq!(join_paths("/", "/users"), "/users");
        assert_eq!(join_paths("/api", "users/"), "/api/users/");
        assert_eq!(join_paths("/api/", "/v1"), "/api/v1");
        assert_eq!(join_paths("/api", "/"), "/api/");
    }
}
