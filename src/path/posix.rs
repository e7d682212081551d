use crate::glob::has_wildcard;

/// Slash-separated backend path (`bucket/data/cars`, `/user/hadoop/cars`).
///
/// Empty and `.` segments are dropped on parse; everything else, including
/// `..` and glob characters, is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PosixPath {
    rooted: bool,
    segments: Vec<String>,
}

impl PosixPath {
    pub fn parse(path: &str) -> Self {
        PosixPath {
            rooted: path.starts_with('/'),
            segments: path
                .split('/')
                .filter(|s| !s.is_empty() && *s != ".")
                .map(str::to_string)
                .collect(),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn file_name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// `None` for a path without segments.
    pub fn parent(&self) -> Option<Self> {
        let (_, rest) = self.segments.split_last()?;
        Some(PosixPath {
            rooted: self.rooted,
            segments: rest.to_vec(),
        })
    }

    /// Append one raw segment.
    pub fn child(&self, segment: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.to_string());
        PosixPath {
            rooted: self.rooted,
            segments,
        }
    }

    /// First segment containing a glob metacharacter, if any.
    pub fn wildcard_segment(&self) -> Option<&str> {
        self.segments
            .iter()
            .map(String::as_str)
            .find(|s| has_wildcard(s))
    }
}

impl std::fmt::Display for PosixPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let joined = self.segments.join("/");
        match (self.rooted, joined.is_empty()) {
            (true, _) => write!(f, "/{joined}"),
            (false, true) => f.write_str("."),
            (false, false) => f.write_str(&joined),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_render() {
        let path = PosixPath::parse("/dbfs//mnt/./cars/");
        assert_eq!(path.segments(), &["dbfs", "mnt", "cars"]);
        assert_eq!(path.to_string(), "/dbfs/mnt/cars");
        assert_eq!(PosixPath::parse("/").to_string(), "/");
        assert_eq!(PosixPath::parse("").to_string(), ".");
    }

    #[test]
    fn test_version_from_matched_path() {
        let path = PosixPath::parse("bucket/cars/2024-01-01T00.00.00.000Z/cars");
        assert_eq!(path.file_name(), Some("cars"));
        assert_eq!(
            path.parent().unwrap().file_name(),
            Some("2024-01-01T00.00.00.000Z")
        );
        assert!(PosixPath::parse("/").parent().is_none());
    }

    #[test]
    fn test_child_keeps_wildcard() {
        let path = PosixPath::parse("data/cars").child("*").child("cars");
        assert_eq!(path.to_string(), "data/cars/*/cars");
        assert_eq!(path.wildcard_segment(), Some("*"));
    }

    #[test]
    fn test_wildcard_segment() {
        assert_eq!(PosixPath::parse("data/run[1]/cars").wildcard_segment(), Some("run[1]"));
        assert_eq!(PosixPath::parse("/data/v?/x").wildcard_segment(), Some("v?"));
        assert!(PosixPath::parse("/data/cars").wildcard_segment().is_none());
    }
}
