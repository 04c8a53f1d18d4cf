use indexmap::IndexMap;

/// One segment of an indexed path. `value` is the full accumulated path up
/// to and including this segment, children are keyed by their own value.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PathNode {
    pub value: String,
    pub children: IndexMap<String, PathNode>,
}

impl PathNode {
    fn new(value: &str) -> Self {
        PathNode {
            value: value.to_string(),
            children: IndexMap::new(),
        }
    }

    /// Last segment of the accumulated path.
    pub fn name(&self, delimiter: char) -> &str {
        self.value.rsplit(delimiter).next().unwrap_or(&self.value)
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Tree of path segments for one source.
#[derive(Debug, Clone)]
pub struct PathIndex {
    root: PathNode,
    delimiter: char,
}

impl PathIndex {
    pub fn new(delimiter: char) -> Self {
        PathIndex {
            root: PathNode::new(""),
            delimiter,
        }
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    /// Insert every accumulated prefix of `path`. Returns false if the path
    /// was already present.
    pub fn insert(&mut self, path: &str) -> bool {
        let path = path.trim_end_matches(self.delimiter);
        if path.is_empty() {
            return false;
        }

        let mut created = false;
        let mut node = &mut self.root;

        for prefix in Self::prefixes(path, self.delimiter) {
            node = node.children.entry(prefix.to_string()).or_insert_with(|| {
                created = true;
                PathNode::new(prefix)
            });
        }

        created
    }

    /// Depth-first lookup from the root. The returned node is an owned copy,
    /// so the caller can walk its children while a scan keeps inserting.
    /// An empty path or a bare delimiter names the root.
    pub fn find_node(&self, path: &str) -> Option<PathNode> {
        let path = path.trim_end_matches(self.delimiter);
        Self::search(&self.root, path, self.delimiter).cloned()
    }

    pub fn contains(&self, path: &str) -> bool {
        Self::search(&self.root, path, self.delimiter).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.root.children.is_empty()
    }

    fn search<'a>(node: &'a PathNode, path: &str, delimiter: char) -> Option<&'a PathNode> {
        if node.value == path {
            return Some(node);
        }

        node.children
            .values()
            .filter(|child| Self::is_on_route(&child.value, path, delimiter))
            .find_map(|child| Self::search(child, path, delimiter))
    }

    fn is_on_route(candidate: &str, path: &str, delimiter: char) -> bool {
        match path.strip_prefix(candidate) {
            Some("") => true,
            Some(rest) => rest.starts_with(delimiter),
            None => false,
        }
    }

    fn prefixes(path: &str, delimiter: char) -> impl Iterator<Item = &str> {
        path.match_indices(delimiter)
            .filter(|(i, _)| *i > 0)
            .map(move |(i, _)| &path[..i])
            .chain(std::iter::once(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insertion_is_idempotent() {
        let mut index = PathIndex::new('/');

        assert!(index.insert("/m/sub/song2.mp3"));
        assert!(!index.insert("/m/sub/song2.mp3"));

        let m = index.find_node("/m").unwrap();
        assert_eq!(m.children.len(), 1);

        let sub = index.find_node("/m/sub").unwrap();
        assert_eq!(sub.children.len(), 1);
        assert!(sub.children.contains_key("/m/sub/song2.mp3"));
    }

    #[test]
    fn children_are_keyed_by_accumulated_path() {
        let mut index = PathIndex::new('/');
        index.insert("/m/song1.mp3");
        index.insert("/m/sub/song2.mp3");
        index.insert("/m/cover.jpg");

        let m = index.find_node("/m").unwrap();
        let keys: Vec<&str> = m.children.keys().map(String::as_str).collect();

        assert_eq!(keys, vec!["/m/song1.mp3", "/m/sub", "/m/cover.jpg"]);
        assert_eq!(m.children["/m/sub"].name('/'), "sub");
    }

    #[test]
    fn lookup_returns_detached_copy() {
        let mut index = PathIndex::new('/');
        index.insert("/m/a.mp3");

        let snapshot = index.find_node("/m").unwrap();
        index.insert("/m/b.mp3");

        assert_eq!(snapshot.children.len(), 1);
        assert_eq!(index.find_node("/m").unwrap().children.len(), 2);
    }

    #[test]
    fn remote_paths_use_backslash() {
        let mut index = PathIndex::new('\\');
        index.insert(r"usb3\Music\a.mp3");
        index.insert(r"usb3\Music\b.flac");

        let music = index.find_node(r"usb3\Music").unwrap();
        assert_eq!(music.children.len(), 2);
        assert_eq!(music.name('\\'), "Music");
        assert!(index.find_node("usb3").is_some());
    }

    #[test]
    fn lookup_does_not_confuse_sibling_prefixes() {
        let mut index = PathIndex::new('/');
        index.insert("/m/album/a.mp3");
        index.insert("/m/album2/b.mp3");

        let album = index.find_node("/m/album").unwrap();
        assert_eq!(album.children.len(), 1);
        assert!(album.children.contains_key("/m/album/a.mp3"));

        assert!(index.find_node("/m/alb").is_none());
        assert!(index.find_node("/missing").is_none());
    }

    #[test]
    fn trailing_delimiter_is_ignored() {
        let mut index = PathIndex::new('/');
        index.insert("/m/sub/");

        assert!(index.contains("/m/sub"));
        assert!(index.find_node("/m/").is_some());
    }

    #[test]
    fn bare_delimiter_names_the_root() {
        let mut index = PathIndex::new('/');
        index.insert("/a.mp3");
        index.insert("/sub/b.mp3");

        for path in ["", "/", "//"] {
            let root = index.find_node(path).unwrap();
            let keys: Vec<&str> = root.children.keys().map(String::as_str).collect();
            assert_eq!(keys, vec!["/a.mp3", "/sub"], "{path:?}");
        }

        let mut share = PathIndex::new('\\');
        share.insert(r"usb3\a.mp3");
        assert_eq!(share.find_node("\\").unwrap().children.len(), 1);
    }
}
