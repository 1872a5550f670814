use std::collections::BTreeSet;
use std::path::{Component, Path};

/// Drops `.` components and doubled separators so `./a//x.txt` and
/// `a/x.txt` name the same entry. Paths with any other non-normal component
/// are returned untouched for the copier to reject.
pub fn normalize_relative(relative_path: &str) -> String {
    let components: Vec<Component> = Path::new(relative_path).components().collect();
    if components
        .iter()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return relative_path.to_string();
    }
    components
        .iter()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Relative paths the user has checked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    paths: BTreeSet<String>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, relative_path: &str) -> bool {
        self.paths.contains(relative_path)
    }

    pub fn insert(&mut self, relative_path: impl Into<String>) -> bool {
        self.paths.insert(relative_path.into())
    }

    pub fn remove(&mut self, relative_path: &str) -> bool {
        self.paths.remove(relative_path)
    }

    /// Flips membership and returns whether the path is now selected.
    pub fn toggle(&mut self, relative_path: &str) -> bool {
        if self.paths.remove(relative_path) {
            false
        } else {
            self.paths.insert(relative_path.to_string());
            true
        }
    }

    pub fn clear(&mut self) {
        self.paths.clear();
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for SelectionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            paths: iter.into_iter().map(Into::into).collect(),
        }
    }
}
