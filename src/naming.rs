//! Collision-free file naming.
//!
//! Videos and generated images each live in their own namespace. A name is
//! taken if the catalog ever issued it or if a file with that name already
//! sits in the namespace's directory.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Video,
    Image,
}

impl Namespace {
    /// Key stored alongside issued names in the catalog.
    pub fn key(&self) -> &'static str {
        match self {
            Namespace::Video => "video",
            Namespace::Image => "image",
        }
    }

    /// Directory under the album root that backs this namespace.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Namespace::Video => "video",
            Namespace::Image => "image",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Return `desired` if it is free, otherwise the first free variant with a
/// `(n)` suffix inserted before the extension (`a.jpg` -> `a(1).jpg`).
///
/// Names without an extension get the suffix appended (`notes` ->
/// `notes(1)`). A leading dot is part of the stem, so `.hidden` becomes
/// `.hidden(1)`.
pub fn resolve_unique_name<E>(
    desired: &str,
    mut exists: impl FnMut(&str) -> Result<bool, E>,
) -> Result<String, E> {
    if !exists(desired)? {
        return Ok(desired.to_string());
    }

    let (stem, extension) = split_extension(desired);
    let mut n: u64 = 1;
    loop {
        let candidate = format!("{}({}){}", stem, n, extension);
        if !exists(&candidate)? {
            return Ok(candidate);
        }
        n += 1;
    }
}

/// Split at the final `.`; the extension keeps its dot.
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(pos) if pos > 0 => name.split_at(pos),
        _ => (name, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::convert::Infallible;

    fn resolve(desired: &str, taken: &[&str]) -> String {
        let taken: HashSet<&str> = taken.iter().copied().collect();
        resolve_unique_name(desired, |name| Ok::<_, Infallible>(taken.contains(name))).unwrap()
    }

    #[test]
    fn test_free_name_unchanged() {
        assert_eq!(resolve("clip.mp4", &[]), "clip.mp4");
        assert_eq!(resolve("clip.mp4", &["other.mp4"]), "clip.mp4");
    }

    #[test]
    fn test_suffix_before_extension() {
        assert_eq!(resolve("clip.mp4", &["clip.mp4"]), "clip(1).mp4");
        assert_eq!(resolve("a.jpg", &["a.jpg", "a(1).jpg"]), "a(2).jpg");
    }

    #[test]
    fn test_only_last_dot_is_extension() {
        assert_eq!(resolve("my.clip.mp4", &["my.clip.mp4"]), "my.clip(1).mp4");
    }

    #[test]
    fn test_name_without_extension() {
        assert_eq!(resolve("notes", &["notes"]), "notes(1)");
        assert_eq!(resolve("notes", &["notes", "notes(1)"]), "notes(2)");
    }

    #[test]
    fn test_leading_dot_is_not_extension() {
        assert_eq!(resolve(".hidden", &[".hidden"]), ".hidden(1)");
    }

    #[test]
    fn test_never_returns_taken_name() {
        let taken = ["x.png", "x(1).png", "x(2).png", "x(4).png"];
        let name = resolve("x.png", &taken);
        assert!(!taken.contains(&name.as_str()));
        assert_eq!(name, "x(3).png");
    }

    #[test]
    fn test_predicate_error_propagates() {
        let result = resolve_unique_name("a.jpg", |_| Err::<bool, &str>("catalog gone"));
        assert_eq!(result, Err("catalog gone"));
    }
}
