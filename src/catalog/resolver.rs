//! Source file name to well identity

use crate::types::WellId;
use std::collections::HashMap;

/// Normalised lookup key of a file name: the final path component with its
/// extension removed.
pub fn normalise_file_name(name: &str) -> String {
    let base = name
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or(name)
        .trim();
    match base.rfind('.') {
        Some(dot) if dot > 0 => base[..dot].to_string(),
        _ => base.to_string(),
    }
}

/// Resolves source files against the field's index table.
#[derive(Debug, Clone, Copy)]
pub struct WellIdentityResolver<'a> {
    index: &'a HashMap<String, WellId>,
}

impl<'a> WellIdentityResolver<'a> {
    pub fn new(index: &'a HashMap<String, WellId>) -> Self {
        Self { index }
    }

    /// Exact match of the normalised file name. Duplicate index rows were
    /// collapsed at load time, first row winning.
    pub fn resolve(&self, file_name: &str) -> Option<&'a WellId> {
        self.index.get(&normalise_file_name(file_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalise_strips_directory_and_extension() {
        assert_eq!(normalise_file_name("tmp/x/1044_run1.las"), "1044_run1");
        assert_eq!(normalise_file_name("C:\\logs\\A.LAS"), "A");
        assert_eq!(normalise_file_name("no_extension"), "no_extension");
        assert_eq!(normalise_file_name(".hidden"), ".hidden");
    }

    #[test]
    fn test_resolve_is_exact() {
        let mut index = HashMap::new();
        index.insert("1044_run1".to_string(), WellId::new("1044"));
        let resolver = WellIdentityResolver::new(&index);
        assert_eq!(resolver.resolve("1044_run1.las"), Some(&WellId::new("1044")));
        assert_eq!(resolver.resolve("1044_RUN1.las"), None);
        assert_eq!(resolver.resolve("1044_run"), None);
    }
}
