use std::sync::OnceLock;

use regex::Regex;

pub(crate) fn valid_ident() -> &'static Regex {
    static VALID_IDENT: OnceLock<Regex> = OnceLock::new();
    VALID_IDENT.get_or_init(|| {
        // One of:
        // - `*`
        // - An ident starting with `a-z_\$` and containing other characters `a-z0-9_\$`
        Regex::new(r"^((\*)|(^[a-z_\$][a-z0-9_\$]*))$").unwrap()
    })
}

#[derive(Debug, Clone, Default)]
pub(crate) struct IdGenerator {
    next_id: usize,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Iterator for IdGenerator {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next_id;
        self.next_id += 1;
        Some(id)
    }
}

/// Generates `{prefix}0`, `{prefix}1`, ... in order.
#[derive(Debug, Clone, Default)]
pub(crate) struct NameGenerator {
    prefix: &'static str,
    id: IdGenerator,
}

impl NameGenerator {
    pub fn new(prefix: &'static str) -> Self {
        NameGenerator {
            prefix,
            id: IdGenerator::new(),
        }
    }

    pub fn gen(&mut self) -> String {
        format!("{}{}", self.prefix, self.id.next().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_ident() {
        assert!(valid_ident().is_match("users"));
        assert!(valid_ident().is_match("_s0"));
        assert!(valid_ident().is_match("*"));
        assert!(!valid_ident().is_match("Users"));
        assert!(!valid_ident().is_match("0abc"));
        assert!(!valid_ident().is_match("first name"));
    }

    #[test]
    fn test_name_generator() {
        let mut names = NameGenerator::new("_j");
        assert_eq!(names.gen(), "_j0");
        assert_eq!(names.gen(), "_j1");
    }
}
