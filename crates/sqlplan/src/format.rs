//! Per-key template rendering.
//!
//! Every node family a dialect knows how to print (operators, predicates,
//! aggregates, joins, clause keywords, literals, cast types, JSON helpers) is
//! backed by one [FormatRegistry]. A registry holds a single default template
//! and per-key overrides on top of it.
//!
//! Templates are plain text with named slots: `{left} {keyword} {right}`.
//! A slot may carry the binding strength its argument needs, `{arg:0}`, which
//! the compiler uses to decide whether the argument needs parentheses. `{{`
//! and `}}` produce literal braces. There is no other syntax.
use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;

use crate::{Error, Result};

/// A key of a [FormatRegistry]. Its static string is the default keyword,
/// available to templates through the `{keyword}` slot.
pub trait FormatKey: Copy + Eq + Hash + Debug + Into<&'static str> {
    fn keyword(self) -> &'static str {
        self.into()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Slot {
        name: String,
        binding_strength: Option<i32>,
    },
}

impl Template {
    /// Compiles a template. Parsing never fails: anything that isn't a
    /// well-formed slot is kept as literal text.
    pub fn parse(source: &str) -> Template {
        let mut segments = Vec::new();
        let mut text = String::new();
        let mut chars = source.char_indices().peekable();

        while let Some((start, c)) = chars.next() {
            match c {
                '{' if matches!(chars.peek(), Some((_, '{'))) => {
                    chars.next();
                    text.push('{');
                }
                '}' if matches!(chars.peek(), Some((_, '}'))) => {
                    chars.next();
                    text.push('}');
                }
                '{' => {
                    let rest = &source[start + 1..];
                    match rest.find('}').and_then(|end| parse_slot(&rest[..end]).map(|s| (end, s))) {
                        Some((end, slot)) => {
                            if !text.is_empty() {
                                segments.push(Segment::Text(std::mem::take(&mut text)));
                            }
                            segments.push(slot);
                            // skip over the slot body and the closing brace
                            for _ in 0..=rest[..end].chars().count() {
                                chars.next();
                            }
                        }
                        None => text.push('{'),
                    }
                }
                c => text.push(c),
            }
        }
        if !text.is_empty() {
            segments.push(Segment::Text(text));
        }

        Template {
            source: source.to_string(),
            segments,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn slots(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Slot { name, .. } => Some(name.as_str()),
            Segment::Text(_) => None,
        })
    }

    pub fn has_slot(&self, name: &str) -> bool {
        self.slots().any(|s| s == name)
    }

    /// Binding strength requested by the first occurrence of a slot.
    pub fn slot_strength(&self, name: &str) -> Option<i32> {
        self.segments.iter().find_map(|s| match s {
            Segment::Slot {
                name: n,
                binding_strength,
            } if n == name => *binding_strength,
            _ => None,
        })
    }

    /// Substitutes every slot. Slots without a value render as empty text.
    pub fn render(&self, params: &Params) -> String {
        self.render_with_keyword(params, "")
    }

    fn render_with_keyword(&self, params: &Params, keyword: &str) -> String {
        let mut out = String::with_capacity(self.source.len() + 16);
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Slot { name, .. } => {
                    let value = params.get(name).or_else(|| (name == "keyword").then_some(keyword));
                    out.push_str(value.unwrap_or_default());
                }
            }
        }
        out
    }
}

fn parse_slot(body: &str) -> Option<Segment> {
    let (name, strength) = match body.split_once(':') {
        Some((name, strength)) => (name, Some(strength.trim().parse::<i32>().ok()?)),
        None => (body, None),
    };
    let valid = !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    valid.then(|| Segment::Slot {
        name: name.to_string(),
        binding_strength: strength,
    })
}

impl From<&str> for Template {
    fn from(source: &str) -> Self {
        Template::parse(source)
    }
}

/// Named values for a template. A parameter counts as present when it was
/// supplied with non-empty text.
#[derive(Debug, Clone, Default)]
pub struct Params<'a> {
    values: Vec<(&'a str, String)>,
}

impl<'a> Params<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<S: Into<String>>(mut self, name: &'a str, value: S) -> Self {
        self.set(name, value);
        self
    }

    pub fn set<S: Into<String>>(&mut self, name: &'a str, value: S) {
        let value = value.into();
        match self.values.iter_mut().find(|(n, _)| *n == name) {
            Some((_, v)) => *v = value,
            None => self.values.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_present(&self, name: &str) -> bool {
        self.get(name).is_some_and(|v| !v.is_empty())
    }
}

#[derive(Debug, Clone)]
enum Condition {
    Present(String),
    Always,
}

#[derive(Debug, Clone, Default)]
struct Entry {
    keyword: Option<String>,
    format: Option<Template>,
    cascade: Vec<(Condition, Template)>,
    binding_strength: Option<i32>,
}

/// Result of resolving a key: the template to use, with the keyword and
/// binding strength that go with it.
#[derive(Debug, Clone, Copy)]
pub struct Lookup<'r> {
    pub template: &'r Template,
    pub keyword: &'r str,
    pub binding_strength: Option<i32>,
}

impl Lookup<'_> {
    pub fn render(&self, params: &Params) -> String {
        self.template.render_with_keyword(params, self.keyword)
    }
}

#[derive(Debug, Clone)]
pub struct FormatRegistry<K: FormatKey> {
    default: Template,
    entries: HashMap<K, Entry>,
    unsupported: HashSet<K>,
}

impl<K: FormatKey> FormatRegistry<K> {
    pub fn new(default_template: &str) -> Self {
        FormatRegistry {
            default: Template::parse(default_template),
            entries: HashMap::new(),
            unsupported: HashSet::new(),
        }
    }

    pub fn set_format(&mut self, key: K, template: &str) -> &mut Self {
        self.entries.entry(key).or_default().format = Some(Template::parse(template));
        self
    }

    /// Like [Self::set_format], for templates whose result binds differently
    /// from the key's usual operator precedence (e.g. when an infix operator
    /// is rendered as a function call).
    pub fn set_format_with_strength(&mut self, key: K, template: &str, strength: i32) -> &mut Self {
        let entry = self.entries.entry(key).or_default();
        entry.format = Some(Template::parse(template));
        entry.binding_strength = Some(strength);
        self
    }

    /// Replaces only the keyword of a key, keeping whatever template applies.
    pub fn alias(&mut self, key: K, keyword: &str) -> &mut Self {
        self.entries.entry(key).or_default().keyword = Some(keyword.to_string());
        self
    }

    /// Ordered rules, each used only when its parameter is present; `"*"`
    /// matches unconditionally. When no rule matches, the key's own template
    /// (or the registry default) is used.
    pub fn set_cascading(&mut self, key: K, rules: &[(&str, &str)]) -> &mut Self {
        let cascade = rules
            .iter()
            .map(|(param, template)| {
                let condition = match *param {
                    "*" => Condition::Always,
                    param => Condition::Present(param.to_string()),
                };
                (condition, Template::parse(template))
            })
            .collect();
        self.entries.entry(key).or_default().cascade = cascade;
        self
    }

    pub fn set_unsupported(&mut self, keys: &[K]) -> &mut Self {
        self.unsupported.extend(keys.iter().copied());
        self
    }

    pub fn set_supported(&mut self, keys: &[K]) -> &mut Self {
        for key in keys {
            self.unsupported.remove(key);
        }
        self
    }

    pub fn is_supported(&self, key: K) -> bool {
        !self.unsupported.contains(&key)
    }

    pub fn keyword(&self, key: K) -> &str {
        self.entries
            .get(&key)
            .and_then(|e| e.keyword.as_deref())
            .unwrap_or_else(|| key.keyword())
    }

    pub fn binding_strength(&self, key: K) -> Option<i32> {
        self.entries.get(&key).and_then(|e| e.binding_strength)
    }

    /// Resolves the template for a key given which parameters will be present.
    pub fn lookup(&self, key: K, params: &Params, throw_error: bool) -> Result<Lookup<'_>> {
        if !self.is_supported(key) {
            if throw_error {
                return Err(Error::new_unsupported(feature_name(key)));
            }
            log::trace!("{key:?} is unsupported, rendering the default");
        }

        let entry = self.entries.get(&key);
        let cascaded = entry.and_then(|e| {
            e.cascade.iter().find_map(|(condition, template)| match condition {
                Condition::Always => Some(template),
                Condition::Present(param) if params.is_present(param) => Some(template),
                Condition::Present(_) => None,
            })
        });
        let template = cascaded
            .or_else(|| entry.and_then(|e| e.format.as_ref()))
            .unwrap_or(&self.default);

        Ok(Lookup {
            template,
            keyword: self.keyword(key),
            binding_strength: entry.and_then(|e| e.binding_strength),
        })
    }

    pub fn get(&self, key: K, params: &Params, throw_error: bool) -> Result<String> {
        Ok(self.lookup(key, params, throw_error)?.render(params))
    }
}

fn feature_name<K: FormatKey>(key: K) -> String {
    match key.keyword() {
        "" => format!("{key:?}"),
        keyword => keyword.to_string(),
    }
}
