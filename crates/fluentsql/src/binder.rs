//! Placeholder allocation and value bindings.
//!
//! Placeholders are named `:p1`, `:p2`, ... and are unique for the lifetime of
//! one builder. Each render starts a fresh binding set, but the counter never
//! goes back, so a name is never reused.

use crate::value::Value;

/// Prefix used in SQL text in front of a binding name.
pub const PLACEHOLDER_PREFIX: char = ':';

/// Ordered map of binding name (without the `:` prefix) to value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    entries: Vec<(String, Value)>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a value by binding name (`"p1"`, not `":p1"`).
    pub fn get(&self, name: &str) -> Option<&Value> {
        let name = name.strip_prefix(PLACEHOLDER_PREFIX).unwrap_or(name);
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Iterate `(name, value)` pairs in binding order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, v)| v)
    }

    fn push(&mut self, name: String, value: Value) {
        self.entries.push((name, value));
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<'a> IntoIterator for &'a Bindings {
    type Item = (&'a str, &'a Value);
    type IntoIter = Box<dyn Iterator<Item = (&'a str, &'a Value)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

/// Allocates placeholder names and records bound values in call order.
#[derive(Debug, Clone, Default)]
pub struct Binder {
    counter: usize,
    bindings: Bindings,
}

impl Binder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a value and return the placeholder to embed in SQL text.
    pub fn bind(&mut self, value: Value) -> String {
        self.counter += 1;
        let name = format!("p{}", self.counter);
        let placeholder = format!("{PLACEHOLDER_PREFIX}{name}");
        self.bindings.push(name, value);
        placeholder
    }

    /// Last issued sequence number (0 before the first bind).
    pub fn counter(&self) -> usize {
        self.counter
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    /// Drop the current bindings; the counter keeps its value.
    pub fn reset_bindings(&mut self) {
        self.bindings.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_increase_in_call_order() {
        let mut binder = Binder::new();
        assert_eq!(binder.bind(Value::Int(1)), ":p1");
        assert_eq!(binder.bind(Value::from("a")), ":p2");
        assert_eq!(binder.counter(), 2);

        let names: Vec<&str> = binder.bindings().names().collect();
        assert_eq!(names, vec!["p1", "p2"]);
        assert_eq!(binder.bindings().get(":p2"), Some(&Value::from("a")));
    }

    #[test]
    fn reset_keeps_counter() {
        let mut binder = Binder::new();
        binder.bind(Value::Int(1));
        binder.reset_bindings();
        assert!(binder.bindings().is_empty());
        assert_eq!(binder.bind(Value::Int(2)), ":p2");
        assert_eq!(binder.bindings().len(), 1);
    }
}
