//! Caller-supplied `key=value` claims.

use std::collections::BTreeMap;
use std::str::FromStr;

use thiserror::Error;

/// Errors produced while parsing a single annotation entry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnnotationError {
    #[error("annotation {0:?} is not of the form key=value")]
    MissingSeparator(String),
    #[error("annotation {0:?} has an empty key")]
    EmptyKey(String),
}

/// One `key=value` pair, as given to `-a`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub key: String,
    pub value: String,
}

impl FromStr for Annotation {
    type Err = AnnotationError;

    fn from_str(entry: &str) -> Result<Self, Self::Err> {
        let Some((key, value)) = entry.split_once('=') else {
            return Err(AnnotationError::MissingSeparator(entry.to_owned()));
        };
        if key.is_empty() {
            return Err(AnnotationError::EmptyKey(entry.to_owned()));
        }
        Ok(Self {
            key: key.to_owned(),
            value: value.to_owned(),
        })
    }
}

/// Accumulator for repeated `-a` flags.
///
/// Later entries overwrite earlier ones with the same key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationSet {
    entries: BTreeMap<String, String>,
}

impl AnnotationSet {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a parsed annotation, replacing any earlier value for its key.
    pub fn insert(&mut self, annotation: Annotation) {
        self.entries.insert(annotation.key, annotation.value);
    }

    /// Borrow the accumulated claims.
    #[inline]
    pub fn snapshot(&self) -> &BTreeMap<String, String> {
        &self.entries
    }
}

impl FromIterator<Annotation> for AnnotationSet {
    fn from_iter<I: IntoIterator<Item = Annotation>>(iter: I) -> Self {
        let mut set = Self::new();
        for annotation in iter {
            set.insert(annotation);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_entries_accumulate() {
        let mut set = AnnotationSet::new();
        set.insert("foo=bar".parse().unwrap());
        set.insert("baz=qux".parse().unwrap());

        let expected: BTreeMap<_, _> = [("foo", "bar"), ("baz", "qux")]
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        assert_eq!(set.snapshot(), &expected);
    }

    #[test]
    fn later_entries_overwrite() {
        let set: AnnotationSet = ["env=dev", "env=prod"]
            .into_iter()
            .map(|entry| entry.parse().unwrap())
            .collect();
        assert_eq!(set.snapshot().get("env").map(String::as_str), Some("prod"));
        assert_eq!(set.snapshot().len(), 1);
    }

    #[test]
    fn missing_separator_is_rejected() {
        assert_eq!(
            "foobar".parse::<Annotation>(),
            Err(AnnotationError::MissingSeparator("foobar".to_owned()))
        );
    }

    #[test]
    fn empty_key_is_rejected() {
        assert_eq!(
            "=bar".parse::<Annotation>(),
            Err(AnnotationError::EmptyKey("=bar".to_owned()))
        );
    }

    #[test]
    fn value_may_contain_separator() {
        let annotation: Annotation = "url=https://x.test/?a=b".parse().unwrap();
        assert_eq!(annotation.key, "url");
        assert_eq!(annotation.value, "https://x.test/?a=b");

        let empty: Annotation = "flag=".parse().unwrap();
        assert_eq!(empty.value, "");
    }
}
