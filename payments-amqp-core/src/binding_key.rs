use std::{convert::Infallible, fmt, str::FromStr};

/// Separator between the words of a routing or binding key
const WORD_SEPARATOR: char = '.';

/// A fragment of a [`BindingKey`] that will represent either a word, a star `*` or a sharp `#`
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum BindingKeyFragment {
    /// A literal word that must be equal to the routing key word
    Value(String),

    /// Matches exactly one word
    Star,

    /// Matches zero or more words
    Sharp,
}

impl BindingKeyFragment {
    pub fn is_star(&self) -> bool {
        matches!(self, BindingKeyFragment::Star)
    }

    pub fn is_sharp(&self) -> bool {
        matches!(self, BindingKeyFragment::Sharp)
    }

    fn parse(word: &str) -> Self {
        match word {
            "*" => BindingKeyFragment::Star,
            "#" => BindingKeyFragment::Sharp,
            w => BindingKeyFragment::Value(w.to_string()),
        }
    }
}

impl fmt::Display for BindingKeyFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingKeyFragment::Value(s) => write!(f, "{s}"),
            BindingKeyFragment::Star => write!(f, "*"),
            BindingKeyFragment::Sharp => write!(f, "#"),
        }
    }
}

/// Pattern used by a topic exchange to select the queues a message is routed to.
///
/// A binding key is a list of words separated by dots. The `*` word matches exactly one word of
/// the routing key and the `#` word matches zero or more words. The empty key only matches the
/// empty routing key.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct BindingKey {
    pub fragments: Vec<BindingKeyFragment>,
}

impl BindingKey {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a dot separated binding key
    pub fn parse(key: &str) -> Self {
        Self {
            fragments: routing_words(key).map(BindingKeyFragment::parse).collect(),
        }
    }

    pub fn fragment(&self, index: usize) -> Option<&BindingKeyFragment> {
        self.fragments.get(index)
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Returns `true` if the binding key contains a `*` or `#` wildcard
    pub fn has_wildcard(&self) -> bool {
        self.fragments
            .iter()
            .any(|f| f.is_star() || f.is_sharp())
    }

    /// Returns `true` if a message published with `routing_key` matches this binding key
    pub fn matches(&self, routing_key: &str) -> bool {
        let words = routing_words(routing_key).collect::<Vec<_>>();
        match_words(&self.fragments, &words)
    }
}

/// Split a key into its words. The empty key has no words
pub fn routing_words(key: &str) -> impl Iterator<Item = &str> {
    let mut split = key.split(WORD_SEPARATOR);
    if key.is_empty() {
        split.next();
    }
    split
}

fn match_words(fragments: &[BindingKeyFragment], words: &[&str]) -> bool {
    match fragments.split_first() {
        None => words.is_empty(),
        Some((BindingKeyFragment::Sharp, rest)) => {
            (0..=words.len()).any(|skip| match_words(rest, &words[skip..]))
        }
        Some((BindingKeyFragment::Star, rest)) => {
            !words.is_empty() && match_words(rest, &words[1..])
        }
        Some((BindingKeyFragment::Value(value), rest)) => {
            words.first() == Some(&value.as_str()) && match_words(rest, &words[1..])
        }
    }
}

impl fmt::Display for BindingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, fragment) in self.fragments.iter().enumerate() {
            if idx > 0 {
                write!(f, "{WORD_SEPARATOR}")?;
            }
            write!(f, "{fragment}")?;
        }
        Ok(())
    }
}

impl FromStr for BindingKey {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<&str> for BindingKey {
    fn from(key: &str) -> Self {
        Self::parse(key)
    }
}

impl From<String> for BindingKey {
    fn from(key: String) -> Self {
        Self::parse(&key)
    }
}

impl From<Vec<String>> for BindingKey {
    fn from(value: Vec<String>) -> Self {
        Self {
            fragments: value.iter().map(|w| BindingKeyFragment::parse(w)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding_key;

    #[test]
    fn parse_and_display() {
        let key = BindingKey::parse("payment.*.#");
        assert_eq!(key, binding_key!["payment", *, #]);
        assert_eq!(key.to_string(), "payment.*.#");
        assert!(key.has_wildcard());
    }

    #[test]
    fn empty_key_has_no_fragments() {
        assert!(BindingKey::parse("").is_empty());
        assert_eq!(BindingKey::parse("").to_string(), "");
        assert!(BindingKey::empty().matches(""));
        assert!(!BindingKey::empty().matches("payment"));
    }

    #[test]
    fn star_matches_exactly_one_word() {
        let key = binding_key![*];
        assert!(key.matches("payment"));
        assert!(key.matches("42"));
        assert!(!key.matches(""));
        assert!(!key.matches("payment.created"));
    }

    #[test]
    fn star_matches_equal_parts() {
        let key = binding_key![*, *, *];
        for routing_key in ["a.b.c", "d.e.f"] {
            assert!(key.matches(routing_key));
        }
        assert!(!key.matches("a.b"));
    }

    #[test]
    fn star_in_any_position() {
        for key in [
            binding_key!["a", "b", *],
            binding_key!["a", *, *],
            binding_key!["a", *, "c"],
            binding_key![*, "b", "c"],
        ] {
            assert!(key.matches("a.b.c"), "{key} should match a.b.c");
        }
        assert!(!binding_key!["a", *, "d"].matches("a.b.c"));
    }

    #[test]
    fn sharp_matches_zero_or_more_words() {
        let key = binding_key!["a", #];
        assert!(key.matches("a"));
        assert!(key.matches("a.b"));
        assert!(key.matches("a.b.c"));
        assert!(!key.matches("b.a"));

        assert!(binding_key![#].matches(""));
        assert!(binding_key![#].matches("x.y.z"));
        assert!(binding_key![#, "z"].matches("x.y.z"));
        assert!(!binding_key![#, "z"].matches("x.y"));
    }

    #[test]
    fn literal_words_must_be_equal() {
        let key = BindingKey::parse("payment.created");
        assert!(key.matches("payment.created"));
        assert!(!key.matches("payment.refused"));
        assert!(!key.has_wildcard());
    }
}
