use std::{collections::BTreeMap, fmt, str::FromStr, sync::Arc};

/// Selects the resources that represent functions: those carrying the marker
/// label key, whatever its value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MarkerLabel(Arc<str>);

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum InvalidLabelKey {
    #[error("label key must not be empty")]
    Empty,

    #[error("label key prefix must not be empty: {0}")]
    EmptyPrefix(String),

    #[error("label key name must be at most 63 characters: {0}")]
    TooLong(String),

    #[error("label key name must consist of alphanumerics, '-', '_' or '.' and start and end with an alphanumeric: {0}")]
    InvalidName(String),
}

// === impl MarkerLabel ===

impl MarkerLabel {
    pub fn key(&self) -> &str {
        &self.0
    }

    /// An existence selector, suitable for server-side list/watch filtering.
    pub fn selector(&self) -> &str {
        &self.0
    }

    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        labels.contains_key(self.key())
    }
}

impl FromStr for MarkerLabel {
    type Err = InvalidLabelKey;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        if key.is_empty() {
            return Err(InvalidLabelKey::Empty);
        }

        let name = match key.rsplit_once('/') {
            Some(("", _)) => return Err(InvalidLabelKey::EmptyPrefix(key.to_string())),
            Some((_, name)) => name,
            None => key,
        };

        if name.len() > 63 {
            return Err(InvalidLabelKey::TooLong(key.to_string()));
        }

        let valid = name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && name.starts_with(|c: char| c.is_ascii_alphanumeric())
            && name.ends_with(|c: char| c.is_ascii_alphanumeric());
        if !valid {
            return Err(InvalidLabelKey::InvalidName(key.to_string()));
        }

        Ok(Self(key.into()))
    }
}

impl fmt::Display for MarkerLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maplit::btreemap;

    #[test]
    fn matches_key_regardless_of_value() {
        let marker = "faas_function".parse::<MarkerLabel>().unwrap();
        assert!(marker.matches(&btreemap! {
            "faas_function".to_string() => "nodeinfo".to_string(),
        }));
        assert!(marker.matches(&btreemap! {
            "faas_function".to_string() => "".to_string(),
        }));
        assert!(!marker.matches(&btreemap! {
            "app".to_string() => "faas_function".to_string(),
        }));
        assert!(!marker.matches(&BTreeMap::new()));
    }

    #[test]
    fn parses_label_keys() {
        assert!("faas_function".parse::<MarkerLabel>().is_ok());
        assert!("openfaas.com/function".parse::<MarkerLabel>().is_ok());
        assert_eq!("".parse::<MarkerLabel>(), Err(InvalidLabelKey::Empty));
        assert!(matches!(
            "/function".parse::<MarkerLabel>(),
            Err(InvalidLabelKey::EmptyPrefix(_))
        ));
        assert!(matches!(
            "-function".parse::<MarkerLabel>(),
            Err(InvalidLabelKey::InvalidName(_))
        ));
        assert!(matches!(
            "a".repeat(64).parse::<MarkerLabel>(),
            Err(InvalidLabelKey::TooLong(_))
        ));
    }
}
