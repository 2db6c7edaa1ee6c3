use std::collections::BTreeMap;

use crate::errors::ParamError;

/// A map from option names to option values, used to select between
/// algorithm variants of the decision procedures and reductions.
pub type ParameterMap = BTreeMap<String, String>;

/// Builds a [`ParameterMap`] from string pairs.
#[must_use]
pub fn params(pairs: &[(&str, &str)]) -> ParameterMap {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

/// Looks up a required key.
pub fn require<'a>(map: &'a ParameterMap, key: &str) -> Result<&'a str, ParamError> {
    map.get(key)
        .map(String::as_str)
        .ok_or_else(|| ParamError::missing(key))
}

/// Rejects any key outside the recognized set.
pub fn check_keys(map: &ParameterMap, recognized: &[&str]) -> Result<(), ParamError> {
    for key in map.keys() {
        if !recognized.contains(&key.as_str()) {
            return Err(ParamError::unknown_key(key));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_and_check() {
        let map = params(&[("algorithm", "antichains")]);
        assert_eq!(require(&map, "algorithm").unwrap(), "antichains");
        assert_eq!(
            require(&map, "direction"),
            Err(ParamError::missing("direction"))
        );
        assert!(check_keys(&map, &["algorithm"]).is_ok());
        assert_eq!(
            check_keys(&map, &["direction"]),
            Err(ParamError::unknown_key("algorithm"))
        );
    }
}
