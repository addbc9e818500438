use serde::de::DeserializeOwned;
use thiserror::Error;

/// A deserialization failure and where in the document it happened.
#[derive(Debug, Error)]
#[error("at JSON path {path} → {message}")]
pub struct PathError {
    pub path: String,
    pub message: String,
}

impl PathError {
    fn from_serde(err: serde_path_to_error::Error<serde_json::Error>) -> Self {
        let path = err.path().to_string();
        Self { path, message: err.into_inner().to_string() }
    }
}

/// Deserialize with JSON-path context in error messages.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T, PathError> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(PathError::from_serde)
}

pub fn from_slice_with_path<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, PathError> {
    let de = &mut serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize::<_, T>(de).map_err(PathError::from_serde)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn reports_the_failing_path() {
        let err = from_str_with_path::<BTreeMap<String, Vec<u8>>>(r#"{"a": [1, 2], "b": [3, "x"]}"#).unwrap_err();
        assert_eq!(err.path, "b[1]");
    }

    #[test]
    fn slices_decode_like_strings() {
        let v: Vec<u32> = from_slice_with_path(b"[1, 2, 3]").unwrap();
        assert_eq!(v, vec![1, 2, 3]);
    }
}
