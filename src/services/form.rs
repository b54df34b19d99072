//! Selection coordinates submitted as form fields

use crate::{
    config::FieldParsing,
    error::{CutoutError, Result},
    types::SelectionRectangle,
};
use std::collections::HashMap;

/// Names of the four coordinate fields, in rectangle order
pub const FIELD_NAMES: [&str; 4] = ["x", "y", "width", "height"];

/// Raw `x`, `y`, `width`, `height` values as they arrived
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionFields {
    values: HashMap<String, String>,
}

impl SelectionFields {
    /// Collect fields from key/value pairs; unrelated keys are ignored
    ///
    /// # Examples
    /// ```rust
    /// use product_cutout::{services::SelectionFields, FieldParsing, SelectionRectangle};
    ///
    /// let fields = SelectionFields::from_pairs([("x", "5"), ("y", " 7 "), ("width", "40")]);
    /// let rect = fields.parse(FieldParsing::Lenient).unwrap();
    /// assert_eq!(rect, SelectionRectangle::new(5, 7, 40, 0));
    /// ```
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let values = pairs
            .into_iter()
            .filter(|(key, _)| FIELD_NAMES.iter().any(|name| *name == key.as_ref()))
            .map(|(key, value)| (key.as_ref().to_string(), value.into()))
            .collect();
        Self { values }
    }

    /// Set one field, replacing an earlier value
    #[must_use]
    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.values.insert(name.to_string(), value.into());
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Turn the fields into a rectangle under the given policy
    ///
    /// # Errors
    /// - `InvalidField` in strict mode for a missing or non-integer field
    pub fn parse(&self, policy: FieldParsing) -> Result<SelectionRectangle> {
        let mut coords = [0i64; 4];
        for (slot, name) in coords.iter_mut().zip(FIELD_NAMES) {
            *slot = self.parse_field(name, policy)?;
        }
        let [x, y, width, height] = coords;
        Ok(SelectionRectangle::new(x, y, width, height))
    }

    fn parse_field(&self, name: &str, policy: FieldParsing) -> Result<i64> {
        let raw = self.get(name).map(str::trim);
        match (raw.map(str::parse::<i64>), policy) {
            (Some(Ok(value)), _) => Ok(value),
            (_, FieldParsing::Lenient) => Ok(0),
            (None, FieldParsing::Strict) => {
                Err(CutoutError::invalid_field(format!("'{}' is missing", name)))
            },
            (Some(Err(_)), FieldParsing::Strict) => Err(CutoutError::invalid_field(format!(
                "'{}' must be an integer, got '{}'",
                name,
                raw.unwrap_or_default()
            ))),
        }
    }
}
