use serde_json::{Map, Value};

use super::elements::ElementError;

/// Typed accessors over one JSON object. `null` is treated as absent for
/// optional fields and as missing for required ones.
pub(crate) struct Fields<'a> {
    object: &'a Map<String, Value>,
}

impl<'a> Fields<'a> {
    pub(crate) fn new(object: &'a Map<String, Value>) -> Self {
        Self { object }
    }

    fn present(&self, name: &str) -> Option<&'a Value> {
        self.object.get(name).filter(|value| !value.is_null())
    }

    fn required(&self, name: &str) -> Result<&'a Value, ElementError> {
        self.present(name)
            .ok_or_else(|| ElementError::invalid(name, "is required"))
    }

    pub(crate) fn required_number(&self, name: &str) -> Result<f64, ElementError> {
        as_number(name, self.required(name)?)
    }

    pub(crate) fn required_dimension(&self, name: &str) -> Result<f64, ElementError> {
        non_negative(name, self.required_number(name)?)
    }

    pub(crate) fn optional_dimension(&self, name: &str) -> Result<Option<f64>, ElementError> {
        self.present(name)
            .map(|value| as_number(name, value).and_then(|number| non_negative(name, number)))
            .transpose()
    }

    pub(crate) fn required_int(&self, name: &str) -> Result<i64, ElementError> {
        as_int(name, self.required(name)?)
    }

    pub(crate) fn optional_int(&self, name: &str) -> Result<Option<i64>, ElementError> {
        self.present(name)
            .map(|value| as_int(name, value))
            .transpose()
    }

    pub(crate) fn optional_i32(&self, name: &str) -> Result<Option<i32>, ElementError> {
        self.optional_int(name)?
            .map(|value| {
                i32::try_from(value)
                    .map_err(|_| ElementError::invalid(name, "is out of range"))
            })
            .transpose()
    }

    pub(crate) fn required_string(&self, name: &str) -> Result<String, ElementError> {
        as_string(name, self.required(name)?)
    }

    pub(crate) fn optional_string(&self, name: &str) -> Result<Option<String>, ElementError> {
        self.present(name)
            .map(|value| as_string(name, value))
            .transpose()
    }

    pub(crate) fn optional_id_list(&self, name: &str) -> Result<Option<Vec<i64>>, ElementError> {
        let Some(value) = self.present(name) else {
            return Ok(None);
        };
        let items = value
            .as_array()
            .ok_or_else(|| ElementError::invalid(name, "must be an array of element ids"))?;
        items
            .iter()
            .map(|item| {
                item.as_i64()
                    .ok_or_else(|| ElementError::invalid(name, "must be an array of element ids"))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }
}

fn as_number(name: &str, value: &Value) -> Result<f64, ElementError> {
    value
        .as_f64()
        .filter(|number| number.is_finite())
        .ok_or_else(|| ElementError::invalid(name, "must be a finite number"))
}

fn as_int(name: &str, value: &Value) -> Result<i64, ElementError> {
    value
        .as_i64()
        .ok_or_else(|| ElementError::invalid(name, "must be an integer"))
}

fn as_string(name: &str, value: &Value) -> Result<String, ElementError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ElementError::invalid(name, "must be a string"))
}

fn non_negative(name: &str, number: f64) -> Result<f64, ElementError> {
    if number < 0.0 {
        return Err(ElementError::invalid(name, "must not be negative"));
    }
    Ok(number)
}
