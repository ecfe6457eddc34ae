//! Conversion rules from raw JSON argument values to handler parameter types.
//!
//! In priority order: a value already of the target kind passes through;
//! numbers and booleans are parsed from their text; enumerations match a
//! member exactly; lists accept an array or the JSON text of one; anything
//! else is decoded generically. Failures always name the parameter and the
//! rejected value.

use crate::arg::{ArgEnum, Json, ParamType, ToolArg};
use runloop_core::CoercionError;
use serde::de::DeserializeOwned;
use serde_json::Value;

impl ToolArg for String {
    fn param_type() -> ParamType {
        ParamType::String
    }

    fn coerce(parameter: &str, raw: &Value) -> Result<Self, CoercionError> {
        match raw {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            other => Err(CoercionError::invalid(
                parameter,
                other,
                "string",
                "expected a scalar value",
            )),
        }
    }
}

fn integer_value(parameter: &str, raw: &Value, expected: &str) -> Result<i128, CoercionError> {
    match raw {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(i128::from(i))
            } else if let Some(u) = n.as_u64() {
                Ok(i128::from(u))
            } else {
                match n.as_f64() {
                    Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e38 => {
                        Ok(f as i128)
                    }
                    _ => Err(CoercionError::invalid(
                        parameter,
                        raw,
                        expected,
                        "not an integral number",
                    )),
                }
            }
        }
        Value::String(s) => s
            .parse::<i128>()
            .map_err(|e| CoercionError::invalid(parameter, raw, expected, e.to_string())),
        other => Err(CoercionError::invalid(
            parameter,
            other,
            expected,
            "expected a number or numeric text",
        )),
    }
}

macro_rules! integer_arg {
    ($($ty:ty),+) => {
        $(
            impl ToolArg for $ty {
                fn param_type() -> ParamType {
                    ParamType::Integer
                }

                fn coerce(parameter: &str, raw: &Value) -> Result<Self, CoercionError> {
                    let expected = stringify!($ty);
                    let wide = integer_value(parameter, raw, expected)?;
                    <$ty>::try_from(wide).map_err(|_| {
                        CoercionError::invalid(
                            parameter,
                            raw,
                            expected,
                            format!("out of range for {expected}"),
                        )
                    })
                }
            }
        )+
    };
}

integer_arg!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

fn float_value(parameter: &str, raw: &Value, expected: &str) -> Result<f64, CoercionError> {
    match raw {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| CoercionError::invalid(parameter, raw, expected, "not representable")),
        Value::String(s) => s
            .parse::<f64>()
            .map_err(|e| CoercionError::invalid(parameter, raw, expected, e.to_string())),
        other => Err(CoercionError::invalid(
            parameter,
            other,
            expected,
            "expected a number or numeric text",
        )),
    }
}

impl ToolArg for f64 {
    fn param_type() -> ParamType {
        ParamType::Float
    }

    fn coerce(parameter: &str, raw: &Value) -> Result<Self, CoercionError> {
        float_value(parameter, raw, "f64")
    }
}

impl ToolArg for f32 {
    fn param_type() -> ParamType {
        ParamType::Float
    }

    fn coerce(parameter: &str, raw: &Value) -> Result<Self, CoercionError> {
        let wide = float_value(parameter, raw, "f32")?;
        let narrow = wide as f32;
        if wide.is_finite() && !narrow.is_finite() {
            return Err(CoercionError::invalid(
                parameter,
                raw,
                "f32",
                "out of range for f32",
            ));
        }
        Ok(narrow)
    }
}

impl ToolArg for bool {
    fn param_type() -> ParamType {
        ParamType::Boolean
    }

    fn coerce(parameter: &str, raw: &Value) -> Result<Self, CoercionError> {
        match raw {
            Value::Bool(b) => Ok(*b),
            Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(true),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(false),
            other => Err(CoercionError::invalid(
                parameter,
                other,
                "boolean",
                "expected true or false",
            )),
        }
    }
}

impl ToolArg for Value {
    fn param_type() -> ParamType {
        ParamType::Any
    }

    fn coerce(_parameter: &str, raw: &Value) -> Result<Self, CoercionError> {
        Ok(raw.clone())
    }
}

impl<T: ToolArg> ToolArg for Option<T> {
    fn param_type() -> ParamType {
        ParamType::Optional(Box::new(T::param_type()))
    }

    fn coerce(parameter: &str, raw: &Value) -> Result<Self, CoercionError> {
        match raw {
            Value::Null => Ok(None),
            other => T::coerce(parameter, other).map(Some),
        }
    }

    fn absent(_parameter: &str) -> Result<Self, CoercionError> {
        Ok(None)
    }
}

impl<T: ToolArg> ToolArg for Vec<T> {
    fn param_type() -> ParamType {
        ParamType::List(Box::new(T::param_type()))
    }

    fn coerce(parameter: &str, raw: &Value) -> Result<Self, CoercionError> {
        let expected = || Self::param_type().describe();
        let parsed;
        let items = match raw {
            Value::Array(items) => items,
            Value::String(text) => {
                parsed = serde_json::from_str::<Vec<Value>>(text).map_err(|e| {
                    CoercionError::invalid(parameter, raw, expected(), e.to_string())
                })?;
                &parsed
            }
            other => {
                return Err(CoercionError::invalid(
                    parameter,
                    other,
                    expected(),
                    "expected an array or its JSON text",
                ));
            }
        };

        items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                T::coerce(parameter, item)
                    .map_err(|e| e.with_parameter(format!("{parameter}[{index}]")))
            })
            .collect()
    }
}

impl<T: DeserializeOwned + Send + 'static> ToolArg for Json<T> {
    fn param_type() -> ParamType {
        ParamType::Object {
            type_name: std::any::type_name::<T>(),
        }
    }

    fn coerce(parameter: &str, raw: &Value) -> Result<Self, CoercionError> {
        // JSON text first, then the raw string itself (unit enum variants, newtypes)
        let decoded = match raw {
            Value::String(text) => serde_json::from_str::<T>(text)
                .or_else(|err| serde_json::from_value::<T>(raw.clone()).map_err(|_| err)),
            other => serde_json::from_value::<T>(other.clone()),
        };
        decoded.map(Json).map_err(|e| {
            CoercionError::invalid(parameter, raw, Self::param_type().describe(), e.to_string())
        })
    }
}

/// Match a textual value against the members of an [`ArgEnum`].
pub fn coerce_enum<T: ArgEnum>(parameter: &str, raw: &Value) -> Result<T, CoercionError> {
    match raw {
        Value::String(text) => T::from_member(text)
            .ok_or_else(|| CoercionError::unknown_variant(parameter, raw, T::MEMBERS)),
        other => Err(CoercionError::unknown_variant(parameter, other, T::MEMBERS)),
    }
}
