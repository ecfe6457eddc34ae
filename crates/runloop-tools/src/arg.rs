//! Typed handler parameters.
//!
//! The remote sends every argument as weakly-typed JSON, often a string even
//! for numbers or lists. A handler parameter type implements [`ToolArg`] to
//! describe itself and to convert such a raw value into a typed one.

use runloop_core::CoercionError;
use serde_json::{Value, json};

/// Declared shape of a handler parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    String,
    Integer,
    Float,
    Boolean,
    /// Closed set of members, matched exactly
    Enum {
        members: &'static [&'static str],
    },
    List(Box<ParamType>),
    /// Structured value decoded generically into a named type
    Object {
        type_name: &'static str,
    },
    /// Raw JSON passed through unchanged
    Any,
    /// May be absent or `null`
    Optional(Box<ParamType>),
}

impl ParamType {
    pub fn enumeration(members: &'static [&'static str]) -> Self {
        ParamType::Enum { members }
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, ParamType::Optional(_))
    }

    /// Human-readable name used in coercion error messages
    pub fn describe(&self) -> String {
        match self {
            ParamType::String => "string".to_string(),
            ParamType::Integer => "integer".to_string(),
            ParamType::Float => "float".to_string(),
            ParamType::Boolean => "boolean".to_string(),
            ParamType::Enum { members } => format!("one of [{}]", members.join(", ")),
            ParamType::List(item) => format!("list of {}", item.describe()),
            ParamType::Object { type_name } => short_type_name(type_name).to_string(),
            ParamType::Any => "any JSON value".to_string(),
            ParamType::Optional(inner) => format!("optional {}", inner.describe()),
        }
    }

    /// JSON schema fragment describing this parameter to the remote model
    pub fn json_schema(&self) -> Value {
        match self {
            ParamType::String => json!({ "type": "string" }),
            ParamType::Integer => json!({ "type": "integer" }),
            ParamType::Float => json!({ "type": "number" }),
            ParamType::Boolean => json!({ "type": "boolean" }),
            ParamType::Enum { members } => json!({ "type": "string", "enum": members }),
            ParamType::List(item) => json!({ "type": "array", "items": item.json_schema() }),
            ParamType::Object { .. } => json!({ "type": "object" }),
            ParamType::Any => json!({}),
            ParamType::Optional(inner) => inner.json_schema(),
        }
    }
}

fn short_type_name(type_name: &str) -> &str {
    let base = type_name.split('<').next().unwrap_or(type_name);
    base.rsplit("::").next().unwrap_or(base)
}

/// A type a tool handler can take as a parameter.
pub trait ToolArg: Sized + Send + 'static {
    fn param_type() -> ParamType;

    /// Convert the raw value bound to `parameter`
    fn coerce(parameter: &str, raw: &Value) -> Result<Self, CoercionError>;

    /// Value used when the argument is missing from the call
    fn absent(parameter: &str) -> Result<Self, CoercionError> {
        Err(CoercionError::missing(parameter))
    }
}

/// An enumeration whose members are matched by exact textual value.
///
/// Usually implemented through [`tool_enum!`](crate::tool_enum).
pub trait ArgEnum: Sized + Send + 'static {
    const MEMBERS: &'static [&'static str];

    fn from_member(member: &str) -> Option<Self>;

    fn as_member(&self) -> &'static str;
}

/// Parameter decoded generically from a JSON object (or its JSON text).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> std::ops::Deref for Json<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

/// Declare an enumeration usable as a tool parameter.
///
/// ```rust
/// use runloop_tools::{ArgEnum, ToolArg, tool_enum};
/// use serde_json::json;
///
/// tool_enum! {
///     #[derive(Debug, Clone, Copy, PartialEq, Eq)]
///     pub enum Side {
///         White => "WHITE",
///         Black => "BLACK",
///     }
/// }
///
/// assert_eq!(Side::coerce("side", &json!("BLACK")).unwrap(), Side::Black);
/// assert!(Side::coerce("side", &json!("black")).is_err());
/// assert_eq!(Side::White.as_member(), "WHITE");
/// ```
#[macro_export]
macro_rules! tool_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($variant:ident => $member:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis enum $name {
            $($variant),+
        }

        impl $crate::ArgEnum for $name {
            const MEMBERS: &'static [&'static str] = &[$($member),+];

            fn from_member(member: &str) -> ::core::option::Option<Self> {
                match member {
                    $($member => ::core::option::Option::Some($name::$variant),)+
                    _ => ::core::option::Option::None,
                }
            }

            fn as_member(&self) -> &'static str {
                match self {
                    $($name::$variant => $member),+
                }
            }
        }

        impl $crate::ToolArg for $name {
            fn param_type() -> $crate::ParamType {
                $crate::ParamType::enumeration(<$name as $crate::ArgEnum>::MEMBERS)
            }

            fn coerce(
                parameter: &str,
                raw: &$crate::__private::Value,
            ) -> ::core::result::Result<Self, $crate::__private::CoercionError> {
                $crate::coerce::coerce_enum(parameter, raw)
            }
        }
    };
}
