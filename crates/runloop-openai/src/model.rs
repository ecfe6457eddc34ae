//! Chat model identifiers accepted when creating an assistant.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

macro_rules! models {
    ($($variant:ident => ($id:literal, $json_schema:literal)),+ $(,)?) => {
        /// A model an assistant can run on.
        ///
        /// Known models carry whether they support strict JSON-schema
        /// response formats; anything else is [`Model::Custom`].
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub enum Model {
            $($variant,)+
            /// A model id not listed here, assumed not to support JSON schema output
            Custom(String),
        }

        impl Model {
            pub const KNOWN: &'static [Model] = &[$(Model::$variant),+];

            pub fn id(&self) -> &str {
                match self {
                    $(Model::$variant => $id,)+
                    Model::Custom(id) => id,
                }
            }

            /// Whether the model accepts a strict `json_schema` response format
            pub fn supports_json_schema(&self) -> bool {
                match self {
                    $(Model::$variant => $json_schema,)+
                    Model::Custom(_) => false,
                }
            }

            fn from_id(id: &str) -> Self {
                match id {
                    $($id => Model::$variant,)+
                    other => Model::Custom(other.to_string()),
                }
            }
        }
    };
}

models! {
    Gpt4oMini => ("gpt-4o-mini", true),
    Gpt4o => ("gpt-4o", false),
    Gpt4Turbo => ("gpt-4-turbo", false),
    Gpt4 => ("gpt-4", false),
    Gpt35Turbo => ("gpt-3.5-turbo", false),
    Gpt4oMini20240718 => ("gpt-4o-mini-2024-07-18", true),
    Gpt4o20240806 => ("gpt-4o-2024-08-06", true),
    Gpt4o20240513 => ("gpt-4o-2024-05-13", false),
    Gpt4TurboPreview => ("gpt-4-turbo-preview", false),
    Gpt4Turbo20240409 => ("gpt-4-turbo-2024-04-09", false),
    Gpt41106Preview => ("gpt-4-1106-preview", false),
    Gpt40613 => ("gpt-4-0613", false),
    Gpt40125Preview => ("gpt-4-0125-preview", false),
    Gpt35Turbo16k => ("gpt-3.5-turbo-16k", false),
    Gpt35Turbo1106 => ("gpt-3.5-turbo-1106", false),
    Gpt35Turbo0125 => ("gpt-3.5-turbo-0125", false),
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Model {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Model::from_id(s))
    }
}

impl From<&str> for Model {
    fn from(id: &str) -> Self {
        Model::from_id(id)
    }
}

impl Serialize for Model {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.id())
    }
}

impl<'de> Deserialize<'de> for Model {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let id = String::deserialize(deserializer)?;
        Ok(Model::from_id(&id))
    }
}
