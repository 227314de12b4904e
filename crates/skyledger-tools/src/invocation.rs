//! Typed tool invocations
//!
//! Service replies carry a tool name plus loosely-typed JSON arguments.
//! They are validated into a [`ToolInvocation`] before anything runs.

use serde_json::Value;
use skyledger_core::{Error, LocationDescriptor, Result};

pub const GET_WEATHER_FOR_LOCATION: &str = "getWeatherForLocation";

#[derive(Clone, Debug, PartialEq)]
pub enum ToolInvocation {
    GetWeatherForLocation(LocationDescriptor),
}

impl ToolInvocation {
    /// Validate a raw tool call.
    pub fn parse(name: &str, args: &Value) -> Result<Self> {
        match name {
            GET_WEATHER_FOR_LOCATION => {
                let obj = args
                    .as_object()
                    .ok_or_else(|| Error::malformed_arguments(name, "arguments must be an object"))?;
                let field = |key: &str| -> Result<String> {
                    match obj.get(key) {
                        Some(Value::String(s)) => Ok(s.clone()),
                        Some(_) => Err(Error::malformed_arguments(name, format!("{} must be a string", key))),
                        None => Err(Error::malformed_arguments(name, format!("missing {}", key))),
                    }
                };
                Ok(Self::GetWeatherForLocation(LocationDescriptor::new(
                    field("country")?,
                    field("state")?,
                    field("district")?,
                )))
            }
            other => Err(Error::UnknownTool(other.to_string())),
        }
    }

    pub fn tool_name(&self) -> &'static str {
        match self {
            Self::GetWeatherForLocation(_) => GET_WEATHER_FOR_LOCATION,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_location() {
        let inv = ToolInvocation::parse(
            GET_WEATHER_FOR_LOCATION,
            &json!({"country": "Japan", "state": "Tokyo", "district": "Minato"}),
        )
        .unwrap();
        assert_eq!(
            inv,
            ToolInvocation::GetWeatherForLocation(LocationDescriptor::new("Japan", "Tokyo", "Minato"))
        );
        assert_eq!(inv.tool_name(), "getWeatherForLocation");
    }

    #[test]
    fn empty_strings_are_accepted() {
        let inv = ToolInvocation::parse(
            GET_WEATHER_FOR_LOCATION,
            &json!({"country": "Nowhere", "state": "", "district": ""}),
        );
        assert!(inv.is_ok());
    }

    #[test]
    fn missing_field_is_malformed() {
        let err = ToolInvocation::parse(GET_WEATHER_FOR_LOCATION, &json!({"country": "Chile"})).unwrap_err();
        assert!(matches!(err, Error::MalformedToolArguments { reason, .. } if reason == "missing state"));
    }

    #[test]
    fn non_string_is_malformed() {
        let err = ToolInvocation::parse(
            GET_WEATHER_FOR_LOCATION,
            &json!({"country": 1, "state": "a", "district": "b"}),
        )
        .unwrap_err();
        assert!(matches!(err, Error::MalformedToolArguments { .. }));
        assert!(ToolInvocation::parse(GET_WEATHER_FOR_LOCATION, &json!("Paris")).is_err());
    }

    #[test]
    fn unknown_tool() {
        let err = ToolInvocation::parse("bash", &json!({})).unwrap_err();
        assert!(matches!(err, Error::UnknownTool(name) if name == "bash"));
    }
}
