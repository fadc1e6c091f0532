use serde::Serialize;
use std::fmt;

/// Output format selection for all subcommands.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Single JSON object on stdout.
    Json,
    /// Human-readable summary on stdout.
    #[default]
    Human,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Human => write!(f, "human"),
        }
    }
}

/// Render a result in the selected format.
pub fn render<T: Serialize + fmt::Display>(
    format: OutputFormat,
    value: &T,
) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Json => serde_json::to_string(value),
        OutputFormat::Human => Ok(value.to_string()),
    }
}

/// Write a result to stdout.
///
/// - **Json**: a single JSON object, no extraneous text.
/// - **Human**: the `Display` representation.
pub fn emit<T: Serialize + fmt::Display>(format: OutputFormat, value: &T) -> Result<(), serde_json::Error> {
    let rendered = render(format, value)?;
    println!("{rendered}");
    Ok(())
}

/// JSON body emitted for a failed invocation.
pub fn error_json(exit_code_num: u8, message: &str) -> String {
    let obj = serde_json::json!({
        "error": message,
        "exit_code": exit_code_num,
    });
    serde_json::to_string(&obj).unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

/// Write an error to stdout (JSON mode) or stderr (human mode).
///
/// `exit_code_num` is the raw numeric exit code (1 or 2).
pub fn emit_error(format: OutputFormat, exit_code_num: u8, message: &str) {
    match format {
        // JSON errors go to stdout so the caller always gets valid JSON on stdout.
        OutputFormat::Json => println!("{}", error_json(exit_code_num, message)),
        OutputFormat::Human => eprintln!("error: {message}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Sample {
        count: u32,
    }

    impl Serialize for Sample {
        fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serde_json::json!({ "count": self.count }).serialize(serializer)
        }
    }

    impl fmt::Display for Sample {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{} things", self.count)
        }
    }

    #[test]
    fn json_render_is_single_line() {
        let rendered = render(OutputFormat::Json, &Sample { count: 42 }).unwrap();
        assert_eq!(rendered, r#"{"count":42}"#);
    }

    #[test]
    fn human_render_uses_display() {
        let rendered = render(OutputFormat::Human, &Sample { count: 3 }).unwrap();
        assert_eq!(rendered, "3 things");
    }

    #[test]
    fn error_json_has_both_fields() {
        let parsed: serde_json::Value = serde_json::from_str(&error_json(2, "boom \"quoted\"")).unwrap();
        assert_eq!(parsed["error"], "boom \"quoted\"");
        assert_eq!(parsed["exit_code"], 2);
    }

    #[test]
    fn output_format_default_is_human() {
        assert_eq!(OutputFormat::default(), OutputFormat::Human);
        assert_eq!(OutputFormat::Json.to_string(), "json");
    }
}
