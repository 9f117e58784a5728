use clap::{builder::ValueParser, Arg, Command};

pub const ARG_VERBOSITY: &str = "verbosity";
pub const ARG_LOG_FORMAT: &str = "log-format";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[must_use]
pub fn validator_log_format() -> ValueParser {
    ValueParser::from(|format: &str| -> std::result::Result<LogFormat, String> {
        match format.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err("expected `pretty` or `json`".to_string()),
        }
    })
}

#[must_use]
pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_VERBOSITY)
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("ROLLCALL_LOG_LEVEL")
                .global(true)
                .action(clap::ArgAction::Count)
                .value_parser(validator_log_level()),
        )
        .arg(
            Arg::new(ARG_LOG_FORMAT)
                .long(ARG_LOG_FORMAT)
                .help("Log output: pretty for terminals, json for log collectors")
                .env("ROLLCALL_LOG_FORMAT")
                .default_value("pretty")
                .value_parser(validator_log_format()),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_names_parse() {
        let matches = Command::new("rollcall")
            .arg(Arg::new("level").long("level").value_parser(validator_log_level()))
            .get_matches_from(vec!["rollcall", "--level", "debug"]);
        assert_eq!(matches.get_one::<u8>("level").copied(), Some(3));

        let result = Command::new("rollcall")
            .arg(Arg::new("level").long("level").value_parser(validator_log_level()))
            .try_get_matches_from(vec!["rollcall", "--level", "loud"]);
        assert!(result.is_err());
    }

    #[test]
    fn log_format_defaults_to_pretty() {
        temp_env::with_var_unset("ROLLCALL_LOG_FORMAT", || {
            let matches = with_args(Command::new("rollcall")).get_matches_from(vec!["rollcall"]);
            assert_eq!(
                matches.get_one::<LogFormat>(ARG_LOG_FORMAT).copied(),
                Some(LogFormat::Pretty)
            );
        });
    }

    #[test]
    fn log_format_from_env() {
        temp_env::with_var("ROLLCALL_LOG_FORMAT", Some("JSON"), || {
            let matches = with_args(Command::new("rollcall")).get_matches_from(vec!["rollcall"]);
            assert_eq!(
                matches.get_one::<LogFormat>(ARG_LOG_FORMAT).copied(),
                Some(LogFormat::Json)
            );
        });
    }

    #[test]
    fn repeated_flag_counts() {
        temp_env::with_vars_unset(["ROLLCALL_LOG_LEVEL", "ROLLCALL_LOG_FORMAT"], || {
            let matches =
                with_args(Command::new("rollcall")).get_matches_from(vec!["rollcall", "-vv"]);
            assert_eq!(matches.get_one::<u8>(ARG_VERBOSITY).copied(), Some(2));
        });
    }
}
