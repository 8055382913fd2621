use std::env;

/// Reads a boolean flag from an environment variable. `1`/`true`/`yes`/`on` and
/// `0`/`false`/`no`/`off` are recognised in any case; anything else, including an unset
/// variable, yields `default`.
pub fn env_flag(var: &str, default: bool) -> bool {
    parse_flag(env::var(var).ok(), default)
}

fn parse_flag(value: Option<String>, default: bool) -> bool {
    let value = match value {
        Some(v) => v,
        None => return default,
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

#[cfg(test)]
mod test {
    use super::{env_flag, parse_flag};

    #[test]
    fn parses_common_truthy_and_falsy_values() {
        assert!(parse_flag(Some("1".into()), false));
        assert!(parse_flag(Some("Yes".into()), false));
        assert!(!parse_flag(Some("off".into()), true));
        assert!(parse_flag(None, true));
        assert!(!parse_flag(Some("garbage".into()), false));
    }

    #[test]
    fn env_flag_falls_back_when_the_variable_is_unset() {
        // A name no other test touches, so parallel test runs cannot race on it.
        std::env::remove_var("TPS_COMMON_TEST_UNSET_FLAG");
        assert!(env_flag("TPS_COMMON_TEST_UNSET_FLAG", true));
        std::env::set_var("TPS_COMMON_TEST_SET_FLAG", "on");
        assert!(env_flag("TPS_COMMON_TEST_SET_FLAG", false));
    }
}
