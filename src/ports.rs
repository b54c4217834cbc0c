use serde_json::Value;

/// Parse a comma separated port list such as `"22, 80,443"`.
///
/// Tokens are trimmed; empty tokens and tokens that are not integers are
/// skipped without error. Order and duplicates are preserved.
pub fn parse_port_list(s: &str) -> Vec<i64> {
    s.split(',')
        .map(str::trim)
        .filter(|tok| !tok.is_empty())
        .filter_map(|tok| tok.parse::<i64>().ok())
        .collect()
}

/// Normalize a loosely typed `ports` field into a list of port numbers.
///
/// - string: see [`parse_port_list`]
/// - array: every element goes through [`port_value`], failures are dropped
/// - anything else: empty list
pub fn normalize_ports(raw: &Value) -> Vec<i64> {
    match raw {
        Value::String(s) => parse_port_list(s),
        Value::Array(items) => items.iter().filter_map(port_value).collect(),
        _ => Vec::new(),
    }
}

/// Convert a single JSON value to an integer port number, if it looks like one.
///
/// Accepts integers, finite floats (truncated toward zero), booleans (0/1)
/// and strings holding an integer with optional surrounding whitespace.
pub fn port_value(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.abs() < i64::MAX as f64)
                .map(|f| f.trunc() as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_trims_whitespace() {
        assert_eq!(parse_port_list("22, 80,443"), vec![22, 80, 443]);
        assert_eq!(parse_port_list("  8080  "), vec![8080]);
    }

    #[test]
    fn parse_skips_empty_and_garbage() {
        assert_eq!(parse_port_list("22,,abc,80"), vec![22, 80]);
        assert_eq!(parse_port_list(",, ,"), Vec::<i64>::new());
        assert_eq!(parse_port_list(""), Vec::<i64>::new());
    }

    #[test]
    fn parse_keeps_duplicates_and_out_of_range() {
        assert_eq!(parse_port_list("80,80,70000,-1"), vec![80, 80, 70000, -1]);
    }

    #[test]
    fn normalize_array_mixed() {
        let raw = json!([22, "80", " 443 ", 8080.9, "http", null, {"p": 1}]);
        assert_eq!(normalize_ports(&raw), vec![22, 80, 443, 8080]);
    }

    #[test]
    fn normalize_other_shapes_are_empty() {
        assert!(normalize_ports(&json!([])).is_empty());
        assert!(normalize_ports(&json!(80)).is_empty());
        assert!(normalize_ports(&json!(null)).is_empty());
        assert!(normalize_ports(&json!({"ports": "80"})).is_empty());
    }

    #[test]
    fn port_value_edge_cases() {
        assert_eq!(port_value(&json!(true)), Some(1));
        assert_eq!(port_value(&json!("8.0")), None);
        assert_eq!(port_value(&json!(f64::MAX)), None);
        assert_eq!(port_value(&json!("+22")), Some(22));
    }
}
