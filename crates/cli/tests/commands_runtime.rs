use std::env;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{Mutex, OnceLock};

use pricewise_cli::commands::distribution::MarginTaxOverride;
use pricewise_cli::commands::{config, distribution, final_total, price};
use pricewise_core::config::{
    ConfigOverrides, LoadOptions, DISPLAY_SCALE_ENV, LOG_FORMAT_ENV, LOG_LEVEL_ENV, ROUNDING_ENV,
};
use rust_decimal::Decimal;
use serde_json::Value;
use tempfile::TempDir;

const CONTRACT_QUOTE: &str = r#"{
  "id": "Q-1",
  "contract_type": "contract",
  "distributions": [
    {
      "id": "D-1",
      "rows": [{ "price": "500" }, { "price": "900", "is_selected": false }],
      "buy_price": "300",
      "margin_value": "20"
    },
    {
      "id": "D-2",
      "rows": [{ "price": "1500" }],
      "buy_price": "1200"
    }
  ]
}"#;

const PACK_QUOTE: &str = r#"{
  "id": "P-1",
  "contract_type": "pack",
  "rows": [{ "price": "1000" }],
  "terms": {
    "buy_price": "600",
    "margin_value": "25",
    "predefined_discounts": [{ "kind": "pre_pay", "value": "10" }]
  }
}"#;

#[test]
fn price_returns_contract_summary_with_distributions() {
    with_env(&[], || {
        let (_dir, path) = write_quote(CONTRACT_QUOTE);
        let result = price::run(&defaults(), &path, false);
        assert_eq!(result.exit_code, 0, "expected successful pricing: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "price");
        assert_eq!(payload["status"], "ok");
        assert_eq!(decimal(&payload["data"]["quote"]["total_price"]), Decimal::from(2000));
        assert_eq!(decimal(&payload["data"]["quote"]["final_total_price"]), Decimal::from(2125));
        assert_eq!(decimal(&payload["data"]["quote"]["raw_margin"]), Decimal::from(25));
        assert_eq!(payload["data"]["quote"]["margin_after_pre_pay_discount"], Value::Null);

        let distributions =
            payload["data"]["distributions"].as_array().cloned().unwrap_or_default();
        assert_eq!(distributions.len(), 2);
        assert_eq!(distributions[0]["distribution_id"], "D-1");
        assert_eq!(decimal(&distributions[0]["summary"]["final_total_price"]), Decimal::from(625));
    });
}

#[test]
fn price_rounds_pack_summary_to_display_scale() {
    with_env(&[("PRICEWISE_PRICING_DISPLAY_SCALE", "1")], || {
        let (_dir, path) = write_quote(PACK_QUOTE);
        let result = price::run(&defaults(), &path, false);
        assert_eq!(result.exit_code, 0, "expected successful pricing: {}", result.output);

        let payload = parse_payload(&result.output);
        let quote = &payload["data"]["quote"];
        assert_eq!(decimal(&quote["total_price_after_margin"]), Decimal::new(13333, 1));
        assert_eq!(decimal(&quote["final_total_price"]), Decimal::from(1200));
        assert!(quote["margin_after_pre_pay_discount"].is_string());
        assert_eq!(payload["data"]["distributions"].as_array().map(Vec::len), Some(0));
    });
}

#[test]
fn price_raw_keeps_full_precision() {
    with_env(&[], || {
        let (_dir, path) = write_quote(PACK_QUOTE);
        let result = price::run(&defaults(), &path, true);
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        let after_margin = decimal(&payload["data"]["quote"]["total_price_after_margin"]);
        assert!(after_margin.scale() > 2, "raw output should not be rounded");
    });
}

#[test]
fn price_reports_validation_violations() {
    with_env(&[], || {
        let quote = CONTRACT_QUOTE.replace(
            r#""margin_value": "20""#,
            r#""margin_value": "20", "custom_discount": "150""#,
        );
        let (_dir, path) = write_quote(&quote);
        let result = price::run(&defaults(), &path, false);
        assert_eq!(result.exit_code, 5, "expected validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "validation");
        assert_eq!(payload["data"]["violations"][0]["code"], "discount_out_of_range");
    });
}

#[test]
fn price_reports_duplicate_discount_kind() {
    with_env(&[], || {
        let quote = PACK_QUOTE.replace(
            r#"[{ "kind": "pre_pay", "value": "10" }]"#,
            r#"[{ "kind": "pre_pay", "value": "10" }, { "kind": "pre_pay", "value": "5" }]"#,
        );
        let (_dir, path) = write_quote(&quote);
        let result = price::run(&defaults(), &path, false);
        assert_eq!(result.exit_code, 5, "expected validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "validation");
        assert_eq!(payload["data"]["violations"][0]["code"], "duplicate_discount_kind");
        assert_eq!(payload["data"]["violations"][0]["field"], "predefined_discounts.pre_pay");
    });
}

#[test]
fn price_reports_out_of_range_amounts_as_validation() {
    with_env(&[], || {
        let quote = r#"{
          "id": "P-HUGE",
          "contract_type": "pack",
          "rows": [{ "price": "100000000000000000000" }],
          "terms": { "margin_value": "1000000000000" }
        }"#;
        let (_dir, path) = write_quote(quote);
        let result = price::run(&defaults(), &path, false);
        assert_eq!(result.exit_code, 5, "expected a rejected quote: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "validation");
        assert_eq!(payload["data"], Value::Null);
    });
}

#[test]
fn price_rejects_contract_without_distributions() {
    with_env(&[], || {
        let (_dir, path) = write_quote(r#"{ "id": "Q-2", "contract_type": "contract" }"#);
        let result = price::run(&defaults(), &path, false);
        assert_eq!(result.exit_code, 5);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "calculation");
    });
}

#[test]
fn price_reports_unreadable_and_malformed_input() {
    with_env(&[], || {
        let dir = TempDir::new().expect("temp dir");
        let missing = price::run(&defaults(), &dir.path().join("absent.json"), false);
        assert_eq!(missing.exit_code, 3);
        assert_eq!(parse_payload(&missing.output)["error_class"], "input_read");

        let (_dir, path) = write_quote("{ not json");
        let malformed = price::run(&defaults(), &path, false);
        assert_eq!(malformed.exit_code, 4);
        assert_eq!(parse_payload(&malformed.output)["error_class"], "input_parse");
    });
}

#[test]
fn price_returns_config_failure_for_invalid_scale() {
    with_env(&[("PRICEWISE_PRICING_DISPLAY_SCALE", "12")], || {
        let (_dir, path) = write_quote(CONTRACT_QUOTE);
        let result = price::run(&defaults(), &path, false);
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn display_scale_flag_wins_over_env() {
    with_env(&[("PRICEWISE_PRICING_DISPLAY_SCALE", "1")], || {
        let (_dir, path) = write_quote(PACK_QUOTE);
        let options = LoadOptions {
            overrides: ConfigOverrides { display_scale: Some(3), ..ConfigOverrides::default() },
            ..LoadOptions::default()
        };
        let result = price::run(&options, &path, false);
        assert_eq!(result.exit_code, 0, "expected successful pricing: {}", result.output);

        let payload = parse_payload(&result.output);
        let after_margin = decimal(&payload["data"]["quote"]["total_price_after_margin"]);
        assert_eq!(after_margin, Decimal::new(1_333_333, 3));
    });
}

#[test]
fn missing_config_flag_file_is_a_config_failure() {
    with_env(&[], || {
        let (dir, path) = write_quote(PACK_QUOTE);
        let options = LoadOptions {
            config_path: Some(dir.path().join("absent.toml")),
            require_file: true,
            ..LoadOptions::default()
        };
        let result = price::run(&options, &path, false);
        assert_eq!(result.exit_code, 2);
        assert_eq!(parse_payload(&result.output)["error_class"], "config_validation");
    });
}

#[test]
fn final_total_materializes_distribution_totals() {
    with_env(&[], || {
        let (_dir, path) = write_quote(CONTRACT_QUOTE);
        let result = final_total::run(&defaults(), &path);
        assert_eq!(result.exit_code, 0, "expected successful final total: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "final-total");
        assert_eq!(decimal(&payload["data"]["total_price"]), Decimal::from(2000));
        assert_eq!(decimal(&payload["data"]["final_total_price"]), Decimal::from(2125));
        assert_eq!(payload["data"]["distributions"][1]["id"], "D-2");
        assert_eq!(
            decimal(&payload["data"]["distributions"][1]["final_total_price"]),
            Decimal::from(1500)
        );
    });
}

#[test]
fn distribution_prices_single_distributor_and_what_if() {
    with_env(&[], || {
        let (_dir, path) = write_quote(CONTRACT_QUOTE);

        let stored = distribution::run(&defaults(), &path, "D-1", MarginTaxOverride::default());
        assert_eq!(stored.exit_code, 0, "expected successful pricing: {}", stored.output);
        let payload = parse_payload(&stored.output);
        assert_eq!(decimal(&payload["data"]["total_price"]), Decimal::from(500));
        assert_eq!(decimal(&payload["data"]["final_total_price"]), Decimal::from(625));

        let what_if = distribution::run(
            &defaults(),
            &path,
            "D-1",
            MarginTaxOverride {
                margin_value: Some(Decimal::from(50)),
                tax_value: Some(Decimal::from(5)),
            },
        );
        let payload = parse_payload(&what_if.output);
        assert_eq!(decimal(&payload["data"]["final_total_price"]), Decimal::from(1005));
        assert_eq!(
            decimal(&payload["data"]["final_total_price_excluding_tax"]),
            Decimal::from(1000)
        );
    });
}

#[test]
fn distribution_unknown_identifier_is_not_found() {
    with_env(&[], || {
        let (_dir, path) = write_quote(CONTRACT_QUOTE);
        let result = distribution::run(&defaults(), &path, "D-404", MarginTaxOverride::default());
        assert_eq!(result.exit_code, 6);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "not_found");
    });
}

#[test]
fn config_reports_env_sources() {
    let vars = [("PRICEWISE_LOG_FORMAT", "json"), ("PRICEWISE_PRICING_ROUNDING", "half_even")];
    with_env(&vars, || {
        let output = config::run(&defaults());
        assert!(output.contains("- logging.format = Json (source: env (PRICEWISE_LOG_FORMAT))"));
        assert!(output
            .contains("- pricing.rounding = HalfEven (source: env (PRICEWISE_PRICING_ROUNDING))"));
        assert!(output.contains("- pricing.display_scale = 2 (source: default)"));
    });
}

#[test]
fn config_reports_override_sources() {
    with_env(&[("PRICEWISE_LOG_LEVEL", "warn")], || {
        let options = LoadOptions {
            overrides: ConfigOverrides {
                display_scale: Some(4),
                log_level: Some("debug".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        };
        let output = config::run(&options);
        assert!(
            output.contains("- pricing.display_scale = 4 (source: override (--display-scale))")
        );
        assert!(output.contains("- logging.level = debug (source: override (--log-level))"));
    });
}

fn defaults() -> LoadOptions {
    LoadOptions::default()
}

fn write_quote(contents: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("quote.json");
    fs::write(&path, contents).expect("write quote fixture");
    (dir, path)
}

fn decimal(value: &Value) -> Decimal {
    let raw = value.as_str().expect("decimal values are serialized as strings");
    Decimal::from_str(raw).expect("valid decimal")
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [DISPLAY_SCALE_ENV, ROUNDING_ENV, LOG_LEVEL_ENV, LOG_FORMAT_ENV].concat();

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
