//! End-to-end behaviour of stacked, projected and validated configs.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use serde_json::{Map, Value, json};
use stratum_config::{
    BasicProjection, CachingConfig, CompositeConfig, ConfigError, ConfigProjection, ConfigSchema,
    ConfigSpec, DictConfig, MissingAction, ProjectedConfig, ProxyConfig, Readable, Reloadable,
    Setting, Slot, Writable, config_schema, layers, shared,
};

fn dict(value: Value) -> DictConfig {
    DictConfig::from_value(value).unwrap()
}

config_schema! {
    /// The demo tool's settings.
    struct ExampleToolConfig {
        message: String = Setting::string().with_default("Hello!"),
        config_file: Option<String> = Setting::string().with_null_default(),
    }
}

#[test]
fn later_layers_override_earlier_ones() {
    let sources = [
        json!({"k": 0, "only0": true}),
        json!({"k": 1}),
        json!({"k": 2, "only2": true}),
    ];
    let composite = CompositeConfig::new(
        sources
            .iter()
            .cloned()
            .map(|v| stratum_config::IntoLayer::into_layer(dict(v)))
            .collect(),
    );
    assert_eq!(composite.get("k").unwrap(), json!(2));
    assert_eq!(composite.get("only0").unwrap(), json!(true));
    assert_eq!(composite.keys(), vec!["k", "only0", "only2"]);
}

#[test]
fn caching_reflects_source_only_after_reload() {
    let source = shared(dict(json!({"a": 1})));
    let mut cached = CachingConfig::new(Rc::clone(&source)).unwrap();

    source.borrow_mut().set("a", json!(2)).unwrap();
    assert_eq!(cached.get("a").unwrap(), json!(1));

    cached.reload().unwrap();
    assert_eq!(cached.get("a").unwrap(), json!(2));
}

#[test]
fn projection_keys_match_relevant_sourcekeys() {
    let projection = BasicProjection::lowercase().with_sourcekey_filter(|sk| sk.starts_with("APP_"));
    let source = dict(json!({"APP_HOST": "h", "APP_PORT": 1, "app_lower": 2, "OTHER": 3}));
    let expected: BTreeSet<String> = source
        .keys()
        .into_iter()
        .filter(|sk| projection.is_relevant_sourcekey(sk))
        .map(|sk| projection.sourcekey_to_key(&sk))
        .collect();

    let projected = ProjectedConfig::new(source, projection);
    let actual: BTreeSet<String> = projected.keys().into_iter().collect();
    assert_eq!(actual, expected);
    let names: Vec<&str> = actual.iter().map(String::as_str).collect();
    assert_eq!(names, vec!["app_host", "app_port"]);
}

#[test]
fn reloading_twice_is_idempotent() {
    let mut composite = CompositeConfig::new(layers![
        CachingConfig::new(dict(json!({"a": 1}))).unwrap(),
        dict(json!({"b": [1, 2]})),
    ]);
    composite.reload().unwrap();
    let first = composite.snapshot().unwrap();
    composite.reload().unwrap();
    assert_eq!(composite.snapshot().unwrap(), first);
}

#[test]
fn snapshot_is_independent_of_source() {
    let mut source = dict(json!({"a": {"nested": 1}}));
    let snapshot = source.snapshot().unwrap();
    assert_eq!(snapshot, source);
    source.set("a", json!(2)).unwrap();
    assert_eq!(snapshot.get("a").unwrap(), json!({"nested": 1}));
}

#[test]
fn missing_key_uses_default_or_fails() {
    let defaulted = Setting::int().named("n").with_default(5);
    assert_eq!(
        defaulted.validate_value(Slot::Missing).unwrap(),
        Slot::Present(json!(5))
    );
    let strict = defaulted.on_missing(MissingAction::Error);
    assert!(strict.validate_value(Slot::Missing).unwrap_err().is_validation());
}

#[test]
fn extra_fields_are_named_unless_allowed() {
    let spec = ConfigSpec::new([Setting::int().named("x")]).unwrap();
    let config = dict(json!({"x": 1, "y": 2}));
    let err = spec.validate_config(&config).unwrap_err();
    assert!(err.to_string().contains('y'));
    assert!(
        spec.with_allow_extra(true)
            .validate_config(&config)
            .is_ok()
    );
}

#[test]
fn example_tool_layers_resolve_in_order() {
    let env = DictConfig::new();
    let cli = shared(DictConfig::new());
    let mut config = ExampleToolConfig::load(layers![env, Rc::clone(&cli)]).unwrap();
    assert_eq!(config.message().unwrap(), "Hello!");
    assert_eq!(config.config_file().unwrap(), None);

    config
        .insert_layer(1, dict(json!({"message": "Hi"})))
        .unwrap();
    assert_eq!(config.message().unwrap(), "Hi");

    cli.borrow_mut().set("message", json!("Bye")).unwrap();
    assert_eq!(config.message().unwrap(), "Bye");
    assert_eq!(config.layers().len(), 3);
}

#[test]
fn proxy_over_external_map_tracks_updates() {
    let map = Rc::new(RefCell::new(Map::new()));
    let schema = ConfigSchema::builder("Proxied")
        .setting("level", Setting::string().with_default("info"))
        .build()
        .unwrap();
    let config = schema
        .load(layers![ProxyConfig::new(Rc::clone(&map))])
        .unwrap();
    assert_eq!(config.get_str("level").unwrap(), "info");

    map.borrow_mut().insert("level".to_owned(), json!("debug"));
    assert_eq!(config.get_str("level").unwrap(), "debug");

    map.borrow_mut().insert("unknown".to_owned(), json!(1));
    assert!(matches!(
        config.validate(),
        Err(ConfigError::UnexpectedFields { .. })
    ));
}

#[test]
fn projected_layer_feeds_schema() {
    let env = dict(json!({"EXAMPLE_MESSAGE": "from env", "PATH": "/bin"}));
    let projection = BasicProjection::new()
        .with_key_to_sourcekey(|k| format!("EXAMPLE_{}", k.to_uppercase()))
        .with_sourcekey_to_key(|sk| sk.strip_prefix("EXAMPLE_").unwrap_or(sk).to_lowercase())
        .with_sourcekey_filter(|sk| sk.starts_with("EXAMPLE_"));

    let config = ExampleToolConfig::load(layers![ProjectedConfig::new(env, projection)]).unwrap();
    assert_eq!(config.message().unwrap(), "from env");
    assert_eq!(config.snapshot().unwrap().len(), 2);
}
