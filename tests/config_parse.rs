use remote_run::config::{CollisionPolicy, Config};

#[test]
fn parse_example_config() {
    let raw = include_str!("../remote-run.example.toml");
    let cfg: Config = toml::from_str(raw).expect("parse TOML");
    cfg.validate().expect("example config is valid");
    assert_eq!(cfg.transfer.backend, "http");
    assert_eq!(cfg.transfer.upload_field, "file");
    assert_eq!(cfg.retrieval.collision_policy(), CollisionPolicy::Fail);
    assert!(!cfg.paths.work_dir.is_empty());
}

#[test]
fn missing_sections_fall_back_to_defaults() {
    let cfg: Config = toml::from_str("[service]\nbase_url = \"http://h:1\"\nrequest_timeout_seconds = 5\n")
        .expect("parse TOML");
    assert_eq!(cfg.service.base_url, "http://h:1");
    assert_eq!(cfg.service.request_timeout().map(|d| d.as_secs()), Some(5));
    assert_eq!(cfg.retrieval.max_parallel, 0);
    assert!(cfg.transfer.timeout().is_none());
    assert!(!cfg.logging.write_to_file);
}

#[test]
fn unknown_backend_and_policy_are_rejected() {
    let mut cfg = Config::default();
    cfg.transfer.backend = "ftp".into();
    assert!(cfg.validate().is_err());

    let mut cfg = Config::default();
    cfg.retrieval.on_collision = "merge".into();
    assert!(cfg.validate().is_err());
}
