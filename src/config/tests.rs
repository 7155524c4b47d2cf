use clap::Parser;
use serial_test::serial;

use super::*;

#[test]
fn defaults_resolve_without_any_source() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.server.listen.to_string(), DEFAULT_LISTEN);
    assert_eq!(settings.logging.level, LevelFilter::INFO);
    assert!(matches!(settings.logging.format, LogFormat::Compact));
    assert_eq!(settings.github.api_base_url, DEFAULT_GITHUB_API_BASE_URL);
    assert_eq!(settings.github.raw_base_url, DEFAULT_GITHUB_RAW_BASE_URL);
    assert!(settings.github.token.is_none());
    assert_eq!(settings.cache.backend, CacheBackend::Redis);
    assert_eq!(settings.cache.ttl, Duration::from_secs(43_200));
    assert_eq!(
        settings.cache.maxmemory_policy.as_deref(),
        Some(DEFAULT_MAXMEMORY_POLICY)
    );
    assert_eq!(
        settings.freshness.request_deadline,
        Duration::from_secs(DEFAULT_REQUEST_DEADLINE_SECS)
    );
    assert!(settings.freshness.coalesce);
    assert!(settings.reaper.enabled);
    assert_eq!(settings.reaper.schedule, DEFAULT_REAPER_SCHEDULE);
    assert_eq!(settings.reaper.scan_batch, DEFAULT_REAPER_SCAN_BATCH);
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.listen = Some("127.0.0.1:4000".to_string());
    raw.logging.level = Some("info".to_string());
    raw.cache.ttl_seconds = Some(60);

    let overrides = ServeOverrides {
        listen: Some("0.0.0.0:4321".to_string()),
        log_level: Some("debug".to_string()),
        cache_ttl_seconds: Some(120),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.listen.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert_eq!(settings.cache.ttl, Duration::from_secs(120));
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    raw.logging.format = Some("compact".to_string());
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn zero_ttl_is_rejected() {
    let mut raw = RawSettings::default();
    raw.cache.ttl_seconds = Some(0);

    let err = Settings::from_raw(raw).expect_err("zero ttl must fail");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "cache.ttl_seconds",
            ..
        }
    ));
}

#[test]
fn zero_scan_batch_is_rejected() {
    let mut raw = RawSettings::default();
    raw.reaper.scan_batch = Some(0);

    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn malformed_schedule_is_rejected() {
    let mut raw = RawSettings::default();
    raw.reaper.schedule = Some("twice a day".to_string());

    let err = Settings::from_raw(raw).expect_err("bad cron must fail");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "reaper.schedule",
            ..
        }
    ));
}

#[test]
fn non_http_base_url_is_rejected() {
    let mut raw = RawSettings::default();
    raw.github.api_base_url = Some("ftp://api.example".to_string());

    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn base_url_trailing_slash_is_trimmed() {
    let mut raw = RawSettings::default();
    raw.github.api_base_url = Some("http://127.0.0.1:9000/".to_string());

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.github.api_base_url, "http://127.0.0.1:9000");
}

#[test]
fn empty_eviction_policy_disables_it() {
    let mut raw = RawSettings::default();
    raw.cache.maxmemory_policy = Some("  ".to_string());

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.cache.maxmemory_policy.is_none());
}

#[test]
fn blank_token_reads_as_absent() {
    let mut raw = RawSettings::default();
    raw.github.token = Some("   ".to_string());

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.github.token.is_none());
}

#[test]
fn unknown_backend_is_rejected() {
    let mut raw = RawSettings::default();
    raw.cache.backend = Some("memcached".to_string());

    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn store_overrides_select_memory_backend() {
    let args = CliArgs::parse_from(["markfresh", "stats", "--cache-backend", "memory"]);
    let mut raw = RawSettings::default();
    raw.apply_command_overrides(args.command.as_ref());

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.cache.backend, CacheBackend::Memory);
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["markfresh"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_render_arguments() {
    let args = CliArgs::parse_from([
        "markfresh",
        "render",
        "--github-token",
        "ghp_example",
        "https://github.com/rust-lang/rust/blob/master/README.md",
    ]);

    match args.command.expect("render command") {
        Command::Render(render) => {
            assert_eq!(render.upstream.github_token.as_deref(), Some("ghp_example"));
            assert_eq!(
                render.url,
                "https://github.com/rust-lang/rust/blob/master/README.md"
            );
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_invalidate_arguments() {
    let args = CliArgs::parse_from([
        "markfresh",
        "invalidate",
        "--redis-url",
        "redis://cache:6379",
        "https://github.com/rust-lang/rust",
    ]);

    match args.command.expect("invalidate command") {
        Command::Invalidate(invalidate) => {
            assert_eq!(
                invalidate.store.redis_url.as_deref(),
                Some("redis://cache:6379")
            );
            assert_eq!(invalidate.key, "https://github.com/rust-lang/rust");
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_serve_overrides() {
    let args = CliArgs::parse_from([
        "markfresh",
        "serve",
        "--listen",
        "0.0.0.0:8080",
        "--coalesce",
        "false",
        "--reaper-enabled",
        "no",
    ]);

    match args.command.expect("serve command") {
        Command::Serve(serve) => {
            assert_eq!(serve.overrides.listen.as_deref(), Some("0.0.0.0:8080"));
            assert_eq!(serve.overrides.coalesce, Some(false));
            assert_eq!(serve.overrides.reaper_enabled, Some(false));
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
#[serial]
fn environment_layer_is_read_with_prefix() {
    // SAFETY: serialised with every other test that touches the environment.
    unsafe {
        std::env::set_var("MARKFRESH__CACHE__TTL_SECONDS", "90");
        std::env::set_var("MARKFRESH__FRESHNESS__COALESCE", "false");
    }

    let args = CliArgs::parse_from(["markfresh", "stats"]);
    let loaded = load(&args);

    unsafe {
        std::env::remove_var("MARKFRESH__CACHE__TTL_SECONDS");
        std::env::remove_var("MARKFRESH__FRESHNESS__COALESCE");
    }

    let settings = loaded.expect("valid settings");
    assert_eq!(settings.cache.ttl, Duration::from_secs(90));
    assert!(!settings.freshness.coalesce);
}

#[test]
#[serial]
fn explicit_config_file_is_layered_under_env() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("markfresh.toml");
    std::fs::write(
        &path,
        "[server]\nlisten = \"127.0.0.1:7000\"\n\n[reaper]\nscan_batch = 25\n",
    )
    .expect("write config");

    let args = CliArgs::parse_from([
        "markfresh",
        "--config-file",
        path.to_str().expect("utf-8 path"),
        "reap",
    ]);
    let settings = load(&args).expect("valid settings");

    assert_eq!(settings.server.listen.port(), 7000);
    assert_eq!(settings.reaper.scan_batch, 25);
}
