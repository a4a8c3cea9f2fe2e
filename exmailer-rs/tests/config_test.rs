//! Integration tests for settings resolution

use exmailer::config::{AuthType, ConfigResolver, Settings};
use exmailer::{ErrorKind, ExMailerError};
use std::path::PathBuf;
use tempfile::TempDir;

const COMPLETE_ENV: [(&str, &str); 5] = [
    ("EXCHANGE_DOMAIN", "corp"),
    ("EXCHANGE_USER", "john"),
    ("EXCHANGE_PASS", "secret"),
    ("EXCHANGE_SERVER", "mail.corp.com"),
    ("EXCHANGE_EMAIL_DOMAIN", "corp.com"),
];

const COMPLETE_JSON: &str = r#"{
    "domain": "corp",
    "username": "john",
    "password": "secret",
    "server": "mail.corp.com",
    "email_domain": "corp.com"
}"#;

const COMPLETE_YAML: &str = "domain: corp
username: john
password: secret
server: mail.corp.com
email_domain: corp.com
";

fn assert_expected(settings: &Settings) {
    assert_eq!(settings.domain(), "corp");
    assert_eq!(settings.username(), "john");
    assert_eq!(settings.password(), "secret");
    assert_eq!(settings.server(), "mail.corp.com");
    assert_eq!(settings.email_domain(), "corp.com");
    assert_eq!(settings.auth_type(), AuthType::Ntlm);
    assert!(!settings.save_copy());
}

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_every_source_yields_same_settings() {
    let dir = TempDir::new().unwrap();
    let json = write(&dir, "explicit.json", COMPLETE_JSON);
    let yaml = write(&dir, "discovered.yaml", COMPLETE_YAML);

    let explicit = ConfigResolver::empty()
        .with_settings([
            ("domain", "corp"),
            ("username", "john"),
            ("password", "secret"),
            ("server", "mail.corp.com"),
            ("email_domain", "corp.com"),
        ])
        .resolve()
        .unwrap();
    let file = ConfigResolver::empty()
        .with_config_path(&json)
        .resolve()
        .unwrap();
    let discovered = ConfigResolver::empty()
        .with_search_paths(vec![yaml])
        .resolve()
        .unwrap();
    let env = ConfigResolver::empty()
        .with_env(COMPLETE_ENV)
        .resolve()
        .unwrap();

    for settings in [&explicit, &file, &discovered, &env] {
        assert_expected(settings);
    }
}

#[test]
fn test_sources_are_not_merged() {
    let resolver = ConfigResolver::empty()
        .with_settings([
            ("domain", "corp"),
            ("username", "alice"),
            ("password", "pw"),
            ("server", "a.corp.com"),
            ("email_domain", "corp.com"),
        ])
        .with_env([
            ("EXCHANGE_SERVER", "b.corp.com"),
            ("EXCHANGE_AUTH_TYPE", "BASIC"),
            ("EXCHANGE_SAVE_COPY", "yes"),
        ]);

    let settings = resolver.resolve().unwrap();
    assert_eq!(settings.server(), "a.corp.com");
    assert_eq!(settings.auth_type(), AuthType::Ntlm);
    assert!(!settings.save_copy());
}

#[test]
fn test_incomplete_top_source_does_not_fall_through() {
    let resolver = ConfigResolver::empty()
        .with_settings([("server", "a.corp.com")])
        .with_env(COMPLETE_ENV);

    let err = resolver.resolve().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    match err {
        ExMailerError::MissingFields { fields, .. } => {
            assert_eq!(fields, vec!["domain", "username", "password", "email_domain"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_explicit_file_beats_discovered_and_env() {
    let dir = TempDir::new().unwrap();
    let chosen = write(
        &dir,
        "chosen.yaml",
        "domain: corp\nusername: file-user\npassword: pw\nserver: file.corp.com\nemail_domain: corp.com\n",
    );
    let discovered = write(&dir, "exmailer.json", COMPLETE_JSON);

    let settings = ConfigResolver::empty()
        .with_config_path(&chosen)
        .with_search_paths(vec![discovered])
        .with_env(COMPLETE_ENV)
        .resolve()
        .unwrap();

    assert_eq!(settings.username(), "file-user");
    assert_eq!(settings.server(), "file.corp.com");
}

#[test]
fn test_missing_explicit_file_is_an_error() {
    let dir = TempDir::new().unwrap();

    let err = ConfigResolver::empty()
        .with_config_path(dir.path().join("absent.json"))
        .with_env(COMPLETE_ENV)
        .resolve()
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(err.to_string().contains("absent.json"));
}

#[test]
fn test_first_existing_search_path_wins() {
    let dir = TempDir::new().unwrap();
    let home = TempDir::new().unwrap();

    let candidates = ConfigResolver::default_search_paths(dir.path(), Some(home.path()));
    std::fs::create_dir_all(home.path().join(".config").join("exmailer")).unwrap();
    std::fs::write(
        home.path().join(".config").join("exmailer").join("config.yaml"),
        "domain: corp\nusername: home-user\npassword: pw\nserver: home.corp.com\nemail_domain: corp.com\n",
    )
    .unwrap();
    std::fs::write(home.path().join(".exmailer.json"), COMPLETE_JSON).unwrap();

    let settings = ConfigResolver::empty()
        .with_search_paths(candidates.clone())
        .resolve()
        .unwrap();
    assert_eq!(settings.username(), "home-user");

    write(&dir, "exmailer.json", COMPLETE_JSON);
    let settings = ConfigResolver::empty()
        .with_search_paths(candidates)
        .resolve()
        .unwrap();
    assert_eq!(settings.username(), "john");
}

#[test]
fn test_env_flags_and_auth_type() {
    let mut env: Vec<(&str, &str)> = COMPLETE_ENV.to_vec();
    env.push(("EXCHANGE_AUTH_TYPE", "basic"));
    env.push(("EXCHANGE_SAVE_COPY", "1"));

    let settings = ConfigResolver::empty().with_env(env).resolve().unwrap();
    assert_eq!(settings.auth_type(), AuthType::Basic);
    assert!(settings.save_copy());
    assert_eq!(settings.login_name(), "corp\\john");
    assert_eq!(settings.primary_address(), "john@corp.com");
}

#[test]
fn test_invalid_save_copy_rejected() {
    let mut env: Vec<(&str, &str)> = COMPLETE_ENV.to_vec();
    env.push(("EXCHANGE_SAVE_COPY", "maybe"));

    let err = ConfigResolver::empty().with_env(env).resolve().unwrap_err();
    assert!(matches!(err, ExMailerError::InvalidBoolean { ref value, .. } if value == "maybe"));
}

#[test]
fn test_no_source_at_all() {
    let err = ConfigResolver::empty().resolve().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn test_debug_never_shows_password() {
    let settings = ConfigResolver::empty()
        .with_env(COMPLETE_ENV)
        .resolve()
        .unwrap();

    assert!(!format!("{:?}", settings).contains("secret"));
}

#[cfg(unix)]
#[test]
fn test_process_env_with_non_utf8_variable() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    // Only this test touches the process environment
    std::env::set_var("EXMAILER_TEST_BINARY_JUNK", OsStr::from_bytes(b"\xff\xfe"));
    for (key, value) in COMPLETE_ENV {
        std::env::set_var(key, value);
    }
    std::env::remove_var("EXCHANGE_AUTH_TYPE");
    std::env::remove_var("EXCHANGE_SAVE_COPY");

    let settings = ConfigResolver::new()
        .with_search_paths(Vec::new())
        .resolve()
        .unwrap();

    assert_expected(&settings);
}
