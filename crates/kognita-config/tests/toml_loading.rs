//! Integration tests for TOML configuration loading.
//!
//! Uses figment::Jail for safe, sandboxed env var manipulation.

use figment::{
    Figment, Jail,
    providers::{Format, Serialized, Toml},
};
use kognita_config::KognitaConfig;

#[test]
fn loads_database_config_from_toml() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
[database]
path = "/var/lib/kognita/state.db"
"#,
        )?;

        let config: KognitaConfig = Figment::from(Serialized::defaults(KognitaConfig::default()))
            .merge(Toml::file("config.toml"))
            .extract()?;

        assert_eq!(config.database.path, "/var/lib/kognita/state.db");
        Ok(())
    });
}

#[test]
fn loads_session_config_from_toml() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
[session]
spaced_repetition_bias = 0.5
extend_step = 10
exam_goal_cap = 8
recap_initial_assignments = 3
"#,
        )?;

        let config: KognitaConfig = Figment::from(Serialized::defaults(KognitaConfig::default()))
            .merge(Toml::file("config.toml"))
            .extract()?;

        assert!((config.session.spaced_repetition_bias - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.session.extend_step, 10);
        assert_eq!(config.session.exam_goal_cap, 8);
        assert_eq!(config.session.recap_initial_assignments, 3);
        Ok(())
    });
}

#[test]
fn partial_toml_keeps_defaults_for_missing_fields() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
[session]
extend_step = 7
"#,
        )?;

        let config: KognitaConfig = Figment::from(Serialized::defaults(KognitaConfig::default()))
            .merge(Toml::file("config.toml"))
            .extract()?;

        assert_eq!(config.session.extend_step, 7);
        assert_eq!(config.session.exam_goal_cap, 5);
        assert_eq!(config.database.path, "kognita.db");
        Ok(())
    });
}
