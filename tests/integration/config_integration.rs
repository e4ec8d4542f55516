//! Integration tests for configuration layering

use super::test_utils::with_env;
use minewatch::config::{global_config_path, ConfigLoader, ProviderType, DEFAULT_CONTEXT};
use std::path::PathBuf;
use tempfile::TempDir;

fn write(path: PathBuf, contents: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

#[test]
fn test_defaults_without_any_source() {
    let temp = TempDir::new().unwrap();
    with_env(&temp, &[], || {
        let config = ConfigLoader::load(temp.path()).unwrap();
        assert_eq!(config.provider.provider_type, ProviderType::OpenAI);
        assert_eq!(config.provider.model, "gpt-4o");
        assert_eq!(config.extraction.default_interval, 30);
        assert_eq!(config.analysis.default_context, DEFAULT_CONTEXT);
    });
}

#[test]
fn test_layer_precedence() {
    let temp = TempDir::new().unwrap();
    with_env(
        &temp,
        &[
            ("MINEWATCH_ENV", "field"),
            ("MINEWATCH__PROVIDER__MODEL", "llava:13b"),
        ],
        || {
            let global = global_config_path().unwrap();
            assert!(global.starts_with(temp.path().join("xdg")));
            write(
                global,
                r#"
[provider]
provider_type = "ollama"
model = "llava"

[extraction]
default_interval = 10
jpeg_quality = 70
"#,
            );
            write(
                temp.path().join("config/config.toml"),
                r#"
[extraction]
default_interval = 20
"#,
            );
            write(
                temp.path().join("config/field.toml"),
                r#"
[analysis]
default_context = "Site type: quarry; Mineral: Limestone"
"#,
            );

            let config = ConfigLoader::load(temp.path()).unwrap();
            assert_eq!(config.provider.provider_type, ProviderType::Ollama);
            assert_eq!(config.provider.model, "llava:13b");
            assert_eq!(config.extraction.jpeg_quality, 70);
            assert_eq!(config.extraction.default_interval, 20);
            assert_eq!(
                config.analysis.default_context,
                "Site type: quarry; Mineral: Limestone"
            );
            assert!(config.validate().is_ok());
        },
    );
}

#[test]
fn test_environment_overrides_explicit_file() {
    let temp = TempDir::new().unwrap();
    with_env(
        &temp,
        &[("MINEWATCH__EXTRACTION__DEFAULT_INTERVAL", "7")],
        || {
            let file = temp.path().join("minewatch.toml");
            write(
                file.clone(),
                r#"
[extraction]
default_interval = 15
frames_dir = "scratch"
"#,
            );
            let config = ConfigLoader::load_from_file(&file).unwrap();
            assert_eq!(config.extraction.default_interval, 7);
            assert_eq!(config.extraction.frames_dir, PathBuf::from("scratch"));
        },
    );
}

#[test]
fn test_missing_explicit_file_is_an_error() {
    let temp = TempDir::new().unwrap();
    with_env(&temp, &[], || {
        assert!(ConfigLoader::load_from_file(&temp.path().join("absent.toml")).is_err());
    });
}

#[test]
fn test_invalid_values_are_all_reported() {
    let temp = TempDir::new().unwrap();
    with_env(&temp, &[], || {
        write(
            temp.path().join("config/config.toml"),
            r#"
[provider]
provider_type = "local"
model = "qwen-vl"

[extraction]
jpeg_quality = 0

[analysis.prompts]
summary_user = "Summarize."
"#,
        );
        let config = ConfigLoader::load(temp.path()).unwrap();
        let issues = config.validate().unwrap_err();
        let rendered: Vec<String> = issues.iter().map(|i| i.to_string()).collect();
        assert!(rendered.iter().any(|i| i.starts_with("Provider:")), "{:?}", rendered);
        assert!(rendered.iter().any(|i| i.contains("jpeg_quality")), "{:?}", rendered);
        assert!(
            rendered.iter().any(|i| i.contains("{combined_analyses}")),
            "{:?}",
            rendered
        );
    });
}

#[test]
fn test_api_key_falls_back_to_openai_env() {
    let temp = TempDir::new().unwrap();
    with_env(&temp, &[("OPENAI_API_KEY", "sk-from-env")], || {
        let config = ConfigLoader::load(temp.path()).unwrap();
        assert_eq!(config.provider.resolve_api_key().as_deref(), Some("sk-from-env"));
        assert!(config.provider.to_model_provider().is_ok());
    });
}

#[test]
fn test_openai_without_key_is_not_configured() {
    let temp = TempDir::new().unwrap();
    with_env(&temp, &[], || {
        let config = ConfigLoader::load(temp.path()).unwrap();
        assert!(config.provider.to_model_provider().is_err());
    });
}
