use std::path::{Path, PathBuf};
use std::time::Duration;

use archiver_app::cli::{Cli, LogTarget};
use archiver_app::config::{ArchiverConfig, ConfigError};
use clap::Parser;
use pretty_assertions::assert_eq;

const SITES: &str = r#"(
    fetch: (
        request_timeout_secs: Some(30),
    ),
    sites: [
        (
            name: "blog",
            api_url: "https://blog.example.com/wp-json/wp/v2/",
            repository: "/srv/blog-archive",
        ),
        (
            name: "news",
            api_url: "https://news.example.com/wp-json/wp/v2/",
            repository: "/srv/news-archive",
            archive_subdir: Some("archive"),
            commit_message: Some("News snapshot"),
            per_page: Some(50),
            pull: false,
        ),
    ],
)"#;

#[test]
fn site_list_applies_defaults() {
    let config = ArchiverConfig::parse(SITES, Path::new("sites.ron")).unwrap();

    let blog = config.sites[0].to_site_config();
    assert_eq!(blog.archive_root(), PathBuf::from("/srv/blog-archive/blog"));
    assert_eq!(blog.commit_message, "Nightly archive update");
    assert!(blog.publish);
    assert!(blog.pull);
    assert_eq!(blog.per_page, None);

    let news = config.sites[1].to_site_config();
    assert_eq!(news.archive_root(), PathBuf::from("/srv/news-archive/archive"));
    assert_eq!(news.commit_message, "News snapshot");
    assert_eq!(news.per_page, Some(50));
    assert!(!news.pull);

    let settings = config.fetch.settings();
    assert_eq!(settings.request_timeout, Some(Duration::from_secs(30)));
    assert_eq!(settings.connect_timeout, None);
}

#[test]
fn site_selection_by_name() {
    let config = ArchiverConfig::parse(SITES, Path::new("sites.ron")).unwrap();
    assert_eq!(config.select(None).unwrap().len(), 2);
    assert_eq!(config.select(Some("news")).unwrap()[0].name, "news");
    assert!(matches!(
        config.select(Some("missing")),
        Err(ConfigError::Invalid(_))
    ));
}

#[test]
fn missing_repository_is_rejected() {
    let text = r#"(sites: [(name: "blog", api_url: "https://x/wp-json/wp/v2/", repository: "")])"#;
    assert!(matches!(
        ArchiverConfig::parse(text, Path::new("sites.ron")),
        Err(ConfigError::Invalid(_))
    ));
}

#[test]
fn missing_api_url_field_is_a_parse_error() {
    let text = r#"(sites: [(name: "blog", repository: "/srv/x")])"#;
    assert!(matches!(
        ArchiverConfig::parse(text, Path::new("sites.ron")),
        Err(ConfigError::Parse { .. })
    ));
}

#[test]
fn unreadable_config_is_reported() {
    let temp = tempfile::TempDir::new().unwrap();
    let err = ArchiverConfig::load(&temp.path().join("absent.ron")).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}

#[test]
fn cli_flags_parse() {
    let cli = Cli::parse_from([
        "archiver",
        "--config",
        "custom.ron",
        "--site",
        "blog",
        "--no-publish",
        "--log",
        "both",
        "--verbose",
    ]);
    assert_eq!(cli.config, PathBuf::from("custom.ron"));
    assert_eq!(cli.site.as_deref(), Some("blog"));
    assert!(cli.no_publish);
    assert_eq!(cli.log, LogTarget::Both);
    assert_eq!(cli.log_level(), log::LevelFilter::Debug);
}
