use std::collections::HashSet;
use std::fs;
use std::io::Write;
use tempfile::TempDir;

use ragchat_core::config::{Config, IndexSettings, SimilarityMetric};
use ragchat_core::ingest::{ChunkingConfig, DocumentLoader};
use ragchat_core::types::{Metadata, MetadataValue, SizePolicy};

#[test]
fn load_directory_single_small_file() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    let file_path = dir.join("a.txt");
    let mut f = fs::File::create(&file_path).unwrap();
    writeln!(f, "Short text").unwrap();

    let loader = DocumentLoader::default();
    let docs = loader.load_directory(dir).expect("load");

    assert_eq!(docs.len(), 1, "one small paragraph becomes one document");
    assert_eq!(docs[0].id, "a.txt:0");
    assert_eq!(docs[0].text.trim(), "Short text");
    assert_eq!(docs[0].metadata.get("category"), Some(&MetadataValue::String("misc".into())));
    assert_eq!(docs[0].metadata.get("total_chunks"), Some(&MetadataValue::Integer(1)));
}

#[test]
fn load_directory_limited_two_files_limit_one() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::write(dir.join("a.txt"), "alpha bravo").unwrap();
    fs::write(dir.join("b.txt"), "charlie delta").unwrap();

    let loader = DocumentLoader::default();
    let docs = loader.load_directory_limited(dir, 1).expect("load limited");

    let sources: HashSet<String> = docs.iter().filter_map(|d| d.metadata.get("source")).map(ToString::to_string).collect();
    assert_eq!(sources.len(), 1, "limited to one source file");
}

#[test]
fn same_stem_files_keep_distinct_ids() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::write(dir.join("guide.txt"), "plain guide").unwrap();
    fs::write(dir.join("guide.md"), "markdown guide").unwrap();

    let docs = DocumentLoader::default().load_directory(dir).expect("load");
    let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["guide.md:0", "guide.txt:0"]);
}

#[test]
fn numeric_directory_names_can_be_filtered_on() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::create_dir_all(dir.join("2020")).unwrap();
    fs::write(dir.join("2020/notes.txt"), "meeting notes").unwrap();

    let docs = DocumentLoader::default().load_directory(dir).expect("load");
    let mut filters = Metadata::new();
    filters.insert("category".into(), MetadataValue::parse("2020"));
    assert!(docs[0].matches(&filters), "command-line value 2020 matches the stored category");
}

#[test]
fn nested_files_get_category_and_unique_ids() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::create_dir_all(dir.join("recipes")).unwrap();
    fs::write(dir.join("recipes/pie.md"), "Apple pie.\n\nBake it.").unwrap();
    fs::write(dir.join("skip.json"), "{}").unwrap();

    let loader = DocumentLoader::new(ChunkingConfig { chunk_size: 12, chunk_overlap: 2 });
    let docs = loader.load_directory(dir).expect("load");

    assert_eq!(docs.len(), 2, "two paragraphs that do not fit together");
    assert_eq!(docs[0].id, "recipes/pie.md:0");
    assert_eq!(docs[1].id, "recipes/pie.md:1");
    for d in &docs {
        assert_eq!(d.metadata.get("category"), Some(&MetadataValue::String("recipes".into())));
        assert!(d.text.chars().count() <= 12);
    }
}

#[test]
fn settings_defaults_and_env_overrides() {
    figment::Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
            [context]
            budget = 500
            size_policy = "tokens"

            [index]
            similarity_metric = "dot"
            "#,
        )?;
        jail.set_env("APP_GENERATION__GENERATION_TIMEOUT_MS", "1500");

        let config = Config::load_for_env("test").expect("load");
        let settings = config.settings().expect("settings");
        assert_eq!(settings.context.budget, 500);
        assert_eq!(settings.context.size_policy, SizePolicy::Tokens);
        assert_eq!(settings.index.similarity_metric, SimilarityMetric::Dot);
        assert_eq!(settings.generation.generation_timeout_ms, 1500);
        assert_eq!(settings.retrieval.top_k, 4, "untouched sections keep defaults");
        assert_eq!(config.get::<u64>("generation.generation_timeout_ms").expect("key"), 1500);
        assert!(config.get::<u64>("generation.missing").is_err());
        assert!(settings.generation.prompt_template.contains("{context}"));
        Ok(())
    });
}

#[test]
fn index_path_expands_env_vars() {
    figment::Jail::expect_with(|jail| {
        jail.set_env("RAGCHAT_TEST_DATA", "/srv/ragchat");
        let settings = IndexSettings { path: "$RAGCHAT_TEST_DATA/index.json".into(), ..IndexSettings::default() };
        assert_eq!(settings.resolved_path(), std::path::PathBuf::from("/srv/ragchat/index.json"));
        Ok(())
    });
}

#[test]
fn settings_reject_template_without_question() {
    figment::Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
            [generation]
            prompt_template = "Context: {context}"
            "#,
        )?;
        let config = Config::load_for_env("test").expect("load");
        let err = config.settings().expect_err("template must be rejected");
        assert!(err.to_string().contains("{question}"));
        Ok(())
    });
}

#[test]
fn settings_reject_template_without_context() {
    figment::Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
            [generation]
            prompt_template = "Q: {question}"
            "#,
        )?;
        let config = Config::load_for_env("test").expect("load");
        let err = config.settings().expect_err("template must be rejected");
        assert!(err.to_string().contains("{context}"));
        Ok(())
    });
}
