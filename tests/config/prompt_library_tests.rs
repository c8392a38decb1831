// Prompt library lifecycle against a real directory

use pipai_core::config::{ConfigError, PromptLibrary};
use std::fs;
use tempfile::tempdir;

#[test]
fn created_prompts_are_discovered_by_a_new_library() {
    let dir = tempdir().expect("tempdir");
    let prompts = dir.path().join("prompts");

    let mut library = PromptLibrary::discover(&prompts).expect("discover");
    assert!(library.is_empty());
    library
        .create("summarize", "Summarize input", "Summarize the following in three bullets.")
        .expect("create");

    let reloaded = PromptLibrary::discover(&prompts).expect("rediscover");
    let template = reloaded.get("summarize").expect("summarize prompt");
    assert_eq!(template.summary, "Summarize input");
    assert_eq!(template.prompt, "Summarize the following in three bullets.");
    assert_eq!(template.path, prompts.join("summarize"));
}

#[test]
fn compose_joins_selected_bodies() {
    let dir = tempdir().expect("tempdir");
    let mut library = PromptLibrary::discover(dir.path()).expect("discover");
    library.create("explain", "", "Explain the output.").expect("create explain");
    library.create("terse", "", "Be brief.").expect("create terse");
    library.create("unused", "", "Never selected.").expect("create unused");

    let composed = library.compose(["terse", "explain"]).expect("composed");
    assert_eq!(composed, "Explain the output.\n\nBe brief.");
}

#[test]
fn create_and_delete_report_conflicts() {
    let dir = tempdir().expect("tempdir");
    let mut library = PromptLibrary::discover(dir.path()).expect("discover");

    library.create("review", "", "Review this diff.").expect("create");
    assert!(matches!(
        library.create("review", "", "Again"),
        Err(ConfigError::PromptExists { .. })
    ));

    library.delete("review").expect("delete");
    assert!(!dir.path().join("review").exists());
    assert!(matches!(
        library.delete("review"),
        Err(ConfigError::PromptNotFound { .. })
    ));
}

#[test]
fn hand_written_text_files_are_prompts() {
    let dir = tempdir().expect("tempdir");
    fs::write(dir.path().join("shell"), "Suggest a shell one-liner.\n").expect("write");
    fs::write(dir.path().join("empty"), "\n").expect("write empty");
    fs::create_dir(dir.path().join("nested")).expect("mkdir");

    let library = PromptLibrary::discover(dir.path()).expect("discover");
    let names: Vec<_> = library.names().collect();
    assert_eq!(names, vec!["shell"]);
    assert_eq!(
        library.get("shell").map(|template| template.summary.as_str()),
        Some("Use the pre-defined 'shell' prompt")
    );
}
