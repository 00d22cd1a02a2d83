//! Integration tests for embedded-reference resolution.

use note2tex::embed::{extract_section, EmbedResolver, ResolveReport};
use note2tex::store::MemoryStore;
use note2tex::Settings;

fn equation_store() -> MemoryStore {
    MemoryStore::new().with_document(
        "✍Writing/equation blocks/eq__block_einstein.md",
        "#expr\nE=mc^{2}\n#derivation\nlong text",
    )
}

#[test]
fn test_resolve_equation_section() {
    let store = equation_store();
    let settings = Settings::default();
    let resolver = EmbedResolver::new(&store, &settings).with_host("Papers/Draft.md");

    let (out, report) = resolver.resolve("before\n![[eq__block_einstein#expr]]\nafter");

    assert_eq!(
        out,
        "before\n\n% Start embedded reference:\n% eq__block_einstein#expr\nE=mc^{2}\n% End embedded reference\n\nafter"
    );
    assert_eq!(report, ResolveReport { resolved: 1, unresolved: 0 });
}

#[test]
fn test_resolve_command_style_section() {
    let store = MemoryStore::new().with_document(
        "Papers/Shared.md",
        "\\texttt{abstract}\nWe study things.\n\\texttt{body}\nMore.",
    );
    let settings = Settings::default();
    let resolver = EmbedResolver::new(&store, &settings).with_host("Papers/Draft.md");

    let (out, _) = resolver.resolve("![[Shared\\texttt{abstract}]]");
    assert!(out.contains("\nWe study things.\n"));
    assert!(!out.contains("More."));
}

#[test]
fn test_resolve_whole_document_without_section() {
    let store = MemoryStore::new().with_document("Intro.md", "Line one\nLine two");
    let settings = Settings::default();
    let (out, _) = EmbedResolver::new(&store, &settings).resolve("![[Intro]]");
    assert!(out.contains("% Intro\nLine one\nLine two\n% End embedded reference"));
}

#[test]
fn test_unknown_section_falls_back_to_whole_content() {
    let store = equation_store();
    let settings = Settings::default();
    let (out, report) =
        EmbedResolver::new(&store, &settings).resolve("![[eq__block_einstein#missing]]");
    assert!(out.contains("#derivation\nlong text"));
    assert_eq!(report.resolved, 1);
}

#[test]
fn test_mixed_resolved_and_unresolved() {
    let store = equation_store();
    let settings = Settings::default();
    let (out, report) = EmbedResolver::new(&store, &settings)
        .resolve("![[eq__block_einstein#expr]] ![[eq__block_missing]]");

    assert!(out.contains("E=mc^{2}"));
    assert!(out.contains("![[eq__block_missing]]"));
    assert_eq!(report, ResolveReport { resolved: 1, unresolved: 1 });
}

#[test]
fn test_custom_block_directories() {
    let mut settings = Settings::default();
    settings.equation_blocks_path = "blocks/eq".into();
    let store = MemoryStore::new().with_document("blocks/eq/eq__block_a.md", "a = 1");

    let (out, _) = EmbedResolver::new(&store, &settings).resolve("![[eq__block_a]]");
    assert!(out.contains("\na = 1\n"));
}

#[test]
fn test_extract_section_is_case_insensitive() {
    assert_eq!(extract_section("# Results \nok\n# Next", "results"), "ok");
}
