//! Reachability-driven loading across modules and deserialization strategies.

use sigil_conformance::{
    archive, callees, codes, dump, has_body, is_bound, referenced, supplying_module, symbol, FileFixture,
};
use sigil_ir::{Signature, SymbolKind};
use sigil_link::strategy::uniform;
use sigil_link::{DeserializationStrategy, LinkError, LinkOptions, Linker};

fn sig(package: &str, name: &str) -> Signature {
    Signature::public(package, name)
}

// ---------------------------------------------------------------------------
// Only referenced top levels load
// ---------------------------------------------------------------------------

#[test]
fn entry_pulls_in_transitive_callees_only() {
    let file = FileFixture::new("lib.kt", "pkg")
        .function("f", &[sig("pkg", "g")])
        .function("g", &[])
        .function("h", &[]);
    let mut linker = Linker::new(LinkOptions::default());
    linker
        .add_archive(archive("m0", vec![file]), &[], &referenced(), false)
        .unwrap();
    linker
        .resolve_by_signature(&sig("pkg", "f"), SymbolKind::Function, "m0")
        .unwrap();
    let report = linker.finish().unwrap();

    assert!(is_bound(&linker, &sig("pkg", "f")));
    assert!(is_bound(&linker, &sig("pkg", "g")));
    assert!(symbol(&linker, &sig("pkg", "h")).is_none());
    assert_eq!(report.top_levels, 2);
    assert_eq!(report.stubs, 0);

    let called = callees(&linker, &sig("pkg", "f"));
    assert_eq!(called, vec![symbol(&linker, &sig("pkg", "g")).unwrap()]);
}

#[test]
fn calls_cross_into_dependencies() {
    let core = FileFixture::new("core.kt", "core")
        .function("log", &[])
        .function("unused", &[]);
    let util = FileFixture::new("util.kt", "util").function("fmt", &[sig("core", "log")]);
    let app = FileFixture::new("main.kt", "app").function("main", &[sig("util", "fmt")]);

    let mut linker = Linker::new(LinkOptions::default());
    linker.add_archive(archive("core", vec![core]), &[], &referenced(), false).unwrap();
    linker.add_archive(archive("util", vec![util]), &["core"], &referenced(), false).unwrap();
    linker.add_archive(archive("app", vec![app]), &["util"], &referenced(), false).unwrap();
    linker.resolve_entry(&sig("app", "main")).unwrap();
    linker.finish().unwrap();

    // `app` reaches `core` through the transitive closure of `util`.
    assert!(is_bound(&linker, &sig("core", "log")));
    assert!(!is_bound(&linker, &sig("core", "unused")));
    let text = dump(&linker);
    assert!(text.contains("module core\n"));
    assert!(text.contains("file main.kt (package app)"));
}

#[test]
fn class_member_call_loads_whole_class() {
    let shapes = FileFixture::new("shapes.kt", "geo")
        .class("Circle", &[("area", &[]), ("scale", &[sig("geo", "helper")])])
        .function("helper", &[]);
    let app = FileFixture::new("main.kt", "app").function("main", &[sig("geo", "Circle.area")]);

    let mut linker = Linker::new(LinkOptions::default());
    linker.add_archive(archive("geo", vec![shapes]), &[], &referenced(), false).unwrap();
    linker.add_archive(archive("app", vec![app]), &["geo"], &referenced(), false).unwrap();
    linker.resolve_entry(&sig("app", "main")).unwrap();
    linker.finish().unwrap();

    assert!(is_bound(&linker, &sig("geo", "Circle")));
    assert!(is_bound(&linker, &sig("geo", "Circle.area")));
    assert!(is_bound(&linker, &sig("geo", "Circle.scale")));
    // `scale` has a body under the referenced strategy, so its callee loads too.
    assert!(is_bound(&linker, &sig("geo", "helper")));
}

// ---------------------------------------------------------------------------
// `contains` and missing signatures
// ---------------------------------------------------------------------------

#[test]
fn resolving_absent_signature_reports_loaded_modules() {
    let file = FileFixture::new("lib.kt", "pkg").function("f", &[]);
    let mut linker = Linker::new(LinkOptions::default());
    linker.add_archive(archive("lib", vec![file]), &[], &referenced(), false).unwrap();
    let err = linker
        .resolve_by_signature(&sig("pkg", "absent"), SymbolKind::Function, "lib")
        .unwrap_err();
    match err {
        LinkError::SignatureNotFound { signature, loaded, .. } => {
            assert_eq!(signature, "pkg/absent");
            assert_eq!(loaded, ["lib"]);
        }
        other => panic!("expected SignatureNotFound, got {other}"),
    }
}

#[test]
fn unknown_module_has_no_deserializer() {
    let mut linker = Linker::new(LinkOptions::default());
    let err = linker
        .resolve_by_signature(&sig("pkg", "f"), SymbolKind::Function, "nowhere")
        .unwrap_err();
    assert!(matches!(err, LinkError::NoDeserializerForModule { .. }));
}

#[test]
fn same_signature_twice_binds_once() {
    let a = FileFixture::new("a.kt", "pkg").function("f", &[]);
    let b = FileFixture::new("b.kt", "pkg").function("f", &[]);
    let mut linker = Linker::new(LinkOptions::default());
    linker.add_archive(archive("first", vec![a]), &[], &uniform(DeserializationStrategy::All), false).unwrap();
    linker.add_archive(archive("second", vec![b]), &[], &uniform(DeserializationStrategy::All), false).unwrap();
    let report = linker.finish().unwrap();
    assert_eq!(report.top_levels, 1);
    assert_eq!(supplying_module(&linker, &sig("pkg", "f")).as_deref(), Some("first"));
    assert_eq!(codes(&linker), ["W303"]);
}

#[test]
fn dependent_module_redeclaring_signature_links_dependency_copy() {
    let m1 = FileFixture::new("base.kt", "pkg")
        .function("f", &[sig("pkg", "base_only")])
        .function("base_only", &[]);
    let m2 = FileFixture::new("app.kt", "pkg")
        .function("main", &[sig("pkg", "f"), sig("pkg", "shared_helper")])
        .function("f", &[sig("pkg", "app_only")])
        .function("app_only", &[]);
    let m1_helpers = FileFixture::new("helpers.kt", "pkg").function("shared_helper", &[]);
    let m3 = FileFixture::new("other.kt", "other").function("unrelated", &[]);
    let mut linker = Linker::new(LinkOptions::default());
    linker.add_archive(archive("m1", vec![m1, m1_helpers]), &[], &referenced(), false).unwrap();
    linker.add_archive(archive("m2", vec![m2]), &["m1"], &referenced(), false).unwrap();
    linker.add_archive(archive("m3", vec![m3]), &[], &referenced(), false).unwrap();

    let err = linker
        .resolve_by_signature(&sig("pkg", "f"), SymbolKind::Function, "m3")
        .unwrap_err();
    assert!(matches!(err, LinkError::SignatureNotFound { ref module, .. } if module == "m3"));

    linker
        .resolve_by_signature(&sig("pkg", "main"), SymbolKind::Function, "m2")
        .unwrap();
    linker.finish().unwrap();

    assert_eq!(supplying_module(&linker, &sig("pkg", "f")).as_deref(), Some("m1"));
    assert_eq!(supplying_module(&linker, &sig("pkg", "shared_helper")).as_deref(), Some("m1"));
    assert!(is_bound(&linker, &sig("pkg", "base_only")));
    assert!(!is_bound(&linker, &sig("pkg", "app_only")));
    assert_eq!(codes(&linker), ["W303"]);
}

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

fn strategy_library() -> FileFixture {
    FileFixture::new("lib.kt", "pkg")
        .function("plain", &[sig("pkg", "leaf")])
        .inline_function("fast", &[sig("pkg", "leaf")])
        .function("leaf", &[])
        .function("exported", &[])
        .export("exported")
}

fn link_with(strategy: DeserializationStrategy, entries: &[&str]) -> Linker {
    let mut linker = Linker::new(LinkOptions::default());
    linker
        .add_archive(archive("lib", vec![strategy_library()]), &[], &uniform(strategy), false)
        .unwrap();
    for entry in entries {
        linker
            .resolve_by_signature(&sig("pkg", entry), SymbolKind::Function, "lib")
            .unwrap();
    }
    linker.finish().unwrap();
    linker
}

#[test]
fn all_strategy_loads_every_top_level() {
    let linker = link_with(DeserializationStrategy::All, &[]);
    for name in ["plain", "fast", "leaf", "exported"] {
        assert!(is_bound(&linker, &sig("pkg", name)), "{name} should be bound");
    }
}

#[test]
fn exported_strategy_seeds_exports_only() {
    let linker = link_with(DeserializationStrategy::ExplicitlyExported, &[]);
    assert!(is_bound(&linker, &sig("pkg", "exported")));
    assert!(symbol(&linker, &sig("pkg", "plain")).is_none());
}

#[test]
fn headers_strategy_drops_bodies() {
    let linker = link_with(DeserializationStrategy::OnlyDeclarationHeaders, &["plain", "fast"]);
    assert!(!has_body(&linker, &sig("pkg", "plain")));
    assert!(!has_body(&linker, &sig("pkg", "fast")));
    // Without bodies nothing references `leaf`.
    assert!(symbol(&linker, &sig("pkg", "leaf")).is_none());
}

#[test]
fn inline_bodies_strategy_keeps_inline_bodies() {
    let linker = link_with(DeserializationStrategy::WithInlineBodies, &["plain", "fast"]);
    assert!(!has_body(&linker, &sig("pkg", "plain")));
    assert!(has_body(&linker, &sig("pkg", "fast")));
    assert!(is_bound(&linker, &sig("pkg", "leaf")));
}

#[test]
fn on_demand_file_is_found_when_asked() {
    let eager = FileFixture::new("a.kt", "pkg").function("main", &[sig("pkg", "lazy")]);
    let lazy = FileFixture::new("b.kt", "pkg").function("lazy", &[]);
    let resolver: sigil_link::StrategyResolver = Box::new(|name: &str| {
        if name == "b.kt" {
            DeserializationStrategy::OnDemand
        } else {
            DeserializationStrategy::OnlyReferenced
        }
    });
    let mut linker = Linker::new(LinkOptions::default());
    linker.add_archive(archive("lib", vec![eager, lazy]), &[], &resolver, false).unwrap();
    linker.resolve_entry(&sig("pkg", "main")).unwrap();
    linker.finish().unwrap();
    assert!(is_bound(&linker, &sig("pkg", "lazy")));
}

// ---------------------------------------------------------------------------
// Demand-driven lookups and local references
// ---------------------------------------------------------------------------

#[test]
fn get_declaration_loads_single_top_level() {
    let file = FileFixture::new("lib.kt", "pkg")
        .function("f", &[])
        .function("g", &[]);
    let mut linker = Linker::new(LinkOptions::default());
    linker.add_archive(archive("lib", vec![file]), &[], &referenced(), false).unwrap();
    let g = linker
        .program_mut()
        .symbols
        .reference(&sig("pkg", "g"), SymbolKind::Function);
    assert!(linker.get_declaration(g).unwrap().is_some());
    assert!(symbol(&linker, &sig("pkg", "f")).is_none());
}

#[test]
fn local_reference_goes_through_owning_file() {
    let helpers = sig("pkg", "Helpers");
    let local = Signature::FileLocal {
        container: Box::new(helpers.clone()),
        id: 7,
    };
    let a = FileFixture::new("a.kt", "pkg").class("Helpers", &[]);
    let b = FileFixture::new("b.kt", "pkg").function("other", &[]);
    let mut linker = Linker::new(LinkOptions::default());
    linker.add_archive(archive("lib", vec![a, b]), &[], &referenced(), false).unwrap();

    let public = linker
        .reference_local("lib", "a.kt", &sig("pkg", "other"), SymbolKind::Function)
        .unwrap();
    assert!(public.is_none());
    assert!(matches!(
        linker.reference_local("lib", "b.kt", &local, SymbolKind::Function),
        Err(LinkError::Usage(_))
    ));
    let found = linker
        .reference_local("lib", "a.kt", &local, SymbolKind::Function)
        .unwrap();
    assert!(found.is_some());
    linker.link().unwrap();
    assert!(is_bound(&linker, &helpers));
}
