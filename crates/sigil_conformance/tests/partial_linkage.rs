//! Failure policy: fatal errors without partial linkage, stubs with it.

use sigil_config::PartialLinkageLog;
use sigil_conformance::{
    archive, callees, codes, dump, dump_of, is_bound, is_stub, referenced, FileFixture,
};
use sigil_ir::{DeclOrigin, ExprKind, Signature, SymbolKind};
use sigil_link::strategy::uniform;
use sigil_link::{DeserializationStrategy, LinkError, LinkOptions, Linker};

fn sig(package: &str, name: &str) -> Signature {
    Signature::public(package, name)
}

fn options(partial_linkage: bool, log: PartialLinkageLog) -> LinkOptions {
    LinkOptions {
        partial_linkage,
        partial_linkage_log: log,
        ..Default::default()
    }
}

fn missing_callee_linker(options: LinkOptions) -> Linker {
    let app = FileFixture::new("main.kt", "app").function("main", &[sig("lib", "gone"), sig("app", "helper")]);
    let app = app.function("helper", &[]);
    let lib = FileFixture::new("lib.kt", "lib").function("present", &[]);
    let mut linker = Linker::new(options);
    linker.add_archive(archive("lib", vec![lib]), &[], &referenced(), false).unwrap();
    linker.add_archive(archive("app", vec![app]), &["lib"], &referenced(), false).unwrap();
    linker.resolve_entry(&sig("app", "main")).unwrap();
    linker
}

/// Kind of the class `lib/Thing` loaded eagerly, then called as a function.
fn kind_mismatch_linker(options: LinkOptions) -> Linker {
    let lib = FileFixture::new("lib.kt", "lib").class("Thing", &[]);
    let app = FileFixture::new("main.kt", "app").function("main", &[sig("lib", "Thing")]);
    let mut linker = Linker::new(options);
    linker
        .add_archive(archive("lib", vec![lib]), &[], &uniform(DeserializationStrategy::All), false)
        .unwrap();
    linker.add_archive(archive("app", vec![app]), &["lib"], &referenced(), false).unwrap();
    linker.resolve_entry(&sig("app", "main")).unwrap();
    linker
}

// ---------------------------------------------------------------------------
// Without partial linkage
// ---------------------------------------------------------------------------

#[test]
fn missing_signature_is_fatal() {
    let mut linker = missing_callee_linker(LinkOptions::default());
    let err = linker.finish().unwrap_err();
    let LinkError::SignatureNotFound { signature, module, loaded } = &err else {
        panic!("expected SignatureNotFound, got {err}");
    };
    assert_eq!(signature, "lib/gone");
    assert_eq!(module, "app");
    assert_eq!(loaded, &["lib", "app"]);
    assert_eq!(err.code().to_string(), "E300");
}

#[test]
fn kind_mismatch_is_fatal() {
    let mut linker = kind_mismatch_linker(LinkOptions::default());
    let err = linker.finish().unwrap_err();
    match &err {
        LinkError::KindMismatch { signature, expected, found, .. } => {
            assert_eq!(signature, "lib/Thing");
            assert_eq!(*expected, SymbolKind::Function);
            assert_eq!(*found, SymbolKind::Class);
        }
        other => panic!("expected KindMismatch, got {other}"),
    }
    assert_eq!(err.code().to_string(), "E301");
}

#[test]
fn unbound_member_of_claimed_class_is_fatal() {
    let lib = FileFixture::new("lib.kt", "lib").class("Thing", &[("real", &[])]);
    let app = FileFixture::new("main.kt", "app").function("main", &[sig("lib", "Thing.missing")]);
    let mut linker = Linker::new(LinkOptions::default());
    linker.add_archive(archive("lib", vec![lib]), &[], &referenced(), false).unwrap();
    linker.add_archive(archive("app", vec![app]), &["lib"], &referenced(), false).unwrap();
    linker.resolve_entry(&sig("app", "main")).unwrap();
    let err = linker.finish().unwrap_err();
    match &err {
        LinkError::Unbound { signature, location } => {
            assert_eq!(signature, "lib/Thing.missing");
            assert_eq!(location.module.as_deref(), Some("lib"));
        }
        other => panic!("expected Unbound, got {other}"),
    }
    assert_eq!(err.code().to_string(), "E303");
}

// ---------------------------------------------------------------------------
// With partial linkage
// ---------------------------------------------------------------------------

#[test]
fn missing_function_becomes_throwing_stub() {
    let mut linker = missing_callee_linker(options(true, PartialLinkageLog::Warning));
    let report = linker.finish().unwrap();
    assert_eq!(report.stubs, 1);
    assert!(is_bound(&linker, &sig("app", "helper")));

    let called = callees(&linker, &sig("app", "main"));
    assert_eq!(called.len(), 2);
    let stub = called
        .iter()
        .copied()
        .find(|&s| is_stub(&linker, s))
        .expect("one callee is a stub");
    let decl = linker.program().declaration_of(stub).unwrap();
    assert_eq!(decl.origin, DeclOrigin::UnlinkedStub);
    let body = decl.kind.as_function().unwrap().body.as_ref().unwrap();
    match body {
        sigil_ir::Body::Expression(expr) => assert_eq!(
            expr.kind,
            ExprKind::LinkageError("unlinked symbol lib/gone: no declaration found".into())
        ),
        other => panic!("expected throwing expression body, got {other:?}"),
    }

    assert_eq!(codes(&linker), ["W300"]);
    assert!(!linker.diagnostics().has_errors());
    assert!(dump(&linker).contains("stubs\n"));
}

#[test]
fn kind_mismatch_is_substituted_and_stubbed() {
    let mut linker = kind_mismatch_linker(options(true, PartialLinkageLog::Warning));
    let report = linker.finish().unwrap();
    assert_eq!(report.stubs, 1);
    assert_eq!(codes(&linker), ["W301", "W300"]);
    let messages: Vec<String> = linker
        .diagnostics()
        .diagnostics()
        .into_iter()
        .map(|d| d.message)
        .collect();
    assert_eq!(
        messages[1],
        "unlinked symbol lib/Thing: expected function, found class"
    );
    // The class itself stays linked under its own kind.
    assert!(is_bound(&linker, &sig("lib", "Thing")));
}

#[test]
fn unbound_member_is_stubbed() {
    let lib = FileFixture::new("lib.kt", "lib").class("Thing", &[("real", &[])]);
    let app = FileFixture::new("main.kt", "app").function("main", &[sig("lib", "Thing.missing")]);
    let mut linker = Linker::new(options(true, PartialLinkageLog::Info));
    linker.add_archive(archive("lib", vec![lib]), &[], &referenced(), false).unwrap();
    linker.add_archive(archive("app", vec![app]), &["lib"], &referenced(), false).unwrap();
    linker.resolve_entry(&sig("app", "main")).unwrap();
    let report = linker.finish().unwrap();
    assert_eq!(report.stubs, 1);
    let diags = linker.diagnostics().diagnostics();
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].severity, sigil_diagnostics::Severity::Note);
    assert_eq!(diags[0].origin.module.as_deref(), Some("lib"));
}

#[test]
fn error_log_level_counts_as_errors_but_still_stubs() {
    let mut linker = missing_callee_linker(options(true, PartialLinkageLog::Error));
    let report = linker.finish().unwrap();
    assert_eq!(report.stubs, 1);
    assert!(linker.diagnostics().has_errors());
}

#[test]
fn silent_log_reports_nothing() {
    let mut linker = missing_callee_linker(options(true, PartialLinkageLog::Silent));
    let report = linker.finish().unwrap();
    assert_eq!(report.stubs, 1);
    assert!(codes(&linker).is_empty());
}

// ---------------------------------------------------------------------------
// Kind resolution order
// ---------------------------------------------------------------------------

/// `app/f` calls class `lib/C` as a function, `app/h` returns it. `entries`
/// picks which of the two is decoded first.
fn stale_call_linker(entries: &[&str]) -> Linker {
    let lib = FileFixture::new("lib.kt", "lib").class("C", &[]);
    let app = FileFixture::new("main.kt", "app")
        .function("f", &[sig("lib", "C")])
        .function_returning("h", &sig("lib", "C"));
    let mut linker = Linker::new(options(true, PartialLinkageLog::Warning));
    linker.add_archive(archive("lib", vec![lib]), &[], &referenced(), false).unwrap();
    linker.add_archive(archive("app", vec![app]), &["lib"], &referenced(), false).unwrap();
    for entry in entries {
        linker.resolve_entry(&sig("app", entry)).unwrap();
    }
    linker
}

fn return_classifier(linker: &Linker, function: &Signature) -> sigil_ir::SymbolId {
    let program = linker.program();
    let symbol = program.symbols.lookup(function).unwrap();
    let decl = program.declaration_of(symbol).unwrap();
    match &decl.kind.as_function().unwrap().return_type {
        sigil_ir::IrType::Simple { classifier, .. } => *classifier,
        other => panic!("unexpected return type {other:?}"),
    }
}

#[test]
fn mismatched_use_order_does_not_change_binding() {
    let mut results = Vec::new();
    for entries in [["h", "f"], ["f", "h"]] {
        let mut linker = stale_call_linker(&entries);
        let report = linker.finish().unwrap();
        assert_eq!(report.stubs, 1, "entries {entries:?}");

        let classifier = return_classifier(&linker, &sig("app", "h"));
        assert!(!is_stub(&linker, classifier), "entries {entries:?}");
        assert_eq!(linker.program().symbols.lookup(&sig("lib", "C")), Some(classifier));
        assert!(linker.program().symbols.is_bound(classifier));

        let called = callees(&linker, &sig("app", "f"));
        assert_eq!(called.len(), 1);
        assert!(is_stub(&linker, called[0]), "entries {entries:?}");
        results.push(dump(&linker));
    }
    assert_eq!(results[0], results[1]);
}

// ---------------------------------------------------------------------------
// Containment
// ---------------------------------------------------------------------------

/// `lib` with or without `lib/d`. `app/main` reaches `d` only through `app/uses_d`.
fn containment_linker(with_d: bool) -> Linker {
    let mut lib = FileFixture::new("lib.kt", "lib").function("util", &[]);
    if with_d {
        lib = lib.function("d", &[]);
    }
    let app = FileFixture::new("main.kt", "app")
        .function("main", &[sig("app", "uses_d"), sig("app", "clean")])
        .function("uses_d", &[sig("lib", "d")])
        .function("clean", &[sig("lib", "util")]);
    let mut linker = Linker::new(options(true, PartialLinkageLog::Warning));
    linker.add_archive(archive("lib", vec![lib]), &[], &referenced(), false).unwrap();
    linker.add_archive(archive("app", vec![app]), &["lib"], &referenced(), false).unwrap();
    linker.resolve_entry(&sig("app", "main")).unwrap();
    linker
}

#[test]
fn missing_declaration_only_affects_its_users() {
    let mut complete = containment_linker(true);
    assert_eq!(complete.finish().unwrap().stubs, 0);
    let mut missing = containment_linker(false);
    assert_eq!(missing.finish().unwrap().stubs, 1);

    for unaffected in [sig("app", "main"), sig("app", "clean"), sig("lib", "util")] {
        let expected = dump_of(&complete, &unaffected).unwrap();
        assert_eq!(dump_of(&missing, &unaffected), Some(expected), "{unaffected}");
    }
    assert!(codes(&complete).is_empty());
    assert_eq!(codes(&missing), ["W300"]);
}
