//! The order in which modules with pending work are drained must not change
//! what gets linked.

use proptest::prelude::*;
use sigil_conformance::{archive, codes, dump, is_bound, referenced, supplying_module, FileFixture};
use sigil_ir::Signature;
use sigil_link::{LinkError, LinkOptions, LinkReport, Linker};

fn sig(package: &str, name: &str) -> Signature {
    Signature::public(package, name)
}

fn graph(options: LinkOptions) -> Linker {
    let core = FileFixture::new("core.kt", "core")
        .function("log", &[])
        .function("unused", &[])
        .class("Box", &[("get", &[sig("core", "log")]), ("set", &[])]);
    let util = FileFixture::new("util.kt", "util")
        .function("fmt", &[sig("core", "log"), sig("core", "gone")])
        .function("pad", &[sig("core", "Box.set")]);
    let app_main = FileFixture::new("main.kt", "app")
        .function("main", &[sig("util", "fmt"), sig("app", "helper"), sig("core", "Box.get")]);
    let app_helper = FileFixture::new("helper.kt", "app").function("helper", &[sig("util", "pad")]);

    let mut linker = Linker::new(options);
    linker.add_archive(archive("core", vec![core]), &[], &referenced(), false).unwrap();
    linker.add_archive(archive("util", vec![util]), &["core"], &referenced(), false).unwrap();
    linker
        .add_archive(archive("app", vec![app_main, app_helper]), &["util"], &referenced(), false)
        .unwrap();
    linker.resolve_entry(&sig("app", "main")).unwrap();
    linker
}

/// `m1` and `m2` both declare `shared/s`, each calling a helper only it has.
/// `m3` depends on `m1`; `m2` stands alone. Both `m2/a` and `m3/b` call `s`.
fn duplicate_graph() -> Linker {
    let m1 = FileFixture::new("shared.kt", "shared")
        .function("s", &[sig("shared", "first_only")])
        .function("first_only", &[]);
    let m2_shared = FileFixture::new("shared.kt", "shared")
        .function("s", &[sig("shared", "second_only")])
        .function("second_only", &[]);
    let m2_main = FileFixture::new("a.kt", "m2").function("a", &[sig("shared", "s")]);
    let m3 = FileFixture::new("b.kt", "m3").function("b", &[sig("shared", "s")]);

    let mut linker = Linker::new(LinkOptions::default());
    linker.add_archive(archive("m1", vec![m1]), &[], &referenced(), false).unwrap();
    linker
        .add_archive(archive("m2", vec![m2_shared, m2_main]), &[], &referenced(), false)
        .unwrap();
    linker.add_archive(archive("m3", vec![m3]), &["m1"], &referenced(), false).unwrap();
    linker.resolve_entry(&sig("m2", "a")).unwrap();
    linker.resolve_entry(&sig("m3", "b")).unwrap();
    linker
}

fn partial() -> LinkOptions {
    LinkOptions {
        partial_linkage: true,
        ..Default::default()
    }
}

fn reference_link() -> (String, LinkReport) {
    let mut linker = graph(partial());
    linker.link().unwrap();
    let report = linker.finish().unwrap();
    (dump(&linker), report)
}

fn choices() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(0usize..8, 0..64)
}

#[test]
fn reference_link_is_complete() {
    let (text, report) = reference_link();
    assert_eq!(report.modules, 3);
    assert_eq!(report.stubs, 1);
    assert!(text.contains("stubs\n"));
    assert!(!text.contains("core/unused"));
}

#[test]
fn duplicate_signature_is_supplied_by_earliest_module() {
    let mut linker = duplicate_graph();
    linker.finish().unwrap();
    assert_eq!(supplying_module(&linker, &sig("shared", "s")).as_deref(), Some("m1"));
    assert!(is_bound(&linker, &sig("shared", "first_only")));
    assert!(!is_bound(&linker, &sig("shared", "second_only")));
    assert_eq!(codes(&linker), ["W303"]);
}

proptest! {
    /// Any drain order binds the same declarations and stubs.
    #[test]
    fn drain_order_does_not_change_result(choices in choices()) {
        let (expected_dump, expected_report) = reference_link();

        let mut linker = graph(partial());
        let mut picks = choices.into_iter();
        linker.drain_with(|_| picks.next().unwrap_or(0)).unwrap();
        let report = linker.finish().unwrap();

        prop_assert_eq!(report, expected_report);
        prop_assert_eq!(dump(&linker), expected_dump);
    }

    /// Without partial linkage every order reports the same missing signature.
    #[test]
    fn drain_order_does_not_change_failure(choices in choices()) {
        let mut linker = graph(LinkOptions::default());
        let mut picks = choices.into_iter();
        let err = linker.drain_with(|ready| picks.next().unwrap_or(ready.len() - 1)).unwrap_err();
        match err {
            LinkError::SignatureNotFound { signature, module, .. } => {
                prop_assert_eq!(signature, "core/gone");
                prop_assert_eq!(module, "util");
            }
            other => prop_assert!(false, "unexpected error: {}", other),
        }
    }

    /// A signature declared by two modules binds the same copy whichever
    /// requester drains first.
    #[test]
    fn drain_order_does_not_pick_duplicate_copy(choices in choices()) {
        let mut expected = duplicate_graph();
        expected.finish().unwrap();

        let mut linker = duplicate_graph();
        let mut picks = choices.into_iter();
        linker.drain_with(|ready| picks.next().unwrap_or(ready.len() - 1)).unwrap();
        linker.finish().unwrap();

        prop_assert_eq!(dump(&linker), dump(&expected));
        prop_assert_eq!(codes(&linker), codes(&expected));
    }
}
