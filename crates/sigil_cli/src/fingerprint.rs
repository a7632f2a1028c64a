//! `sigil fingerprint`: print the fingerprints of an archive.

use std::path::Path;

use sigil_archive::Archive;
use sigil_common::Fingerprint;

use crate::pipeline::read_archive;
use crate::FingerprintArgs;

/// Runs the `sigil fingerprint` command.
pub fn run(args: &FingerprintArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let archive = read_archive(Path::new(&args.archive))?;
    print!("{}", render(&archive, args.raw));
    Ok(0)
}

fn show(fingerprint: Fingerprint, raw: bool) -> String {
    if raw {
        fingerprint.to_raw().iter().map(|b| format!("{b:02x}")).collect()
    } else {
        fingerprint.to_string()
    }
}

/// One line per file, then the archive line.
fn render(archive: &Archive, raw: bool) -> String {
    let mut out = String::new();
    for (name, fingerprint) in archive.file_fingerprints() {
        out.push_str(&format!("{}  {name}\n", show(fingerprint, raw)));
    }
    out.push_str(&format!("{}  <archive {}>\n", show(archive.fingerprint(), raw), archive.name));
    out
}
