//! `sigil status`: per-library up-to-date check against the fingerprint cache.

use sigil_cache::{FingerprintCache, LibraryStatus};

use crate::pipeline::{read_archive, resolve_project_root};
use crate::StatusArgs;

/// Runs the `sigil status` command.
pub fn run(args: &StatusArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let root = resolve_project_root(args.config.as_deref())?;
    let config = sigil_config::load_config(&root)?;
    if !config.cache.enabled {
        println!("fingerprint cache disabled for {}", config.project.name);
        return Ok(0);
    }
    let cache = FingerprintCache::load_or_create(&root.join(&config.cache.dir), env!("CARGO_PKG_VERSION"));
    for library in &config.libraries {
        let archive = read_archive(&root.join(&library.path))?;
        println!("{}", describe(&library.name, &cache.check(&library.name, &archive)));
    }
    Ok(0)
}

fn describe(library: &str, status: &LibraryStatus) -> String {
    match status {
        LibraryStatus::UpToDate => format!("{library}: up to date"),
        LibraryStatus::Unknown(_) => format!("{library}: never linked"),
        LibraryStatus::Changed(changes) => {
            let dirty = changes.dirty_files();
            let mut line = format!("{library}: {} dirty file(s)", dirty.len());
            if !dirty.is_empty() {
                line.push_str(&format!(": {}", dirty.join(", ")));
            }
            if !changes.removed.is_empty() {
                line.push_str(&format!(" (removed: {})", changes.removed.join(", ")));
            }
            line
        }
    }
}
