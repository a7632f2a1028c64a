//! Linking state of one archive file.

use crate::codec::SignatureCodec;
use crate::context::LinkContext;
use crate::error::LinkResult;
use crate::strategy::DeserializationStrategy;
use sigil_archive::ArchiveFile;
use sigil_ir::ids::{FileId, LoopId, ModuleId, SymbolId};
use sigil_ir::signature::Signature;
use sigil_ir::types::IrType;
use std::collections::{HashMap, HashSet, VecDeque};

/// Everything a module remembers about one of its files while linking.
///
/// The reverse index maps each top-level signature the file declares to its
/// declaration record. A top level is scheduled at most once: it enters the
/// pending queue, is materialized when the queue drains, and never comes back.
#[derive(Debug)]
pub struct FileState {
    /// Position of the file in its archive.
    pub index: usize,
    /// File name as recorded in the archive.
    pub name: String,
    /// Strategy the file is loaded with.
    pub strategy: DeserializationStrategy,
    pub(crate) file_id: Option<FileId>,
    pub(crate) indexed: bool,
    pub(crate) hidden: bool,
    pub(crate) top_levels: HashMap<Signature, u32>,
    pub(crate) order: Vec<Signature>,
    pub(crate) exported: Vec<Signature>,
    pending: VecDeque<Signature>,
    scheduled: HashSet<Signature>,
    pub(crate) codec: SignatureCodec,
    pub(crate) types: HashMap<u32, IrType>,
    pub(crate) locals: HashMap<Signature, SymbolId>,
    pub(crate) loops: HashMap<i32, LoopId>,
    pub(crate) requested: HashSet<Signature>,
}

impl FileState {
    /// Creates the state of file `index`; nothing is indexed yet.
    pub fn new(index: usize, name: impl Into<String>, strategy: DeserializationStrategy) -> Self {
        Self {
            index,
            name: name.into(),
            strategy,
            file_id: None,
            indexed: false,
            hidden: false,
            top_levels: HashMap::new(),
            order: Vec::new(),
            exported: Vec::new(),
            pending: VecDeque::new(),
            scheduled: HashSet::new(),
            codec: SignatureCodec::new(),
            types: HashMap::new(),
            locals: HashMap::new(),
            loops: HashMap::new(),
            requested: HashSet::new(),
        }
    }

    /// Decodes the file's top-level and exported signature lists.
    pub(crate) fn index(&mut self, file: &ArchiveFile) -> LinkResult<()> {
        if self.indexed {
            return Ok(());
        }
        for entry in &file.top_level {
            let signature = self.codec.decode(file, entry.signature)?;
            if self
                .top_levels
                .insert(signature.clone(), entry.declaration)
                .is_none()
            {
                self.order.push(signature);
            }
        }
        for &index in &file.exported {
            let signature = self.codec.decode(file, index)?;
            self.exported.push(signature);
        }
        self.indexed = true;
        tracing::trace!(file = %self.name, top_levels = self.order.len(), "file indexed");
        Ok(())
    }

    /// Returns `true` if this file declares `signature` as a top level.
    pub fn declares(&self, signature: &Signature) -> bool {
        !self.hidden && self.top_levels.contains_key(signature)
    }

    /// Queues a top level for materialization. Returns `false` if the file
    /// does not declare it or it was already scheduled.
    pub fn enqueue(&mut self, signature: &Signature) -> bool {
        if !self.declares(signature) || self.scheduled.contains(signature) {
            return false;
        }
        self.scheduled.insert(signature.clone());
        self.pending.push_back(signature.clone());
        true
    }

    /// Queues the top levels the strategy loads without being asked.
    pub(crate) fn enqueue_initial(&mut self) {
        let initial: Vec<Signature> = if self.strategy.whole_world() {
            self.order.clone()
        } else if self.strategy.explicitly_exported() {
            self.exported.clone()
        } else {
            Vec::new()
        };
        for signature in &initial {
            self.enqueue(signature);
        }
    }

    /// The next pending top level. It stays queued until
    /// [`complete_pending`](Self::complete_pending) is called.
    pub(crate) fn front_pending(&self) -> Option<Signature> {
        self.pending.front().cloned()
    }

    /// Drops the front of the queue once it has been materialized.
    pub(crate) fn complete_pending(&mut self, signature: &Signature) {
        if self.pending.front() == Some(signature) {
            self.pending.pop_front();
        }
    }

    /// Top levels waiting to be materialized, in queue order.
    pub fn pending(&self) -> impl Iterator<Item = &Signature> {
        self.pending.iter()
    }

    /// Returns `true` if top levels are waiting to be materialized.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Returns the program file, registering it on first use.
    pub(crate) fn file_id(
        &mut self,
        cx: &mut LinkContext,
        module: ModuleId,
        package: &str,
    ) -> FileId {
        *self
            .file_id
            .get_or_insert_with(|| cx.program.add_file(module, self.name.clone(), package))
    }

    /// Stops claiming the file's signatures and drops queued work.
    pub(crate) fn hide(&mut self) {
        self.hidden = true;
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigil_archive::records::{DeclKindRecord, DeclRecord};
    use sigil_archive::FileBuilder;
    use sigil_ir::decl::ClassKind;
    use sigil_ir::symbol::SymbolKind;

    fn class_file(names: &[&str], exported: &[&str]) -> ArchiveFile {
        let mut fb = FileBuilder::new("a.kt", "pkg");
        for name in names {
            let sig = Signature::public("pkg", *name);
            let record = DeclRecord {
                symbol: fb.symbol(SymbolKind::Class, &sig),
                name: fb.string(name),
                start: 0,
                end: 0,
                debug_info: None,
                kind: DeclKindRecord::Class {
                    class_kind: ClassKind::Class,
                    type_parameters: Vec::new(),
                    supertypes: Vec::new(),
                    members: Vec::new(),
                    is_expect: false,
                },
            };
            fb.declare(&record);
        }
        for name in exported {
            fb.export(&Signature::public("pkg", *name));
        }
        fb.finish().unwrap()
    }

    #[test]
    fn enqueue_only_declared_and_only_once() {
        let file = class_file(&["A", "B"], &[]);
        let mut state = FileState::new(0, "a.kt", DeserializationStrategy::OnlyReferenced);
        state.index(&file).unwrap();

        let a = Signature::public("pkg", "A");
        assert!(state.enqueue(&a));
        assert!(!state.enqueue(&a));
        assert!(!state.enqueue(&Signature::public("pkg", "Z")));
        assert_eq!(state.front_pending(), Some(a.clone()));
        state.complete_pending(&a);
        assert!(!state.enqueue(&a));
        assert!(!state.has_pending());
    }

    #[test]
    fn initial_queue_follows_strategy() {
        let file = class_file(&["A", "B", "C"], &["B"]);

        let mut all = FileState::new(0, "a.kt", DeserializationStrategy::All);
        all.index(&file).unwrap();
        all.enqueue_initial();
        let queued: Vec<String> = all.pending().map(ToString::to_string).collect();
        assert_eq!(queued, ["pkg/A", "pkg/B", "pkg/C"]);

        let mut exported = FileState::new(0, "a.kt", DeserializationStrategy::ExplicitlyExported);
        exported.index(&file).unwrap();
        exported.enqueue_initial();
        let queued: Vec<&Signature> = exported.pending().collect();
        assert_eq!(queued, [&Signature::public("pkg", "B")]);

        let mut referenced = FileState::new(0, "a.kt", DeserializationStrategy::OnlyReferenced);
        referenced.index(&file).unwrap();
        referenced.enqueue_initial();
        assert!(!referenced.has_pending());
    }

    #[test]
    fn front_stays_queued_until_completed() {
        let file = class_file(&["A", "B"], &[]);
        let mut state = FileState::new(0, "a.kt", DeserializationStrategy::OnlyReferenced);
        state.index(&file).unwrap();
        let (a, b) = (Signature::public("pkg", "A"), Signature::public("pkg", "B"));
        state.enqueue(&a);
        assert_eq!(state.front_pending(), Some(a.clone()));
        assert!(state.has_pending());

        state.enqueue(&b);
        state.complete_pending(&b);
        assert_eq!(state.front_pending(), Some(a.clone()));
        state.complete_pending(&a);
        assert_eq!(state.front_pending(), Some(b));
    }

    #[test]
    fn hidden_file_claims_nothing() {
        let file = class_file(&["A"], &[]);
        let mut state = FileState::new(0, "a.kt", DeserializationStrategy::All);
        state.index(&file).unwrap();
        state.enqueue_initial();
        state.hide();
        assert!(!state.has_pending());
        assert!(!state.declares(&Signature::public("pkg", "A")));
        assert!(!state.enqueue(&Signature::public("pkg", "A")));
    }
}
