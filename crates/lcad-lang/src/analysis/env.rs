//! Lexical frames and value slots, arena-allocated.
//!
//! Frames mirror AST nesting (one per expression), not the call stack:
//! scoping is static. AST nodes hold `FrameId` handles into the arena, and
//! frames hold a parent handle, so there are no ownership cycles. A slot is
//! the single storage location behind a binding; `None` means declared but
//! never assigned, which reads as a distinct error from "not defined".

use std::collections::HashMap;
use std::rc::Rc;

use crate::runtime::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameId(u32);

impl FrameId {
    /// Placeholder until the builder pass runs. Dereferencing it is a bug.
    pub const UNSET: FrameId = FrameId(u32::MAX);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotId(u32);

/// One name→slot entry. `protected` marks registry seeds (builtins and the
/// reserved constants); `origin` records which module file exported the
/// binding, for import collision checks.
#[derive(Debug, Clone)]
pub struct Binding {
    pub slot: SlotId,
    pub protected: bool,
    pub origin: Option<Rc<str>>,
}

#[derive(Debug, Default)]
pub struct Frame {
    parent: Option<FrameId>,
    bindings: HashMap<String, Binding>,
}

#[derive(Debug, Default)]
pub struct EnvArena {
    frames: Vec<Frame>,
    slots: Vec<Option<Value>>,
}

impl EnvArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_frame(&mut self, parent: Option<FrameId>) -> FrameId {
        let id = FrameId(self.frames.len() as u32);
        self.frames.push(Frame { parent, bindings: HashMap::new() });
        id
    }

    pub fn parent(&self, frame: FrameId) -> Option<FrameId> {
        self.frames[frame.0 as usize].parent
    }

    /// Register `name` in `frame` with a fresh unset slot.
    /// Returns `None` if the name is already bound in this frame.
    pub fn bind(&mut self, frame: FrameId, name: &str, protected: bool) -> Option<SlotId> {
        self.bind_with_origin(frame, name, protected, None)
    }

    pub fn bind_with_origin(
        &mut self,
        frame: FrameId,
        name: &str,
        protected: bool,
        origin: Option<Rc<str>>,
    ) -> Option<SlotId> {
        let f = &mut self.frames[frame.0 as usize];
        if f.bindings.contains_key(name) {
            return None;
        }
        let slot = SlotId(self.slots.len() as u32);
        self.slots.push(None);
        f.bindings.insert(name.to_string(), Binding { slot, protected, origin });
        Some(slot)
    }

    /// Alias an existing slot under a new name (used by import re-export —
    /// the module's slot and the importer's name share storage).
    pub fn bind_alias(
        &mut self,
        frame: FrameId,
        name: &str,
        slot: SlotId,
        origin: Option<Rc<str>>,
    ) -> bool {
        let f = &mut self.frames[frame.0 as usize];
        if f.bindings.contains_key(name) {
            return false;
        }
        f.bindings.insert(name.to_string(), Binding { slot, protected: false, origin });
        true
    }

    /// Binding in this exact frame, no parent walk.
    pub fn binding(&self, frame: FrameId, name: &str) -> Option<&Binding> {
        self.frames[frame.0 as usize].bindings.get(name)
    }

    /// Innermost-out walk from `frame` to the root.
    pub fn lookup(&self, frame: FrameId, name: &str) -> Option<&Binding> {
        let mut current = Some(frame);
        while let Some(id) = current {
            let f = &self.frames[id.0 as usize];
            if let Some(b) = f.bindings.get(name) {
                return Some(b);
            }
            current = f.parent;
        }
        None
    }

    /// True if any frame strictly above `frame` binds `name`.
    pub fn shadows(&self, frame: FrameId, name: &str) -> bool {
        match self.parent(frame) {
            Some(parent) => self.lookup(parent, name).is_some(),
            None => false,
        }
    }

    pub fn get(&self, slot: SlotId) -> Option<&Value> {
        self.slots[slot.0 as usize].as_ref()
    }

    pub fn set(&mut self, slot: SlotId, value: Value) {
        self.slots[slot.0 as usize] = Some(value);
    }

    /// Swap a slot's contents — the activation-record primitive. A user
    /// function call saves each parameter slot, installs the argument, and
    /// swaps the saved state back when the call unwinds, which is what makes
    /// direct and mutual recursion safe.
    pub fn replace(&mut self, slot: SlotId, value: Option<Value>) -> Option<Value> {
        std::mem::replace(&mut self.slots[slot.0 as usize], value)
    }

    /// All bindings of one frame, for import re-export.
    pub fn bindings_of(&self, frame: FrameId) -> impl Iterator<Item = (&String, &Binding)> {
        self.frames[frame.0 as usize].bindings.iter()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
