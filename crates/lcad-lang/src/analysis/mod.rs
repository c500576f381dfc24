pub mod builder;
pub mod env;

#[cfg(test)]
mod tests;

use std::rc::Rc;

use crate::builtins::Registry;
use crate::error::Error;
use crate::syntax::ast::Node;
use builder::Builder;
use env::{EnvArena, FrameId};

// ─── Entry point ─────────────────────────────────────────────────────────────

/// Run the lexical-environment pass over a parsed term sequence.
///
/// On success returns the non-fatal warnings (shadowing); any hard error
/// (duplicate definition, builtin override, malformed form) fails the
/// whole build.
pub fn build(
    arena: &mut EnvArena,
    registry: &Registry,
    nodes: &[Rc<Node>],
    root: FrameId,
) -> Result<Vec<Error>, Vec<Error>> {
    let mut builder = Builder::new(arena, registry);
    builder.build(nodes, root);
    let Builder { errors, warnings, .. } = builder;
    if errors.is_empty() { Ok(warnings) } else { Err(errors) }
}
