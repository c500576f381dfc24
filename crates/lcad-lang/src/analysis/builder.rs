//! Pass 2 — Lexical Environment Builder
//!
//! Walks the parsed tree once and attaches a frame to every expression and
//! symbol, exactly mirroring AST nesting. Function definitions are
//! registered eagerly — the `UserFunction` value is allocated here, at
//! build time — so sibling functions can reference each other regardless
//! of textual order. Parameter and loop-variable slots are also registered
//! here, which is what lets every symbol in a body resolve statically.

use std::rc::Rc;

use crate::analysis::env::{EnvArena, FrameId, SlotId};
use crate::builtins::Registry;
use crate::error::{Error, ErrorCode};
use crate::runtime::value::{Function, ParamSpec, UserFunction, Value};
use crate::syntax::ast::{ExprNode, Node, Span};

pub struct Builder<'a> {
    arena: &'a mut EnvArena,
    registry: &'a Registry,
    pub errors: Vec<Error>,
    pub warnings: Vec<Error>,
}

impl<'a> Builder<'a> {
    pub fn new(arena: &'a mut EnvArena, registry: &'a Registry) -> Self {
        Self { arena, registry, errors: Vec::new(), warnings: Vec::new() }
    }

    pub fn build(&mut self, nodes: &[Rc<Node>], root: FrameId) {
        for node in nodes {
            self.walk(node, root);
        }
    }

    fn walk(&mut self, node: &Rc<Node>, enclosing: FrameId) {
        match &**node {
            Node::Int(..) | Node::Float(..) | Node::Str(..) => {}
            Node::Symbol(s) => s.env.set(enclosing),
            Node::Expr(e) => self.walk_expr(e, enclosing),
        }
    }

    fn walk_expr(&mut self, e: &ExprNode, enclosing: FrameId) {
        let frame = self.arena.new_frame(Some(enclosing));
        e.env.set(frame);

        if let Some(head) = e.elements.first() {
            if let Some(s) = head.as_symbol() {
                s.env.set(frame);
            }
        }

        match e.elements.first().and_then(|n| n.symbol_name()) {
            Some("def") => self.walk_def(e, frame, enclosing),
            Some("lambda") => self.walk_lambda(e, frame),
            Some("for") => self.walk_for(e, frame),
            _ => {
                for child in e.args() {
                    self.walk(child, frame);
                }
            }
        }
    }

    // ─── def ─────────────────────────────────────────────────────────────────

    /// `(def name value)` declares a variable slot; `(def name (params) body)`
    /// additionally allocates the function value right now. Both bind in the
    /// *enclosing* frame — the def expression's own frame belongs to the
    /// function's parameters and body.
    fn walk_def(&mut self, e: &ExprNode, frame: FrameId, enclosing: FrameId) {
        let name = match e.elements.get(1).and_then(|n| n.as_symbol()) {
            Some(s) => {
                s.env.set(frame);
                s
            }
            None => {
                self.errors.push(Error::at(
                    ErrorCode::S004,
                    &e.span,
                    "`def` expects a symbol name as its first argument",
                ));
                for child in e.args() {
                    self.walk(child, frame);
                }
                return;
            }
        };

        match e.elements.len() {
            // (def name value)
            3 => {
                self.declare(&name.name, &name.span, enclosing);
                self.walk(&e.elements[2], frame);
            }
            // (def name (params...) body)
            4 if e.elements[2].as_expr().is_some() => {
                let slot = self.declare(&name.name, &name.span, enclosing);
                let param_list = e.elements[2].as_expr().unwrap();
                let params = self.walk_params(param_list, frame);
                self.walk(&e.elements[3], frame);
                if let Some(slot) = slot {
                    let func = UserFunction {
                        name: Rc::from(name.name.as_str()),
                        params,
                        body: e.elements[3].clone(),
                        frame,
                    };
                    self.arena.set(slot, Value::Function(Function::User(Rc::new(func))));
                }
            }
            _ => {
                self.errors.push(Error::at(
                    ErrorCode::S004,
                    &e.span,
                    "`def` expects a name and a value, or a name, parameter list and body",
                ));
                for child in e.args().iter().skip(1) {
                    self.walk(child, frame);
                }
            }
        }
    }

    // ─── lambda ──────────────────────────────────────────────────────────────

    /// Parameters are registered in the lambda's frame now; the closure
    /// value itself is created at evaluation time.
    fn walk_lambda(&mut self, e: &ExprNode, frame: FrameId) {
        let Some(param_list) = e.elements.get(1).and_then(|n| n.as_expr()) else {
            self.errors.push(Error::at(
                ErrorCode::S004,
                &e.span,
                "`lambda` expects a parameter list and a body",
            ));
            for child in e.args() {
                self.walk(child, frame);
            }
            return;
        };
        if e.elements.len() != 3 {
            self.errors.push(Error::at(
                ErrorCode::S004,
                &e.span,
                "`lambda` expects a parameter list and a body",
            ));
        }
        self.walk_params(param_list, frame);
        if let Some(body) = e.elements.get(2) {
            self.walk(body, frame);
        }
    }

    // ─── for ─────────────────────────────────────────────────────────────────

    /// `(for (var range...) body...)` — the loop variable gets a slot in
    /// the for expression's frame so the body resolves it statically.
    fn walk_for(&mut self, e: &ExprNode, frame: FrameId) {
        let range = e.elements.get(1).and_then(|n| n.as_expr());
        let var = range.and_then(|r| r.elements.first()).and_then(|n| n.as_symbol());
        match (range, var) {
            (Some(range), Some(var)) if (2..=4).contains(&range.elements.len()) => {
                let range_frame = self.arena.new_frame(Some(frame));
                range.env.set(range_frame);
                var.env.set(range_frame);
                self.declare(&var.name, &var.span, frame);
                for arg in range.args() {
                    self.walk(arg, range_frame);
                }
            }
            _ => {
                self.errors.push(Error::at(
                    ErrorCode::S004,
                    &e.span,
                    "`for` expects a loop spec `(var limit)`, `(var list)`, \
                     `(var start end)` or `(var start end step)`",
                ));
                if let Some(range) = range {
                    let range_frame = self.arena.new_frame(Some(frame));
                    range.env.set(range_frame);
                    for child in range.elements.iter() {
                        self.walk(child, range_frame);
                    }
                }
            }
        }
        for child in e.args().iter().skip(1) {
            self.walk(child, frame);
        }
    }

    // ─── Parameter lists ─────────────────────────────────────────────────────

    /// Plain symbols are required positionals; `:name default` pairs are
    /// keyword parameters. Required parameters must come first.
    fn walk_params(&mut self, list: &ExprNode, frame: FrameId) -> Vec<ParamSpec> {
        let param_frame = self.arena.new_frame(Some(frame));
        list.env.set(param_frame);

        let mut params = Vec::new();
        let mut seen_keyword = false;
        let mut i = 0;
        while i < list.elements.len() {
            let entry = &list.elements[i];
            let Some(sym) = entry.as_symbol() else {
                self.errors.push(Error::at(
                    ErrorCode::S003,
                    entry.span(),
                    "parameter must be a symbol",
                ));
                i += 1;
                continue;
            };
            sym.env.set(param_frame);

            if let Some(stripped) = sym.name.strip_prefix(':') {
                seen_keyword = true;
                let Some(default) = list.elements.get(i + 1) else {
                    self.errors.push(Error::at(
                        ErrorCode::S003,
                        &sym.span,
                        format!("keyword parameter `:{stripped}` is missing its default"),
                    ));
                    break;
                };
                self.walk(default, param_frame);
                if let Some(slot) = self.declare(stripped, &sym.span, frame) {
                    params.push(ParamSpec {
                        name: stripped.to_string(),
                        slot,
                        default: Some(default.clone()),
                    });
                }
                i += 2;
            } else {
                if seen_keyword {
                    self.errors.push(Error::at(
                        ErrorCode::S003,
                        &sym.span,
                        format!("required parameter `{}` after a keyword parameter", sym.name),
                    ));
                }
                if let Some(slot) = self.declare(&sym.name, &sym.span, frame) {
                    params.push(ParamSpec { name: sym.name.clone(), slot, default: None });
                }
                i += 1;
            }
        }
        params
    }

    // ─── Declarations ────────────────────────────────────────────────────────

    /// Bind `name` in `frame`. Overriding a builtin or reserved constant is
    /// always fatal; a duplicate in the same frame is fatal; shadowing an
    /// ancestor binding only warns.
    fn declare(&mut self, name: &str, span: &Span, frame: FrameId) -> Option<SlotId> {
        if self.registry.is_reserved(name) {
            self.errors.push(Error::at(
                ErrorCode::S002,
                span,
                format!("cannot override built-in `{name}`"),
            ));
            return None;
        }
        let Some(slot) = self.arena.bind(frame, name, false) else {
            self.errors.push(Error::at(
                ErrorCode::S001,
                span,
                format!("`{name}` is already defined in this scope"),
            ));
            return None;
        };
        if self.arena.shadows(frame, name) {
            let warning = Error::at(
                ErrorCode::W001,
                span,
                format!("`{name}` shadows a binding from an enclosing scope"),
            );
            log::warn!("{warning}");
            self.warnings.push(warning);
        }
        Some(slot)
    }
}
