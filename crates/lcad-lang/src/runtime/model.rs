//! The mutable evaluation target: "the current point in 3D space and
//! everything emitted so far".
//!
//! Transform composition is local-space (right-multiplication), matching
//! scene-graph convention: a child transform is relative to its parent.
//! Geometry forms save the matrix, multiply, evaluate their body, and
//! restore — so a transform never leaks to sibling expressions.

use glam::{DMat4, DVec3};

use crate::error::EvalErrorKind;

pub const MAIN_GROUP: &str = "main";

/// One placed physical part, captured with the full transform that was
/// current at placement time.
#[derive(Debug, Clone, PartialEq)]
pub struct PartPlacement {
    pub part: String,
    pub color: i64,
    pub step: i64,
    pub matrix: DMat4,
}

impl PartPlacement {
    /// Row-major cells for writer collaborators (file formats are row-major).
    pub fn matrix_rows(&self) -> [f64; 16] {
        self.matrix.transpose().to_cols_array()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    Line,
    Triangle,
    Quad,
}

impl PrimitiveKind {
    pub fn point_count(self) -> usize {
        match self {
            Self::Line => 2,
            Self::Triangle => 3,
            Self::Quad => 4,
        }
    }
}

/// One graphics primitive, with its points already pushed through the
/// transform that was current at emission time.
#[derive(Debug, Clone, PartialEq)]
pub struct Primitive {
    pub kind: PrimitiveKind,
    pub color: i64,
    pub step: i64,
    pub points: Vec<DVec3>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Part(PartPlacement),
    Primitive(Primitive),
    Comment(String),
}

/// A named, flat sub-assembly with its own header lines and step counter.
#[derive(Debug)]
pub struct Group {
    name: String,
    header: Vec<String>,
    step: i64,
    entries: Vec<Entry>,
    has_comments: bool,
}

impl Group {
    fn new(name: String) -> Self {
        Self { name, header: Vec::new(), step: 1, entries: Vec::new(), has_comments: false }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn step(&self) -> i64 {
        self.step
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Entries in emission order: sorted by step, unless any comment lines
    /// are present — comments pin the listing to insertion order.
    pub fn entries_ordered(&self) -> Vec<&Entry> {
        let mut out: Vec<&Entry> = self.entries.iter().collect();
        if !self.has_comments {
            out.sort_by_key(|e| match e {
                Entry::Part(p) => p.step,
                Entry::Primitive(p) => p.step,
                Entry::Comment(_) => 0,
            });
        }
        out
    }

    pub fn part_count(&self) -> usize {
        self.entries.iter().filter(|e| matches!(e, Entry::Part(_))).count()
    }
}

// ─── Model ───────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct Model {
    matrix: DMat4,
    groups: Vec<Group>,
    /// Stack of open group indices; the last one receives placements.
    open: Vec<usize>,
}

impl Model {
    pub fn new() -> Self {
        Self {
            matrix: DMat4::IDENTITY,
            groups: vec![Group::new(MAIN_GROUP.to_string())],
            open: vec![0],
        }
    }

    pub fn matrix(&self) -> DMat4 {
        self.matrix
    }

    /// Right-multiply the current transform; returns the previous matrix
    /// for the caller to restore after its body has been evaluated.
    pub fn push_matrix(&mut self, local: DMat4) -> DMat4 {
        let saved = self.matrix;
        self.matrix = self.matrix * local;
        saved
    }

    pub fn restore_matrix(&mut self, saved: DMat4) {
        self.matrix = saved;
    }

    /// Open a new group. A group deliberately starts from the identity
    /// matrix, not the enclosing transform; the caller restores the saved
    /// matrix when the group's body is done.
    pub fn open_group(&mut self, name: &str) -> Result<DMat4, EvalErrorKind> {
        if self.groups.iter().any(|g| g.name == name) {
            return Err(EvalErrorKind::GroupExists(name.to_string()));
        }
        self.groups.push(Group::new(name.to_string()));
        self.open.push(self.groups.len() - 1);
        let saved = self.matrix;
        self.matrix = DMat4::IDENTITY;
        Ok(saved)
    }

    pub fn close_group(&mut self, saved: DMat4) {
        if self.open.len() > 1 {
            self.open.pop();
        }
        self.matrix = saved;
    }

    fn current_mut(&mut self) -> &mut Group {
        let idx = *self.open.last().unwrap();
        &mut self.groups[idx]
    }

    pub fn current(&self) -> &Group {
        &self.groups[*self.open.last().unwrap()]
    }

    pub fn place_part(&mut self, part: &str, color: i64, step: i64) {
        let matrix = self.matrix;
        self.current_mut().entries.push(Entry::Part(PartPlacement {
            part: part.to_string(),
            color,
            step,
            matrix,
        }));
    }

    /// Points are transformed here, at emission time.
    pub fn place_primitive(&mut self, kind: PrimitiveKind, color: i64, points: Vec<DVec3>) {
        let matrix = self.matrix;
        let step = self.current().step;
        let points = points.into_iter().map(|p| matrix.transform_point3(p)).collect();
        self.current_mut().entries.push(Entry::Primitive(Primitive { kind, color, step, points }));
    }

    pub fn add_comment(&mut self, text: &str) {
        let group = self.current_mut();
        group.entries.push(Entry::Comment(text.to_string()));
        group.has_comments = true;
    }

    pub fn add_header(&mut self, line: &str) {
        self.current_mut().header.push(line.to_string());
    }

    /// Advance the current group's build step; subsequent parts default
    /// onto the new step.
    pub fn advance_step(&mut self) -> i64 {
        let group = self.current_mut();
        group.step += 1;
        group.step
    }

    pub fn current_step(&self) -> i64 {
        self.current().step
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }
}

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_identity_and_main_group() {
        let model = Model::new();
        assert_eq!(model.matrix(), DMat4::IDENTITY);
        assert_eq!(model.groups().len(), 1);
        assert_eq!(model.current().name(), MAIN_GROUP);
    }

    #[test]
    fn push_restore_round_trips() {
        let mut model = Model::new();
        let saved = model.push_matrix(DMat4::from_translation(DVec3::new(1.0, 2.0, 3.0)));
        assert_ne!(model.matrix(), DMat4::IDENTITY);
        model.restore_matrix(saved);
        assert_eq!(model.matrix(), DMat4::IDENTITY);
    }

    #[test]
    fn placement_captures_current_matrix() {
        let mut model = Model::new();
        let saved = model.push_matrix(DMat4::from_translation(DVec3::new(0.0, 0.0, 20.0)));
        model.place_part("3001", 4, 1);
        model.restore_matrix(saved);
        model.place_part("3002", 4, 1);

        let entries = model.current().entries();
        let Entry::Part(a) = &entries[0] else { panic!() };
        let Entry::Part(b) = &entries[1] else { panic!() };
        assert_eq!(a.matrix.w_axis.z, 20.0);
        assert_eq!(b.matrix, DMat4::IDENTITY);
    }

    #[test]
    fn group_starts_from_identity() {
        let mut model = Model::new();
        let saved = model.push_matrix(DMat4::from_translation(DVec3::new(5.0, 0.0, 0.0)));
        let group_saved = model.open_group("sub").unwrap();
        assert_eq!(model.matrix(), DMat4::IDENTITY);
        model.close_group(group_saved);
        model.restore_matrix(saved);
        assert_eq!(model.groups().len(), 2);
    }

    #[test]
    fn duplicate_group_rejected() {
        let mut model = Model::new();
        let saved = model.open_group("sub").unwrap();
        model.close_group(saved);
        assert!(matches!(model.open_group("sub"), Err(EvalErrorKind::GroupExists(_))));
    }

    #[test]
    fn entries_sort_by_step_without_comments() {
        let mut model = Model::new();
        model.place_part("b", 0, 2);
        model.place_part("a", 0, 1);
        let ordered = model.current().entries_ordered();
        let Entry::Part(first) = ordered[0] else { panic!() };
        assert_eq!(first.part, "a");
    }

    #[test]
    fn comments_pin_insertion_order() {
        let mut model = Model::new();
        model.place_part("b", 0, 2);
        model.add_comment("note");
        model.place_part("a", 0, 1);
        let ordered = model.current().entries_ordered();
        let Entry::Part(first) = ordered[0] else { panic!() };
        assert_eq!(first.part, "b");
    }

    #[test]
    fn primitive_points_are_transformed() {
        let mut model = Model::new();
        let saved = model.push_matrix(DMat4::from_translation(DVec3::new(10.0, 0.0, 0.0)));
        model.place_primitive(PrimitiveKind::Line, 24, vec![DVec3::ZERO, DVec3::new(0.0, 1.0, 0.0)]);
        model.restore_matrix(saved);
        let Entry::Primitive(p) = &model.current().entries()[0] else { panic!() };
        assert_eq!(p.points[0], DVec3::new(10.0, 0.0, 0.0));
    }
}
