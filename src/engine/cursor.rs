//! Depth-first traversal with a resettable context navigator.
//!
//! A [`TreeCursor`] does two jobs over one [`Forest`]:
//!
//! 1. **Linear traversal** (`has_next` / `next`): visits every element in
//!    depth-first order, turning each nested branch into an enter/exit pair.
//! 2. **Context navigation** (`previous_sibling`, `parent`, `child`, ...):
//!    looks around the module most recently produced by `next` without
//!    disturbing the traversal. Only rule matching uses this.
//!
//! The two jobs keep separate stacks:
//!
//! ```text
//! linear:  [root next=3] [branch@2 next=1]          <- owned by next()
//! context: [root at=2]   [branch@2 at=0] [child..]  <- rebuilt by reset_context()
//!                         ^ level
//! ```
//!
//! `reset_context` throws the context stack away and rebuilds it from the
//! linear stack, so context drift can never leak into traversal.
//!
//! Frames address their slice of the forest by an index path from the root
//! rather than by reference. That keeps `TreeCursor` free of borrows, so a
//! half-finished pass can be parked inside the engine between chunked steps;
//! [`TreeCursor::over`] pairs it with the forest for the duration of a call.

use crate::{Element, Forest, Module, Symbol};
use std::collections::HashSet;

/// One step of linear traversal.
#[derive(Debug, PartialEq)]
pub enum Visit<'f, V> {
    /// Entered a nested branch (a synthetic `[`).
    Enter,
    /// Left a nested branch (a synthetic `]`).
    Exit,
    Module(&'f Module<V>),
}

impl<V> Visit<'_, V> {
    /// The symbol this visit stands for: `[`, `]`, or the module's id.
    pub fn symbol(&self) -> &str {
        match self {
            Visit::Enter => crate::BRANCH_OPEN,
            Visit::Exit => crate::BRANCH_CLOSE,
            Visit::Module(module) => module.id.as_str(),
        }
    }
}

/// Axis along which a context predecessor is looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// `^`
    PreviousSiblingOrParent,
    /// `<`
    PreviousSibling,
    /// `>`
    NextSibling,
    /// `[`
    Child,
    /// `]`
    Parent,
}

/// A parsed direction tag. `from_origin` is the `.` prefix: reset the context
/// to the strict predecessor before navigating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Direction {
    pub axis: Axis,
    pub from_origin: bool,
}

impl Direction {
    /// Parse one of `^ < > [ ]`, optionally prefixed with `.`.
    pub fn parse(tag: &str) -> Option<Direction> {
        let (from_origin, rest) = match tag.strip_prefix('.') {
            Some(rest) => (true, rest),
            None => (false, tag),
        };
        let axis = match rest {
            "^" => Axis::PreviousSiblingOrParent,
            "<" => Axis::PreviousSibling,
            ">" => Axis::NextSibling,
            "[" => Axis::Child,
            "]" => Axis::Parent,
            _ => return None,
        };
        Some(Direction { axis, from_origin })
    }
}

#[derive(Debug, Clone)]
struct Frame {
    path: Vec<usize>,
    /// Index of the next element to visit.
    next: usize,
}

#[derive(Debug, Clone)]
struct ContextFrame {
    path: Vec<usize>,
    /// Index of the element in focus; `-1` is before the first, `len` past the last.
    at: isize,
}

/// Owned traversal state. See the module docs.
#[derive(Debug, Clone)]
pub struct TreeCursor {
    linear: Vec<Frame>,
    context: Vec<ContextFrame>,
    /// Current context level; `None` once navigation has climbed past the root.
    level: Option<usize>,
    /// Set by `next`; the context stack no longer mirrors the linear one.
    stale: bool,
}

impl Default for TreeCursor {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeCursor {
    pub fn new() -> Self {
        TreeCursor {
            linear: vec![Frame { path: Vec::new(), next: 0 }],
            context: vec![ContextFrame { path: Vec::new(), at: -1 }],
            level: Some(0),
            stale: false,
        }
    }

    /// Pair this state with the forest it walks.
    ///
    /// The same `forest` must be passed on every call for a given cursor.
    pub fn over<'s, 'f, V>(&'s mut self, forest: &'f Forest<V>, ignore: &'f HashSet<Symbol>) -> Cursor<'s, 'f, V> {
        Cursor { state: self, forest, ignore }
    }

    /// True while `next` has something left to yield.
    pub fn has_next<V>(&self, forest: &Forest<V>) -> bool {
        match self.linear.as_slice() {
            [] => false,
            [root] => root.next < slice_at(forest, &root.path).len(),
            _ => true,
        }
    }
}

/// Resolve an index path to the slice it addresses.
fn slice_at<'f, V>(forest: &'f Forest<V>, path: &[usize]) -> &'f [Element<V>] {
    let mut items: &'f [Element<V>] = forest;
    for &index in path {
        match items.get(index) {
            Some(Element::Branch(sub)) => items = sub,
            _ => return &[],
        }
    }
    items
}

/// A [`TreeCursor`] bound to its forest and ignore set.
pub struct Cursor<'s, 'f, V> {
    state: &'s mut TreeCursor,
    forest: &'f Forest<V>,
    ignore: &'f HashSet<Symbol>,
}

impl<'s, 'f, V> Cursor<'s, 'f, V> {
    pub fn has_next(&self) -> bool {
        self.state.has_next(self.forest)
    }

    /// Advance linear traversal by one element.
    ///
    /// # Panics
    ///
    /// Panics when the cursor is already exhausted; check [`Cursor::has_next`] first.
    pub fn next(&mut self) -> Visit<'f, V> {
        assert!(self.has_next(), "tree cursor advanced past the end of the forest");
        let forest = self.forest;
        self.state.stale = true;

        let Some(top) = self.state.linear.last_mut() else {
            unreachable!("has_next guarantees a frame");
        };
        let index = top.next;
        match slice_at(forest, &top.path).get(index) {
            Some(Element::Leaf(module)) => {
                top.next += 1;
                Visit::Module(module)
            }
            Some(Element::Branch(_)) => {
                top.next += 1;
                let mut path = top.path.clone();
                path.push(index);
                self.state.linear.push(Frame { path, next: 0 });
                Visit::Enter
            }
            None => {
                self.state.linear.pop();
                Visit::Exit
            }
        }
    }

    /// Drop every frame pushed by context navigation and put each level's
    /// focus back on the element `next` last produced there.
    pub fn reset_context(&mut self) {
        let state = &mut *self.state;
        state.context.clear();
        state
            .context
            .extend(state.linear.iter().map(|frame| ContextFrame { path: frame.path.clone(), at: frame.next as isize - 1 }));
        state.level = state.context.len().checked_sub(1);
        state.stale = false;
    }

    /// Look up a neighbor along `direction`.
    pub fn navigate(&mut self, direction: Direction) -> Option<&'f Module<V>> {
        if direction.from_origin {
            self.reset_context();
        }
        match direction.axis {
            Axis::PreviousSiblingOrParent => self.previous_sibling_or_parent(),
            Axis::PreviousSibling => self.previous_sibling(),
            Axis::NextSibling => self.next_sibling(),
            Axis::Child => self.child(),
            Axis::Parent => self.parent(),
        }
    }

    pub fn previous_sibling(&mut self) -> Option<&'f Module<V>> {
        self.refresh();
        let level = self.state.level?;
        while let Some(element) = self.retreat(level) {
            if let Some(module) = self.candidate(element) {
                return Some(module);
            }
        }
        None
    }

    pub fn next_sibling(&mut self) -> Option<&'f Module<V>> {
        self.refresh();
        let level = self.state.level?;
        while let Some(element) = self.advance(level) {
            if let Some(module) = self.candidate(element) {
                return Some(module);
            }
        }
        None
    }

    /// Scan left; when a level runs out, continue in the enclosing level.
    pub fn previous_sibling_or_parent(&mut self) -> Option<&'f Module<V>> {
        self.refresh();
        while let Some(level) = self.state.level {
            while let Some(element) = self.retreat(level) {
                if let Some(module) = self.candidate(element) {
                    return Some(module);
                }
            }
            self.state.level = level.checked_sub(1);
        }
        None
    }

    /// The module a branch hangs off, stepping over sibling branches.
    ///
    /// Returns `None` when the nearest module to the left sits in the same
    /// level without a branch in between (it is a sibling, not a parent).
    pub fn parent(&mut self) -> Option<&'f Module<V>> {
        self.refresh();
        let mut crossed_branch = false;
        while let Some(level) = self.state.level {
            while let Some(element) = self.retreat(level) {
                match element {
                    Element::Branch(_) => crossed_branch = true,
                    Element::Leaf(module) if self.is_ignored(module) => {}
                    Element::Leaf(module) => return crossed_branch.then_some(module),
                }
            }
            crossed_branch = true;
            self.state.level = level.checked_sub(1);
        }
        None
    }

    /// Descend into the branch that follows the focus and return its first
    /// module. The branch becomes the new context level.
    pub fn child(&mut self) -> Option<&'f Module<V>> {
        self.refresh();
        let level = self.state.level?;
        loop {
            match self.advance(level)? {
                Element::Branch(_) => break,
                Element::Leaf(module) if self.is_ignored(module) => {}
                Element::Leaf(_) => return None,
            }
        }

        let state = &mut *self.state;
        let focus = &state.context[level];
        let mut path = focus.path.clone();
        path.push(focus.at as usize);
        state.context.truncate(level + 1);
        state.context.push(ContextFrame { path, at: -1 });
        state.level = Some(level + 1);

        while let Some(element) = self.advance(level + 1) {
            if let Some(module) = self.candidate(element) {
                return Some(module);
            }
        }
        None
    }

    fn refresh(&mut self) {
        if self.state.stale {
            self.reset_context();
        }
    }

    fn retreat(&mut self, level: usize) -> Option<&'f Element<V>> {
        let frame = &mut self.state.context[level];
        if frame.at <= 0 {
            frame.at = -1;
            return None;
        }
        frame.at -= 1;
        slice_at(self.forest, &frame.path).get(frame.at as usize)
    }

    fn advance(&mut self, level: usize) -> Option<&'f Element<V>> {
        let frame = &mut self.state.context[level];
        let items = slice_at(self.forest, &frame.path);
        let next = frame.at + 1;
        if next as usize >= items.len() {
            frame.at = items.len() as isize;
            return None;
        }
        frame.at = next;
        items.get(next as usize)
    }

    fn is_ignored(&self, module: &Module<V>) -> bool {
        self.ignore.contains(module.id.as_str())
    }

    /// Modules that context matching may land on: not a branch, not ignored.
    fn candidate(&self, element: &'f Element<V>) -> Option<&'f Module<V>> {
        match element {
            Element::Leaf(module) if !self.is_ignored(module) => Some(module),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(visits: Vec<Visit<'_, ()>>) -> Vec<String> {
        visits.iter().map(|v| v.symbol().to_string()).collect()
    }

    fn walk(forest: &Forest<()>) -> Vec<String> {
        let ignore = HashSet::new();
        let mut state = TreeCursor::new();
        let mut cursor = state.over(forest, &ignore);
        let mut visits = Vec::new();
        while cursor.has_next() {
            visits.push(cursor.next());
        }
        ids(visits)
    }

    /// Advance until `next` yields the module `id` (first occurrence).
    fn seek<'s, 'f>(cursor: &mut Cursor<'s, 'f, ()>, id: &str) {
        while cursor.has_next() {
            if let Visit::Module(m) = cursor.next() {
                if m.id == id {
                    return;
                }
            }
        }
        panic!("module {id} not found");
    }

    fn id_of(module: Option<&Module<()>>) -> Option<&str> {
        module.map(|m| m.id.as_str())
    }

    #[test]
    fn linear_traversal_emits_branch_markers() {
        let forest = forest![module!("A"), branch![module!("B"), branch![module!("C")]], module!("D")];
        assert_eq!(walk(&forest), vec!["A", "[", "B", "[", "C", "]", "]", "D"]);
    }

    #[test]
    fn trailing_branch_closes_before_exhaustion() {
        let forest = forest![module!("A"), branch![module!("B")]];
        assert_eq!(walk(&forest), vec!["A", "[", "B", "]"]);
    }

    #[test]
    fn empty_forest_has_nothing_to_visit() {
        let forest: Forest<()> = Vec::new();
        assert!(walk(&forest).is_empty());
        let empty_branch = forest![branch![]];
        assert_eq!(walk(&empty_branch), vec!["[", "]"]);
    }

    #[test]
    #[should_panic(expected = "past the end")]
    fn next_on_exhausted_cursor_panics() {
        let forest: Forest<()> = forest![module!("A")];
        let ignore = HashSet::new();
        let mut state = TreeCursor::new();
        let mut cursor = state.over(&forest, &ignore);
        cursor.next();
        cursor.next();
    }

    #[test]
    fn explicit_bracket_modules_are_plain_modules() {
        let forest = forest![module!("A"), module!("["), module!("B"), module!("]")];
        assert_eq!(walk(&forest), vec!["A", "[", "B", "]"]);
        let ignore = HashSet::new();
        let mut state = TreeCursor::new();
        let mut cursor = state.over(&forest, &ignore);
        seek(&mut cursor, "B");
        cursor.reset_context();
        assert_eq!(id_of(cursor.previous_sibling()), Some("["));
    }

    #[test]
    fn sibling_lookups_round_trip_through_reset() {
        let forest = forest![module!("A"), module!("B"), module!("C")];
        let ignore = HashSet::new();
        let mut state = TreeCursor::new();
        let mut cursor = state.over(&forest, &ignore);
        seek(&mut cursor, "B");

        for resets in 1..4 {
            for _ in 0..resets {
                cursor.reset_context();
            }
            assert_eq!(id_of(cursor.previous_sibling()), Some("A"));
            for _ in 0..resets {
                cursor.reset_context();
            }
            assert_eq!(id_of(cursor.next_sibling()), Some("C"));
        }
    }

    #[test]
    fn sibling_lookups_stop_at_boundaries() {
        let forest = forest![module!("A"), module!("B")];
        let ignore = HashSet::new();
        let mut state = TreeCursor::new();
        let mut cursor = state.over(&forest, &ignore);
        seek(&mut cursor, "A");
        cursor.reset_context();
        assert_eq!(id_of(cursor.previous_sibling()), None);
        cursor.reset_context();
        assert_eq!(id_of(cursor.next_sibling()), Some("B"));
        assert_eq!(id_of(cursor.next_sibling()), None);
    }

    #[test]
    fn context_navigation_does_not_disturb_traversal() {
        let forest = forest![module!("A"), branch![module!("B")], module!("C")];
        let ignore = HashSet::new();
        let mut state = TreeCursor::new();
        let mut cursor = state.over(&forest, &ignore);
        seek(&mut cursor, "B");
        cursor.reset_context();
        assert_eq!(id_of(cursor.previous_sibling_or_parent()), Some("A"));
        assert_eq!(id_of(cursor.previous_sibling_or_parent()), None);
        assert_eq!(cursor.next().symbol(), "]");
        assert_eq!(cursor.next().symbol(), "C");
        assert!(!cursor.has_next());
    }

    #[test]
    fn siblings_skip_branches_and_ignored_symbols() {
        let forest = forest![module!("A"), module!("+"), branch![module!("X")], module!("B")];
        let ignore: HashSet<Symbol> = [Symbol::from("+")].into_iter().collect();
        let mut state = TreeCursor::new();
        let mut cursor = state.over(&forest, &ignore);
        seek(&mut cursor, "B");
        cursor.reset_context();
        assert_eq!(id_of(cursor.previous_sibling()), Some("A"));
    }

    #[test]
    fn parent_steps_over_sibling_branches() {
        let forest = forest![module!("A"), branch![module!("B")], branch![module!("C"), module!("D")]];
        let ignore = HashSet::new();
        let mut state = TreeCursor::new();
        let mut cursor = state.over(&forest, &ignore);

        seek(&mut cursor, "C");
        cursor.reset_context();
        assert_eq!(id_of(cursor.parent()), Some("A"));

        seek(&mut cursor, "D");
        cursor.reset_context();
        // C is a sibling of D, not its parent.
        assert_eq!(id_of(cursor.parent()), None);
    }

    #[test]
    fn parent_of_top_level_module_is_none() {
        let forest = forest![module!("A"), module!("B")];
        let ignore = HashSet::new();
        let mut state = TreeCursor::new();
        let mut cursor = state.over(&forest, &ignore);
        seek(&mut cursor, "A");
        cursor.reset_context();
        assert_eq!(id_of(cursor.parent()), None);
        seek(&mut cursor, "B");
        cursor.reset_context();
        assert_eq!(id_of(cursor.parent()), None);
    }

    #[test]
    fn child_descends_into_following_branch() {
        let forest = forest![module!("A"), branch![module!("B"), module!("C")], module!("D")];
        let ignore = HashSet::new();
        let mut state = TreeCursor::new();
        let mut cursor = state.over(&forest, &ignore);
        seek(&mut cursor, "A");
        cursor.reset_context();
        assert_eq!(id_of(cursor.child()), Some("B"));
        // The branch is now the context level.
        assert_eq!(id_of(cursor.next_sibling()), Some("C"));

        seek(&mut cursor, "D");
        cursor.reset_context();
        assert_eq!(id_of(cursor.child()), None);
    }

    #[test]
    fn parent_and_child_skip_ignored_leaves() {
        let forest = forest![
            module!("A"),
            module!("+"),
            branch![module!("+"), module!("B"), module!("C")],
            module!("D"),
            module!("E"),
            branch![module!("F")]
        ];
        let ignore: HashSet<Symbol> = [Symbol::from("+")].into_iter().collect();
        let mut state = TreeCursor::new();
        let mut cursor = state.over(&forest, &ignore);

        seek(&mut cursor, "A");
        cursor.reset_context();
        assert_eq!(id_of(cursor.child()), Some("B"));

        seek(&mut cursor, "B");
        cursor.reset_context();
        assert_eq!(id_of(cursor.parent()), Some("A"));

        seek(&mut cursor, "C");
        cursor.reset_context();
        assert_eq!(id_of(cursor.parent()), None);

        // E is not ignored, so D has no branch of its own.
        seek(&mut cursor, "D");
        cursor.reset_context();
        assert_eq!(id_of(cursor.child()), None);

        seek(&mut cursor, "F");
        cursor.reset_context();
        assert_eq!(id_of(cursor.parent()), Some("E"));
    }

    #[test]
    fn dotted_direction_restarts_from_origin() {
        let forest = forest![module!("A"), module!("B"), module!("C")];
        let ignore = HashSet::new();
        let mut state = TreeCursor::new();
        let mut cursor = state.over(&forest, &ignore);
        seek(&mut cursor, "B");
        cursor.reset_context();
        let back = Direction::parse("<").unwrap();
        let ahead = Direction::parse(">").unwrap();
        let ahead_from_origin = Direction::parse(".>").unwrap();
        assert_eq!(id_of(cursor.navigate(back)), Some("A"));
        // Without the dot the focus is still on A.
        assert_eq!(id_of(cursor.navigate(ahead)), Some("B"));
        cursor.reset_context();
        assert_eq!(id_of(cursor.navigate(back)), Some("A"));
        assert_eq!(id_of(cursor.navigate(ahead_from_origin)), Some("C"));
    }

    #[test]
    fn direction_parsing() {
        assert_eq!(Direction::parse("^"), Some(Direction { axis: Axis::PreviousSiblingOrParent, from_origin: false }));
        assert_eq!(Direction::parse(".]"), Some(Direction { axis: Axis::Parent, from_origin: true }));
        assert_eq!(Direction::parse(".["), Some(Direction { axis: Axis::Child, from_origin: true }));
        assert_eq!(Direction::parse(""), None);
        assert_eq!(Direction::parse(".."), None);
        assert_eq!(Direction::parse("<>"), None);
    }
}
