//! The mode graph (§3, §4.1, §4.2): a flat table of statically enumerated
//! nodes, each with a keybinding map and a *mutable* parent slot. Binding
//! resolution is an explicit walk up the parent chain rather than trait
//! inheritance, per the design note in §9 ("model as a flat table of nodes
//! each holding an index into a mutable `parent` slot").
//!
//! Only `OPERATOR`'s parent is ever retargeted at runtime (§4.2); every
//! other edge is fixed for the life of the graph.

use std::collections::HashMap;
use std::rc::Rc;

use crate::editor::Editor;

/// The statically enumerated mode nodes (§3's mode diagram).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModeId {
    Basic,
    Move,
    Operator,
    OperatorOption,
    TextObj,
    Normal,
    Visual,
    VisualLine,
    Readline,
    Prompt,
    Insert,
    Replace,
}

impl ModeId {
    pub const ALL: [ModeId; 12] = [
        ModeId::Basic,
        ModeId::Move,
        ModeId::Operator,
        ModeId::OperatorOption,
        ModeId::TextObj,
        ModeId::Normal,
        ModeId::Visual,
        ModeId::VisualLine,
        ModeId::Readline,
        ModeId::Prompt,
        ModeId::Insert,
        ModeId::Replace,
    ];

    /// `isuser` (§3 invariant): modes a person perceives as "the current
    /// mode", as opposed to transient parse states (`OPERATOR`,
    /// `OPERATOR_OPTION`, `TEXTOBJ`, `MOVE`, `BASIC`, `READLINE`).
    pub fn is_user(self) -> bool {
        matches!(
            self,
            ModeId::Normal
                | ModeId::Visual
                | ModeId::VisualLine
                | ModeId::Insert
                | ModeId::Replace
                | ModeId::Prompt
        )
    }

    pub fn is_visual(self) -> bool {
        matches!(self, ModeId::Visual | ModeId::VisualLine)
    }

    /// The static parent edge (§3's mode diagram, read right-to-left as
    /// "child ← parent"). `OPERATOR`'s parent is the one dynamic edge; its
    /// static value here is the "leave" target (`MOVE`).
    fn static_parent(self) -> Option<ModeId> {
        match self {
            ModeId::Basic => None,
            ModeId::Move => Some(ModeId::Basic),
            ModeId::Operator => Some(ModeId::Move),
            ModeId::TextObj => Some(ModeId::Move),
            ModeId::OperatorOption => Some(ModeId::TextObj),
            ModeId::Normal => Some(ModeId::Operator),
            ModeId::Visual => Some(ModeId::Move),
            ModeId::VisualLine => Some(ModeId::Visual),
            ModeId::Readline => Some(ModeId::Basic),
            ModeId::Prompt => Some(ModeId::Readline),
            ModeId::Insert => Some(ModeId::Readline),
            ModeId::Replace => Some(ModeId::Insert),
        }
    }
}

/// Either a bound action (invoked with the unconsumed remainder of the
/// input buffer, returning the new remainder — §4.1) or an alias (a
/// keystring substituted back into the parse stream).
#[derive(Clone)]
pub enum Binding {
    Action(ActionFn),
    Alias(String),
}

/// `(editor, remainder) -> new remainder`. Most actions consume nothing
/// extra and return `remainder` unchanged; a find-char or replace-char
/// action consumes the next key(s) out of it.
pub type ActionFn = Rc<dyn Fn(&mut Editor, &str) -> String>;

#[derive(Default)]
struct ModeNode {
    bindings: HashMap<String, Binding>,
}

pub enum Resolution {
    Exact(Binding),
    Prefix,
    None,
}

/// The mode graph proper: static nodes, their (mostly static) keybinding
/// tables, and the one mutable parent slot for `OPERATOR`.
pub struct ModeGraph {
    nodes: HashMap<ModeId, ModeNode>,
    /// Dynamic retargeting of `OPERATOR`'s parent (§4.2). Always one of
    /// `Move` (default), `OperatorOption`, or `TextObj`.
    operator_parent: ModeId,
}

impl ModeGraph {
    pub fn new() -> Self {
        let mut nodes = HashMap::new();
        for id in ModeId::ALL {
            nodes.insert(id, ModeNode::default());
        }
        Self {
            nodes,
            operator_parent: ModeId::Move,
        }
    }

    pub fn bind(&mut self, mode: ModeId, key: impl Into<String>, binding: Binding) {
        self.nodes.get_mut(&mode).unwrap().bindings.insert(key.into(), binding);
    }

    pub fn bind_action(&mut self, mode: ModeId, key: impl Into<String>, action: ActionFn) {
        self.bind(mode, key, Binding::Action(action));
    }

    pub fn bind_alias(&mut self, mode: ModeId, key: impl Into<String>, alias: impl Into<String>) {
        self.bind(mode, key, Binding::Alias(alias.into()));
    }

    pub fn parent_of(&self, id: ModeId) -> Option<ModeId> {
        if id == ModeId::Operator {
            Some(self.operator_parent)
        } else {
            id.static_parent()
        }
    }

    /// Retargets `OPERATOR`'s parent (§4.2 hook duties). Called by
    /// `Editor::set_mode` on `OPERATOR.enter`/`.leave` and on
    /// `VISUAL*.enter`/`.leave`.
    pub fn set_operator_parent(&mut self, parent: ModeId) {
        self.operator_parent = parent;
    }

    pub fn operator_parent(&self) -> ModeId {
        self.operator_parent
    }

    /// Resolves `prefix` against the mode chain starting at `current`
    /// (§4.1): an exact match at the innermost mode that has one wins; else
    /// a prefix match anywhere in the chain keeps the parser waiting; else
    /// there is no match at all.
    pub fn resolve(&self, current: ModeId, prefix: &str) -> Resolution {
        let mut node = Some(current);
        let mut saw_prefix = false;
        while let Some(id) = node {
            let bindings = &self.nodes[&id].bindings;
            if let Some(binding) = bindings.get(prefix) {
                return Resolution::Exact(binding.clone());
            }
            if bindings.keys().any(|k| k.len() > prefix.len() && k.starts_with(prefix)) {
                saw_prefix = true;
            }
            node = self.parent_of(id);
        }
        if saw_prefix {
            Resolution::Prefix
        } else {
            Resolution::None
        }
    }
}

impl Default for ModeGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> ActionFn {
        Rc::new(|_editor, rest| rest.to_string())
    }

    #[test]
    fn exact_match_at_innermost_mode() {
        let mut g = ModeGraph::new();
        g.bind_action(ModeId::Normal, "x", noop());
        match g.resolve(ModeId::Normal, "x") {
            Resolution::Exact(_) => {}
            _ => panic!("expected exact match"),
        }
    }

    #[test]
    fn falls_through_to_parent_chain() {
        let mut g = ModeGraph::new();
        g.bind_action(ModeId::Move, "h", noop());
        match g.resolve(ModeId::Normal, "h") {
            Resolution::Exact(_) => {}
            _ => panic!("expected a binding inherited via the parent chain"),
        }
    }

    #[test]
    fn prefix_state_when_only_longer_key_exists() {
        let mut g = ModeGraph::new();
        g.bind_action(ModeId::Normal, "gg", noop());
        match g.resolve(ModeId::Normal, "g") {
            Resolution::Prefix => {}
            _ => panic!("expected a prefix state"),
        }
    }

    #[test]
    fn none_when_nothing_matches() {
        let g = ModeGraph::new();
        match g.resolve(ModeId::Normal, "Q") {
            Resolution::None => {}
            _ => panic!("expected no match"),
        }
    }

    #[test]
    fn dynamic_operator_reparenting() {
        let mut g = ModeGraph::new();
        assert_eq!(g.parent_of(ModeId::Operator), Some(ModeId::Move));
        g.set_operator_parent(ModeId::OperatorOption);
        assert_eq!(g.parent_of(ModeId::Operator), Some(ModeId::OperatorOption));
        g.bind_action(ModeId::TextObj, "iw", noop());
        g.set_operator_parent(ModeId::TextObj);
        match g.resolve(ModeId::Operator, "iw") {
            Resolution::Exact(_) => {}
            _ => panic!("text-objects should resolve through the retargeted parent"),
        }
    }
}
