//! Flattened, lazily expanded rows of one explorer tree.

use ratatui::widgets::ListState;

use canopy_explorer::{Collapsible, TreeItem, TreeSource};

#[derive(Debug, Clone)]
pub struct Row<N> {
    pub id: u64,
    pub depth: usize,
    pub node: N,
    pub item: TreeItem,
    pub expanded: bool,
    pub loading: bool,
}

impl<N> Row<N> {
    pub fn is_expandable(&self) -> bool {
        self.item.collapsible != Collapsible::None
    }
}

#[derive(Debug)]
pub struct TreeView<N> {
    rows: Vec<Row<N>>,
    next_id: u64,
    pub list_state: ListState,
    /// Roots have been listed at least once.
    pub loaded: bool,
}

impl<N: TreeSource> Default for TreeView<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: TreeSource> TreeView<N> {
    pub fn new() -> Self {
        TreeView {
            rows: Vec::new(),
            next_id: 0,
            list_state: ListState::default(),
            loaded: false,
        }
    }

    pub fn rows(&self) -> &[Row<N>] {
        &self.rows
    }

    fn make_row(&mut self, node: N, depth: usize) -> Row<N> {
        self.next_id += 1;
        Row {
            id: self.next_id,
            depth,
            item: node.get_tree_item(),
            node,
            expanded: false,
            loading: false,
        }
    }

    /// Replaces the whole tree with fresh roots, keeping the selection index in range.
    pub fn set_roots(&mut self, nodes: Vec<N>) {
        let rows: Vec<_> = nodes.into_iter().map(|n| self.make_row(n, 0)).collect();
        self.rows = rows;
        self.loaded = true;
        self.clamp_selection();
    }

    pub fn position(&self, id: u64) -> Option<usize> {
        self.rows.iter().position(|row| row.id == id)
    }

    /// Index one past the last descendant of the row at `idx`.
    fn subtree_end(&self, idx: usize) -> usize {
        let depth = self.rows[idx].depth;
        self.rows[idx + 1..]
            .iter()
            .position(|row| row.depth <= depth)
            .map_or(self.rows.len(), |offset| idx + 1 + offset)
    }

    pub fn mark_loading(&mut self, id: u64) -> bool {
        match self.position(id) {
            Some(idx) if self.rows[idx].is_expandable() => {
                self.rows[idx].loading = true;
                true
            }
            _ => false,
        }
    }

    /// Installs freshly listed children under row `id`, replacing earlier ones.
    ///
    /// Returns false when the row vanished in the meantime.
    pub fn set_children(&mut self, id: u64, nodes: Vec<N>) -> bool {
        let Some(idx) = self.position(id) else {
            return false;
        };
        let depth = self.rows[idx].depth + 1;
        let end = self.subtree_end(idx);
        let children: Vec<_> = nodes.into_iter().map(|n| self.make_row(n, depth)).collect();
        self.rows.splice(idx + 1..end, children);
        self.rows[idx].expanded = true;
        self.rows[idx].loading = false;
        self.clamp_selection();
        true
    }

    pub fn collapse(&mut self, id: u64) {
        let Some(idx) = self.position(id) else {
            return;
        };
        let end = self.subtree_end(idx);
        self.rows.drain(idx + 1..end);
        self.rows[idx].expanded = false;
        self.rows[idx].loading = false;
        if self.list_state.selected().is_some_and(|sel| sel > idx && sel < end) {
            self.list_state.select(Some(idx));
        }
        self.clamp_selection();
    }

    /// Expanded rows showing the same node as `node`; their children need relisting.
    pub fn expanded_matching(&self, node: &N) -> Vec<u64> {
        self.rows
            .iter()
            .filter(|row| {
                row.expanded && row.node.name() == node.name() && row.node.path() == node.path()
            })
            .map(|row| row.id)
            .collect()
    }

    pub fn selected(&self) -> Option<&Row<N>> {
        self.list_state.selected().and_then(|idx| self.rows.get(idx))
    }

    pub fn parent_of(&self, id: u64) -> Option<u64> {
        let idx = self.position(id)?;
        let depth = self.rows[idx].depth;
        self.rows[..idx]
            .iter()
            .rev()
            .find(|row| row.depth < depth)
            .map(|row| row.id)
    }

    pub fn select_id(&mut self, id: u64) {
        if let Some(idx) = self.position(id) {
            self.list_state.select(Some(idx));
        }
    }

    pub fn select_next(&mut self) {
        if self.rows.is_empty() {
            return;
        }
        let next = self
            .list_state
            .selected()
            .map_or(0, |idx| (idx + 1).min(self.rows.len() - 1));
        self.list_state.select(Some(next));
    }

    pub fn select_previous(&mut self) {
        if self.rows.is_empty() {
            return;
        }
        let previous = self
            .list_state
            .selected()
            .map_or(0, |idx| idx.saturating_sub(1));
        self.list_state.select(Some(previous));
    }

    fn clamp_selection(&mut self) {
        if self.rows.is_empty() {
            self.list_state.select(None);
            return;
        }
        let idx = self
            .list_state
            .selected()
            .unwrap_or(0)
            .min(self.rows.len() - 1);
        self.list_state.select(Some(idx));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use canopy_explorer::{BackendError, Document};

    #[derive(Debug, Clone)]
    struct Fake {
        path: String,
        leaf: bool,
    }

    fn dir(path: &str) -> Fake {
        Fake {
            path: path.to_owned(),
            leaf: false,
        }
    }

    fn file(path: &str) -> Fake {
        Fake {
            path: path.to_owned(),
            leaf: true,
        }
    }

    #[async_trait]
    impl TreeSource for Fake {
        fn name(&self) -> &str {
            &self.path
        }

        fn path(&self) -> &str {
            &self.path
        }

        async fn get_children(&self) -> Vec<Self> {
            Vec::new()
        }

        fn get_tree_item(&self) -> TreeItem {
            TreeItem::new(self.path.clone(), self.leaf)
        }

        async fn fetch(&self) -> Result<Option<Document>, BackendError> {
            Ok(None)
        }
    }

    fn paths(view: &TreeView<Fake>) -> Vec<(usize, &str)> {
        view.rows()
            .iter()
            .map(|row| (row.depth, row.node.path()))
            .collect()
    }

    #[test]
    fn expanding_inserts_children_below_the_parent() {
        let mut view = TreeView::new();
        view.set_roots(vec![dir("a"), dir("b")]);
        let a = view.rows()[0].id;

        assert!(view.mark_loading(a));
        assert!(view.rows()[0].loading);
        assert!(view.set_children(a, vec![dir("a/x"), file("a/y")]));
        let x = view.rows()[1].id;
        assert!(view.set_children(x, vec![file("a/x/1")]));

        assert_eq!(
            paths(&view),
            vec![(0, "a"), (1, "a/x"), (2, "a/x/1"), (1, "a/y"), (0, "b")]
        );
        assert!(!view.rows()[0].loading);
        assert_eq!(view.parent_of(view.rows()[2].id), Some(x));
        assert_eq!(view.parent_of(a), None);
    }

    #[test]
    fn relisting_replaces_previous_children() {
        let mut view = TreeView::new();
        view.set_roots(vec![dir("a"), dir("b")]);
        let a = view.rows()[0].id;
        view.set_children(a, vec![dir("a/x")]);
        let x = view.rows()[1].id;
        view.set_children(x, vec![file("a/x/1")]);

        view.set_children(a, vec![file("a/z")]);
        assert_eq!(paths(&view), vec![(0, "a"), (1, "a/z"), (0, "b")]);
        assert!(!view.set_children(x, vec![file("gone")]));
    }

    #[test]
    fn collapse_removes_descendants_and_moves_selection() {
        let mut view = TreeView::new();
        view.set_roots(vec![dir("a"), dir("b")]);
        let a = view.rows()[0].id;
        view.set_children(a, vec![file("a/1"), file("a/2")]);
        view.list_state.select(Some(2));

        view.collapse(a);
        assert_eq!(paths(&view), vec![(0, "a"), (0, "b")]);
        assert!(!view.rows()[0].expanded);
        assert_eq!(view.list_state.selected(), Some(0));
    }

    #[test]
    fn leaves_never_load() {
        let mut view = TreeView::new();
        view.set_roots(vec![file("k")]);
        let k = view.rows()[0].id;
        assert!(!view.mark_loading(k));
    }

    #[test]
    fn stale_node_maps_to_expanded_rows() {
        let mut view = TreeView::new();
        view.set_roots(vec![dir("a"), dir("b")]);
        let a = view.rows()[0].id;
        view.set_children(a, vec![file("a/1")]);

        assert_eq!(view.expanded_matching(&dir("a")), vec![a]);
        assert!(view.expanded_matching(&dir("b")).is_empty());
    }

    #[test]
    fn selection_stays_in_bounds() {
        let mut view: TreeView<Fake> = TreeView::new();
        view.select_next();
        assert_eq!(view.list_state.selected(), None);

        view.set_roots(vec![dir("a"), dir("b")]);
        assert_eq!(view.list_state.selected(), Some(0));
        view.select_next();
        view.select_next();
        assert_eq!(view.list_state.selected(), Some(1));
        view.select_previous();
        view.select_previous();
        assert_eq!(view.list_state.selected(), Some(0));

        view.list_state.select(Some(1));
        view.set_roots(vec![dir("only")]);
        assert_eq!(view.list_state.selected(), Some(0));
        view.set_roots(Vec::new());
        assert_eq!(view.list_state.selected(), None);
    }
}
