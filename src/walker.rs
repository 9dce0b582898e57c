use crate::composed::{TreeView, composed_children};

/// Lazy depth-first, pre-order cursor over the composed tree below a context
/// node. The context itself is never produced; it is the search root, not a
/// result. The walk is single-use; restart by constructing a new walker over
/// the same context.
pub struct TreeWalker<'view, T: TreeView> {
    view: &'view T,
    stack: Vec<T::Node>,
}

impl<'view, T: TreeView> TreeWalker<'view, T> {
    pub fn new(view: &'view T, context: T::Node) -> Self {
        let mut walker = Self {
            view,
            stack: vec![context],
        };
        walker.advance();
        walker
    }

    fn advance(&mut self) -> Option<T::Node> {
        let node = self.stack.pop()?;
        let children = composed_children(self.view, node);
        // reversed, so the next pop yields the first child
        for child in children.into_iter().rev() {
            self.stack.push(child);
        }
        Some(node)
    }
}

impl<'view, T: TreeView> Iterator for TreeWalker<'view, T> {
    type Item = T::Node;

    fn next(&mut self) -> Option<T::Node> {
        self.advance()
    }
}
