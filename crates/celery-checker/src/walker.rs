//! Pre-order traversal of a tree's body structure.
//!
//! [`travel`] visits a node, then each of its body children in order,
//! depth first. Argument values are not walked; the checker inspects those
//! itself. The first visit that fails stops the walk.

use celery_types::NodeRef;

/// Visit `root` and every node reachable through `body`, pre-order.
pub fn travel<'t, E>(
    root: NodeRef<'t>,
    mut visit: impl FnMut(NodeRef<'t>) -> Result<(), E>,
) -> Result<(), E> {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        visit(node)?;
        stack.extend(node.body().rev());
    }
    Ok(())
}
