use std::collections::{HashMap, HashSet, VecDeque};

use anyhow::{Result, bail};

use crate::dsl::NodeTree;

pub fn topo_sort(tree: &NodeTree) -> Result<Vec<String>> {
    let mut indeg: HashMap<&str, usize> = tree
        .nodes
        .iter()
        .map(|n| (n.id.as_str(), 0usize))
        .collect();

    let mut outgoing: HashMap<&str, Vec<&str>> = HashMap::new();
    for c in &tree.connections {
        let Some(d) = indeg.get_mut(c.to.node_id.as_str()) else {
            bail!(
                "connection references missing node: {} -> {}",
                c.from.node_id,
                c.to.node_id
            );
        };
        *d += 1;
        if !indeg.contains_key(c.from.node_id.as_str()) {
            bail!(
                "connection references missing node: {} -> {}",
                c.from.node_id,
                c.to.node_id
            );
        }
        outgoing
            .entry(c.from.node_id.as_str())
            .or_default()
            .push(c.to.node_id.as_str());
    }

    // Seed in document order so the result is reproducible.
    let mut q: VecDeque<&str> = tree
        .nodes
        .iter()
        .map(|n| n.id.as_str())
        .filter(|id| indeg.get(id) == Some(&0))
        .collect();
    let mut order: Vec<String> = Vec::with_capacity(tree.nodes.len());

    while let Some(n) = q.pop_front() {
        order.push(n.to_string());
        if let Some(nexts) = outgoing.get(n) {
            for m in nexts {
                if let Some(entry) = indeg.get_mut(m) {
                    *entry -= 1;
                    if *entry == 0 {
                        q.push_back(m);
                    }
                }
            }
        }
    }

    if order.len() != tree.nodes.len() {
        bail!("cycle detected in node tree (cannot topologically sort)");
    }
    Ok(order)
}

/// Checks the preconditions the compiler relies on: every link joins an
/// existing output socket to an existing input socket, no input carries two
/// links, and the tree is acyclic.
pub fn validate_tree(tree: &NodeTree) -> Result<()> {
    let mut seen_inputs: HashSet<(&str, &str)> = HashSet::new();
    for c in &tree.connections {
        let Some(from) = tree.node(&c.from.node_id) else {
            bail!("connection {} starts at missing node '{}'", c.id, c.from.node_id);
        };
        let Some(to) = tree.node(&c.to.node_id) else {
            bail!("connection {} ends at missing node '{}'", c.id, c.to.node_id);
        };
        if from.output_by_id(&c.from.port_id).is_none() {
            bail!(
                "connection {} starts at missing output '{}.{}'",
                c.id,
                from.id,
                c.from.port_id
            );
        }
        if to.input_by_id(&c.to.port_id).is_none() {
            bail!(
                "connection {} ends at missing input '{}.{}'",
                c.id,
                to.id,
                c.to.port_id
            );
        }
        if !seen_inputs.insert((c.to.node_id.as_str(), c.to.port_id.as_str())) {
            bail!(
                "input '{}.{}' has more than one incoming link",
                c.to.node_id,
                c.to.port_id
            );
        }
    }
    topo_sort(tree)?;
    Ok(())
}
