use std::{collections::VecDeque, fmt};

use crate::{AvlTree, NodeHandle};

impl<T: fmt::Display> AvlTree<T> {
    /// Writes one line per node in level order.
    ///
    /// Each line is indented by the node's depth, using `..` for a left child and `**` for a right
    /// child, and shows the node's key, height and count.
    pub fn write_breadth_first<W: fmt::Write>(&self, mut w: W) -> fmt::Result {
        for node in self.breadth_first() {
            let mut depth = 0;
            let mut opt_cur = node.parent();
            while let Some(cur) = opt_cur {
                depth += 1;
                opt_cur = self.links(cur).parent();
            }

            let marker = match node.parent() {
                Some(parent) if self.links(parent).left() == Some(node.handle()) => "..",
                Some(_) => "**",
                None => "",
            };

            writeln!(
                w,
                "{indent}{key:>10}\theight: {height}\tcount: {count}",
                indent = marker.repeat(depth),
                key = node.key(),
                height = node.height(),
                count = node.count(),
            )?;
        }

        Ok(())
    }

    /// Writes a Graphviz rendering of the tree.
    ///
    /// Vertices are named after node handles, so equal keys render as distinct vertices.
    pub fn dotgraph<W: fmt::Write>(&self, name: &str, mut w: W) -> fmt::Result {
        let root = match self.root {
            Some(r) => r,
            None => return write!(w, "digraph \"graph-{name}\" {{}}"),
        };

        enum Item {
            Node(NodeHandle),
            Missing(u32),
        }

        let mut queue = VecDeque::new();
        queue.push_back(Item::Node(root));

        write!(
            w,
            "digraph \"graph-{name}\" {{\n subgraph \"subgraph-{name}\" {{"
        )?;

        let mut missing = 0;
        let mut edges = String::new();

        while !queue.is_empty() {
            use fmt::Write;

            write!(w, "{{rank=same; ")?;

            for _ in 0..queue.len() {
                let Some(item) = queue.pop_front() else {
                    break;
                };

                let node = match item {
                    Item::Node(node) => node,
                    Item::Missing(id) => {
                        write!(w, "\"graph{name}-missing{id}\" [shape=point]; ")?;
                        continue;
                    }
                };

                let id = node.index();
                let links = self.links(node);
                let key = &self.nodes[node].key;
                write!(
                    w,
                    "\"graph{name}-{id}\" [label=\"{key} {}:{}\"]; ",
                    links.height, links.count
                )?;

                for child in [links.left(), links.right()] {
                    match child {
                        Some(child) => {
                            writeln!(
                                edges,
                                "\"graph{name}-{id}\" -> \"graph{name}-{}\";",
                                child.index()
                            )?;
                            queue.push_back(Item::Node(child));
                        }
                        None => {
                            writeln!(
                                edges,
                                "\"graph{name}-{id}\" -> \"graph{name}-missing{missing}\";"
                            )?;
                            queue.push_back(Item::Missing(missing));
                            missing += 1;
                        }
                    }
                }
            }

            writeln!(w, "}}")?;
        }

        w.write_str(&edges)?;

        w.write_str(" }\n}")
    }
}
