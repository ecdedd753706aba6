//! Tree display utilities for logical plans.

use std::fmt;

/// A node in a display tree.
pub trait TreeNode {
    /// Get the display label of this node.
    fn label(&self) -> String;

    /// Get child nodes.
    fn children(&self) -> Vec<&dyn TreeNode>;

    /// Get additional details to display.
    fn details(&self) -> Option<String> {
        None
    }
}

/// Helper for displaying tree structures.
pub struct DisplayTree<'a> {
    root: &'a dyn TreeNode,
}

impl<'a> DisplayTree<'a> {
    /// Create a new display tree.
    pub fn new(root: &'a dyn TreeNode) -> Self {
        Self { root }
    }

    fn write_line(f: &mut fmt::Formatter<'_>, node: &dyn TreeNode) -> fmt::Result {
        write!(f, "{}", node.label())?;
        if let Some(details) = node.details() {
            write!(f, " ({details})")?;
        }
        writeln!(f)
    }

    fn fmt_node(
        f: &mut fmt::Formatter<'_>,
        node: &dyn TreeNode,
        prefix: &str,
        is_last: bool,
    ) -> fmt::Result {
        let connector = if is_last { "└─ " } else { "├─ " };
        write!(f, "{prefix}{connector}")?;
        Self::write_line(f, node)?;

        let children = node.children();
        let child_prefix = format!("{prefix}{}", if is_last { "   " } else { "│  " });
        for (i, child) in children.iter().enumerate() {
            Self::fmt_node(f, *child, &child_prefix, i + 1 == children.len())?;
        }
        Ok(())
    }
}

impl fmt::Display for DisplayTree<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Self::write_line(f, self.root)?;

        let children = self.root.children();
        for (i, child) in children.iter().enumerate() {
            Self::fmt_node(f, *child, "", i + 1 == children.len())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestNode {
        name: String,
        children: Vec<TestNode>,
    }

    impl TestNode {
        fn leaf(name: &str) -> Self {
            Self {
                name: name.to_string(),
                children: vec![],
            }
        }
    }

    impl TreeNode for TestNode {
        fn label(&self) -> String {
            self.name.clone()
        }

        fn children(&self) -> Vec<&dyn TreeNode> {
            self.children.iter().map(|c| c as &dyn TreeNode).collect()
        }
    }

    #[test]
    fn test_display_tree() {
        let tree = TestNode {
            name: "Join_3".to_string(),
            children: vec![
                TestNode {
                    name: "Selection_2".to_string(),
                    children: vec![TestNode::leaf("DataSource_1")],
                },
                TestNode::leaf("DataSource_4"),
            ],
        };

        let output = DisplayTree::new(&tree).to_string();
        assert_eq!(
            output,
            "Join_3\n├─ Selection_2\n│  └─ DataSource_1\n└─ DataSource_4\n"
        );
    }
}
