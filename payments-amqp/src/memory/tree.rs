//! Prefix tree of queues indexing queues by the [`BindingKey`] they are bound with
//!
//! For example the following bindings
//!
//! | Queue          | Binding key            |
//! |----------------|------------------------|
//! | payments       | *                      |
//! | refunds        | refund.#               |
//! | audit          | #                      |
//! | fraud          | card.*.declined        |
//!
//! will be organized as such in the tree:
//!
//! ```text
//!    * [payments]
//!    # [audit]
//!    refund []
//!        # [refunds]
//!    card []
//!        * []
//!            declined [fraud]
//! ```
use std::fmt;

use payments_amqp_core::{routing_words, BindingKey, BindingKeyFragment};

/// Type used to walk the tree and collect queues
struct QueueCollector {
    queues: Vec<String>,
}

impl QueueCollector {
    fn new() -> Self {
        Self { queues: vec![] }
    }

    /// Offer queues to this collector. A queue reached through several bindings is only
    /// collected once
    fn offer(&mut self, queues: &[String]) {
        for queue in queues {
            if !self.queues.contains(queue) {
                self.queues.push(queue.clone());
            }
        }
    }

    fn into_queues(self) -> Vec<String> {
        self.queues
    }
}

/// A node of the tree
#[derive(Debug, Default)]
struct Node {
    /// Special node to represent the `*` binding key fragment
    star_node: Option<Box<Node>>,

    /// Special node to represent the `#` binding key fragment
    sharp_node: Option<Box<Node>>,

    /// Children of this node, one per literal word
    children: Vec<Box<Node>>,

    /// Depth of this node. Will be 0 for the root node
    depth: usize,

    /// The fragment of the binding key this node holds.
    /// Will be `None` for the root node
    fragment: Option<BindingKeyFragment>,

    /// Queues bound with a binding key ending at this node
    queues: Vec<String>,
}

impl Node {
    fn new(depth: usize, fragment: BindingKeyFragment) -> Self {
        Self {
            depth,
            fragment: Some(fragment),
            ..Default::default()
        }
    }

    /// Walk down the tree along `fragments`, creating the missing nodes, and return the queues
    /// of the final node
    fn find_or_create(&mut self, fragments: &[BindingKeyFragment]) -> &mut Vec<String> {
        let Some((fragment, rest)) = fragments.split_first() else {
            return &mut self.queues;
        };

        let depth = self.depth + 1;
        let node = match fragment {
            BindingKeyFragment::Star => self
                .star_node
                .get_or_insert_with(|| Box::new(Node::new(depth, BindingKeyFragment::Star))),
            BindingKeyFragment::Sharp => self
                .sharp_node
                .get_or_insert_with(|| Box::new(Node::new(depth, BindingKeyFragment::Sharp))),
            BindingKeyFragment::Value(_) => {
                match self
                    .children
                    .iter()
                    .position(|n| n.fragment.as_ref() == Some(fragment))
                {
                    Some(i) => &mut self.children[i],
                    None => {
                        self.children
                            .push(Box::new(Node::new(depth, fragment.clone())));
                        self.children
                            .last_mut()
                            .expect("children should have at least one element")
                    }
                }
            }
        };

        node.find_or_create(rest)
    }

    /// Collect the queues of every node reached by the remaining routing key `words`
    fn accept(&self, collector: &mut QueueCollector, words: &[&str]) {
        if let Some(ref sharp_node) = self.sharp_node {
            for skip in 0..=words.len() {
                sharp_node.accept(collector, &words[skip..]);
            }
        }

        let Some((word, rest)) = words.split_first() else {
            collector.offer(&self.queues);
            return;
        };

        if let Some(ref star_node) = self.star_node {
            star_node.accept(collector, rest);
        }

        let child = self.children.iter().find(|n| match n.fragment {
            Some(BindingKeyFragment::Value(ref value)) => value == word,
            _ => false,
        });
        if let Some(child_node) = child {
            child_node.accept(collector, rest);
        }
    }
}

/// Indentation level to use when printing the tree
const INDENT_LEVEL: usize = 4;

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref fragment) = self.fragment {
            let indent = (self.depth - 1) * INDENT_LEVEL;
            let queues = self.queues.join(", ");
            writeln!(f, "{:indent$}{fragment} [{queues}]", "")?;
        }

        if let Some(ref star_node) = self.star_node {
            write!(f, "{star_node}")?;
        }

        if let Some(ref sharp_node) = self.sharp_node {
            write!(f, "{sharp_node}")?;
        }

        for child in &self.children {
            write!(f, "{child}")?;
        }

        Ok(())
    }
}

/// Prefix tree of queues based on the [`BindingKey`] of their bindings to a topic exchange
#[derive(Debug, Default)]
pub(crate) struct BindingTree {
    root: Node,
}

impl BindingTree {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Add a `queue` bound with `key`. Adding the same binding twice has no effect
    pub(crate) fn add(&mut self, queue: &str, key: &BindingKey) {
        let queues = self.root.find_or_create(&key.fragments);
        if !queues.iter().any(|q| q == queue) {
            queues.push(queue.to_string());
        }
    }

    /// Get the queues a message published with `routing_key` must be routed to
    pub(crate) fn route(&self, routing_key: &str) -> Vec<String> {
        let words = routing_words(routing_key).collect::<Vec<_>>();

        let mut collector = QueueCollector::new();
        self.root.accept(&mut collector, &words);
        collector.into_queues()
    }
}

impl fmt::Display for BindingTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use payments_amqp_core::binding_key;

    #[test]
    fn doc() {
        let mut tree = BindingTree::new();
        tree.add("payments", &binding_key![*]);
        tree.add("refunds", &binding_key!["refund", #]);
        tree.add("audit", &binding_key![#]);
        tree.add("fraud", &binding_key!["card", *, "declined"]);

        println!("{tree}");
    }

    #[test]
    fn match_empty() {
        let mut tree = BindingTree::new();
        tree.add("payments", &BindingKey::empty());

        assert_eq!(tree.route(""), vec!["payments"]);
        assert!(tree.route("payment").is_empty());
    }

    #[test]
    fn match_basic() {
        let mut tree = BindingTree::new();
        tree.add("payments", &binding_key!["payment"]);

        assert_eq!(tree.route("payment"), vec!["payments"]);
        assert!(tree.route("refund").is_empty());
    }

    #[test]
    fn star_matches_a_single_word() {
        let mut tree = BindingTree::new();
        tree.add("payments", &binding_key![*]);

        assert_eq!(tree.route("payment"), vec!["payments"]);
        assert_eq!(tree.route("42"), vec!["payments"]);
        assert!(tree.route("").is_empty());
        assert!(tree.route("payment.created").is_empty());
    }

    #[test]
    fn star_matches_anything() {
        for binding_key in [
            binding_key!["a", "b", *],
            binding_key!["a", *, *],
            binding_key!["a", *, "c"],
            binding_key![*, "b", "c"],
        ] {
            let mut tree = BindingTree::new();
            tree.add("queue", &binding_key);

            assert_eq!(tree.route("a.b.c"), vec!["queue"], "{binding_key}");
        }
    }

    #[test]
    fn sharp_matches_zero_or_more_words() {
        let mut tree = BindingTree::new();
        tree.add("refunds", &binding_key!["refund", #]);

        assert_eq!(tree.route("refund"), vec!["refunds"]);
        assert_eq!(tree.route("refund.card"), vec!["refunds"]);
        assert_eq!(tree.route("refund.card.visa"), vec!["refunds"]);
        assert!(tree.route("payment.refund").is_empty());
    }

    #[test]
    fn queue_is_routed_once() {
        let mut tree = BindingTree::new();
        tree.add("audit", &binding_key![#]);
        tree.add("audit", &binding_key![*]);
        tree.add("audit", &binding_key!["payment"]);

        assert_eq!(tree.route("payment"), vec!["audit"]);
    }

    #[test]
    fn add_is_idempotent() {
        let mut tree = BindingTree::new();
        tree.add("payments", &binding_key![*]);
        tree.add("payments", &binding_key![*]);

        assert_eq!(tree.route("payment"), vec!["payments".to_string()]);
    }

    #[test]
    fn match_queues() {
        let mut tree = BindingTree::new();
        tree.add("q1", &binding_key!["card", *, "declined"]);
        tree.add("q2", &binding_key!["card", *, *]);
        tree.add("q3", &binding_key!["transfer", *, *]);

        let queues = tree.route("card.visa.declined");
        assert_eq!(queues.len(), 2);
        assert!(queues.contains(&"q1".to_string()));
        assert!(queues.contains(&"q2".to_string()));
    }
}
