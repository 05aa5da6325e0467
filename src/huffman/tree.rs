//! Frequency counting and Huffman tree construction.
//!
//! The encoder only ever uses the fixed DEFLATE tables; these helpers build
//! a data-derived tree for inspection. Ties are broken by position: the
//! first of several equally light nodes is merged first, and merged nodes go
//! to the back of the queue.

/// Node of a Huffman tree
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    Leaf { symbol: u8, weight: u32 },
    Composite { left: Box<Node>, right: Box<Node>, weight: u32 },
}

impl Node {
    pub fn weight(&self) -> u32 {
        match self {
            Node::Leaf { weight, .. } | Node::Composite { weight, .. } => *weight,
        }
    }

    /// Depth of every leaf, as (symbol, code length) in left-to-right order
    pub fn code_lengths(&self) -> Vec<(u8, u8)> {
        fn walk(node: &Node, depth: u8, out: &mut Vec<(u8, u8)>) {
            match node {
                // a lone leaf still needs one bit
                Node::Leaf { symbol, .. } => out.push((*symbol, depth.max(1))),
                Node::Composite { left, right, .. } => {
                    walk(left, depth + 1, out);
                    walk(right, depth + 1, out);
                }
            }
        }
        let mut out = Vec::new();
        walk(self, 0, &mut out);
        out
    }
}

/// Count each byte, keeping the order in which bytes first appear
pub fn compute_frequencies(data: &[u8]) -> Vec<(u8, u32)> {
    let mut slot = [usize::MAX; 256];
    let mut freq: Vec<(u8, u32)> = Vec::new();
    for &byte in data {
        match slot[byte as usize] {
            usize::MAX => {
                slot[byte as usize] = freq.len();
                freq.push((byte, 1));
            }
            i => freq[i].1 += 1,
        }
    }
    freq
}

/// Build a Huffman tree; `None` for an empty table
pub fn build_tree(freq: &[(u8, u32)]) -> Option<Node> {
    let mut nodes: Vec<Node> =
        freq.iter().map(|&(symbol, weight)| Node::Leaf { symbol, weight }).collect();

    while nodes.len() > 1 {
        let left = take_lightest(&mut nodes);
        let right = take_lightest(&mut nodes);
        let weight = left.weight() + right.weight();
        nodes.push(Node::Composite { left: Box::new(left), right: Box::new(right), weight });
    }

    nodes.pop()
}

/// Remove and return the first node of minimum weight
fn take_lightest(nodes: &mut Vec<Node>) -> Node {
    let mut best = 0;
    for (i, node) in nodes.iter().enumerate().skip(1) {
        if node.weight() < nodes[best].weight() {
            best = i;
        }
    }
    nodes.remove(best)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf_symbol(node: &Node) -> u8 {
        match node {
            Node::Leaf { symbol, .. } => *symbol,
            Node::Composite { .. } => panic!("expected a leaf"),
        }
    }

    fn children(node: &Node) -> (&Node, &Node) {
        match node {
            Node::Composite { left, right, .. } => (left, right),
            Node::Leaf { .. } => panic!("expected a composite node"),
        }
    }

    #[test]
    fn test_compute_frequencies() {
        let data = b"Blah blah blah blah blah!";
        let freq = compute_frequencies(data);
        assert_eq!(freq, vec![(b'B', 1), (b'l', 5), (b'a', 5), (b'h', 5), (b' ', 4), (b'b', 4), (b'!', 1)]);
        assert_eq!(freq.iter().map(|&(_, w)| w as usize).sum::<usize>(), data.len());
    }

    #[test]
    fn test_build_tree() {
        let freq = compute_frequencies(b"aaaaaabbbbccddd");
        assert_eq!(freq, vec![(b'a', 6), (b'b', 4), (b'c', 2), (b'd', 3)]);

        let root = build_tree(&freq).unwrap();
        assert_eq!(root.weight(), 15);

        let (a, rest) = children(&root);
        assert_eq!(leaf_symbol(a), b'a');
        assert_eq!(a.weight(), 6);
        assert_eq!(rest.weight(), 9);

        let (b, cd) = children(rest);
        assert_eq!(leaf_symbol(b), b'b');
        assert_eq!(cd.weight(), 5);

        let (c, d) = children(cd);
        assert_eq!((leaf_symbol(c), c.weight()), (b'c', 2));
        assert_eq!((leaf_symbol(d), d.weight()), (b'd', 3));

        assert_eq!(root.code_lengths(), vec![(b'a', 1), (b'b', 2), (b'c', 3), (b'd', 3)]);
    }

    #[test]
    fn test_degenerate_trees() {
        assert!(build_tree(&[]).is_none());
        let single = build_tree(&compute_frequencies(b"zzz")).unwrap();
        assert_eq!(single, Node::Leaf { symbol: b'z', weight: 3 });
        assert_eq!(single.code_lengths(), vec![(b'z', 1)]);
    }
}
