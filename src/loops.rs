use std::collections::BTreeMap;

/// Matching bracket positions for a program, plus the brackets that have no partner.
///
/// Positions are character indices into the program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopMap {
    pairs: BTreeMap<usize, usize>,
    unmatched: Vec<usize>,
}

impl LoopMap {
    /// Single left-to-right pass with a stack of open brackets.
    ///
    /// Unmatched `]` are listed in encounter order, followed by the `[` still
    /// open at the end, outermost first.
    pub fn build(code: &[char]) -> Self {
        let mut open = Vec::new();
        let mut pairs = BTreeMap::new();
        let mut unmatched = Vec::new();

        for (pos, c) in code.iter().enumerate() {
            match c {
                '[' => open.push(pos),
                ']' => match open.pop() {
                    Some(head) => {
                        pairs.insert(head, pos);
                        pairs.insert(pos, head);
                    }
                    None => unmatched.push(pos),
                },
                _ => {}
            }
        }
        unmatched.extend(open);

        LoopMap { pairs, unmatched }
    }

    pub fn partner(&self, pos: usize) -> Option<usize> {
        self.pairs.get(&pos).copied()
    }

    pub fn pairs(&self) -> &BTreeMap<usize, usize> {
        &self.pairs
    }

    pub fn unmatched(&self) -> &[usize] {
        &self.unmatched
    }
}
