use std::collections::{HashMap, HashSet};

/// Every leading substring of `word`, shortest first, including the word
/// itself. Splits on char boundaries.
pub fn prefixes_of(word: &str) -> impl Iterator<Item = &str> {
    word.char_indices()
        .map(move |(idx, ch)| &word[..idx + ch.len_utf8()])
}

#[derive(Debug, Default)]
struct TrieNode {
    children: HashMap<char, TrieNode>,
    is_word: bool,
}

/// Trie over the words observed in the current consolidation window.
///
/// Only holds vocabulary accumulated since the last [`PrefixIndex::reset`];
/// the full vocabulary lives in the ranked store.
#[derive(Debug, Default)]
pub struct PrefixIndex {
    root: TrieNode,
    words: HashSet<String>,
    node_count: usize,
}

impl PrefixIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `word`, creating nodes along its path. Empty input is ignored.
    pub fn insert(&mut self, word: &str) {
        if word.is_empty() {
            return;
        }
        if !self.words.insert(word.to_string()) {
            return;
        }

        let mut node = &mut self.root;
        for ch in word.chars() {
            node = match node.children.entry(ch) {
                std::collections::hash_map::Entry::Occupied(entry) => entry.into_mut(),
                std::collections::hash_map::Entry::Vacant(entry) => {
                    self.node_count += 1;
                    entry.insert(TrieNode::default())
                }
            };
        }
        node.is_word = true;
    }

    /// Replaces the current contents with `words`.
    pub fn load<I, S>(&mut self, words: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.reset();
        for word in words {
            self.insert(word.as_ref());
        }
    }

    /// All stored words starting with `prefix`. Order follows the child maps
    /// and carries no ranking.
    pub fn suggest(&self, prefix: &str) -> Vec<String> {
        let mut node = &self.root;
        for ch in prefix.chars() {
            match node.children.get(&ch) {
                Some(child) => node = child,
                None => return Vec::new(),
            }
        }

        let mut out = Vec::new();
        let mut buffer = prefix.to_string();
        collect_words(node, &mut buffer, &mut out);
        out
    }

    /// Every prefix of every stored word: the ranked-store keys this window
    /// may need to refresh.
    pub fn all_prefixes(&self) -> HashSet<String> {
        let mut prefixes = HashSet::new();
        for word in &self.words {
            for prefix in prefixes_of(word) {
                if !prefixes.contains(prefix) {
                    prefixes.insert(prefix.to_string());
                }
            }
        }
        prefixes
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    /// Drops the whole tree in one step.
    pub fn reset(&mut self) {
        self.root = TrieNode::default();
        self.words = HashSet::new();
        self.node_count = 0;
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

fn collect_words(node: &TrieNode, buffer: &mut String, out: &mut Vec<String>) {
    if node.is_word {
        out.push(buffer.clone());
    }
    for (ch, child) in &node.children {
        buffer.push(*ch);
        collect_words(child, buffer, out);
        buffer.pop();
    }
}
