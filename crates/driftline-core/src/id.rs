//! Node identifiers
//!
//! A node is named by a short ASCII tag that travels in the first five bytes
//! of every measurement packet. Shorter tags are NUL padded on the wire and
//! longer ones are truncated.

use std::fmt;

/// Width of a node tag on the wire
pub const NODE_TAG_LEN: usize = 5;

/// Fixed-width node identifier as carried in a measurement packet
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NodeTag([u8; NODE_TAG_LEN]);

impl NodeTag {
    pub const EMPTY: NodeTag = NodeTag([0u8; NODE_TAG_LEN]);

    /// Build a tag from a string, truncating to five bytes and NUL padding
    /// the remainder.
    pub fn new(name: &str) -> Self {
        let mut bytes = [0u8; NODE_TAG_LEN];
        let src = name.as_bytes();
        let n = src.len().min(NODE_TAG_LEN);
        bytes[..n].copy_from_slice(&src[..n]);
        NodeTag(bytes)
    }

    #[inline]
    pub fn from_bytes(bytes: [u8; NODE_TAG_LEN]) -> Self {
        NodeTag(bytes)
    }

    #[inline]
    pub fn to_bytes(self) -> [u8; NODE_TAG_LEN] {
        self.0
    }

    /// The tag with trailing NUL and space padding removed.
    ///
    /// Non-UTF-8 bytes are replaced rather than rejected so that a garbled
    /// identifier still produces a log row.
    pub fn name(&self) -> String {
        let end = self
            .0
            .iter()
            .rposition(|&b| b != 0 && b != b' ')
            .map_or(0, |i| i + 1);
        String::from_utf8_lossy(&self.0[..end]).into_owned()
    }

    /// True when the tag is nothing but padding
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|&b| b == 0 || b == b' ')
    }
}

impl From<&str> for NodeTag {
    fn from(name: &str) -> Self {
        NodeTag::new(name)
    }
}

impl fmt::Debug for NodeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({:?})", self.name())
    }
}

impl fmt::Display for NodeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_tag_padding() {
        let tag = NodeTag::new("A");
        assert_eq!(tag.to_bytes(), [b'A', 0, 0, 0, 0]);
        assert_eq!(tag.name(), "A");
    }

    #[test]
    fn test_tag_truncation() {
        let tag = NodeTag::new("sensor-7");
        assert_eq!(&tag.to_bytes(), b"senso");
        assert_eq!(tag.name(), "senso");
    }

    #[test]
    fn test_tag_space_padding_stripped() {
        let tag = NodeTag::from_bytes(*b"AB   ");
        assert_eq!(tag.name(), "AB");
        assert!(!tag.is_empty());
    }

    #[test]
    fn test_empty_tag() {
        assert!(NodeTag::EMPTY.is_empty());
        assert!(NodeTag::from_bytes(*b"  \0 \0").is_empty());
        assert_eq!(NodeTag::EMPTY.name(), "");
    }

    proptest! {
        #[test]
        fn prop_short_names_survive(name in "[A-Za-z0-9_-]{1,5}") {
            prop_assert_eq!(NodeTag::new(&name).name(), name);
        }

        #[test]
        fn prop_name_never_exceeds_tag(bytes in any::<[u8; NODE_TAG_LEN]>()) {
            let tag = NodeTag::from_bytes(bytes);
            prop_assert!(tag.name().len() <= NODE_TAG_LEN * 3);
            prop_assert_eq!(tag.is_empty(), tag.name().is_empty());
        }
    }
}
