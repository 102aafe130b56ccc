//! Packed string column
//!
//! Variable-length UTF-8 strings stored as one contiguous byte buffer plus
//! an offset table with `n + 1` entries: `offsets[i]..offsets[i + 1]`
//! delimits entry `i`. No internal delimiters.

use anyhow::bail;

#[derive(Debug, Default)]
pub struct StringColumnBuilder {
    data: Vec<u8>,
    offsets: Vec<u32>,
}

impl StringColumnBuilder {
    pub fn new() -> Self {
        Self {
            data: vec![],
            offsets: vec![0],
        }
    }

    pub fn push(&mut self, s: &str) {
        self.data.extend_from_slice(s.as_bytes());
        self.offsets.push(self.data.len() as u32);
    }

    pub fn build(self) -> StringColumn {
        StringColumn {
            data: self.data,
            offsets: self.offsets,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringColumn {
    data: Vec<u8>,
    offsets: Vec<u32>,
}

impl StringColumn {
    /// Reconstruct a column from stored parts, validating the offset
    /// invariants: `offsets[0] == 0`, monotone non-decreasing, final offset
    /// equal to the data length, and every entry valid UTF-8.
    pub fn from_parts(data: Vec<u8>, offsets: Vec<u32>) -> anyhow::Result<Self> {
        match offsets.first() {
            None => bail!("string column offsets empty"),
            Some(0) => (),
            Some(first) => bail!("string column offsets start at {first}, expected 0"),
        }

        if offsets.windows(2).any(|w| w[0] > w[1]) {
            bail!("string column offsets not monotone");
        }

        if *offsets.last().expect("nonempty offsets") as usize != data.len() {
            bail!(
                "string column final offset {} != data length {}",
                offsets.last().expect("nonempty offsets"),
                data.len()
            );
        }

        if std::str::from_utf8(&data).is_err() {
            bail!("string column data is not valid UTF-8");
        }

        Ok(Self { data, offsets })
    }

    pub fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        if index >= self.len() {
            return None;
        }

        let start = self.offsets[index] as usize;
        let end = self.offsets[index + 1] as usize;
        std::str::from_utf8(&self.data[start..end]).ok()
    }

    /// Entries in the half-open range `[start, min(end, len))`
    pub fn get_range(&self, start: usize, end: usize) -> Vec<&str> {
        let end = end.min(self.len());
        if start >= end {
            return vec![];
        }

        (start..end).filter_map(|i| self.get(i)).collect()
    }

    pub fn into_parts(self) -> (Vec<u8>, Vec<u32>) {
        (self.data, self.offsets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_round_trip() {
        let mut builder = StringColumnBuilder::new();
        for s in ["alpha", "", "日本語", "zed"] {
            builder.push(s);
        }

        let column = builder.build();
        assert_eq!(column.len(), 4);
        assert_eq!(column.get(0), Some("alpha"));
        assert_eq!(column.get(1), Some(""));
        assert_eq!(column.get(2), Some("日本語"));
        assert_eq!(column.get(3), Some("zed"));
        assert_eq!(column.get(4), None);
    }

    #[test]
    fn test_get_range_clamped() {
        let mut builder = StringColumnBuilder::new();
        for s in ["a", "b", "c"] {
            builder.push(s);
        }

        let column = builder.build();
        assert_eq!(column.get_range(1, 3), vec!["b", "c"]);
        assert_eq!(column.get_range(1, 100), vec!["b", "c"]);
        assert_eq!(column.get_range(2, 2), Vec::<&str>::new());
        assert_eq!(column.get_range(5, 6), Vec::<&str>::new());
    }

    #[test]
    fn test_from_parts_validates() {
        assert!(StringColumn::from_parts(vec![], vec![]).is_err());
        assert!(StringColumn::from_parts(b"ab".to_vec(), vec![1, 2]).is_err());
        assert!(StringColumn::from_parts(b"ab".to_vec(), vec![0, 2, 1]).is_err());
        assert!(StringColumn::from_parts(b"ab".to_vec(), vec![0, 1]).is_err());
        assert!(StringColumn::from_parts(vec![0xff], vec![0, 1]).is_err());

        let column = StringColumn::from_parts(b"ab".to_vec(), vec![0, 1, 2]).unwrap();
        assert_eq!(column.get(1), Some("b"));
    }

    #[test]
    fn test_empty_column() {
        let column = StringColumnBuilder::new().build();
        assert!(column.is_empty());
        assert_eq!(column.get_range(0, 10), Vec::<&str>::new());
    }

    #[quickcheck_macros::quickcheck]
    fn prop_read_equals_written(strings: Vec<String>) -> bool {
        let mut builder = StringColumnBuilder::new();
        for s in &strings {
            builder.push(s);
        }

        let column = builder.build();
        strings
            .iter()
            .enumerate()
            .all(|(i, s)| column.get(i) == Some(s.as_str()))
    }
}
