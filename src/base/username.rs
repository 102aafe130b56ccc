//! Username representation
//!
//! Case is preserved for display; the lowercase form is the key used for
//! search and canonical ordering.

use serde::{Deserialize, Serialize};

#[derive(Debug, PartialEq, Eq, Clone, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Username(pub String);

//////////
// impl //
//////////

impl Username {
    pub fn new(username: impl Into<String>) -> Self {
        Self(username.into())
    }

    /// Lowercase form used for search & ordering
    pub fn search_key(&self) -> String {
        self.0.to_lowercase()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/////////////////
// conversions //
/////////////////

impl From<&str> for Username {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Username {
    fn from(value: String) -> Self {
        Self(value)
    }
}

///////////////////
// display/debug //
///////////////////

impl std::fmt::Display for Username {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

///////////////
// arbitrary //
///////////////

#[cfg(test)]
impl quickcheck::Arbitrary for Username {
    fn arbitrary(g: &mut quickcheck::Gen) -> Self {
        let alphabet: Vec<_> = ('a'..='z')
            .chain('A'..='Z')
            .chain('0'..='9')
            .chain(['.', '_'])
            .collect();
        let len = 1 + usize::arbitrary(g) % 30;
        let mut chars = vec![];

        for _ in 0..len {
            let idx = usize::arbitrary(g) % alphabet.len();
            chars.push(alphabet.get(idx).cloned().unwrap());
        }

        Self(chars.into_iter().collect())
    }
}
