use crate::domain_port::IdGenerator;
use nanoid::{alphabet, rngs};

const DEFAULT_ID_LEN: usize = 21;

/// URL-safe random ids from the OS RNG.
#[derive(Debug, Clone)]
pub struct NanoIdGenerator {
    len: usize,
}

impl NanoIdGenerator {
    pub fn new() -> Self {
        Self {
            len: DEFAULT_ID_LEN,
        }
    }
}

impl Default for NanoIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator for NanoIdGenerator {
    fn next_id(&self) -> String {
        nanoid::format(rngs::default, &alphabet::SAFE, self.len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn ids_are_url_safe_and_distinct() {
        let ids = NanoIdGenerator::new();
        let seen: HashSet<String> = (0..1000).map(|_| ids.next_id()).collect();
        assert_eq!(seen.len(), 1000);
        assert!(seen.iter().all(|id| id.len() == DEFAULT_ID_LEN));
        assert!(
            seen.iter()
                .flat_map(|id| id.chars())
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        );
    }
}
