use serde::{Deserialize, Serialize};

pub const UNKNOWN_SIZE: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeEntry {
    pub prefix: String,
    pub size: String,
}

/// Ordered code-prefix to nominal-size table. The first matching entry wins,
/// so list longer prefixes that share a lead with shorter ones first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SizeTable {
    entries: Vec<SizeEntry>,
}

impl SizeTable {
    pub fn new(entries: Vec<(&str, &str)>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(prefix, size)| SizeEntry {
                    prefix: prefix.to_string(),
                    size: size.to_string(),
                })
                .collect(),
        }
    }

    pub fn entries(&self) -> &[SizeEntry] {
        &self.entries
    }

    /// Size for a canonical code string such as `DB-0010`.
    pub fn lookup(&self, code: &str) -> &str {
        self.entries
            .iter()
            .find(|entry| code.starts_with(&entry.prefix))
            .map(|entry| entry.size.as_str())
            .unwrap_or(UNKNOWN_SIZE)
    }

    /// Size for an extracted family tag such as `DB`, ignoring any trailing
    /// separator on the table's prefixes. Works for every code format,
    /// including compact codes (`DB10`) that carry no separator.
    pub fn lookup_prefix(&self, prefix: &str) -> &str {
        self.entries
            .iter()
            .find(|entry| entry.prefix.trim_end_matches(['-', '_', ' ']) == prefix)
            .map(|entry| entry.size.as_str())
            .unwrap_or(UNKNOWN_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delica_sizes() -> SizeTable {
        SizeTable::new(vec![
            ("DBS-", "15/0"),
            ("DB-", "11/0"),
            ("DBM-", "10/0"),
            ("DBL-", "8/0"),
        ])
    }

    #[test]
    fn known_prefixes_map_to_their_size() {
        let sizes = delica_sizes();
        assert_eq!(sizes.lookup("DB-0010"), "11/0");
        assert_eq!(sizes.lookup("DBS-0010"), "15/0");
        assert_eq!(sizes.lookup("DBM-0010"), "10/0");
        assert_eq!(sizes.lookup("DBL-0010-B"), "8/0");
        assert_eq!(sizes.lookup("DB-"), "11/0");
    }

    #[test]
    fn unknown_prefix_yields_sentinel() {
        let sizes = delica_sizes();
        assert_eq!(sizes.lookup("TR-0010"), UNKNOWN_SIZE);
        assert_eq!(sizes.lookup(""), UNKNOWN_SIZE);
        assert_eq!(SizeTable::default().lookup("DB-0010"), UNKNOWN_SIZE);
    }

    #[test]
    fn prefix_lookup_ignores_separator() {
        let sizes = delica_sizes();
        assert_eq!(sizes.lookup_prefix("DB"), "11/0");
        assert_eq!(sizes.lookup_prefix("DBS"), "15/0");
        assert_eq!(sizes.lookup_prefix("DBX"), UNKNOWN_SIZE);
    }

    #[test]
    fn first_entry_wins() {
        let sizes = SizeTable::new(vec![("DB", "first"), ("DB-", "second")]);
        assert_eq!(sizes.lookup("DB-0001"), "first");
    }

    #[test]
    fn deserializes_from_ordered_list() {
        let sizes: SizeTable = serde_json::from_str(
            r#"[{"prefix": "DBS-", "size": "15/0"}, {"prefix": "DB-", "size": "11/0"}]"#,
        )
        .unwrap();
        assert_eq!(sizes.entries().len(), 2);
        assert_eq!(sizes.lookup("DBS-0001"), "15/0");
    }
}
