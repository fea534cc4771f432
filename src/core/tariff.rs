use std::{
    fmt::{Debug, Display, Formatter},
    hash::{Hash, Hasher},
};

/// Statically registered electricity tariff.
pub struct Tariff {
    /// Stable identifier used in the configuration, for example `agile`.
    pub id: &'static str,

    /// Human-readable name for the notifications.
    pub display_name: &'static str,

    /// Product display name in the catalog API.
    pub product_name: &'static str,

    /// Tariff name in the sign-up URL.
    pub external_name: &'static str,

    /// Product code prefix, for example `AGILE-` matches `E-1R-AGILE-24-10-01-C`.
    product_code_prefix: &'static str,

    /// Whether the automated switch is able to move the account onto this tariff.
    pub is_switchable: bool,
}

impl Tariff {
    /// Check whether the tariff code belongs to this tariff, in any region.
    ///
    /// Tariff codes look like `E-1R-{product code}-{region}`.
    #[must_use]
    pub fn matches_code(&self, tariff_code: &str) -> bool {
        parse_tariff_code(tariff_code)
            .is_some_and(|(product_code, _)| self.matches_product_code(product_code))
    }

    /// Check whether the product code, like `AGILE-24-10-01`, belongs to this tariff.
    #[must_use]
    pub fn matches_product_code(&self, product_code: &str) -> bool {
        product_code.starts_with(self.product_code_prefix)
    }
}

impl PartialEq for Tariff {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Tariff {}

impl Hash for Tariff {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Debug for Tariff {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Tariff({})", self.id)
    }
}

impl Display for Tariff {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name)
    }
}

/// Split the tariff code into the product code and the region code.
fn parse_tariff_code(tariff_code: &str) -> Option<(&str, char)> {
    let (head, region) = tariff_code.rsplit_once('-')?;
    let mut region_chars = region.chars();
    let region_code = region_chars.next().filter(char::is_ascii_uppercase)?;
    if region_chars.next().is_some() {
        return None;
    }
    let product_code = head.strip_prefix("E-1R-").or_else(|| head.strip_prefix("E-2R-"))?;
    Some((product_code, region_code))
}

/// Region code is the trailing character of the tariff code.
#[must_use]
pub fn region_code(tariff_code: &str) -> Option<char> {
    tariff_code.chars().last().filter(char::is_ascii_alphabetic)
}

/// All the known tariffs, in the order the comparison reports them.
pub static TARIFFS: &[Tariff] = &[
    Tariff {
        id: "flexible",
        display_name: "Flexible Octopus",
        product_name: "Flexible Octopus",
        external_name: "flexible",
        product_code_prefix: "VAR-",
        is_switchable: false,
    },
    Tariff {
        id: "agile",
        display_name: "Agile Octopus",
        product_name: "Agile Octopus",
        external_name: "agile",
        product_code_prefix: "AGILE-",
        is_switchable: true,
    },
    Tariff {
        id: "go",
        display_name: "Octopus Go",
        product_name: "Octopus Go",
        external_name: "go",
        product_code_prefix: "GO-",
        is_switchable: true,
    },
    Tariff {
        id: "intelligent",
        display_name: "Intelligent Octopus Go",
        product_name: "Intelligent Octopus Go",
        external_name: "intelligent-go",
        product_code_prefix: "INTELLI-",
        is_switchable: false,
    },
    Tariff {
        id: "cosy",
        display_name: "Cosy Octopus",
        product_name: "Cosy Octopus",
        external_name: "cosy",
        product_code_prefix: "COSY-",
        is_switchable: true,
    },
    Tariff {
        id: "tracker",
        display_name: "Octopus Tracker",
        product_name: "Octopus Tracker",
        external_name: "tracker",
        product_code_prefix: "SILVER-",
        is_switchable: true,
    },
    Tariff {
        id: "flux",
        display_name: "Octopus Flux",
        product_name: "Octopus Flux",
        external_name: "flux",
        product_code_prefix: "FLUX-IMPORT-",
        is_switchable: false,
    },
];

#[must_use]
pub fn find_by_id(id: &str) -> Option<&'static Tariff> {
    TARIFFS.iter().find(|tariff| tariff.id.eq_ignore_ascii_case(id.trim()))
}

#[must_use]
pub fn find_by_code(tariff_code: &str) -> Option<&'static Tariff> {
    TARIFFS.iter().find(|tariff| tariff.matches_code(tariff_code))
}

/// Configured tariff identifiers resolved against the registry.
#[must_use]
pub struct Candidates {
    /// Known tariffs, in the registry order, without duplicates.
    pub tariffs: Vec<&'static Tariff>,

    /// Identifiers that did not match any tariff.
    pub unknown_ids: Vec<String>,
}

impl Candidates {
    pub fn resolve<S: AsRef<str>>(ids: &[S]) -> Self {
        let mut unknown_ids = Vec::new();
        let mut requested = Vec::with_capacity(ids.len());
        for id in ids.iter().map(AsRef::as_ref).filter(|id| !id.trim().is_empty()) {
            match find_by_id(id) {
                Some(tariff) => requested.push(tariff),
                None => unknown_ids.push(id.trim().to_owned()),
            }
        }
        let tariffs = TARIFFS.iter().filter(|tariff| requested.contains(tariff)).collect();
        Self { tariffs, unknown_ids }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_code_ok() {
        let agile = find_by_id("agile").unwrap();
        assert!(agile.matches_code("E-1R-AGILE-24-10-01-C"));
        assert!(!agile.matches_code("E-1R-GO-VAR-22-10-14-C"));
    }

    #[test]
    fn test_flexible_does_not_match_go() {
        assert_eq!(find_by_code("E-1R-GO-VAR-22-10-14-N").map(|tariff| tariff.id), Some("go"));
        assert_eq!(find_by_code("E-1R-VAR-22-11-01-N").map(|tariff| tariff.id), Some("flexible"));
    }

    #[test]
    fn test_matches_code_rejects_malformed_region() {
        let go = find_by_id("go").unwrap();
        assert!(!go.matches_code("E-1R-GO-VAR-22-10-14"));
        assert!(!go.matches_code("E-1R-GO-VAR-22-10-14-c"));
        assert!(!go.matches_code("GO-VAR-22-10-14-C"));
    }

    #[test]
    fn test_region_code() {
        assert_eq!(region_code("E-1R-AGILE-24-10-01-C"), Some('C'));
        assert_eq!(region_code(""), None);
    }

    #[test]
    fn test_resolve_keeps_registry_order() {
        let candidates = Candidates::resolve(&["tracker", " Agile", "nope", "go", "agile", ""]);
        let ids: Vec<_> = candidates.tariffs.iter().map(|tariff| tariff.id).collect();
        assert_eq!(ids, ["agile", "go", "tracker"]);
        assert_eq!(candidates.unknown_ids, ["nope"]);
    }
}
