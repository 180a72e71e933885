use crate::error::{Result, RosterError};

/// Maximum number of candidates quoted back to the user for an ambiguous reference
pub const AMBIGUITY_SAMPLE: usize = 5;

/// Outcome of resolving a partial reference against a candidate set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<T> {
    /// Exactly one candidate won
    Found(T),
    /// More than one candidate matched at the deciding tier
    Ambiguous(Vec<T>),
    /// No candidate matched at any tier
    NotFound,
}

impl<T> Resolution<T> {
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> Resolution<U> {
        match self {
            Self::Found(value) => Resolution::Found(f(value)),
            Self::Ambiguous(values) => Resolution::Ambiguous(values.into_iter().map(f).collect()),
            Self::NotFound => Resolution::NotFound,
        }
    }

    pub fn found(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            _ => None,
        }
    }

    /// Convert into a `Result`, labelling ambiguous candidates with `label`.
    pub fn into_result(
        self,
        kind: &'static str,
        fragment: &str,
        label: impl Fn(&T) -> String,
    ) -> Result<T> {
        match self {
            Self::Found(value) => Ok(value),
            Self::Ambiguous(values) => Err(RosterError::Ambiguous {
                kind,
                fragment: fragment.to_string(),
                total: values.len(),
                sample: values.iter().take(AMBIGUITY_SAMPLE).map(label).collect(),
            }),
            Self::NotFound => Err(RosterError::not_found(kind, fragment)),
        }
    }
}

/// Resolve `fragment` against `candidates` by tier: exact, prefix, substring.
///
/// Matching is case-insensitive and stops at the first tier with at least one
/// hit. An empty fragment never matches. Candidate order is preserved in the
/// ambiguous case.
pub fn resolve_fragment<T>(
    fragment: &str,
    candidates: impl IntoIterator<Item = T>,
    key: impl Fn(&T) -> &str,
) -> Resolution<T> {
    let needle = fragment.trim().to_lowercase();
    if needle.is_empty() {
        return Resolution::NotFound;
    }

    let keyed: Vec<(String, T)> = candidates
        .into_iter()
        .map(|candidate| (key(&candidate).to_lowercase(), candidate))
        .collect();

    let tiers: [fn(&str, &str) -> bool; 3] = [
        |hay, needle| hay == needle,
        |hay, needle| hay.starts_with(needle),
        |hay, needle| hay.contains(needle),
    ];

    let mut remaining = keyed;
    for tier in tiers {
        let (hits, rest): (Vec<_>, Vec<_>) = remaining
            .into_iter()
            .partition(|(lowered, _)| tier(lowered, &needle));
        if !hits.is_empty() {
            return pick(hits.into_iter().map(|(_, candidate)| candidate).collect());
        }
        remaining = rest;
    }
    Resolution::NotFound
}

/// Convenience wrapper for plain string candidates.
pub fn resolve_name<'a>(
    fragment: &str,
    candidates: impl IntoIterator<Item = &'a str>,
) -> Resolution<&'a str> {
    resolve_fragment(fragment, candidates, |name| *name)
}

pub(crate) fn pick<T>(mut hits: Vec<T>) -> Resolution<T> {
    match hits.len() {
        0 => Resolution::NotFound,
        1 => Resolution::Found(hits.remove(0)),
        _ => Resolution::Ambiguous(hits),
    }
}
