//! Randomised request headers for upstream calls.
//!
//! Each request gets a browser `User-Agent` and a search-engine `Referer`
//! drawn from weighted pools, so repeated runs do not present an identical
//! fingerprint.

use std::sync::Mutex;

use crate::http_client::{HttpAuth, HttpRequest};

const REFERERS: [(&str, f64); 5] = [
    ("https://www.google.com/", 0.88),
    ("https://bing.com/", 0.03),
    ("https://search.yahoo.com/", 0.03),
    ("https://www.baidu.com/", 0.03),
    ("https://yandex.com/", 0.03),
];

const USER_AGENTS: [(&str, f64); 20] = [
    ("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/117.0.0.0 Safari/537.36", 0.205),
    ("Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/117.0.0.0 Safari/537.36", 0.14),
    ("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/118.0.0.0 Safari/537.36", 0.13),
    ("Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:109.0) Gecko/20100101 Firefox/118.0", 0.105),
    ("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/116.0.0.0 Safari/537.36", 0.055),
    ("Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/118.0.0.0 Safari/537.36", 0.055),
    ("Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/117.0.0.0 Safari/537.36", 0.05),
    ("Mozilla/5.0 (X11; Linux x86_64; rv:109.0) Gecko/20100101 Firefox/118.0", 0.045),
    ("Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/116.0.0.0 Safari/537.36", 0.04),
    ("Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:109.0) Gecko/20100101 Firefox/118.0", 0.03),
    ("Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15", 0.025),
    ("Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:109.0) Gecko/20100101 Firefox/117.0", 0.02),
    ("Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:109.0) Gecko/20100101 Firefox/118.0", 0.015),
    ("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/116.0.0.0 Safari/537.36 OPR/102.0.0.0", 0.015),
    ("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/117.0.0.0 Safari/537.36 Edg/117.0.2045.60", 0.015),
    ("Mozilla/5.0 (Windows NT 10.0; rv:109.0) Gecko/20100101 Firefox/118.0", 0.0125),
    ("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/118.0.0.0 Safari/537.36 Edg/118.0.2088.46", 0.0125),
    ("Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.6 Safari/605.1.15", 0.012),
    ("Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/118.0.0.0 Safari/537.36", 0.01),
    ("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/117.0.0.0 Safari/537.36 Edg/117.0.2045.47", 0.008),
];

/// Pick one item with probability proportional to its weight.
///
/// Non-finite and negative weights count as zero. When every weight is zero
/// the pick is uniform. Returns `None` only for an empty slice.
pub fn weighted_choice<'a, T>(items: &'a [T], weights: &[f64], rng: &mut fastrand::Rng) -> Option<&'a T> {
    if items.is_empty() {
        return None;
    }

    let weight_at = |index: usize| {
        weights
            .get(index)
            .copied()
            .filter(|weight| weight.is_finite() && *weight > 0.0)
            .unwrap_or(0.0)
    };
    let total: f64 = (0..items.len()).map(weight_at).sum();
    if total <= 0.0 {
        return items.get(rng.usize(..items.len()));
    }

    let mut target = rng.f64() * total;
    for (index, item) in items.iter().enumerate() {
        let weight = weight_at(index);
        if target < weight {
            return Some(item);
        }
        target -= weight;
    }

    // Floating point residue lands on the last positively weighted item.
    (0..items.len())
        .rev()
        .find(|index| weight_at(*index) > 0.0)
        .and_then(|index| items.get(index))
}

/// Immutable header pools used to build session profiles.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderPools {
    pub referers: Vec<(String, f64)>,
    pub user_agents: Vec<(String, f64)>,
}

impl Default for HeaderPools {
    fn default() -> Self {
        Self {
            referers: REFERERS
                .iter()
                .map(|(value, weight)| ((*value).to_owned(), *weight))
                .collect(),
            user_agents: USER_AGENTS
                .iter()
                .map(|(value, weight)| ((*value).to_owned(), *weight))
                .collect(),
        }
    }
}

/// Headers applied to one upstream request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProfile {
    pub user_agent: String,
    pub referer: String,
    pub api_key: Option<String>,
}

impl SessionProfile {
    /// Attach the news API key header.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn apply(&self, request: HttpRequest) -> HttpRequest {
        let request = request
            .with_header("user-agent", self.user_agent.as_str())
            .with_header("referer", self.referer.as_str())
            .with_header("upgrade-insecure-requests", "1");

        match &self.api_key {
            Some(key) => request.with_auth(&HttpAuth::Header {
                name: String::from("X-Api-Key"),
                value: key.clone(),
            }),
            None => request,
        }
    }
}

/// Produces a fresh [`SessionProfile`] per request.
#[derive(Debug)]
pub struct SessionFactory {
    pools: HeaderPools,
    rng: Mutex<fastrand::Rng>,
}

impl Default for SessionFactory {
    fn default() -> Self {
        Self::new(HeaderPools::default())
    }
}

impl SessionFactory {
    pub fn new(pools: HeaderPools) -> Self {
        Self {
            pools,
            rng: Mutex::new(fastrand::Rng::new()),
        }
    }

    /// Deterministic factory for tests and reproducible runs.
    pub fn with_seed(pools: HeaderPools, seed: u64) -> Self {
        Self {
            pools,
            rng: Mutex::new(fastrand::Rng::with_seed(seed)),
        }
    }

    pub fn profile(&self) -> SessionProfile {
        let mut rng = match self.rng.lock() {
            Ok(rng) => rng,
            Err(poisoned) => poisoned.into_inner(),
        };

        SessionProfile {
            user_agent: pick(&self.pools.user_agents, &mut rng),
            referer: pick(&self.pools.referers, &mut rng),
            api_key: None,
        }
    }
}

fn pick(pool: &[(String, f64)], rng: &mut fastrand::Rng) -> String {
    let (values, weights): (Vec<&str>, Vec<f64>) =
        pool.iter().map(|(value, weight)| (value.as_str(), *weight)).unzip();
    weighted_choice(&values, &weights, rng)
        .map(|value| (*value).to_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pools_carry_normalised_weights() {
        let pools = HeaderPools::default();
        assert_eq!(pools.referers.len(), 5);
        assert_eq!(pools.user_agents.len(), 20);

        let referer_total: f64 = pools.referers.iter().map(|(_, w)| w).sum();
        let agent_total: f64 = pools.user_agents.iter().map(|(_, w)| w).sum();
        assert!((referer_total - 1.0).abs() < 1e-9);
        assert!((agent_total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn weighted_choice_always_returns_a_member() {
        let items = ["a", "b", "c"];
        let mut rng = fastrand::Rng::with_seed(7);
        for _ in 0..500 {
            let choice = weighted_choice(&items, &[0.2, 0.0, 0.8], &mut rng).expect("non-empty");
            assert!(items.contains(choice));
            assert_ne!(*choice, "b");
        }
    }

    #[test]
    fn weighted_choice_handles_degenerate_weights() {
        let mut rng = fastrand::Rng::with_seed(1);
        let empty: [&str; 0] = [];
        assert_eq!(weighted_choice(&empty, &[], &mut rng), None);

        let items = ["x", "y"];
        let choice = weighted_choice(&items, &[0.0, f64::NAN], &mut rng).expect("uniform fallback");
        assert!(items.contains(choice));
    }

    #[test]
    fn seeded_factory_is_reproducible() {
        let first = SessionFactory::with_seed(HeaderPools::default(), 42).profile();
        let second = SessionFactory::with_seed(HeaderPools::default(), 42).profile();
        assert_eq!(first, second);
    }

    #[test]
    fn profile_applies_browser_headers_and_api_key() {
        let profile = SessionFactory::with_seed(HeaderPools::default(), 3)
            .profile()
            .with_api_key("secret");
        let request = profile.apply(HttpRequest::get("https://example.test"));

        assert!(request.headers.contains_key("user-agent"));
        assert!(request.headers.contains_key("referer"));
        assert_eq!(
            request.headers.get("upgrade-insecure-requests").map(String::as_str),
            Some("1")
        );
        assert_eq!(request.headers.get("x-api-key").map(String::as_str), Some("secret"));
    }
}
