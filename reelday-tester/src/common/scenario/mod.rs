use anyhow::Result;
use rand_chacha::ChaCha20Rng;

use reelday_game::GamePolicy;

pub mod catalog;

pub use catalog::catalog_scenarios;

/// One iteration of a scenario: an rng seeded for this iteration and the
/// policy under test.
pub type ScenarioCheck = fn(&mut ChaCha20Rng, &GamePolicy) -> Result<()>;

#[derive(Debug, Clone)]
pub struct TestScenario {
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub check: ScenarioCheck,
}

impl TestScenario {
    #[must_use]
    pub const fn new(
        key: &'static str,
        name: &'static str,
        description: &'static str,
        check: ScenarioCheck,
    ) -> Self {
        Self {
            key,
            name,
            description,
            check,
        }
    }
}

pub fn get_scenario(key: &str) -> Option<TestScenario> {
    catalog_scenarios()
        .into_iter()
        .find(|scenario| scenario.key == key)
}

pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    catalog_scenarios()
        .into_iter()
        .map(|scenario| (scenario.key, scenario.description))
        .collect()
}

/// Expand the `all` keyword into every catalog key, keeping the other names in order.
pub fn expand_scenarios(keys: &[String]) -> Vec<String> {
    let mut expanded: Vec<String> = keys.iter().filter(|k| *k != "all").cloned().collect();
    if keys.iter().any(|k| k == "all") {
        for (key, _) in list_scenarios() {
            if !expanded.iter().any(|k| k == key) {
                expanded.push(key.to_string());
            }
        }
    }
    expanded
}
