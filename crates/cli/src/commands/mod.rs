//! CLI Commands

pub mod list;
pub mod load;
pub mod probe;
pub mod run;

use anyhow::{bail, Result};
use std::path::Path;

use reelcheck_e2e::{catalog, Scenario};

/// Built-in scenarios (unless `builtin` is false) followed by YAML
/// scenarios from `dir`.
pub fn collect_scenarios(dir: Option<&Path>, builtin: bool) -> Result<Vec<Scenario>> {
    let mut scenarios = if builtin { catalog::builtin() } else { Vec::new() };
    if let Some(dir) = dir {
        scenarios.extend(Scenario::load_all(dir)?);
    }
    if scenarios.is_empty() {
        bail!("no scenarios to run");
    }
    Ok(scenarios)
}

/// Keep scenarios carrying `tag` and, when names are given, matching one
/// of them (case-insensitive).
pub fn select(scenarios: Vec<Scenario>, tag: Option<&str>, names: &[String]) -> Vec<Scenario> {
    scenarios
        .into_iter()
        .filter(|s| tag.map_or(true, |t| s.has_tag(t)))
        .filter(|s| names.is_empty() || names.iter().any(|n| n.eq_ignore_ascii_case(&s.name)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_by_tag_and_name() {
        let all = catalog::builtin();
        let smoke = select(all.clone(), Some("smoke"), &[]);
        assert!(!smoke.is_empty());
        assert!(smoke.iter().all(|s| s.has_tag("smoke")));

        let named = select(all.clone(), None, &["ce-03".to_string(), "LOGO-02".to_string()]);
        let names: Vec<_> = named.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["CE-03", "LOGO-02"]);

        assert!(select(all, Some("search"), &["LOGO-01".to_string()]).is_empty());
    }

    #[test]
    fn test_collect_requires_something_to_run() {
        assert!(collect_scenarios(None, false).is_err());
        assert_eq!(collect_scenarios(None, true).unwrap().len(), catalog::builtin().len());
    }
}
