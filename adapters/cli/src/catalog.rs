use std::{fs, path::Path};

use anyhow::{bail, Context, Result};
use cluster_conductor_core::{Catalog, Level};
use serde::Deserialize;
use tracing::debug;

const CATALOG_VERSION: u32 = 1;
const BUNDLED_CATALOG: &str = include_str!("../catalog/levels.toml");

#[derive(Debug, Deserialize)]
struct CatalogManifest {
    version: u32,
    levels: Vec<Level>,
}

/// Loads the catalog at `path`, or the bundled demo catalog when absent.
pub(crate) fn load(path: Option<&Path>) -> Result<Catalog> {
    match path {
        Some(path) => {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("failed to read level catalog {}", path.display()))?;
            parse(&contents)
                .with_context(|| format!("invalid level catalog {}", path.display()))
        }
        None => parse(BUNDLED_CATALOG).context("bundled level catalog is invalid"),
    }
}

pub(crate) fn parse(contents: &str) -> Result<Catalog> {
    let manifest: CatalogManifest =
        toml::from_str(contents).context("failed to parse level catalog")?;

    if manifest.version != CATALOG_VERSION {
        bail!(
            "unsupported level catalog version {}; expected {}",
            manifest.version,
            CATALOG_VERSION
        );
    }

    let catalog = Catalog::new(manifest.levels)?;
    debug!(levels = catalog.len(), "level catalog loaded");
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use cluster_conductor_core::{CatalogError, GamePhase};
    use cluster_conductor_system_session::Session;

    use super::*;

    const MINIMAL: &str = r#"
version = 1

[[levels]]
name = "Tiny"
solution = { "web-1" = "node-1" }

[[levels.nodes]]
id = "node-1"
name = "worker-1"
capacity = 1
vcpu = 2.0
memory = 4.0
infrastructure = { node_type = "worker" }

[[levels.pods]]
id = "web-1"
name = "web-1"
request = { vcpu = 1.0, memory = 1.0 }

[[levels.objectives]]
description = "Schedule every pod"
rule = { kind = "all_scheduled", pods = "all" }
"#;

    #[test]
    fn bundled_catalog_parses() {
        let catalog = load(None).expect("bundled catalog loads");

        assert_eq!(catalog.len(), 5);
        let names: Vec<&str> = catalog.iter().map(|level| level.name.as_str()).collect();
        assert_eq!(names[0], "Pod Scheduling 101");
        assert_eq!(names[4], "Stateful Services & Quorum");
    }

    #[test]
    fn bundled_solutions_complete_their_levels() {
        let catalog = load(None).expect("bundled catalog loads");
        let levels: Vec<Level> = catalog.iter().cloned().collect();
        let mut session = Session::new(catalog);

        for (index, level) in levels.iter().enumerate() {
            session.jump_to_level(index).expect("level exists");
            session.begin().expect("briefing begins");
            for (pod, node) in &level.solution {
                let outcome = session.attempt_move(pod, node);
                assert!(
                    outcome.accepted(),
                    "{}: {pod} -> {node} refused: {:?}",
                    level.name,
                    outcome.detail()
                );
            }
            assert_eq!(
                session.phase(),
                GamePhase::LevelComplete,
                "solution of {} should complete it",
                level.name
            );
        }
    }

    #[test]
    fn minimal_catalog_uses_defaults() {
        let catalog = parse(MINIMAL).expect("minimal catalog parses");
        let level = catalog.get(0).expect("one level");

        assert!(level.description.is_empty());
        assert!(level.physical_hosts.is_empty());
        assert!(!level.validation.resources);
    }

    #[test]
    fn rejects_unknown_versions() {
        let error = parse(&MINIMAL.replace("version = 1", "version = 2"))
            .expect_err("version 2 is not supported");

        assert!(
            error.to_string().contains("unsupported level catalog version 2"),
            "{error}"
        );
    }

    #[test]
    fn surfaces_catalog_validation_errors() {
        let broken = MINIMAL.replace(
            "solution = { \"web-1\" = \"node-1\" }",
            "solution = { \"web-1\" = \"node-9\" }",
        );
        let error = parse(&broken).expect_err("solution references a missing node");

        assert!(
            error.downcast_ref::<CatalogError>().is_some(),
            "expected a catalog error, got {error:#}"
        );
    }

    #[test]
    fn reports_malformed_toml_with_context() {
        let error = parse("version = ").expect_err("truncated catalog");

        assert_eq!(error.to_string(), "failed to parse level catalog");
    }
}
