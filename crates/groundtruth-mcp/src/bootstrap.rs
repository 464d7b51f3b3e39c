//! Building a Truth Layer from configuration

use crate::config::{GroundTruthConfig, ModuleKind, ModuleSpec, SeedSpec};
use crate::McpError;
use groundtruth_domain::{SourceModule, Tier};
use groundtruth_engine::{ConfigError, TruthLayer};
use groundtruth_sources::{HttpJsonConfig, HttpJsonModule, SeedProfile, SeededModule};
use std::collections::HashMap;

/// Identifier of the demo public company
pub const DEMO_PUBLIC_ID: &str = "ACME-CIK-001";

/// Identifier of the demo private company
pub const DEMO_PRIVATE_ID: &str = "NIMBUS-PVT-042";

/// Classification code the demo benchmarks are keyed by
pub const DEMO_CLASSIFICATION: &str = "NAICS-5112";

/// Demo module set: one seeded module per profile
pub fn demo_modules() -> Vec<ModuleSpec> {
    vec![
        ModuleSpec::seeded("sec-filings", "filings"),
        ModuleSpec::seeded("market-quotes", "market_quotes"),
        ModuleSpec::seeded("private-signals", "private_estimates"),
        ModuleSpec::seeded("industry-benchmarks", "benchmarks"),
    ]
}

/// Facts for the demo module set
pub fn demo_seeds() -> Vec<SeedSpec> {
    let fy = Some("FY2024");
    vec![
        SeedSpec::scalar("sec-filings", DEMO_PUBLIC_ID, "revenue_total", fy, 100_000_000.0, "USD"),
        SeedSpec::scalar("sec-filings", DEMO_PUBLIC_ID, "net_income", fy, 12_500_000.0, "USD"),
        SeedSpec::scalar("sec-filings", DEMO_PUBLIC_ID, "headcount", fy, 500.0, "employees"),
        SeedSpec::scalar("sec-filings", DEMO_PUBLIC_ID, "revenue_per_employee", fy, 200_000.0, "USD"),
        SeedSpec::scalar("market-quotes", DEMO_PUBLIC_ID, "market_cap", None, 1_200_000_000.0, "USD"),
        SeedSpec::scalar("private-signals", DEMO_PRIVATE_ID, "headcount", None, 120.0, "employees")
            .with_confidence(0.75),
        SeedSpec::scalar("private-signals", DEMO_PRIVATE_ID, "funding_total", None, 25_000_000.0, "USD"),
        SeedSpec::scalar(
            "industry-benchmarks",
            DEMO_CLASSIFICATION,
            "revenue_per_employee",
            None,
            250_000.0,
            "USD",
        )
        .with_confidence(0.8),
        SeedSpec::scalar(
            "industry-benchmarks",
            DEMO_CLASSIFICATION,
            "revenue_per_funding_dollar",
            None,
            0.9,
            "ratio",
        )
        .with_confidence(0.6),
    ]
}

fn seeded_module(spec: &ModuleSpec, seeds: &[&SeedSpec]) -> Result<SeededModule, ConfigError> {
    let profile: SeedProfile = match (&spec.profile, spec.tier) {
        (Some(profile), _) => profile
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("modules.{}: {}", spec.name, e)))?,
        (None, Some(Tier::Tier1)) => SeedProfile::Filings,
        (None, Some(Tier::Tier2)) => SeedProfile::PrivateEstimates,
        (None, Some(Tier::Tier3)) => SeedProfile::Benchmarks,
        (None, None) => {
            return Err(ConfigError::Invalid(format!(
                "modules.{}: seeded modules need a profile or a tier",
                spec.name
            )))
        }
    };

    let mut module = profile.build(spec.name.as_str());
    if let Some(tier) = spec.tier {
        if module.tier() != tier {
            return Err(ConfigError::Invalid(format!(
                "modules.{}: profile {} serves {}, not {}",
                spec.name,
                profile.as_str(),
                module.tier(),
                tier
            )));
        }
    }
    if let Some(confidence) = spec.confidence()? {
        module = module.with_confidence(confidence);
    }
    if let Some(origin) = &spec.origin {
        module = module.with_origin(origin.as_str());
    }

    for seed in seeds {
        let value = seed.metric_value()?;
        let period = seed.period.as_deref();
        module = match seed.confidence()? {
            Some(confidence) => module.seed_with_confidence(
                seed.identifier.as_str(),
                seed.metric.as_str(),
                period,
                value,
                confidence,
            ),
            None => module.seed(seed.identifier.as_str(), seed.metric.as_str(), period, value),
        };
    }
    Ok(module)
}

fn http_module(spec: &ModuleSpec) -> Result<HttpJsonModule, ConfigError> {
    let (Some(base_url), Some(tier)) = (&spec.base_url, spec.tier) else {
        return Err(ConfigError::Invalid(format!(
            "modules.{}: http modules need base_url and tier",
            spec.name
        )));
    };

    let mut http = HttpJsonConfig::new(spec.name.as_str(), base_url.as_str(), tier);
    if let Some(confidence) = spec.confidence()? {
        http.confidence = confidence;
    }
    HttpJsonModule::new(http).map_err(|e| ConfigError::Invalid(format!("modules.{}: {}", spec.name, e)))
}

/// Build the Truth Layer described by `config`
///
/// With no `[[modules]]` the demo module set and its seeds are registered
/// (extra `[[seeds]]` may still target the demo modules).
pub fn build_engine(config: &GroundTruthConfig) -> Result<TruthLayer, McpError> {
    config.validate()?;

    let (modules, seeds) = if config.modules.is_empty() {
        tracing::info!("No modules configured, registering demo sources");
        let mut seeds = demo_seeds();
        seeds.extend(config.seeds.iter().cloned());
        (demo_modules(), seeds)
    } else {
        (config.modules.clone(), config.seeds.clone())
    };

    let mut seeds_by_module: HashMap<&str, Vec<&SeedSpec>> = HashMap::new();
    for seed in &seeds {
        seeds_by_module.entry(seed.module.as_str()).or_default().push(seed);
    }

    let mut builder = TruthLayer::builder()
        .config(config.engine.clone())
        .cache_config(config.cache.clone())
        .limiter_config(config.limiter.clone());

    for spec in &modules {
        let own_seeds = seeds_by_module.remove(spec.name.as_str()).unwrap_or_default();
        builder = match spec.kind {
            ModuleKind::Seeded => builder.module(seeded_module(spec, &own_seeds)?),
            ModuleKind::Http => {
                if !own_seeds.is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "seeds target http module '{}'",
                        spec.name
                    ))
                    .into());
                }
                builder.module(http_module(spec)?)
            }
        };
    }

    if let Some(orphan) = seeds_by_module.keys().next() {
        return Err(ConfigError::Invalid(format!("seeds target unknown module '{orphan}'")).into());
    }

    let engine = builder.build()?;
    for module in engine.describe() {
        tracing::info!(
            module = %module.name,
            tier = %module.tier,
            origin = %module.origin,
            cache_class = %module.cache_class,
            "Registered source module"
        );
    }
    Ok(engine)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_engine() {
        let engine = build_engine(&GroundTruthConfig::default()).unwrap();
        let names: Vec<_> = engine.describe().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(
            names,
            ["sec-filings", "market-quotes", "private-signals", "industry-benchmarks"]
        );
    }

    #[test]
    fn test_demo_seeds_target_demo_modules() {
        let names: Vec<_> = demo_modules().into_iter().map(|m| m.name).collect();
        for seed in demo_seeds() {
            assert!(names.contains(&seed.module), "{}", seed.module);
            assert!(seed.metric_value().is_ok());
        }
    }

    #[test]
    fn test_configured_modules_replace_demo() {
        let mut config = GroundTruthConfig::default();
        config.modules.push(ModuleSpec::seeded("filings", "filings"));
        config.seeds.push(SeedSpec::scalar("filings", "X", "revenue_total", None, 1.0, "USD"));

        let engine = build_engine(&config).unwrap();
        assert_eq!(engine.describe().len(), 1);
        assert_eq!(engine.describe()[0].tier, Tier::Tier1);
    }

    #[test]
    fn test_seeded_tier_without_profile() {
        let mut spec = ModuleSpec::seeded("bench", "benchmarks");
        spec.profile = None;
        spec.tier = Some(Tier::Tier3);

        let module = seeded_module(&spec, &[]).unwrap();
        assert_eq!(module.tier(), Tier::Tier3);
    }

    #[test]
    fn test_profile_tier_conflict() {
        let mut spec = ModuleSpec::seeded("filings", "filings");
        spec.tier = Some(Tier::Tier3);
        assert!(seeded_module(&spec, &[]).is_err());
    }

    #[test]
    fn test_unknown_profile() {
        let spec = ModuleSpec::seeded("x", "horoscopes");
        assert!(seeded_module(&spec, &[]).is_err());
    }

    #[test]
    fn test_orphan_seed_rejected() {
        let mut config = GroundTruthConfig::default();
        config.modules.push(ModuleSpec::seeded("filings", "filings"));
        config.seeds.push(SeedSpec::scalar("nowhere", "X", "m", None, 1.0, "USD"));
        assert!(matches!(build_engine(&config), Err(McpError::Config(_))));
    }

    #[test]
    fn test_seed_for_http_module_rejected() {
        let mut config = GroundTruthConfig::default();
        config
            .modules
            .push(ModuleSpec::http("quotes-api", "https://quotes.example.test", Tier::Tier2));
        config.seeds.push(SeedSpec::scalar("quotes-api", "X", "m", None, 1.0, "USD"));
        assert!(matches!(build_engine(&config), Err(McpError::Config(_))));
    }

    #[test]
    fn test_http_module_origin() {
        let mut config = GroundTruthConfig::default();
        config
            .modules
            .push(ModuleSpec::http("quotes-api", "https://quotes.example.test/v1", Tier::Tier2));

        let engine = build_engine(&config).unwrap();
        assert_eq!(engine.describe()[0].origin, "quotes.example.test");
    }
}
