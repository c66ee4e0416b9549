//! Output formatting for CLI commands.
//!
//! Text output uses `tabled` tables with `colored` accents; JSON output is
//! meant for scripting and never contains secrets.

use colored::Colorize;
use serde::Serialize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::config::{StackConfig, ValidationResult};
use crate::pipeline::StackRun;
use crate::state::{DeclarationHasher, ManifestDiff, StackManifest};
use crate::topology::{Declaration, ResourceId, ResourceSpec, SubnetLayout, Zone};

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Declaration row for table display.
#[derive(Tabled)]
struct DeclarationRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Details")]
    details: String,
}

/// Zone row for table display.
#[derive(Tabled)]
struct ZoneRow {
    #[tabled(rename = "Zone")]
    zone: String,
    #[tabled(rename = "Private subnet")]
    private: String,
    #[tabled(rename = "Public subnet")]
    public: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a validation result.
    #[must_use]
    pub fn format_validation(&self, config: &StackConfig, result: &ValidationResult, show_warnings: bool) -> String {
        if self.format == OutputFormat::Json {
            let json = serde_json::json!({
                "valid": result.is_valid(),
                "project": config.qualified_name(),
                "region": config.region_label(),
                "warnings": result.warnings.iter().map(ToString::to_string).collect::<Vec<_>>(),
            });
            return serde_json::to_string_pretty(&json).unwrap_or_default();
        }

        let mut output = format!("{} Configuration is valid\n", "✓".green());
        if show_warnings && !result.warnings.is_empty() {
            let _ = write!(output, "\n{} Warnings:\n", "⚠".yellow());
            for warning in &result.warnings {
                let _ = writeln!(output, "   - {warning}");
            }
        }

        let _ = write!(output, "\nStack: {}\n", config.qualified_name());
        let _ = writeln!(output, "   Region: {}", config.region_label());
        let _ = writeln!(output, "   Network: {}", config.network.cidr_block);
        let _ = writeln!(output, "   Max zones: {}", config.network.max_zones);
        if !config.network.zones.is_empty() {
            let _ = writeln!(output, "   Pinned zones: {}", config.network.zones.join(", "));
        }
        let _ = writeln!(output, "   Engine: {:?}", config.engine.kind);
        let _ = writeln!(output, "   Manifest backend: {:?}", config.state.backend);

        output
    }

    /// Formats the selected zones and their planned subnets.
    #[must_use]
    pub fn format_zones(&self, region: &str, zones: &[Zone], layout: &SubnetLayout) -> String {
        if self.format == OutputFormat::Json {
            return serde_json::to_string_pretty(&ZonesJson { region, zones, layout }).unwrap_or_default();
        }

        let rows: Vec<ZoneRow> = layout
            .private
            .iter()
            .zip(&layout.public)
            .map(|(private, public)| ZoneRow {
                zone: private.zone.to_string(),
                private: private.cidr.to_string(),
                public: public.cidr.to_string(),
            })
            .collect();

        let mut output = format!("\nZones in {region}: {}\n\n", zones.len());
        output.push_str(&Table::new(rows).to_string());
        output.push('\n');
        output
    }

    /// Formats a planned run.
    ///
    /// `diff` compares the run with the last applied manifest, if any.
    #[must_use]
    pub fn format_plan(&self, run: &StackRun, fingerprint: &str, diff: Option<&ManifestDiff>, detailed: bool) -> String {
        if self.format == OutputFormat::Json {
            return serde_json::to_string_pretty(&PlanJson::new(run, fingerprint, diff)).unwrap_or_default();
        }

        let mut output = String::new();
        let _ = write!(output, "\nStack plan via {} engine\n", run.engine);
        let _ = writeln!(
            output,
            "   Zones: {}",
            run.zones.iter().map(Zone::as_str).collect::<Vec<_>>().join(", ")
        );
        let _ = write!(
            output,
            "   Fingerprint: {}\n\n",
            DeclarationHasher::new().short_hash(fingerprint)
        );

        output.push_str(&Self::declaration_table(
            run.submissions().map(|s| (&s.declaration, Some(&s.id))),
        ));
        output.push('\n');

        if detailed {
            output.push_str("\nProperties:\n");
            for declaration in run.declarations() {
                let properties = serde_json::to_string(&declaration.redacted()).unwrap_or_default();
                let _ = writeln!(output, "   {}: {properties}", declaration.name.bold());
            }
        }

        let _ = write!(output, "\nPlan: {} declarations\n", run.len().to_string().green());
        match diff {
            None => {
                let _ = writeln!(output, "No previous apply recorded.");
            }
            Some(diff) if diff.is_empty() => {
                let _ = writeln!(
                    output,
                    "{} Matches the last apply, nothing has changed.",
                    "✓".green()
                );
            }
            Some(diff) => {
                let _ = writeln!(output, "{} Differs from the last apply: {diff}", "~".yellow());
                for name in &diff.added {
                    let _ = writeln!(output, "   {} {name}", "+".green());
                }
                for name in &diff.changed {
                    let _ = writeln!(output, "   {} {name}", "~".yellow());
                }
                for name in &diff.removed {
                    let _ = writeln!(output, "   {} {name}", "-".red());
                }
            }
        }

        output
    }

    /// Formats a stored manifest.
    #[must_use]
    pub fn format_manifest(&self, manifest: &StackManifest, location: &str) -> String {
        if self.format == OutputFormat::Json {
            return serde_json::to_string_pretty(manifest).unwrap_or_default();
        }

        let hasher = DeclarationHasher::new();
        let mut output = String::new();
        let _ = write!(
            output,
            "\nManifest: {}/{}\n\n",
            manifest.project, manifest.environment
        );
        let _ = writeln!(output, "   Location: {location}");
        let _ = writeln!(output, "   Version: {}", manifest.version);
        let _ = writeln!(output, "   Run: {}", manifest.run_id);
        let _ = writeln!(output, "   Engine: {}", manifest.engine);
        let _ = writeln!(output, "   Fingerprint: {}", hasher.short_hash(&manifest.fingerprint));
        let _ = writeln!(output, "   Applied: {}", manifest.generated_at.format("%Y-%m-%d %H:%M:%S UTC"));
        let _ = write!(
            output,
            "   Zones: {}\n\n",
            manifest.zones.iter().map(Zone::as_str).collect::<Vec<_>>().join(", ")
        );

        output.push_str(&Self::declaration_table(
            manifest.resources.iter().map(|e| (&e.declaration, Some(&e.id))),
        ));
        output.push('\n');

        if !manifest.history.is_empty() {
            let _ = writeln!(output, "\n   Recent history ({}):", manifest.history.len());
            for entry in manifest.history.iter().rev().take(5) {
                let _ = writeln!(
                    output,
                    "     {} {} via {} ({} declarations)",
                    entry.timestamp.format("%Y-%m-%d %H:%M"),
                    hasher.short_hash(&entry.fingerprint),
                    entry.engine,
                    entry.resource_count
                );
            }
        }

        output
    }

    /// Formats the outcome of an apply.
    #[must_use]
    pub fn format_applied(&self, manifest: &StackManifest, location: &str) -> String {
        if self.format == OutputFormat::Json {
            return serde_json::to_string_pretty(manifest).unwrap_or_default();
        }

        format!(
            "\n{} Applied {} declarations via {} engine\n   Manifest written to {location}\n",
            "✓".green(),
            manifest.resources.len(),
            manifest.engine
        )
    }

    fn declaration_table<'a>(entries: impl Iterator<Item = (&'a Declaration, Option<&'a ResourceId>)>) -> String {
        let rows: Vec<DeclarationRow> = entries
            .enumerate()
            .map(|(i, (declaration, id))| DeclarationRow {
                index: i + 1,
                kind: declaration.kind().to_string(),
                name: declaration.name.clone(),
                id: id.map_or_else(|| String::from("-"), ToString::to_string),
                details: describe(&declaration.spec),
            })
            .collect();

        Table::new(rows).to_string()
    }
}

/// One-line summary of a declaration's properties.
fn describe(spec: &ResourceSpec) -> String {
    match spec {
        ResourceSpec::Vpc { cidr_block, .. } => cidr_block.to_string(),
        ResourceSpec::InternetGateway { vpc_id, .. } | ResourceSpec::RouteTable { vpc_id } => {
            format!("in {vpc_id}")
        }
        ResourceSpec::Subnet {
            cidr_block,
            availability_zone,
            ..
        } => format!("{cidr_block} in {availability_zone}"),
        ResourceSpec::Route {
            destination_cidr_block,
            gateway_id,
            ..
        } => format!("{destination_cidr_block} -> {gateway_id}"),
        ResourceSpec::RouteTableAssociation {
            subnet_id,
            route_table_id,
        } => format!("{subnet_id} -> {route_table_id}"),
        ResourceSpec::DbSubnetGroup { subnet_ids, .. } => format!("{} private subnets", subnet_ids.len()),
        ResourceSpec::DbCluster {
            engine,
            availability_zones,
            ..
        } => format!(
            "{engine} across {}",
            availability_zones
                .iter()
                .map(Zone::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        ),
        ResourceSpec::DbClusterInstance {
            instance_class,
            cluster_identifier,
            ..
        } => format!("{instance_class} in {cluster_identifier}"),
    }
}

// JSON serialization helpers

#[derive(Serialize)]
struct ZonesJson<'a> {
    region: &'a str,
    zones: &'a [Zone],
    layout: &'a SubnetLayout,
}

#[derive(Serialize)]
struct PlanJson<'a> {
    engine: &'a str,
    fingerprint: &'a str,
    zones: &'a [Zone],
    changed: Option<bool>,
    diff: Option<&'a ManifestDiff>,
    declarations: Vec<DeclarationJson>,
}

#[derive(Serialize)]
struct DeclarationJson {
    id: ResourceId,
    #[serde(flatten)]
    declaration: Declaration,
}

impl<'a> PlanJson<'a> {
    fn new(run: &'a StackRun, fingerprint: &'a str, diff: Option<&'a ManifestDiff>) -> Self {
        Self {
            engine: run.engine,
            fingerprint,
            zones: &run.zones,
            changed: diff.map(|d| !d.is_empty()),
            diff,
            declarations: run
                .submissions()
                .map(|s| DeclarationJson {
                    id: s.id.clone(),
                    declaration: s.declaration.redacted(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DatabaseConfig, StackConfig};
    use crate::pipeline::StackPipeline;
    use crate::topology::{REDACTED, StaticZoneSource};

    fn config() -> StackConfig {
        let yaml = r"
project:
  name: app
network:
  zones: [us-east-1a, us-east-1b]
";
        let mut config: StackConfig = serde_yaml::from_str(yaml).unwrap();
        config.database = DatabaseConfig {
            username: Some(String::from("admin")),
            password: Some(String::from("hunter2")),
            instance_class: Some(String::from("db.r6g.large")),
            ..DatabaseConfig::default()
        };
        config
    }

    async fn preview() -> StackRun {
        let config = config();
        let zones = StaticZoneSource::new("us-east-1", vec![Zone::new("us-east-1a"), Zone::new("us-east-1b")]);
        StackPipeline::new(&config, &zones)
            .prepare()
            .await
            .unwrap()
            .preview()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_plan_text_lists_declarations() {
        let run = preview().await;
        let fingerprint = run.fingerprint().unwrap();
        let output = OutputFormatter::new(OutputFormat::Text).format_plan(&run, &fingerprint, None, true);

        assert!(output.contains("public-route-table-association-1"));
        assert!(output.contains("10.0.3.0/24 in us-east-1b"));
        assert!(output.contains("No previous apply recorded"));
        assert!(!output.contains("hunter2"));
    }

    #[tokio::test]
    async fn test_plan_json_is_redacted() {
        let run = preview().await;
        let fingerprint = run.fingerprint().unwrap();
        let output = OutputFormatter::new(OutputFormat::Json).format_plan(&run, &fingerprint, None, false);

        let json: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(json["declarations"].as_array().unwrap().len(), run.len());
        assert_eq!(json["declarations"][0]["name"], "vpc");
        assert!(json["changed"].is_null());
        assert!(output.contains(REDACTED));
        assert!(!output.contains("hunter2"));
    }

    #[test]
    fn test_describe_route() {
        let spec = ResourceSpec::Route {
            route_table_id: ResourceId::new("rtb-1"),
            destination_cidr_block: String::from("0.0.0.0/0"),
            gateway_id: ResourceId::new("igw-1"),
        };
        assert_eq!(describe(&spec), "0.0.0.0/0 -> igw-1");
    }
}
