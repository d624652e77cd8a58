// Text command surface: island value lookup by name

use crate::presence::ObserverSource;
use crate::service::WorthService;
use crate::worth::format_decimal;
use std::sync::Arc;

pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// `/<label> info` and `/<label> <name>`
pub struct ValueCommand {
    service: Arc<WorthService>,
    observers: Arc<dyn ObserverSource>,
}

impl ValueCommand {
    pub fn new(service: Arc<WorthService>, observers: Arc<dyn ObserverSource>) -> Self {
        Self { service, observers }
    }

    /// Run the command and return the reply lines.
    ///
    /// The breakdown is computed on demand from the provider, not the cache.
    pub fn execute(&self, label: &str, args: &[String]) -> Vec<String> {
        let Some(first) = args.first() else {
            return vec![format!("Usage: /{} info", label)];
        };

        if first.eq_ignore_ascii_case("info") {
            return self.info(label);
        }

        if args.len() > 1 {
            return vec![format!("Unknown subcommand. Try: /{} info", label)];
        }

        self.island_value(first)
    }

    fn info(&self, label: &str) -> Vec<String> {
        let provider = if self.service.provider().is_available() {
            "available"
        } else {
            "unavailable"
        };
        vec![
            format!("{} v{}", NAME, VERSION),
            format!("Provider: {}", provider),
            format!("Command: /{} info", label),
        ]
    }

    fn island_value(&self, name: &str) -> Vec<String> {
        let limit = self.service.config().breakdown.command_limit;
        let Some((details, lines)) = self.service.lookup_by_name(name, limit) else {
            return vec![format!(
                "Couldn't get island value for '{}'. (No island / player not found / island data unavailable)",
                name
            )];
        };

        let mut out = vec![format!(
            "Island value for {}: {}",
            name,
            format_decimal(details.worth)
        )];

        if lines.is_empty() {
            out.push("  (No block breakdown available)".to_string());
            return out;
        }

        out.push("Top blocks:".to_string());
        for (idx, line) in lines.iter().enumerate() {
            let star = if idx == 0 { "★ " } else { "" };
            out.push(format!(
                "  {}) {}{} x{} @ {} = {}",
                idx + 1,
                star,
                line.key(),
                line.amount(),
                format_decimal(line.worth_each()),
                format_decimal(line.worth_total()),
            ));
        }
        out
    }

    /// Suggestions for the argument being typed.
    ///
    /// Only the first argument completes: `info` plus online observer names,
    /// filtered by case-insensitive prefix.
    pub fn complete(&self, args: &[String]) -> Vec<String> {
        let [prefix] = args else {
            return Vec::new();
        };

        let mut options = vec!["info".to_string()];
        options.extend(
            self.observers
                .online_observers()
                .into_iter()
                .map(|observer| observer.name),
        );
        filter_prefix(options, prefix)
    }
}

fn filter_prefix(options: Vec<String>, prefix: &str) -> Vec<String> {
    if prefix.is_empty() {
        return options;
    }
    let prefix = prefix.to_lowercase();
    options
        .into_iter()
        .filter(|option| option.to_lowercase().starts_with(&prefix))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceConfig;
    use crate::display::DisplayBoard;
    use crate::presence::{Observer, PresenceRegistry};
    use crate::provider::{FeedDocument, FeedProvider, Location, ProviderStatus, WorthProvider};
    use serde_json::json;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn command_with(provider: FeedProvider) -> (ValueCommand, Arc<PresenceRegistry>) {
        let presence = Arc::new(PresenceRegistry::new());
        let provider: Arc<dyn WorthProvider> = Arc::new(provider);
        let service = Arc::new(WorthService::new(
            provider,
            presence.clone(),
            Arc::new(DisplayBoard::new()),
            ServiceConfig::default(),
        ));
        (ValueCommand::new(service, presence.clone()), presence)
    }

    fn command() -> (ValueCommand, Arc<PresenceRegistry>) {
        let doc: FeedDocument = serde_json::from_value(json!({
            "schema_version": 1,
            "block_values": { "DIAMOND_BLOCK": "300", "SPAWNER:ZOMBIE": "12.5" },
            "islands": [
                {
                    "id": "00000000-0000-0000-0000-00000000000a",
                    "owner": "Steve",
                    "worth": "950.00",
                    "block_counts": { "DIAMOND_BLOCK": 3, "SPAWNER:ZOMBIE": 4 }
                },
                {
                    "id": "00000000-0000-0000-0000-00000000000b",
                    "owner": "Herobrine",
                    "worth": "10"
                }
            ]
        }))
        .unwrap();
        command_with(FeedProvider::from_document(doc))
    }

    #[test]
    fn test_no_args_prints_usage() {
        let (cmd, _) = command();
        assert_eq!(cmd.execute("isvalue", &[]), vec!["Usage: /isvalue info"]);
    }

    #[test]
    fn test_info() {
        let (cmd, _) = command();
        let out = cmd.execute("isvalue", &args(&["INFO"]));
        assert_eq!(out.len(), 3);
        assert!(out[0].starts_with(NAME));
        assert_eq!(out[1], "Provider: available");
        assert_eq!(out[2], "Command: /isvalue info");
    }

    #[test]
    fn test_island_value_with_breakdown() {
        let (cmd, _) = command();
        let out = cmd.execute("isvalue", &args(&["steve"]));
        assert_eq!(
            out,
            vec![
                "Island value for steve: 950",
                "Top blocks:",
                "  1) ★ DIAMOND_BLOCK x3 @ 300 = 900",
                "  2) SPAWNER:ZOMBIE x4 @ 12.5 = 50",
            ]
        );
    }

    #[test]
    fn test_island_value_without_breakdown() {
        let (cmd, _) = command();
        let out = cmd.execute("isvalue", &args(&["Herobrine"]));
        assert_eq!(
            out,
            vec!["Island value for Herobrine: 10", "  (No block breakdown available)"]
        );
    }

    #[test]
    fn test_unknown_player() {
        let (cmd, _) = command();
        let out = cmd.execute("isvalue", &args(&["nobody"]));
        assert_eq!(out.len(), 1);
        assert!(out[0].starts_with("Couldn't get island value for 'nobody'."));
    }

    #[test]
    fn test_unavailable_provider() {
        let (cmd, _) = command_with(FeedProvider::unavailable(ProviderStatus::Absent));
        assert_eq!(cmd.execute("isvalue", &args(&["info"]))[1], "Provider: unavailable");
        assert!(cmd.execute("isvalue", &args(&["steve"]))[0].starts_with("Couldn't get"));
    }

    #[test]
    fn test_extra_args_are_rejected() {
        let (cmd, _) = command();
        assert_eq!(
            cmd.execute("worth", &args(&["steve", "extra"])),
            vec!["Unknown subcommand. Try: /worth info"]
        );
    }

    #[test]
    fn test_completion() {
        let (cmd, presence) = command();
        for (id, name) in [(1, "Steve"), (2, "Sam"), (3, "Alex")] {
            presence.upsert(Observer {
                id: uuid::Uuid::from_u128(id),
                name: name.to_string(),
                location: Location::new("skyblock", 0.0, 0.0, 0.0),
            });
        }

        let mut all = cmd.complete(&args(&[""]));
        all.sort();
        assert_eq!(all, vec!["Alex", "Sam", "Steve", "info"]);

        let mut s = cmd.complete(&args(&["s"]));
        s.sort();
        assert_eq!(s, vec!["Sam", "Steve"]);

        assert_eq!(cmd.complete(&args(&["IN"])), vec!["info"]);
        assert!(cmd.complete(&args(&["steve", ""])).is_empty());
        assert!(cmd.complete(&[]).is_empty());
    }
}
