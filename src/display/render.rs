use crate::worth::{format_decimal, EntityWorthSnapshot};

/// Text shown on a display until the first breakdown is pushed
pub const LOADING_TEXT: &str = "ISLAND VALUE\nLoading...";

/// Hologram text for one island snapshot
pub fn render_hologram(snapshot: &EntityWorthSnapshot) -> String {
    let mut lines = vec!["ISLAND VALUE".to_string()];

    match snapshot.worth_rank {
        Some(1) => lines.push("Rank: #1 (Top)".to_string()),
        Some(rank) => lines.push(format!("Rank: #{}", rank)),
        None => {}
    }

    lines.push(format!("Owner: {}", snapshot.owner_name));
    lines.push(match snapshot.total_worth {
        Some(worth) => format!("Worth: {}", format_decimal(worth)),
        None => "Worth: N/A".to_string(),
    });

    if snapshot.top_lines.is_empty() {
        lines.push("No block breakdown available".to_string());
    } else {
        lines.push("Top blocks:".to_string());
        for (idx, line) in snapshot.top_lines.iter().enumerate() {
            let star = if idx == 0 { "★ " } else { "" };
            lines.push(format!(
                "  {}) {}{} x{} ({}) = {}",
                idx + 1,
                star,
                line.key(),
                line.amount(),
                format_decimal(line.worth_each()),
                format_decimal(line.worth_total()),
            ));
        }
    }

    lines.join("\n")
}
