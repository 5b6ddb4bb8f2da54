//! Plain-text rendering of panels.

use crate::effectiveness::EffectGroup;
use crate::tracker::Panel;

/// Uppercase the first character.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// One group as `<label>X : Type, Type`.
pub fn render_group(group: &EffectGroup) -> String {
    let names: Vec<String> = group.categories.iter().map(|c| capitalize(c)).collect();
    format!("{}X : {}", group.multiplier.label(), names.join(", "))
}

/// A title line with the creature name, then one line per group.
pub fn render_panel(panel: &Panel) -> Vec<String> {
    let mut lines = Vec::with_capacity(panel.groups.len() + 1);
    lines.push(capitalize(&panel.name));
    lines.extend(panel.groups.groups().iter().map(render_group));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CompatibilityRow;
    use crate::effectiveness::aggregate;

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("fire"), "Fire");
        assert_eq!(capitalize("mr-mime"), "Mr-mime");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_render_panel() {
        let row = CompatibilityRow {
            double_from: vec!["water".into(), "ground".into(), "rock".into()],
            zero_from: vec![],
            half_from: vec!["fire".into(), "grass".into(), "ice".into()],
        };
        let effectiveness = aggregate(&["fire".to_string()], |_| Some(row.clone()));
        let panel = Panel {
            name: "charmander".to_string(),
            groups: effectiveness.grouped(),
            unresolved: vec![],
        };

        assert_eq!(
            render_panel(&panel),
            vec![
                "Charmander",
                "1/2X : Fire, Grass, Ice",
                "2X : Water, Ground, Rock",
            ]
        );
    }

    #[test]
    fn test_render_empty_panel() {
        let panel = Panel {
            name: "ditto".to_string(),
            groups: Default::default(),
            unresolved: vec!["normal".to_string()],
        };
        assert_eq!(render_panel(&panel), vec!["Ditto"]);
    }
}
