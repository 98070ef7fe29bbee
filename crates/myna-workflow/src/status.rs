//! Markdown overview of what this installation supports.

use std::fmt::Write;

use myna_components::ComponentRegistry;
use myna_files::FileKind;
use myna_metadata::MetadataRegistry;

fn or_dash(text: &str) -> &str {
    if text.is_empty() { "-" } else { text }
}

/// Tables of registered component classes, file kinds and metadata.
pub fn status_markdown(components: &ComponentRegistry, metadata: &MetadataRegistry) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Myna status\n");

    let _ = writeln!(out, "## Components\n");
    let _ = writeln!(out, "| Class | Kind | Types | Input | Output | Data requirements |");
    let _ = writeln!(out, "|---|---|---|---|---|---|");
    for (name, spec) in components.iter() {
        let _ = writeln!(
            out,
            "| `{name}` | {} | {} | {} | {} | {} |",
            spec.kind,
            spec.type_names().join(", "),
            spec.input.map_or("-", FileKind::name),
            spec.output.map_or("-", FileKind::name),
            or_dash(&spec.data_requirements.join(", ")),
        );
    }

    let _ = writeln!(out, "\n## File kinds\n");
    let _ = writeln!(out, "| Kind | Extension | Required columns |");
    let _ = writeln!(out, "|---|---|---|");
    for kind in FileKind::ALL {
        let _ = writeln!(
            out,
            "| {} | `{}` | {} |",
            kind.name(),
            kind.filetype(),
            or_dash(&kind.required_columns().join(", ")),
        );
    }

    let _ = writeln!(out, "\n## Metadata\n");
    let _ = writeln!(out, "| Name | Scope | Unit | Description |");
    let _ = writeln!(out, "|---|---|---|---|");
    for spec in metadata.iter() {
        let _ = writeln!(
            out,
            "| `{}` | {} | {} | {} |",
            spec.name,
            spec.scope,
            or_dash(&spec.unit),
            spec.description,
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_every_registered_class() {
        let components = ComponentRegistry::with_builtins();
        let text = status_markdown(&components, &MetadataRegistry::with_builtins());
        for name in components.names() {
            assert!(text.contains(&format!("`{name}`")), "{name}");
        }
        assert!(text.contains("| FileGV | `.csv` |"));
        assert!(text.contains("`laser_power`"));
    }
}
