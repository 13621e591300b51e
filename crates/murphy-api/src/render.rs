use std::fmt::Write;

use crate::view::StatusView;

/// HTML page listing the counters and every running container.
pub fn render_index(view: &StatusView) -> String {
    let mut html = String::with_capacity(1024);
    html.push_str("<!DOCTYPE html>\n<html>\n<head><title>murphy</title></head>\n<body>\n");
    let _ = writeln!(
        html,
        "<p>Requested: {} | Completed: {} | Failed: {} | Progress: {:.0}%</p>",
        view.requested,
        view.completed,
        view.failed,
        view.progress * 100.0
    );

    html.push_str("<table>\n<tr><th>Container</th><th>Memory (MB)</th><th>VCores</th><th>Command</th></tr>\n");
    for container in &view.containers {
        let _ = writeln!(
            html,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape(&container.container_id),
            container.memory_mb,
            container.vcores,
            escape(&container.command.join(" "))
        );
    }
    html.push_str("</table>\n</body>\n</html>\n");
    html
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::ContainerView;

    #[test]
    fn lists_running_containers_escaped() {
        let view = StatusView {
            requested: 2,
            completed: 1,
            failed: 0,
            progress: 0.5,
            containers: vec![ContainerView {
                container_id: "container_000002".into(),
                memory_mb: 512,
                vcores: 1,
                priority: 0,
                command: vec!["sh".into(), "-c".into(), "a<b && c".into()],
            }],
        };

        let html = render_index(&view);
        assert!(html.contains("Requested: 2 | Completed: 1 | Failed: 0 | Progress: 50%"));
        assert!(html.contains("<td>container_000002</td><td>512</td>"));
        assert!(html.contains("sh -c a&lt;b &amp;&amp; c"));
    }
}
