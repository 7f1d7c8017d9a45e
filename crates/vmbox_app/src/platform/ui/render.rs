use vmbox_core::{RegionStatus, RegionView, Spoilers};

const SPINNER_FRAMES: [char; 4] = ['|', '/', '-', '\\'];

/// Renders one region as terminal text. Busy regions show only a spinner.
pub fn render_region(region: &RegionView, reveal_spoilers: bool) -> String {
    let mut lines = Vec::new();
    match region.status {
        RegionStatus::Busy => {
            let frame = SPINNER_FRAMES[region.poll_attempts as usize % SPINNER_FRAMES.len()];
            lines.push(format!(
                "[{}] {} working (checks: {})",
                region.name, frame, region.poll_attempts
            ));
        }
        RegionStatus::Idle => {
            lines.push(format!("[{}] ready", region.name));
            if let Some(content) = region.content.as_deref() {
                let mut spoilers = Spoilers::scan(content);
                if reveal_spoilers {
                    spoilers.reveal_all();
                }
                let shown = if spoilers.is_empty() {
                    content.to_string()
                } else {
                    spoilers.render()
                };
                lines.extend(shown.lines().map(|line| format!("  {}", line.trim_end())));
            }
            if !region.forms.is_empty() {
                lines.push("  actions:".to_string());
                for (index, form) in region.forms.iter().enumerate() {
                    lines.push(format!(
                        "    form {index} -> {}: {}",
                        form.target_url,
                        form.actions.join(", ")
                    ));
                }
            }
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use vmbox_core::{FormRef, FormView, RegionStatus, RegionView};

    use super::render_region;

    fn idle(content: &str) -> RegionView {
        RegionView {
            id: 1,
            name: "scenario_sidebar".to_string(),
            status: RegionStatus::Idle,
            spinner_visible: false,
            content: Some(content.to_string()),
            forms: vec![FormView {
                form: FormRef {
                    generation: 1,
                    index: 0,
                },
                target_url: "http://lab.example/scenario/manage_vm/web".to_string(),
                actions: vec!["start".to_string(), "reset".to_string()],
            }],
            last_failure: None,
            poll_attempts: 0,
        }
    }

    #[test]
    fn idle_region_lists_content_and_actions() {
        let text = render_region(&idle("<div>Running</div>"), false);
        assert_eq!(
            text,
            "[scenario_sidebar] ready\n  <div>Running</div>\n  actions:\n    form 0 -> http://lab.example/scenario/manage_vm/web: start, reset"
        );
    }

    #[test]
    fn spoilers_are_hidden_unless_revealed() {
        let view = idle(r#"<p>Hint</p><div class="spoiler">flag</div>"#);
        let hidden = render_region(&view, false);
        assert!(hidden.contains("show spoiler"));
        assert!(!hidden.contains("flag"));

        let shown = render_region(&view, true);
        assert!(shown.contains("flag"));
        assert!(!shown.contains("show spoiler"));
    }

    #[test]
    fn busy_region_hides_content() {
        let view = RegionView {
            status: RegionStatus::Busy,
            spinner_visible: true,
            content: None,
            poll_attempts: 2,
            ..idle("<div>secret</div>")
        };
        assert_eq!(render_region(&view, false), "[scenario_sidebar] - working (checks: 2)");
    }
}
