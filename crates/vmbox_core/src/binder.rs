//! View binder: turns server-supplied markup into bound, submittable forms.
//!
//! Replacing a region's content invalidates every form bound to the old
//! content, so each bind bumps the region's generation and rescans the new
//! fragment. A [`FormRef`] from an older generation can never dispatch.

use scraper::{ElementRef, Html, Selector};
use url::Url;
use vmbox_logging::{vmbox_debug, vmbox_warn};

use crate::PendingAction;

/// Name of the control carrying the action to perform.
pub const ACTION_FIELD: &str = "action";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FormRef {
    pub generation: u64,
    pub index: usize,
}

/// A form that passed the submittable-action contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionForm {
    /// The form's `action` attribute, resolved against the page URL.
    pub target_url: String,
    pub credential: String,
    /// Actions this form can submit, in document order.
    pub actions: Vec<String>,
}

impl ActionForm {
    pub fn offers(&self, action: &str) -> bool {
        self.actions.iter().any(|candidate| candidate == action)
    }

    pub fn pending(&self, action: &str) -> PendingAction {
        PendingAction {
            action_name: action.to_string(),
            credential: self.credential.clone(),
            endpoint_url: self.target_url.clone(),
        }
    }
}

/// Finds every `form[name=form_name]` in `markup` that offers at least one action.
pub fn scan_forms(
    markup: &str,
    base_url: &Url,
    form_name: &str,
    credential_field: &str,
) -> Vec<ActionForm> {
    let (Ok(form_sel), Ok(control_sel)) = (
        Selector::parse("form"),
        Selector::parse("input, button, select"),
    ) else {
        return Vec::new();
    };
    let fragment = Html::parse_fragment(markup);

    let forms = fragment
        .select(&form_sel)
        .filter(|form| form.value().attr("name") == Some(form_name))
        .filter_map(|form| {
            let target_url = match resolve_target(base_url, form.value().attr("action")) {
                Ok(url) => url,
                Err(err) => {
                    vmbox_warn!("Skipping form with unresolvable target: {}", err);
                    return None;
                }
            };
            let controls: Vec<ElementRef<'_>> = form.select(&control_sel).collect();
            let credential = controls
                .iter()
                .find(|control| control.value().attr("name") == Some(credential_field))
                .and_then(|control| control.value().attr("value"))
                .unwrap_or_default()
                .to_string();
            let actions = collect_actions(&controls, credential_field);
            if actions.is_empty() {
                vmbox_debug!("Skipping form targeting {} without actions", target_url);
                return None;
            }
            Some(ActionForm {
                target_url,
                credential,
                actions,
            })
        })
        .collect();
    forms
}

/// Inner markup of the element whose `id` is `name`.
pub fn extract_region(page: &str, name: &str) -> Option<String> {
    let sel = Selector::parse("[id]").ok()?;
    let doc = Html::parse_document(page);
    let found = doc
        .select(&sel)
        .find(|node| node.value().id() == Some(name))
        .map(|node| node.inner_html());
    found
}

fn resolve_target(base_url: &Url, action_attr: Option<&str>) -> Result<String, url::ParseError> {
    match action_attr.map(str::trim) {
        None | Some("") => Ok(base_url.to_string()),
        Some(target) => base_url.join(target).map(String::from),
    }
}

fn collect_actions(controls: &[ElementRef<'_>], credential_field: &str) -> Vec<String> {
    let mut actions: Vec<String> = Vec::new();
    let mut push = |candidate: &str| {
        let candidate = candidate.trim();
        if !candidate.is_empty() && !actions.iter().any(|a| a == candidate) {
            actions.push(candidate.to_string());
        }
    };

    for control in controls {
        let element = control.value();
        let name = element.attr("name").unwrap_or_default();
        if name == ACTION_FIELD {
            match element.name() {
                "select" => {
                    for option in control
                        .descendants()
                        .filter_map(ElementRef::wrap)
                        .filter(|el| el.value().name() == "option")
                    {
                        let text = option.text().collect::<String>();
                        push(option.value().attr("value").unwrap_or(&text));
                    }
                }
                "button" => {
                    let text = control.text().collect::<String>();
                    push(element.attr("value").unwrap_or(&text));
                }
                _ => push(element.attr("value").unwrap_or_default()),
            }
        } else if !name.is_empty() && name != credential_field && is_submit_control(control) {
            // Older markup names each submit button after its action.
            push(name);
        }
    }
    actions
}

fn is_submit_control(control: &ElementRef<'_>) -> bool {
    let element = control.value();
    let kind = element.attr("type").map(str::to_ascii_lowercase);
    match element.name() {
        "input" => kind.as_deref() == Some("submit"),
        "button" => matches!(kind.as_deref(), None | Some("submit")),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use url::Url;

    use super::{extract_region, scan_forms};

    fn base() -> Url {
        Url::parse("http://lab.example/scenario/show/web").unwrap()
    }

    #[test]
    fn scans_hidden_action_and_credential() {
        let markup = r#"
            <form name="vmbox_form" method="post" action="/scenario/manage_vm/web">
              <input type="hidden" name="csrfmiddlewaretoken" value="tok">
              <input type="hidden" name="action" value="start">
              <input type="submit" value="Start">
            </form>"#;
        let forms = scan_forms(markup, &base(), "vmbox_form", "csrfmiddlewaretoken");
        assert_eq!(forms.len(), 1);
        assert_eq!(forms[0].target_url, "http://lab.example/scenario/manage_vm/web");
        assert_eq!(forms[0].credential, "tok");
        assert_eq!(forms[0].actions, vec!["start".to_string()]);
    }

    #[test]
    fn legacy_submit_buttons_become_actions() {
        let markup = r#"
            <form name="vmbox_form" method="post" action="">
              <input type="submit" name="suspend" value="Suspend">
              <input type="submit" name="stop" value="Stop">
              <button name="stop">Stop again</button>
            </form>"#;
        let forms = scan_forms(markup, &base(), "vmbox_form", "csrfmiddlewaretoken");
        assert_eq!(forms[0].target_url, base().to_string());
        assert_eq!(forms[0].credential, "");
        assert_eq!(forms[0].actions, vec!["suspend".to_string(), "stop".to_string()]);
    }

    #[test]
    fn select_options_and_buttons_are_read() {
        let markup = r#"
            <form name="vmbox_form" action="manage">
              <select name="action"><option value="start">Start</option><option>reset</option></select>
              <button name="action" value="stop">Stop</button>
            </form>"#;
        let forms = scan_forms(markup, &base(), "vmbox_form", "csrfmiddlewaretoken");
        assert_eq!(forms[0].target_url, "http://lab.example/scenario/show/manage");
        assert_eq!(
            forms[0].actions,
            vec!["start".to_string(), "reset".to_string(), "stop".to_string()]
        );
    }

    #[test]
    fn other_forms_and_empty_forms_are_skipped() {
        let markup = r#"
            <form name="secret_form" action="/submit_secret/web">
              <input type="hidden" name="action" value="start">
            </form>
            <form name="vmbox_form" action="/x"><p>nothing to submit</p></form>"#;
        let forms = scan_forms(markup, &base(), "vmbox_form", "csrfmiddlewaretoken");
        assert!(forms.is_empty());
    }

    #[test]
    fn extracts_region_by_id() {
        let page = r#"<html><body><div id="other">x</div>
            <div id="scenario_sidebar"><p>VM stopped</p></div></body></html>"#;
        assert_eq!(
            extract_region(page, "scenario_sidebar").as_deref(),
            Some("<p>VM stopped</p>")
        );
        assert_eq!(extract_region(page, "missing"), None);
    }
}
