//! Spoiler toggle: `.spoiler` blocks start hidden behind a reveal link.

use scraper::{ElementRef, Html, Selector};

pub const SPOILER_CLASS: &str = "spoiler";
pub const REVEAL_LABEL: &str = "show spoiler";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spoiler {
    outer_html: String,
    pub content_html: String,
    revealed: bool,
}

impl Spoiler {
    pub fn is_revealed(&self) -> bool {
        self.revealed
    }

    pub fn affordance_visible(&self) -> bool {
        !self.revealed
    }
}

/// All top-level spoilers of one markup fragment.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Spoilers {
    markup: String,
    items: Vec<Spoiler>,
}

impl Spoilers {
    pub fn scan(markup: &str) -> Self {
        let Ok(sel) = Selector::parse(".spoiler") else {
            return Self::default();
        };
        let fragment = Html::parse_fragment(markup);
        let items: Vec<Spoiler> = fragment
            .select(&sel)
            .filter(|node| !inside_spoiler(node))
            .map(|node| Spoiler {
                outer_html: node.html(),
                content_html: node.inner_html(),
                revealed: false,
            })
            .collect();
        let markup = fragment.root_element().inner_html();
        Self { markup, items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Spoiler> {
        self.items.get(index)
    }

    /// Shows spoiler `index` and hides its reveal link. Returns false if
    /// there is no such spoiler or it was already shown.
    pub fn reveal(&mut self, index: usize) -> bool {
        match self.items.get_mut(index) {
            Some(item) if !item.revealed => {
                item.revealed = true;
                true
            }
            _ => false,
        }
    }

    pub fn reveal_all(&mut self) {
        for item in &mut self.items {
            item.revealed = true;
        }
    }

    /// The fragment with every hidden spoiler replaced by its reveal link.
    pub fn render(&self) -> String {
        let affordance = format!("<a class=\"reveal_spoiler\">{REVEAL_LABEL}</a> ");
        let mut out = String::with_capacity(self.markup.len());
        let mut cursor = 0;
        for item in &self.items {
            let Some(offset) = self.markup[cursor..].find(&item.outer_html) else {
                continue;
            };
            let start = cursor + offset;
            let end = start + item.outer_html.len();
            out.push_str(&self.markup[cursor..start]);
            if item.revealed {
                out.push_str(&item.outer_html);
            } else {
                out.push_str(&affordance);
            }
            cursor = end;
        }
        out.push_str(&self.markup[cursor..]);
        out
    }
}

fn inside_spoiler(node: &ElementRef<'_>) -> bool {
    node.ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| ancestor.value().classes().any(|class| class == SPOILER_CLASS))
}
