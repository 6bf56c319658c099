//! Transport-neutral inline keyboards.

use crate::callback::Callback;

/// What pressing a button does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonAction {
    Callback(String),
    Url(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub text: String,
    pub action: ButtonAction,
}

impl Button {
    pub fn callback(text: impl Into<String>, callback: Callback) -> Self {
        Self {
            text: text.into(),
            action: ButtonAction::Callback(callback.to_string()),
        }
    }

    pub fn url(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            action: ButtonAction::Url(url.into()),
        }
    }
}

/// Rows of buttons attached to a message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row.
    pub fn row(mut self, row: Vec<Button>) -> Self {
        if !row.is_empty() {
            self.rows.push(row);
        }
        self
    }

    /// Append a single-button row.
    pub fn button(self, text: impl Into<String>, callback: Callback) -> Self {
        self.row(vec![Button::callback(text, callback)])
    }

    /// Lay buttons out `per_row` to a row.
    pub fn grid(mut self, buttons: Vec<Button>, per_row: usize) -> Self {
        let mut buttons = buttons.into_iter().peekable();
        while buttons.peek().is_some() {
            let row: Vec<Button> = buttons.by_ref().take(per_row.max(1)).collect();
            self.rows.push(row);
        }
        self
    }

    /// Append the Back / Cancel row.
    pub fn nav(self) -> Self {
        self.row(vec![
            Button::callback("⬅️ Back", Callback::Back),
            Button::callback("✖️ Cancel", Callback::Cancel),
        ])
    }

    /// Append a single "Main menu" row.
    pub fn home(self) -> Self {
        self.button("🏠 Main menu", Callback::MainMenu)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Every callback tag on the keyboard, row by row.
    pub fn callbacks(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().flatten().filter_map(|b| match &b.action {
            ButtonAction::Callback(tag) => Some(tag.as_str()),
            ButtonAction::Url(_) => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_splits_rows() {
        let buttons = (1..=5)
            .map(|i| Button::callback(format!("#{i}"), Callback::StockItem(i)))
            .collect();
        let kb = Keyboard::new().grid(buttons, 2).nav();

        assert_eq!(kb.rows.len(), 4);
        assert_eq!(kb.rows[2].len(), 1);
        assert_eq!(
            kb.callbacks().collect::<Vec<_>>(),
            vec![
                "st:item:1",
                "st:item:2",
                "st:item:3",
                "st:item:4",
                "st:item:5",
                "nav:back",
                "nav:cancel"
            ]
        );
    }

    #[test]
    fn test_empty_rows_are_skipped() {
        let kb = Keyboard::new().row(vec![]).grid(vec![], 3);
        assert!(kb.is_empty());
    }
}
