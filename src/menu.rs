//! Menu registry
//!
//! Static, process-wide table of USSD screens. Each menu is either a numbered
//! choice list or a multi-step form that collects one field per step.

mod catalog;

pub use catalog::*;

use crate::state_machine::{Fields, PartyKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Identifier of a registered menu
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MenuId {
    Main,
    RegisterFarmer,
    RegisterBuyer,
    MarketPrices,
    Orders,
    CreateOrder,
    Account,
    Help,
}

impl MenuId {
    pub const ALL: [MenuId; 8] = [
        MenuId::Main,
        MenuId::RegisterFarmer,
        MenuId::RegisterBuyer,
        MenuId::MarketPrices,
        MenuId::Orders,
        MenuId::CreateOrder,
        MenuId::Account,
        MenuId::Help,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MenuId::Main => "main",
            MenuId::RegisterFarmer => "register_farmer",
            MenuId::RegisterBuyer => "register_buyer",
            MenuId::MarketPrices => "market_prices",
            MenuId::Orders => "orders",
            MenuId::CreateOrder => "create_order",
            MenuId::Account => "account",
            MenuId::Help => "help",
        }
    }

    /// Parse a stored identifier
    pub fn parse(s: &str) -> Result<Self, MenuError> {
        MenuId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| MenuError::UnknownMenu(s.to_string()))
    }
}

impl fmt::Display for MenuId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MenuError {
    #[error("Unknown menu: {0}")]
    UnknownMenu(String),
    #[error("Root menu {0} is not registered")]
    MissingRoot(MenuId),
    #[error("Menu {0} registered twice")]
    Duplicate(MenuId),
    #[error("Menu {from} links to unregistered menu {to}")]
    DanglingTarget { from: MenuId, to: MenuId },
    #[error("Form {0} has no fields")]
    EmptyForm(MenuId),
}

/// Where a numbered option leads
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Move to another menu
    Menu(MenuId),
    /// End the session with an informational screen
    End(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuOption {
    pub token: &'static str,
    pub target: Target,
}

impl MenuOption {
    pub fn to(token: &'static str, menu: MenuId) -> Self {
        Self {
            token,
            target: Target::Menu(menu),
        }
    }

    pub fn end(token: &'static str, text: &'static str) -> Self {
        Self {
            token,
            target: Target::End(text),
        }
    }
}

/// Accepted shape of a form field value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldFormat {
    /// Any non-empty text
    Text,
    /// Whole number greater than zero
    PositiveNumber,
    /// One of the listed tokens; the paired value is what gets stored
    Choice(Vec<(&'static str, &'static str)>),
}

impl FieldFormat {
    /// Normalize a raw token into the value to store, or `None` if rejected
    pub fn accept(&self, token: &str) -> Option<String> {
        let token = token.trim();
        if token.is_empty() {
            return None;
        }
        match self {
            FieldFormat::Text => Some(token.to_string()),
            FieldFormat::PositiveNumber => match token.parse::<u64>() {
                Ok(n) if n > 0 => Some(n.to_string()),
                _ => None,
            },
            FieldFormat::Choice(choices) => choices
                .iter()
                .find(|(key, _)| *key == token)
                .map(|(_, value)| (*value).to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub prompt: &'static str,
    pub format: FieldFormat,
}

impl Field {
    pub fn text(name: &'static str, prompt: &'static str) -> Self {
        Self {
            name,
            prompt,
            format: FieldFormat::Text,
        }
    }

    pub fn number(name: &'static str, prompt: &'static str) -> Self {
        Self {
            name,
            prompt,
            format: FieldFormat::PositiveNumber,
        }
    }

    pub fn choice(
        name: &'static str,
        prompt: &'static str,
        choices: Vec<(&'static str, &'static str)>,
    ) -> Self {
        Self {
            name,
            prompt,
            format: FieldFormat::Choice(choices),
        }
    }
}

/// What happens once every field of a form has been collected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Register {
        kind: PartyKind,
        confirmation: &'static str,
        welcome: &'static str,
    },
    PlaceOrder {
        confirmation: &'static str,
        notice: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuKind {
    Choice(Vec<MenuOption>),
    Form {
        fields: Vec<Field>,
        completion: Completion,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Menu {
    pub id: MenuId,
    /// Screen text for choice menus, heading for forms
    pub prompt: &'static str,
    pub kind: MenuKind,
}

impl Menu {
    pub fn choice(id: MenuId, prompt: &'static str, options: Vec<MenuOption>) -> Self {
        Self {
            id,
            prompt,
            kind: MenuKind::Choice(options),
        }
    }

    pub fn form(
        id: MenuId,
        prompt: &'static str,
        fields: Vec<Field>,
        completion: Completion,
    ) -> Self {
        Self {
            id,
            prompt,
            kind: MenuKind::Form { fields, completion },
        }
    }

    /// Number of steps in a form; zero for choice menus
    pub fn step_count(&self) -> usize {
        match &self.kind {
            MenuKind::Choice(_) => 0,
            MenuKind::Form { fields, .. } => fields.len(),
        }
    }

    pub fn field(&self, step: usize) -> Option<&Field> {
        match &self.kind {
            MenuKind::Choice(_) => None,
            MenuKind::Form { fields, .. } => fields.get(step),
        }
    }

    /// Text shown at the given step. Out-of-range steps fall back to the heading.
    pub fn screen(&self, step: usize) -> String {
        match self.field(step) {
            Some(field) => format!("{}\n{}", self.prompt, field.prompt),
            None => self.prompt.to_string(),
        }
    }
}

/// Read-only table of menus, validated at construction
#[derive(Debug)]
pub struct MenuRegistry {
    menus: HashMap<MenuId, Menu>,
    root: MenuId,
}

impl MenuRegistry {
    pub fn new(root: MenuId, menus: impl IntoIterator<Item = Menu>) -> Result<Self, MenuError> {
        let mut table = HashMap::new();
        for menu in menus {
            let id = menu.id;
            if table.insert(id, menu).is_some() {
                return Err(MenuError::Duplicate(id));
            }
        }

        if !table.contains_key(&root) {
            return Err(MenuError::MissingRoot(root));
        }

        for menu in table.values() {
            match &menu.kind {
                MenuKind::Choice(options) => {
                    for option in options {
                        if let Target::Menu(to) = option.target {
                            if !table.contains_key(&to) {
                                return Err(MenuError::DanglingTarget { from: menu.id, to });
                            }
                        }
                    }
                }
                MenuKind::Form { fields, .. } if fields.is_empty() => {
                    return Err(MenuError::EmptyForm(menu.id));
                }
                MenuKind::Form { .. } => {}
            }
        }

        Ok(Self { menus: table, root })
    }

    pub fn lookup(&self, id: MenuId) -> Result<&Menu, MenuError> {
        self.menus
            .get(&id)
            .ok_or_else(|| MenuError::UnknownMenu(id.as_str().to_string()))
    }

    pub fn root_id(&self) -> MenuId {
        self.root
    }

    pub fn root(&self) -> &Menu {
        // Presence of the root entry is checked in `new`
        &self.menus[&self.root]
    }

    #[allow(dead_code)] // Used in tests
    pub fn contains(&self, id: MenuId) -> bool {
        self.menus.contains_key(&id)
    }

    #[allow(dead_code)] // Used in tests
    pub fn ids(&self) -> impl Iterator<Item = MenuId> + '_ {
        self.menus.keys().copied()
    }
}

/// Substitute `{key}` placeholders from collected fields
///
/// Single pass over the template: substituted values are copied through as
/// typed, so a value that looks like a placeholder stays literal. Unknown
/// placeholders are left in place.
pub fn render(template: &str, fields: &Fields) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some((before, after)) = rest.split_once('{') {
        out.push_str(before);
        let substitution = after
            .split_once('}')
            .and_then(|(key, tail)| fields.get(key).map(|value| (value, tail)));
        if let Some((value, tail)) = substitution {
            out.push_str(value);
            rest = tail;
        } else {
            out.push('{');
            rest = after;
        }
    }
    out.push_str(rest);
    out
}
