//! Pure state transition function
//!
//! Rules, in order of precedence:
//! 1. Back token outside the root returns to the root and drops partial fields
//! 2. A listed option on a choice menu moves to its target
//! 3. Anything else on a choice menu redisplays it
//! 4. A valid value on a form is stored and the next field is prompted
//! 5. Storing the last field completes the form and emits its side effects

use super::{Effect, Fields, MenuState};
use crate::gateway::Reply;
use crate::menu::{
    render, Completion, MenuError, MenuId, MenuKind, MenuRegistry, Target, FIELD_PHONE,
    FIELD_PRICE, FIELD_QUANTITY, FIELD_TOTAL,
};
use thiserror::Error;

/// Input that leaves any non-root menu
pub const BACK_TOKEN: &str = "0";

/// Result of a state transition
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionResult {
    pub new_state: MenuState,
    pub reply: Reply,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn proceed(state: MenuState, text: impl Into<String>) -> Self {
        Self {
            new_state: state,
            reply: Reply::proceed(text),
            effects: vec![],
        }
    }

    pub fn end(state: MenuState, text: impl Into<String>) -> Self {
        Self {
            new_state: state,
            reply: Reply::end(text),
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.reply.terminal
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error)]
pub enum TransitionError {
    #[error(transparent)]
    Menu(#[from] MenuError),
    #[error("Step {step} is out of range for form {menu}")]
    StepOutOfRange { menu: MenuId, step: usize },
}

/// Pure transition function
///
/// Given the same registry, state and token this always produces the same
/// result. Malformed input never fails; only a state that does not match the
/// registry does.
pub fn transition(
    registry: &MenuRegistry,
    state: &MenuState,
    phone: &str,
    token: &str,
) -> Result<TransitionResult, TransitionError> {
    let menu = registry.lookup(state.menu)?;

    if token == BACK_TOKEN && !state.is_at(registry.root_id()) {
        return Ok(reset(registry));
    }

    match &menu.kind {
        MenuKind::Choice(options) => {
            let Some(option) = options.iter().find(|option| option.token == token) else {
                return Ok(TransitionResult::proceed(
                    state.clone(),
                    menu.screen(state.step),
                ));
            };

            match option.target {
                Target::Menu(to) => {
                    let next = registry.lookup(to)?;
                    Ok(TransitionResult::proceed(MenuState::at(to), next.screen(0)))
                }
                Target::End(text) => Ok(TransitionResult::end(
                    MenuState::at(registry.root_id()),
                    render(text, &template_context(&state.fields, phone)),
                )),
            }
        }

        MenuKind::Form { fields, completion } => {
            let field = fields
                .get(state.step)
                .ok_or(TransitionError::StepOutOfRange {
                    menu: state.menu,
                    step: state.step,
                })?;

            let Some(value) = field.format.accept(token) else {
                return Ok(TransitionResult::proceed(
                    state.clone(),
                    menu.screen(state.step),
                ));
            };

            let mut next = state.clone();
            next.fields.insert(field.name.to_string(), value);
            next.step += 1;

            if next.step < fields.len() {
                let text = menu.screen(next.step);
                Ok(TransitionResult::proceed(next, text))
            } else {
                Ok(complete(registry, completion, next.fields, phone))
            }
        }
    }
}

/// Transition that recovers from registry mismatches by resetting to the root
pub fn advance(
    registry: &MenuRegistry,
    state: &MenuState,
    phone: &str,
    token: &str,
) -> TransitionResult {
    transition(registry, state, phone, token).unwrap_or_else(|e| {
        tracing::error!(
            menu = %state.menu,
            step = state.step,
            error = %e,
            "Session state does not match menu registry, resetting to root"
        );
        reset(registry)
    })
}

/// Show the current screen again without changing anything
pub fn redisplay(registry: &MenuRegistry, state: &MenuState) -> TransitionResult {
    match registry.lookup(state.menu) {
        Ok(menu) if menu.step_count() == 0 || state.step < menu.step_count() => {
            TransitionResult::proceed(state.clone(), menu.screen(state.step))
        }
        Ok(_) => {
            tracing::error!(menu = %state.menu, step = state.step, "Step out of range, resetting to root");
            reset(registry)
        }
        Err(e) => {
            tracing::error!(menu = %state.menu, error = %e, "Unknown menu, resetting to root");
            reset(registry)
        }
    }
}

/// Root menu with a clean slate
pub fn reset(registry: &MenuRegistry) -> TransitionResult {
    TransitionResult::proceed(
        MenuState::at(registry.root_id()),
        registry.root().screen(0),
    )
}

fn complete(
    registry: &MenuRegistry,
    completion: &Completion,
    fields: Fields,
    phone: &str,
) -> TransitionResult {
    let root = MenuState::at(registry.root_id());
    let mut context = template_context(&fields, phone);

    match completion {
        Completion::Register {
            kind,
            confirmation,
            welcome,
        } => TransitionResult::end(root, render(confirmation, &context))
            .with_effect(Effect::register(*kind, fields, phone))
            .with_effect(Effect::notify(phone, render(welcome, &context))),

        Completion::PlaceOrder {
            confirmation,
            notice,
        } => {
            if let Some(total) = order_total(&fields) {
                context.insert(FIELD_TOTAL.to_string(), group_thousands(total));
            }
            TransitionResult::end(root, render(confirmation, &context))
                .with_effect(Effect::place_order(fields, phone))
                .with_effect(Effect::notify(phone, render(notice, &context)))
        }
    }
}

fn template_context(fields: &Fields, phone: &str) -> Fields {
    let mut context = fields.clone();
    context.insert(FIELD_PHONE.to_string(), phone.to_string());
    context
}

/// Quantity times unit price, if both are present and the product fits
pub fn order_total(fields: &Fields) -> Option<u64> {
    let quantity: u64 = fields.get(FIELD_QUANTITY)?.parse().ok()?;
    let price: u64 = fields.get(FIELD_PRICE)?.parse().ok()?;
    quantity.checked_mul(price)
}

/// `1234567` -> `1,234,567`
fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i).is_multiple_of(3) {
            out.push(',');
        }
        out.push(c);
    }
    out
}
