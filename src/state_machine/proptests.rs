//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::transition::BACK_TOKEN;
use super::*;
use crate::menu::{agriconnect, Menu, MenuKind, MenuRegistry};
use proptest::prelude::*;

// ============================================================================
// Test Helpers
// ============================================================================

const PHONE: &str = "+255700000001";

fn registry() -> MenuRegistry {
    agriconnect().unwrap()
}

/// State is consistent with the registry it was produced from
fn is_valid_state(registry: &MenuRegistry, state: &MenuState) -> bool {
    let Ok(menu) = registry.lookup(state.menu) else {
        return false;
    };
    match &menu.kind {
        MenuKind::Choice(_) => state.step == 0 && state.fields.is_empty(),
        MenuKind::Form { fields, .. } => {
            state.step < fields.len() && state.fields.len() == state.step
        }
    }
}

/// Replay tokens from the root, collecting every intermediate result
fn run(registry: &MenuRegistry, tokens: &[String]) -> Vec<TransitionResult> {
    let mut state = MenuState::at(registry.root_id());
    let mut out = vec![];
    for token in tokens {
        let result = advance(registry, &state, PHONE, token);
        state = result.new_state.clone();
        out.push(result);
    }
    out
}

/// Token is neither back navigation nor acceptable input for the current screen
fn is_rejected(menu: &Menu, state: &MenuState, token: &str) -> bool {
    if token == BACK_TOKEN {
        return false;
    }
    match &menu.kind {
        MenuKind::Choice(options) => options.iter().all(|option| option.token != token),
        MenuKind::Form { fields, .. } => fields[state.step].format.accept(token).is_none(),
    }
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_token() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => (0u8..10).prop_map(|n| n.to_string()),
        2 => "[0-9]{1,7}",
        2 => "[a-zA-Z ]{0,12}",
        1 => "[-.*#x0-9]{1,4}",
    ]
}

fn arb_tokens() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec(arb_token(), 0..25)
}

fn arb_name() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z ]{0,15}"
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // Invariant 1: Every reachable state is registered and well-formed
    #[test]
    fn prop_transitions_preserve_validity(tokens in arb_tokens()) {
        let registry = registry();
        for result in run(&registry, &tokens) {
            prop_assert!(
                is_valid_state(&registry, &result.new_state),
                "Invalid state: {:?}",
                result.new_state
            );
        }
    }

    // Invariant 2: Only terminal replies carry side effects, and terminal states are the root
    #[test]
    fn prop_effects_only_on_terminal(tokens in arb_tokens()) {
        let registry = registry();
        for result in run(&registry, &tokens) {
            if result.is_terminal() {
                prop_assert!(result.new_state.is_at(registry.root_id()));
                prop_assert!(result.new_state.fields.is_empty());
            } else {
                prop_assert!(result.effects.is_empty(), "Effects on non-terminal: {:?}", result);
            }
        }
    }

    // Invariant 3: Back from anywhere but the root lands on the root with nothing collected
    #[test]
    fn prop_back_clears_fields(tokens in arb_tokens()) {
        let registry = registry();
        for result in run(&registry, &tokens) {
            let state = result.new_state;
            if state.is_at(registry.root_id()) {
                continue;
            }
            let back = advance(&registry, &state, PHONE, BACK_TOKEN);
            prop_assert!(back.new_state.is_at(registry.root_id()));
            prop_assert!(back.new_state.fields.is_empty());
            prop_assert!(!back.is_terminal());
            prop_assert!(back.effects.is_empty());
        }
    }

    // Invariant 4: Redisplay never changes state and is stable
    #[test]
    fn prop_redisplay_is_idempotent(tokens in arb_tokens()) {
        let registry = registry();
        for result in run(&registry, &tokens) {
            let first = redisplay(&registry, &result.new_state);
            let second = redisplay(&registry, &first.new_state);
            prop_assert_eq!(&first.new_state, &result.new_state);
            prop_assert_eq!(&first, &second);
            prop_assert!(first.effects.is_empty());
        }
    }

    // Invariant 5: Same state and token always give the same result
    #[test]
    fn prop_transitions_are_deterministic(tokens in arb_tokens(), token in arb_token()) {
        let registry = registry();
        let state = run(&registry, &tokens)
            .pop()
            .map_or_else(|| MenuState::at(registry.root_id()), |r| r.new_state);
        prop_assert_eq!(
            advance(&registry, &state, PHONE, &token),
            advance(&registry, &state, PHONE, &token)
        );
    }

    // Invariant 6: Completing the farmer form yields exactly one registration with every field
    #[test]
    fn prop_farmer_registration_collects_all_fields(
        name in arb_name(),
        location in arb_name(),
        crop in arb_name(),
    ) {
        let registry = registry();
        let tokens = vec!["1".to_string(), name.clone(), location.clone(), crop.clone()];
        let last = run(&registry, &tokens).pop().unwrap();

        prop_assert!(last.is_terminal());
        let registrations: Vec<_> = last
            .effects
            .iter()
            .filter_map(|e| match e {
                Effect::Register { kind, fields, .. } => Some((*kind, fields.clone())),
                _ => None,
            })
            .collect();
        prop_assert_eq!(registrations.len(), 1);
        let (kind, fields) = &registrations[0];
        prop_assert_eq!(*kind, PartyKind::Farmer);
        prop_assert_eq!(&fields["name"], name.trim());
        prop_assert_eq!(&fields["location"], location.trim());
        prop_assert_eq!(&fields["crop_type"], crop.trim());
    }

    // Invariant 7: A token the current screen does not accept redisplays it unchanged
    #[test]
    fn prop_unknown_option_redisplays(
        tokens in arb_tokens(),
        token in "[7-9][0-9]{0,3}|[a-z]{1,5}| {0,3}",
    ) {
        let registry = registry();
        let root = MenuState::at(registry.root_id());
        let states = std::iter::once(root)
            .chain(run(&registry, &tokens).into_iter().map(|r| r.new_state));

        for state in states {
            let menu = registry.lookup(state.menu).unwrap();
            if !is_rejected(menu, &state, &token) {
                continue;
            }
            let result = advance(&registry, &state, PHONE, &token);
            prop_assert_eq!(&result.new_state, &state);
            prop_assert_eq!(&result.reply.text, &menu.screen(state.step));
            prop_assert!(!result.is_terminal());
            prop_assert!(result.effects.is_empty());
        }
    }
}
