//! BIN-based card routing.
//!
//! The processor publishes, per payment method, prefix patterns (and
//! exclusion patterns) over card numbers. The first credit-card method with
//! a matching, non-excluded rule wins.

use regex::Regex;
use saldo_core::error::CoreError;

use super::processor::PaymentMethodSpec;

/// Resolve the processor's method id for a card number.
///
/// Fails with [`CoreError::UnresolvedPaymentMethod`] when no published rule
/// matches. Unparsable patterns are skipped, not fatal: one bad rule in the
/// processor's catalog must not take card payments down.
pub fn resolve_card_method(
    methods: &[PaymentMethodSpec],
    card_number: &str,
) -> Result<String, CoreError> {
    for method in methods {
        if method.payment_type_id != "credit_card" {
            continue;
        }
        for rule in &method.bin_rules {
            let Some(pattern) = rule.pattern.as_deref() else {
                continue;
            };
            if !matches_prefix(pattern, card_number) {
                continue;
            }
            if let Some(exclusion) = rule.exclusion_pattern.as_deref() {
                if matches_prefix(exclusion, card_number) {
                    continue;
                }
            }
            return Ok(method.id.clone());
        }
    }
    Err(CoreError::UnresolvedPaymentMethod)
}

/// Match a pattern against the start of the card number (the processor's
/// patterns describe BIN prefixes, not whole numbers).
fn matches_prefix(pattern: &str, card_number: &str) -> bool {
    match Regex::new(&format!(r"\A(?:{pattern})")) {
        Ok(re) => re.is_match(card_number),
        Err(e) => {
            tracing::warn!(pattern, error = %e, "Skipping unparsable BIN pattern");
            false
        }
    }
}
