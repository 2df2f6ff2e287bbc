//! The processor set, in registration order: confirmation buttons, the
//! onboarding keyword, reply heuristics, balance, undo, credit/debit
//! recording, daily summary, chat, query.

pub mod balance;
pub mod chat;
pub mod confirmation;
pub mod daily_summary;
pub mod query;
pub mod reply;
pub mod start;
pub mod transaction;
pub mod undo;

use rust_decimal::Decimal;

pub use balance::BalanceProcessor;
pub use chat::ChatProcessor;
pub use confirmation::ConfirmationProcessor;
pub use daily_summary::DailySummaryProcessor;
pub use query::QueryProcessor;
pub use reply::ReplyProcessor;
pub use start::StartProcessor;
pub use transaction::TransactionProcessor;
pub use undo::UndoProcessor;

/// Rupee rendering used across response copy.
pub(crate) fn rupees(amount: Decimal) -> String {
    format!("₹{amount:.2}")
}

/// Sign framing for a contact balance: negative means the user owes.
pub(crate) fn balance_tag(balance: Decimal) -> &'static str {
    if balance < Decimal::ZERO {
        "🔴 (Due)"
    } else {
        "🟢 (Credit)"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rupees_renders_two_decimals() {
        assert_eq!(rupees(dec!(500)), "₹500.00");
        assert_eq!(rupees(dec!(99.9)), "₹99.90");
    }

    #[test]
    fn negative_balance_is_due() {
        assert_eq!(balance_tag(dec!(-1)), "🔴 (Due)");
        assert_eq!(balance_tag(dec!(0)), "🟢 (Credit)");
        assert_eq!(balance_tag(dec!(10)), "🟢 (Credit)");
    }
}
