//! Rule preset for coaching emails: request values merged with fixed structural literals.

use super::ValidationRuleSet;

/// Opening HTML envelope tag.
pub const HTML_OPEN: &str = "<html>";
/// Closing HTML envelope tag.
pub const HTML_CLOSE: &str = "</html>";
/// Inline style declarations every call-to-action button must carry.
pub const BUTTON_STYLE_DECLARATIONS: [&str; 4] = [
    "border-radius: 4px",
    "background-color: #77b5fb",
    "display: inline-block",
    "padding: 10px 20px",
];
/// Payment link used when none is configured.
pub const DEFAULT_PAYMENT_LINK: &str = "https://pay.example/2";
/// Raw link prefixes that must not appear outside the expected link.
pub const RAW_LINK_PREFIXES: [&str; 3] = ["http://", "https://", "www."];

/// Request-specific values for one email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailRules {
    pub user_name: String,
    pub payment_link: String,
    pub quote: Option<String>,
    pub step_text: Option<String>,
}

impl EmailRules {
    pub fn new(user_name: impl Into<String>, payment_link: impl Into<String>) -> Self {
        Self {
            user_name: user_name.into(),
            payment_link: payment_link.into(),
            quote: None,
            step_text: None,
        }
    }

    pub fn with_quote(mut self, quote: impl Into<String>) -> Self {
        self.quote = Some(quote.into());
        self
    }

    pub fn with_step_text(mut self, step_text: impl Into<String>) -> Self {
        self.step_text = Some(step_text.into());
        self
    }

    /// Builds the rule set.
    ///
    /// - exactly once: `<html>`, `</html>`, the payment link, the quote
    /// - at least once: the user name, the step text, each button declaration
    /// - forbidden in the residual: [`RAW_LINK_PREFIXES`]
    pub fn build(&self) -> ValidationRuleSet {
        let mut exactly_once = vec![
            HTML_OPEN.to_string(),
            HTML_CLOSE.to_string(),
            self.payment_link.clone(),
        ];
        exactly_once.extend(self.quote.clone());

        let mut at_least_once = vec![self.user_name.clone()];
        at_least_once.extend(self.step_text.clone());
        at_least_once.extend(BUTTON_STYLE_DECLARATIONS.iter().map(|s| s.to_string()));

        ValidationRuleSet::new()
            .exactly_once(exactly_once)
            .at_least_once(at_least_once)
            .forbid(RAW_LINK_PREFIXES)
    }
}
