//! `{{placeholder}}` substitution for messages and notification text

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::{Captures, Regex};

lazy_static! {
    static ref PLACEHOLDER: Regex = Regex::new(r"\{\{\s*([a-z_]+)\s*\}\}").expect("valid regex");
}

/// Values available for substitution. Anything left `None` resolves to
/// the empty string, never a literal leftover placeholder.
#[derive(Debug, Default, Clone)]
pub struct VariableContext {
    pub signer_name: Option<String>,
    pub signer_email: Option<String>,
    pub creator_name: Option<String>,
    pub creator_email: Option<String>,
    pub commission_percent: Option<String>,
    pub document_name: Option<String>,
    pub expiry_date: Option<String>,
    pub current_date: Option<String>,
    pub company_name: Option<String>,
}

impl VariableContext {
    /// Context pre-filled with today's date.
    pub fn now(now: DateTime<Utc>) -> Self {
        Self {
            current_date: Some(now.format("%B %-d, %Y").to_string()),
            ..Self::default()
        }
    }

    fn lookup(&self, key: &str) -> Option<&str> {
        let slot = match key {
            "signer_name" => &self.signer_name,
            "signer_email" => &self.signer_email,
            "creator_name" => &self.creator_name,
            "creator_email" => &self.creator_email,
            "commission_percent" => &self.commission_percent,
            "document_name" => &self.document_name,
            "expiry_date" => &self.expiry_date,
            "current_date" => &self.current_date,
            "company_name" => &self.company_name,
            _ => return None,
        };
        slot.as_deref()
    }
}

/// Replace every `{{name}}` with its context value. Unknown names and
/// missing values substitute as empty strings.
pub fn substitute(text: &str, ctx: &VariableContext) -> String {
    PLACEHOLDER
        .replace_all(text, |caps: &Captures<'_>| {
            ctx.lookup(&caps[1]).unwrap_or("").to_string()
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ctx() -> VariableContext {
        VariableContext {
            signer_name: Some("Ada Lovelace".to_string()),
            document_name: Some("Listing Agreement".to_string()),
            company_name: Some("North Shore Realty".to_string()),
            ..VariableContext::default()
        }
    }

    #[test]
    fn replaces_known_placeholders() {
        let out = substitute("Hi {{signer_name}}, please sign {{document_name}}.", &ctx());
        assert_eq!(out, "Hi Ada Lovelace, please sign Listing Agreement.");
    }

    #[test]
    fn unresolved_yields_empty_string() {
        let out = substitute("Expires {{expiry_date}}!", &ctx());
        assert_eq!(out, "Expires !");
    }

    #[test]
    fn unknown_names_also_vanish() {
        let out = substitute("{{nonsense_key}}done", &ctx());
        assert_eq!(out, "done");
    }

    #[test]
    fn whitespace_inside_braces_is_tolerated() {
        let out = substitute("From {{ company_name }}", &ctx());
        assert_eq!(out, "From North Shore Realty");
    }

    #[test]
    fn text_without_placeholders_is_untouched() {
        let plain = "No templating here.";
        assert_eq!(substitute(plain, &ctx()), plain);
    }
}
