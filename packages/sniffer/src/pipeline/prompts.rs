//! Named prompt templates and placeholder rendering.
//!
//! Use-case bundles reference templates by name; [`resolve_template`]
//! falls back to treating the configured string as the template text
//! itself, so file-loaded bundles can carry inline prompts.

/// Template names referenced by the compiled-in bundles.
pub const LENDER_SCRAPER_SYSTEM_MESSAGE_NAME: &str = "lender_scraper_system_message";
pub const LENDER_SCRAPER_PROMPT_NAME: &str = "lender_scraper_prompt";
pub const GENERIC_SCRAPER_SYSTEM_MESSAGE_NAME: &str = "generic_scraper_system_message";
pub const GENERIC_SCRAPER_PROMPT_NAME: &str = "generic_scraper_prompt";
pub const REFINEMENT_PROMPT_NAME: &str = "refinement_prompt";
pub const SEARCH_QUESTION_NAME: &str = "search_question";

pub const LENDER_SCRAPER_SYSTEM_MESSAGE: &str = "\
You are a lender policy data extractor. Browse, click, scroll, and parse the lender's \
official pages to collect home loan and Loan Against Property (LAP) parameters. Return \
one JSON object matching the provided schema with clean, normalized values. Do not \
guess; if a field is not found, set it to null. Prefer the most recent, official \
sources on {domain_allowlist} (including PDFs hosted on the same domain).

SCOPE
- Allowed domains: {domain_allowlist} (and subpaths).
- Seed pages include titles/links containing: Home Loan, Housing Loan, Loan Against \
Property, LAP, Interest Rates, Rates & Charges, Schedule of Charges, Eligibility, \
Documents Required, MITC, Fees, Processing Fee, Prepayment, Foreclosure, Contact, \
Downloads, FAQs.
- Open and parse MITC / Schedule of Charges / product brochure PDFs when present.

NORMALIZATION
- Numbers as JSON numbers; no commas, symbols, or unit suffixes.
- Percentages numeric without the % sign (e.g. 8.5).
- Tenure converted from months to years.
- Unknown or unavailable values are null.
- De-duplicate arrays; trim whitespace.

Return only the final JSON object matching the schema, no commentary.";

pub const LENDER_SCRAPER_PROMPT: &str = "\
GOAL: Extract {lender_name} Home Loan & LAP parameters from official pages and PDFs on \
{lender_website}. Click, scroll, and parse tabs and accordions to reveal hidden \
content. Follow internal links relevant to rates, fees and charges, features, \
eligibility, documents, MITC, schedule of charges, and downloads.

EXTRACTION TARGETS
- Interest rates: headline rate or range, slab-wise rates, benchmark/reset if present.
- Loan amounts: minimum and maximum.
- Tenure: minimum and maximum, in years.
- LTV: maximum percentage, with tiering if disclosed.
- Fees and charges: processing fee, prepayment and foreclosure charges.
- Eligibility: age, employment type, minimum income, credit score floor.
- Approval and processing time, in days.
- Special offers: seasonal campaigns, fee waivers.

Domain allowlist: {domain_allowlist}. Return exactly one JSON object matching the \
schema. No extra text.";

pub const GENERIC_SCRAPER_SYSTEM_MESSAGE: &str = "\
You are a data extraction agent. Fetch the provided pages from {domain_allowlist} and \
extract every distinct entry matching the provided schema. Use only visible, \
verifiable information; do not invent values. If a field is not found, set it to null. \
Return only data matching the schema, no commentary.";

pub const GENERIC_SCRAPER_PROMPT: &str = "\
Extract all records matching the schema from the pages on {domain}. Capture every \
distinct entry rather than summarizing; keep values concise and trimmed.";

pub const REFINEMENT_PROMPT: &str = "\
You are a data-refinement engine. Normalize the scraped object to the target schema. \
Output exactly one JSON object; no commentary. Rules:
- Numbers: JSON numbers only (no commas/units).
- Currency: numeric with two decimals; strip currency words and symbols.
- Percentages: numeric without the % sign.
- Tenure: convert months to years.
- IDs, phones, postal codes: digits/alphanumerics only; null if invalid.
- Missing or unparseable values become null.
- De-duplicate arrays; trim text.

Return keys exactly as in the schema and keep nulls where data is unavailable.";

pub const SEARCH_QUESTION: &str = "\
What is the
1. interest rate,
2. loan-to-value,
3. minimum credit score,
4. loan amount range,
5. loan tenure range,
6. approval time,
7. processing fee,
8. special offers
for home loan from {source}.";

/// Look up a compiled-in template by name.
pub fn get_prompt(name: &str) -> Option<&'static str> {
    match name {
        LENDER_SCRAPER_SYSTEM_MESSAGE_NAME => Some(LENDER_SCRAPER_SYSTEM_MESSAGE),
        LENDER_SCRAPER_PROMPT_NAME => Some(LENDER_SCRAPER_PROMPT),
        GENERIC_SCRAPER_SYSTEM_MESSAGE_NAME => Some(GENERIC_SCRAPER_SYSTEM_MESSAGE),
        GENERIC_SCRAPER_PROMPT_NAME => Some(GENERIC_SCRAPER_PROMPT),
        REFINEMENT_PROMPT_NAME => Some(REFINEMENT_PROMPT),
        SEARCH_QUESTION_NAME => Some(SEARCH_QUESTION),
        _ => None,
    }
}

/// Resolve a configured value: a known template name, or the value
/// itself as inline template text.
pub fn resolve_template(configured: &str) -> &str {
    get_prompt(configured).unwrap_or(configured)
}

/// Substitute `{name}` placeholders. Unknown placeholders are left
/// in place rather than erased.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (name, value) in vars {
        out = out.replace(&format!("{{{name}}}"), value);
    }
    out
}

/// Substitute every domain-derived placeholder the templates use.
pub fn render_for_domain(template: &str, domain: &str) -> String {
    render(
        template,
        &[
            ("domain", domain),
            ("domain_allowlist", domain),
            ("lender_name", domain),
            ("lender_website", domain),
            ("source", domain),
        ],
    )
}

/// Compose the Stage A extraction prompt: rendered system message,
/// rendered scraper prompt, then the request's free-text context.
pub fn compose_scraper_prompt(
    system_message: &str,
    scraper_prompt: &str,
    request_context: &str,
    domain: &str,
) -> String {
    let mut composed = format!(
        "{}\n{}",
        render_for_domain(resolve_template(system_message), domain),
        render_for_domain(resolve_template(scraper_prompt), domain),
    );
    if !request_context.is_empty() {
        composed.push('\n');
        composed.push_str(request_context);
    }
    composed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_substitutes_named_placeholders() {
        let out = render("rates for {lender_name} on {domain}", &[
            ("lender_name", "example-bank.test"),
            ("domain", "example-bank.test"),
        ]);
        assert_eq!(out, "rates for example-bank.test on example-bank.test");
    }

    #[test]
    fn test_render_leaves_unknown_placeholders() {
        assert_eq!(render("{who}?", &[("domain", "x")]), "{who}?");
    }

    #[test]
    fn test_resolve_template_falls_back_to_inline_text() {
        assert_eq!(
            resolve_template(REFINEMENT_PROMPT_NAME),
            REFINEMENT_PROMPT
        );
        assert_eq!(resolve_template("Extract the menu items."), "Extract the menu items.");
    }

    #[test]
    fn test_compose_appends_request_context() {
        let composed = compose_scraper_prompt(
            GENERIC_SCRAPER_SYSTEM_MESSAGE_NAME,
            GENERIC_SCRAPER_PROMPT_NAME,
            "focus on branch offices",
            "example.com",
        );
        assert!(composed.contains("example.com"));
        assert!(composed.ends_with("focus on branch offices"));
        assert!(!composed.contains("{domain}"));
    }
}
