//! `$NAME` / `${NAME}` expansion

use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::LazyLock;

// Alternatives, leftmost first:
//   ${NAME}       substituted
//   ${...}        not a name (or unterminated): kept verbatim, nothing inside expands
//   $$            kept verbatim
//   $NAME         substituted
static VARIABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{(\w+)\}|\$\{[^}]*\}?|\$\$|\$(\w+)").expect("variable pattern is valid")
});

/// Substitutes variables from session variables, then the environment.
///
/// Unknown names become the empty string. Substituted values are never
/// rescanned.
#[derive(Debug, Clone, Copy)]
pub struct Expander<'a> {
    variables: &'a HashMap<String, String>,
    env: &'a HashMap<String, String>,
}

impl<'a> Expander<'a> {
    /// Create an expander over the two lookup sources.
    pub fn new(variables: &'a HashMap<String, String>, env: &'a HashMap<String, String>) -> Self {
        Self { variables, env }
    }

    /// Look a name up: session variable, then environment, then empty.
    pub fn lookup(&self, name: &str) -> &'a str {
        self.variables
            .get(name)
            .or_else(|| self.env.get(name))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Expand every variable reference in `input`.
    pub fn expand(&self, input: &str) -> String {
        if !input.contains('$') {
            return input.to_string();
        }
        VARIABLE
            .replace_all(input, |caps: &Captures<'_>| {
                match caps.get(1).or_else(|| caps.get(2)) {
                    Some(name) => self.lookup(name.as_str()).to_string(),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }
}

/// Expand `input` against session variables and the environment.
pub fn expand(
    input: &str,
    variables: &HashMap<String, String>,
    env: &HashMap<String, String>,
) -> String {
    Expander::new(variables, env).expand(input)
}
