//! Policy taxonomy shown to the semantic classifier.

/// A single disallowed-content category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyCategory {
    /// Short code the classifier answers with (e.g. `O1`).
    pub code: &'static str,
    /// Human-readable name.
    pub name: &'static str,
    /// Things the assistant should not do for this category.
    pub prohibitions: &'static [&'static str],
}

/// The static taxonomy of disallowed categories.
///
/// Immutable for the process lifetime; not configurable at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyDocument {
    categories: &'static [PolicyCategory],
}

const DEFAULT_CATEGORIES: &[PolicyCategory] = &[
    PolicyCategory {
        code: "O1",
        name: "Violence and Hate",
        prohibitions: &[
            "Help with violence or hate speech.",
            "Encourage self-harm.",
        ],
    },
    PolicyCategory {
        code: "O2",
        name: "Sexual Content",
        prohibitions: &["Engage in sexually explicit conversations."],
    },
    PolicyCategory {
        code: "O3",
        name: "Criminal Planning",
        prohibitions: &["Help with illegal acts or crimes."],
    },
    PolicyCategory {
        code: "O4",
        name: "Guns and Illegal Weapons",
        prohibitions: &["Assist in acquiring or building weapons."],
    },
];

static DEFAULT_POLICY: PolicyDocument = PolicyDocument {
    categories: DEFAULT_CATEGORIES,
};

impl PolicyDocument {
    /// Returns the built-in policy (categories `O1`..`O4`).
    pub fn default_policy() -> &'static PolicyDocument {
        &DEFAULT_POLICY
    }

    /// Returns all categories in order.
    pub fn categories(&self) -> &'static [PolicyCategory] {
        self.categories
    }

    /// Looks up a category by its code.
    pub fn category(&self, code: &str) -> Option<&'static PolicyCategory> {
        self.categories.iter().find(|c| c.code == code)
    }

    /// Renders the policy as the text block embedded in the classifier prompt.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for category in self.categories {
            out.push_str(category.code);
            out.push_str(": ");
            out.push_str(category.name);
            out.push_str(".\nShould not\n");
            for line in category.prohibitions {
                out.push_str("- ");
                out.push_str(line);
                out.push('\n');
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_has_four_categories() {
        let policy = PolicyDocument::default_policy();
        let codes: Vec<_> = policy.categories().iter().map(|c| c.code).collect();
        assert_eq!(codes, vec!["O1", "O2", "O3", "O4"]);
    }

    #[test]
    fn category_lookup_by_code() {
        let policy = PolicyDocument::default_policy();
        assert_eq!(policy.category("O3").unwrap().name, "Criminal Planning");
        assert!(policy.category("O9").is_none());
        assert!(policy.category("o1").is_none());
    }

    #[test]
    fn render_lists_every_prohibition() {
        let rendered = PolicyDocument::default_policy().render();
        assert!(rendered.starts_with("O1: Violence and Hate.\nShould not\n"));
        assert!(rendered.contains("- Encourage self-harm.\n"));
        assert!(rendered.contains("O4: Guns and Illegal Weapons.\n"));
        assert_eq!(rendered.matches("Should not").count(), 4);
    }
}
